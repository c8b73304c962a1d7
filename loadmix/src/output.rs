use std::time::Duration;

use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, cfg: &loadmix_core::GeneratorConfig);
    fn progress(&self) -> Option<loadmix_core::ProgressFn>;
    fn print_summary(&self, summary: &loadmix_core::RunSummary) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat, duration: Duration) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new(duration)),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
