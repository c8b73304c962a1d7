use std::collections::BTreeMap;
use std::io::Write as _;
use std::sync::Arc;

use serde::Serialize;

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _cfg: &loadmix_core::GeneratorConfig) {}

    fn progress(&self) -> Option<loadmix_core::ProgressFn> {
        Some(Arc::new(move |u| {
            emit_json_line(&build_progress_line(&u));
        }))
    }

    fn print_summary(&self, summary: &loadmix_core::RunSummary) -> anyhow::Result<()> {
        emit_json_line(&build_summary_line(summary));
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub elapsed_secs: u64,
    pub requests_total: u64,
    pub success_total: u64,
    pub failed_total: u64,
}

fn build_progress_line(u: &loadmix_core::ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        elapsed_secs: u.elapsed.as_secs(),
        requests_total: u.requests_total,
        success_total: u.success_total,
        failed_total: u.failed_total,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub totals: JsonTotals,
    pub duration_secs: u64,
    pub requests_per_sec: f64,
    pub by_kind: Vec<JsonKindCount>,
    pub errors: BTreeMap<String, u64>,
    pub latency: Option<JsonLatencySummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonTotals {
    pub requests_total: u64,
    pub success_total: u64,
    pub failed_total: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonKindCount {
    pub kind: String,
    pub requests_total: u64,
    pub failed_total: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonLatencySummary {
    pub p50_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p99_ms: Option<f64>,
    pub mean_ms: Option<f64>,
    pub max_ms: Option<f64>,
    pub count: u64,
}

fn build_summary_line(summary: &loadmix_core::RunSummary) -> JsonSummaryLine {
    let by_kind = summary
        .by_kind
        .iter()
        .map(|k| JsonKindCount {
            kind: k.kind.to_string(),
            requests_total: k.requests_total,
            failed_total: k.failed_total,
        })
        .collect();

    let latency = (summary.latency_count > 0).then(|| JsonLatencySummary {
        p50_ms: summary.latency_p50_ms,
        p90_ms: summary.latency_p90_ms,
        p99_ms: summary.latency_p99_ms,
        mean_ms: summary.latency_mean_ms,
        max_ms: summary.latency_max_ms,
        count: summary.latency_count,
    });

    JsonSummaryLine {
        kind: "summary",
        totals: JsonTotals {
            requests_total: summary.requests_total,
            success_total: summary.success_total,
            failed_total: summary.failed_total,
        },
        duration_secs: summary.run_duration.as_secs(),
        requests_per_sec: summary.rps,
        by_kind,
        errors: summary.errors.clone(),
        latency,
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
