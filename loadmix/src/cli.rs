use clap::Parser;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 60, 30s, 2m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!("invalid duration '{s}' (expected e.g. 60, 30s, 2m)"));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 60, 30s, 2m)"))?;

    let unit = unit_str.trim();
    match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60)
                .and_then(|v| v.checked_mul(60))
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!("invalid duration '{s}' (expected e.g. 60, 30s, 2m)")),
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress bar and summary.
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "loadmix",
    author,
    version,
    about = "Synthetic traffic generator with a fixed request mix",
    long_about = "loadmix drives synthetic load against a sample service for a bounded duration.\n\nEach request's category is drawn from a weighted mix (user lookups, resource fetches, batch submissions, health checks, plus deliberate slow and failing calls) so the target produces traces, logs and metrics worth inspecting.\n\nIndividual request failures are counted and never abort the run.",
    after_help = "Examples:\n  loadmix\n  loadmix 30s\n  loadmix 2m http://localhost:8080\n  loadmix 60 http://localhost:3000 --output json\n  loadmix 10s --seed 42"
)]
pub struct Cli {
    /// How long to generate traffic (e.g. 60, 30s, 2m)
    #[arg(default_value = "60", value_parser = parse_duration)]
    pub duration: Duration,

    /// Base URL of the target service
    #[arg(default_value = "http://localhost:3000")]
    pub base_url: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Seed the request mix and pacing for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,
}
