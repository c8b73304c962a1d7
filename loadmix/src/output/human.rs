use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    bar: ProgressBar,
}

impl HumanReadableOutput {
    pub(crate) fn new(duration: Duration) -> Self {
        let bar = ProgressBar::with_draw_target(
            Some(duration.as_millis() as u64),
            ProgressDrawTarget::stderr_with_hz(5),
        );
        bar.set_style(bar_style());

        Self { bar }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, cfg: &loadmix_core::GeneratorConfig) {
        println!("target: {}", cfg.base_url);
        println!("duration: {}s", cfg.duration.as_secs());

        let mix = cfg
            .mix
            .entries()
            .iter()
            .map(|(kind, weight)| format!("{kind}={weight}%"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("mix: {mix}");
        println!();
    }

    fn progress(&self) -> Option<loadmix_core::ProgressFn> {
        let bar = self.bar.clone();
        let total_ms = self.bar.length().unwrap_or(0);

        Some(Arc::new(move |u| {
            let elapsed_ms = u.elapsed.as_millis() as u64;
            bar.set_position(elapsed_ms.min(total_ms));
            bar.set_message(format!(
                "reqs={} ok={} failed={} elapsed={}s",
                u.requests_total,
                u.success_total,
                u.failed_total,
                u.elapsed.as_secs()
            ));
        }))
    }

    fn print_summary(&self, summary: &loadmix_core::RunSummary) -> anyhow::Result<()> {
        self.bar.finish_and_clear();
        print!("{}", render(summary));
        Ok(())
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("[ {bar:20.cyan/blue} ] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}

fn render(summary: &loadmix_core::RunSummary) -> String {
    let mut out = String::new();

    out.push_str("summary\n");
    writeln!(
        &mut out,
        "  requests: {} (ok {}, failed {})",
        summary.requests_total, summary.success_total, summary.failed_total
    )
    .ok();
    writeln!(&mut out, "  duration: {}s", summary.run_duration.as_secs()).ok();
    writeln!(&mut out, "  rps: {:.0}", summary.rps).ok();

    if summary.latency_count > 0 {
        writeln!(
            &mut out,
            "  latency = p50={} p90={} p99={} mean={} max={} (n={})",
            format_ms(summary.latency_p50_ms),
            format_ms(summary.latency_p90_ms),
            format_ms(summary.latency_p99_ms),
            format_ms(summary.latency_mean_ms),
            format_ms(summary.latency_max_ms),
            summary.latency_count
        )
        .ok();
    } else {
        out.push_str("  latency: n/a\n");
    }

    if !summary.by_kind.is_empty() {
        out.push_str("  by kind:\n");
        for k in &summary.by_kind {
            writeln!(
                &mut out,
                "    {}: {} (failed {})",
                k.kind, k.requests_total, k.failed_total
            )
            .ok();
        }
    }

    if !summary.errors.is_empty() {
        out.push_str("  errors:\n");
        for (key, count) in &summary.errors {
            writeln!(&mut out, "    {key}: {count}").ok();
        }
    }

    out
}

fn format_ms(v: Option<f64>) -> String {
    match v {
        Some(ms) if ms >= 1000.0 => format!("{:.2}s", ms / 1000.0),
        Some(ms) => format!("{ms:.1}ms"),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use loadmix_core::{KindSummary, RequestKind};

    #[test]
    fn render_includes_totals_kinds_and_errors() {
        let mut errors = BTreeMap::new();
        errors.insert("http_status:500".to_string(), 2u64);

        let summary = loadmix_core::RunSummary {
            requests_total: 120,
            success_total: 117,
            failed_total: 3,
            run_duration: Duration::from_secs(60),
            rps: 2.0,
            by_kind: vec![KindSummary {
                kind: RequestKind::UserLookup,
                requests_total: 50,
                failed_total: 0,
            }],
            errors,
            latency_p50_ms: Some(42.5),
            latency_p90_ms: Some(180.0),
            latency_p99_ms: Some(2100.0),
            latency_mean_ms: Some(88.1),
            latency_max_ms: Some(2400.0),
            latency_count: 120,
        };

        let text = render(&summary);
        assert!(text.contains("requests: 120 (ok 117, failed 3)"));
        assert!(text.contains("duration: 60s"));
        assert!(text.contains("rps: 2"));
        assert!(text.contains("p50=42.5ms"));
        assert!(text.contains("p99=2.10s"));
        assert!(text.contains("user-lookup: 50 (failed 0)"));
        assert!(text.contains("http_status:500: 2"));
    }

    #[test]
    fn render_handles_an_empty_run() {
        let summary = loadmix_core::RunSummary {
            requests_total: 0,
            success_total: 0,
            failed_total: 0,
            run_duration: Duration::from_secs(1),
            rps: 0.0,
            by_kind: Vec::new(),
            errors: BTreeMap::new(),
            latency_p50_ms: None,
            latency_p90_ms: None,
            latency_p99_ms: None,
            latency_mean_ms: None,
            latency_max_ms: None,
            latency_count: 0,
        };

        let text = render(&summary);
        assert!(text.contains("requests: 0 (ok 0, failed 0)"));
        assert!(text.contains("latency: n/a"));
        assert!(!text.contains("by kind"));
        assert!(!text.contains("errors:"));
    }
}
