use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use loadmix_testapp::TestServer;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProgressLine {
    elapsed_secs: u64,
    requests_total: u64,
    success_total: u64,
    failed_total: u64,
}

#[derive(Debug, Deserialize)]
struct Totals {
    requests_total: u64,
    success_total: u64,
    failed_total: u64,
}

#[derive(Debug, Deserialize)]
struct SummaryLine {
    totals: Totals,
    duration_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind")]
enum JsonLine {
    #[serde(rename = "progress")]
    Progress(ProgressLine),

    #[serde(rename = "summary")]
    Summary(SummaryLine),
}

#[tokio::test]
async fn e2e_counts_stay_consistent_and_match_the_server() -> anyhow::Result<()> {
    let server = TestServer::start_seeded(5).await.context("start test app")?;
    let base_url = server.base_url().to_string();

    let exe = env!("CARGO_BIN_EXE_loadmix");

    // Long enough for a couple of progress ticks (one per 10 requests) at
    // the default 100-500ms pacing.
    let duration = "8s";

    let start = Instant::now();
    let output = tokio::task::spawn_blocking(move || {
        Command::new(exe)
            .arg(duration)
            .arg(&base_url)
            .arg("--output")
            .arg("json")
            .arg("--seed")
            .arg("5")
            .output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run loadmix binary")?;
    let wall = start.elapsed();

    let server_seen = server.stats().requests_total();
    server.shutdown().await;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    anyhow::ensure!(
        output.status.success(),
        "loadmix exited with {}\nstdout:\n{}\nstderr:\n{}",
        output.status,
        stdout,
        stderr
    );

    // Duration bound: one in-flight request (2s worst case) plus one pause
    // on top of the configured 8s, with slack for process startup.
    anyhow::ensure!(
        wall < Duration::from_secs(14),
        "run overshot its duration bound: {wall:?}"
    );

    let mut last_progress: Option<ProgressLine> = None;
    let mut summary: Option<SummaryLine> = None;
    let mut progress_lines = 0u64;

    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let parsed: JsonLine = serde_json::from_str(line)
            .with_context(|| format!("failed to parse json line: {line}"))?;

        match parsed {
            JsonLine::Progress(p) => {
                anyhow::ensure!(
                    p.success_total + p.failed_total == p.requests_total,
                    "count mismatch in progress line: {line}"
                );

                if let Some(prev) = &last_progress {
                    anyhow::ensure!(
                        p.requests_total >= prev.requests_total,
                        "requests_total went backwards\nprev={prev:?}\nnext={p:?}"
                    );
                    anyhow::ensure!(
                        p.elapsed_secs >= prev.elapsed_secs,
                        "elapsed_secs went backwards\nprev={prev:?}\nnext={p:?}"
                    );
                }

                progress_lines += 1;
                last_progress = Some(p);
            }
            JsonLine::Summary(s) => {
                anyhow::ensure!(summary.is_none(), "expected a single summary line");
                summary = Some(s);
            }
        }
    }

    anyhow::ensure!(
        progress_lines > 0,
        "expected at least one progress json line\nstdout:\n{stdout}\nstderr:\n{stderr}"
    );

    let summary = summary.with_context(|| {
        format!("expected a final summary json line\nstdout:\n{stdout}\nstderr:\n{stderr}")
    })?;

    anyhow::ensure!(
        summary.totals.success_total + summary.totals.failed_total == summary.totals.requests_total,
        "count mismatch in summary totals: {:?}",
        summary.totals
    );
    anyhow::ensure!(summary.duration_secs >= 8, "summary under-reports duration");

    if let Some(p) = &last_progress {
        anyhow::ensure!(
            summary.totals.requests_total >= p.requests_total,
            "summary total below last progress total\nsummary={:?}\nprogress={p:?}",
            summary.totals
        );
    }

    // The generator waits for every response, so both sides should agree;
    // allow a tiny tolerance for transport-level flakes.
    let delta = server_seen.abs_diff(summary.totals.requests_total);
    anyhow::ensure!(
        delta <= 2,
        "request totals mismatch\nloadmix={}\nserver_seen={server_seen}\nstdout:\n{stdout}\nstderr:\n{stderr}",
        summary.totals.requests_total
    );

    Ok(())
}

#[tokio::test]
async fn invalid_input_exits_with_the_invalid_input_code() -> anyhow::Result<()> {
    let exe = env!("CARGO_BIN_EXE_loadmix");

    let output = tokio::task::spawn_blocking(move || Command::new(exe).arg("abc").output())
        .await
        .context("spawn_blocking join")?
        .context("run loadmix binary")?;
    anyhow::ensure!(
        output.status.code() == Some(30),
        "bad duration should exit 30, got {:?}",
        output.status.code()
    );

    let output = tokio::task::spawn_blocking(move || {
        Command::new(exe).arg("1s").arg("https://example.com").output()
    })
    .await
    .context("spawn_blocking join")?
    .context("run loadmix binary")?;
    anyhow::ensure!(
        output.status.code() == Some(30),
        "non-http base url should exit 30, got {:?}",
        output.status.code()
    );

    Ok(())
}
