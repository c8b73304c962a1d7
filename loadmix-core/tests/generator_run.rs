use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use loadmix_core::{Generator, GeneratorConfig, ProgressFn, ProgressUpdate};
use loadmix_testapp::TestServer;

#[tokio::test]
async fn bounded_run_keeps_counts_consistent() -> anyhow::Result<()> {
    let server = TestServer::start_seeded(7).await.context("start test app")?;

    let mut cfg = GeneratorConfig::new(server.base_url(), Duration::from_secs(2));
    cfg.pause_min = Duration::from_millis(10);
    cfg.pause_max = Duration::from_millis(30);
    cfg.progress_every = 5;

    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::default();
    let sink = updates.clone();
    let progress: ProgressFn = Arc::new(move |u| {
        sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(u);
    });

    let started = Instant::now();
    let summary = Generator::with_seed(cfg, 7).run(Some(progress)).await;
    let wall = started.elapsed();

    // Worst-case overshoot is one in-flight request (the 2s latency route)
    // plus one pause; allow a little scheduler slack on top.
    anyhow::ensure!(
        wall < Duration::from_secs(5),
        "run overshot its duration bound: {wall:?}"
    );

    anyhow::ensure!(summary.requests_total > 0, "expected at least one request");
    anyhow::ensure!(
        summary.success_total + summary.failed_total == summary.requests_total,
        "count mismatch in summary: {} + {} != {}",
        summary.success_total,
        summary.failed_total,
        summary.requests_total
    );

    let updates = updates
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    anyhow::ensure!(!updates.is_empty(), "expected progress updates");

    let mut prev_total = 0;
    for u in &updates {
        anyhow::ensure!(
            u.success_total + u.failed_total == u.requests_total,
            "count mismatch in progress update: {u:?}"
        );
        anyhow::ensure!(
            u.requests_total % 5 == 0,
            "progress should fire on the configured cadence, got {}",
            u.requests_total
        );
        anyhow::ensure!(u.requests_total > prev_total, "progress went backwards");
        prev_total = u.requests_total;
    }

    let server_seen = server.stats().requests_total();
    server.shutdown().await;

    anyhow::ensure!(
        server_seen == summary.requests_total,
        "server saw {server_seen} requests, generator counted {}",
        summary.requests_total
    );

    Ok(())
}

#[tokio::test]
async fn unreachable_target_counts_errors_without_aborting() -> anyhow::Result<()> {
    // Nothing listens on port 1; every request fails at the transport layer.
    let cfg = {
        let mut cfg = GeneratorConfig::new("http://127.0.0.1:1", Duration::from_millis(400));
        cfg.pause_min = Duration::from_millis(10);
        cfg.pause_max = Duration::from_millis(20);
        cfg
    };

    let summary = Generator::with_seed(cfg, 11).run(None).await;

    anyhow::ensure!(summary.requests_total > 0, "expected attempts");
    anyhow::ensure!(
        summary.failed_total == summary.requests_total,
        "all requests should have failed: {summary:?}"
    );
    anyhow::ensure!(summary.success_total == 0);
    anyhow::ensure!(
        summary.errors.keys().any(|k| k.starts_with("http_error:")),
        "expected a transport error breakdown, got {:?}",
        summary.errors
    );

    Ok(())
}
