use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::time::sleep;

use crate::http::{HttpClient, HttpRequest};
use crate::mix::{RequestKind, RequestMix};
use crate::stats::{RunStats, RunSummary};

/// Resource names the resource-fetch category samples from.
const SAMPLE_RESOURCES: [&str; 4] = ["orders", "products", "inventory", "customers"];

/// Fixed three-item batch submitted by the batch-submit category.
const BATCH_BODY: &[u8] = br#"{"items":["item-1","item-2","item-3"]}"#;

const USER_ID_MAX: u64 = 10_000;

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy)]
pub struct ProgressUpdate {
    pub requests_total: u64,
    pub success_total: u64,
    pub failed_total: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub duration: Duration,
    pub mix: RequestMix,
    /// Pause drawn uniformly from `[pause_min, pause_max)` after each request.
    pub pause_min: Duration,
    pub pause_max: Duration,
    /// Emit a progress update every this many requests (0 disables).
    pub progress_every: u64,
    /// Optional caller-side request timeout. Unset by default; a timed-out
    /// request counts as a failure like any other transport error.
    pub request_timeout: Option<Duration>,
}

impl GeneratorConfig {
    pub fn new(base_url: impl Into<String>, duration: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            duration,
            mix: RequestMix::default_mix(),
            pause_min: Duration::from_millis(100),
            pause_max: Duration::from_millis(500),
            progress_every: 10,
            request_timeout: None,
        }
    }
}

/// Wall-clock run gate: allows iterations until the deadline passes.
#[derive(Debug)]
struct DeadlineGate {
    deadline: Instant,
}

impl DeadlineGate {
    fn start(duration: Duration) -> Self {
        Self {
            deadline: Instant::now() + duration,
        }
    }

    fn next(&self) -> bool {
        Instant::now() < self.deadline
    }
}

/// Single-loop traffic generator.
///
/// Issues one request at a time against the configured base URL for the
/// configured duration: draw a category from the mix, send the request,
/// tally the outcome, pause, repeat. Individual request failures are
/// counted and never abort the run.
pub struct Generator {
    cfg: GeneratorConfig,
    client: HttpClient,
    rng: fastrand::Rng,
    stats: RunStats,
}

impl Generator {
    pub fn new(cfg: GeneratorConfig) -> Self {
        Self::with_rng(cfg, fastrand::Rng::new())
    }

    /// A seeded generator replays the same category/pause sequence,
    /// which keeps runs reproducible in tests.
    pub fn with_seed(cfg: GeneratorConfig, seed: u64) -> Self {
        Self::with_rng(cfg, fastrand::Rng::with_seed(seed))
    }

    fn with_rng(cfg: GeneratorConfig, rng: fastrand::Rng) -> Self {
        Self {
            cfg,
            client: HttpClient::default(),
            rng,
            stats: RunStats::default(),
        }
    }

    pub async fn run(mut self, progress: Option<ProgressFn>) -> RunSummary {
        let started = Instant::now();
        let gate = DeadlineGate::start(self.cfg.duration);

        while gate.next() {
            let roll = self.rng.u8(..100);
            let kind = self.cfg.mix.pick(roll);
            let req = self.next_request(kind);

            let req_started = Instant::now();
            match self.client.request(req).await {
                Ok(res) => {
                    self.stats
                        .record_response(kind, res.status, req_started.elapsed());
                }
                Err(err) => {
                    self.stats.record_transport_error(
                        kind,
                        err.transport_error_kind(),
                        req_started.elapsed(),
                    );
                }
            }

            if let Some(progress) = &progress
                && self.cfg.progress_every > 0
                && self.stats.requests_total() % self.cfg.progress_every == 0
            {
                (progress)(ProgressUpdate {
                    requests_total: self.stats.requests_total(),
                    success_total: self.stats.success_total(),
                    failed_total: self.stats.failed_total(),
                    elapsed: started.elapsed(),
                });
            }

            sleep(self.next_pause()).await;
        }

        self.stats.summarize(started.elapsed())
    }

    fn next_request(&mut self, kind: RequestKind) -> HttpRequest {
        let base = self.cfg.base_url.trim_end_matches('/');

        let mut req = match kind {
            RequestKind::UserLookup => {
                let id = self.rng.u64(1..=USER_ID_MAX);
                HttpRequest::get(format!("{base}/user/{id}"))
            }
            RequestKind::ResourceFetch => {
                let resource = SAMPLE_RESOURCES[self.rng.usize(..SAMPLE_RESOURCES.len())];
                HttpRequest::get(format!("{base}/api/{resource}"))
            }
            RequestKind::BatchSubmit => HttpRequest::post_json(
                format!("{base}/api/process"),
                Bytes::from_static(BATCH_BODY),
            ),
            RequestKind::HealthCheck => HttpRequest::get(format!("{base}/")),
            RequestKind::Slow => HttpRequest::get(format!("{base}/slow")),
            RequestKind::Error => HttpRequest::get(format!("{base}/error")),
        };

        req.timeout = self.cfg.request_timeout;
        req
    }

    fn next_pause(&mut self) -> Duration {
        let min_ms = self.cfg.pause_min.as_millis().min(u128::from(u64::MAX)) as u64;
        let max_ms = self.cfg.pause_max.as_millis().min(u128::from(u64::MAX)) as u64;
        if max_ms <= min_ms {
            return self.cfg.pause_min;
        }
        Duration::from_millis(self.rng.u64(min_ms..max_ms))
    }
}
