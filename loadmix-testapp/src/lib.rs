//! Instrumented sample service.
//!
//! A small axum app whose handlers simulate variable-latency downstream
//! work (database lookups, external calls, batch processing) with
//! deliberate random failures plus deterministic error and latency
//! routes. It exists to produce traffic worth observing; run it under an
//! external instrumentation agent and point the load generator at it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::{Duration, sleep};

mod error;
mod jitter;
mod order;

pub use error::{AppError, ErrorBody, RejectBody};
pub use jitter::Jitter;

pub const PATH_STATUS: &str = "/";
pub const PATH_USER: &str = "/user/{id}";
pub const PATH_RESOURCE: &str = "/api/{resource}";
pub const PATH_PROCESS: &str = "/api/process";
pub const PATH_ORDER: &str = "/order";
pub const PATH_ERROR: &str = "/error";
pub const PATH_SLOW: &str = "/slow";

const USER_DELAY_MS: std::ops::Range<u64> = 0..100;
const SLOW_QUERY_PCT: u8 = 10;
const SLOW_QUERY_EXTRA_MS: u64 = 500;
const RESOURCE_DELAY_MS: std::ops::Range<u64> = 0..200;
const RESOURCE_FAILURE_PCT: u8 = 5;
const PROCESS_ITEM_WORK_MS: u64 = 50;
const SLOW_ROUTE_DELAY_MS: u64 = 2000;

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().min(u128::from(u64::MAX)) as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Default)]
pub struct AppStats {
    requests_total: Arc<AtomicU64>,
}

impl AppStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub(crate) stats: AppStats,
    pub(crate) jitter: Jitter,
}

impl AppState {
    pub fn seeded(seed: u64) -> Self {
        Self {
            stats: AppStats::default(),
            jitter: Jitter::with_seed(seed),
        }
    }

    pub fn stats(&self) -> &AppStats {
        &self.stats
    }
}

#[derive(Debug, Serialize)]
struct ServiceStatus {
    service: &'static str,
    status: &'static str,
    timestamp_ms: u64,
}

async fn handle_status(State(state): State<AppState>) -> Json<ServiceStatus> {
    state.stats.inc_requests_total();
    tracing::info!("status check");

    Json(ServiceStatus {
        service: "loadmix-testapp",
        status: "ok",
        timestamp_ms: unix_millis(),
    })
}

#[derive(Debug, Serialize)]
struct User {
    id: String,
    name: String,
    email: String,
    timestamp_ms: u64,
}

/// Simulated database lookup: a short uniform delay, occasionally
/// stretched by a slow-query path. Always succeeds; the `id` is echoed
/// back exactly as it appeared in the path.
async fn handle_user(State(state): State<AppState>, Path(id): Path<String>) -> Json<User> {
    state.stats.inc_requests_total();

    let delay = state.jitter.delay_ms(USER_DELAY_MS);
    let delay_ms = delay.as_millis() as u64;
    sleep(delay).await;

    let slow_query = state.jitter.chance(SLOW_QUERY_PCT);
    if slow_query {
        sleep(Duration::from_millis(SLOW_QUERY_EXTRA_MS)).await;
    }

    tracing::info!(user_id = %id, delay_ms, slow_query, "user lookup");

    Json(User {
        name: format!("user-{id}"),
        email: format!("user-{id}@example.test"),
        id,
        timestamp_ms: unix_millis(),
    })
}

#[derive(Debug, Serialize)]
struct ResourceData {
    resource: String,
    id: u64,
    name: String,
    timestamp_ms: u64,
}

/// Simulated external call: longer uniform delay and a small chance the
/// upstream is unavailable, surfaced as a 503.
async fn handle_resource(State(state): State<AppState>, Path(resource): Path<String>) -> Response {
    state.stats.inc_requests_total();

    let delay = state.jitter.delay_ms(RESOURCE_DELAY_MS);
    let delay_ms = delay.as_millis() as u64;
    sleep(delay).await;

    if state.jitter.chance(RESOURCE_FAILURE_PCT) {
        tracing::warn!(%resource, delay_ms, "upstream unavailable");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RejectBody {
                error: "upstream dependency unavailable",
            }),
        )
            .into_response();
    }

    let id = state.jitter.number(1..100_000);
    tracing::info!(%resource, id, delay_ms, "resource fetch");

    Json(ResourceData {
        name: format!("{resource}-{id}"),
        resource,
        id,
        timestamp_ms: unix_millis(),
    })
    .into_response()
}

#[derive(Debug, Deserialize)]
struct ProcessRequest {
    #[serde(default)]
    items: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct ProcessedItem {
    item: serde_json::Value,
    processed: bool,
}

#[derive(Debug, Serialize)]
struct ProcessResponse {
    count: usize,
    results: Vec<ProcessedItem>,
}

/// Batch processing: validates the `items` array, then does a fixed
/// amount of simulated work per item, sequentially.
async fn handle_process(State(state): State<AppState>, body: Bytes) -> Response {
    state.stats.inc_requests_total();

    let req: ProcessRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(RejectBody {
                    error: "invalid json body",
                }),
            )
                .into_response();
        }
    };

    let items = match req.items {
        Some(serde_json::Value::Array(items)) => items,
        _ => {
            tracing::warn!("process request without an items array");
            return (
                StatusCode::BAD_REQUEST,
                Json(RejectBody {
                    error: "items must be an array",
                }),
            )
                .into_response();
        }
    };

    let mut results = Vec::with_capacity(items.len());
    for item in items {
        sleep(Duration::from_millis(PROCESS_ITEM_WORK_MS)).await;
        results.push(ProcessedItem {
            item,
            processed: true,
        });
    }

    tracing::info!(count = results.len(), "batch processed");

    Json(ProcessResponse {
        count: results.len(),
        results,
    })
    .into_response()
}

/// Deterministic failure path: always bubbles an error into the 500
/// boundary so error tracking has something to chew on.
async fn handle_error(State(state): State<AppState>) -> Result<Json<ServiceStatus>, AppError> {
    state.stats.inc_requests_total();
    Err(AppError::internal("deliberate failure for testing"))
}

#[derive(Debug, Serialize)]
struct SlowResponse {
    status: &'static str,
    delayed_ms: u64,
}

/// Deterministic latency path: a fixed two-second stall, then a 200.
async fn handle_slow(State(state): State<AppState>) -> Json<SlowResponse> {
    state.stats.inc_requests_total();
    sleep(Duration::from_millis(SLOW_ROUTE_DELAY_MS)).await;
    tracing::info!(delayed_ms = SLOW_ROUTE_DELAY_MS, "slow response released");

    Json(SlowResponse {
        status: "ok",
        delayed_ms: SLOW_ROUTE_DELAY_MS,
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(PATH_STATUS, get(handle_status))
        .route(PATH_USER, get(handle_user))
        .route(PATH_PROCESS, post(handle_process))
        .route(PATH_RESOURCE, get(handle_resource))
        .route(PATH_ORDER, post(order::handle_order))
        .route(PATH_ERROR, get(handle_error))
        .route(PATH_SLOW, get(handle_slow))
        .with_state(state)
}

/// Embeddable server for tests: binds an ephemeral loopback port and
/// shuts down gracefully on request (or aborts when dropped).
pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: AppStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with_state(AppState::default()).await
    }

    pub async fn start_seeded(seed: u64) -> std::io::Result<Self> {
        Self::start_with_state(AppState::seeded(seed)).await
    }

    async fn start_with_state(state: AppState) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = state.stats.clone();
        let app = router(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &AppStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
