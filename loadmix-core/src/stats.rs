use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use hdrhistogram::Histogram;

use crate::http::HttpTransportErrorKind;
use crate::mix::RequestKind;

#[derive(Debug, Default, Clone, Copy)]
struct KindCounters {
    requests_total: u64,
    failed_total: u64,
}

#[derive(Debug, Clone)]
pub struct KindSummary {
    pub kind: RequestKind,
    pub requests_total: u64,
    pub failed_total: u64,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub requests_total: u64,
    pub success_total: u64,
    pub failed_total: u64,
    pub run_duration: Duration,
    /// Average requests/sec over the whole run.
    pub rps: f64,
    /// Per-category breakdown, in category declaration order.
    pub by_kind: Vec<KindSummary>,
    /// Failure breakdown keyed by `http_status:<code>` / `http_error:<kind>`.
    pub errors: BTreeMap<String, u64>,
    pub latency_p50_ms: Option<f64>,
    pub latency_p90_ms: Option<f64>,
    pub latency_p99_ms: Option<f64>,
    pub latency_mean_ms: Option<f64>,
    pub latency_max_ms: Option<f64>,
    pub latency_count: u64,
}

/// Mutable run accounting.
///
/// The generator issues one request at a time, so a single loop owns this
/// exclusively and plain counters suffice. Every record call bumps the
/// total and exactly one of success/failed, which keeps
/// `success_total + failed_total == requests_total` true at every
/// observation point.
#[derive(Debug)]
pub struct RunStats {
    requests_total: u64,
    success_total: u64,
    failed_total: u64,
    by_kind: HashMap<RequestKind, KindCounters>,
    errors: BTreeMap<String, u64>,
    latency_us: Histogram<u64>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self {
            requests_total: 0,
            success_total: 0,
            failed_total: 0,
            by_kind: HashMap::new(),
            errors: BTreeMap::new(),
            // Track up to 60s in microseconds (with 3 sigfigs).
            latency_us: Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
                .unwrap_or_else(|err| panic!("failed to init histogram: {err}")),
        }
    }
}

impl RunStats {
    /// Record a request that produced an HTTP response.
    pub fn record_response(&mut self, kind: RequestKind, status: u16, elapsed: Duration) {
        let failed = status != 200;
        if failed {
            *self
                .errors
                .entry(format!("http_status:{status}"))
                .or_insert(0) += 1;
        }
        self.record(kind, failed, elapsed);
    }

    /// Record a request that failed before producing a response.
    pub fn record_transport_error(
        &mut self,
        kind: RequestKind,
        error: HttpTransportErrorKind,
        elapsed: Duration,
    ) {
        *self
            .errors
            .entry(format!("http_error:{error}"))
            .or_insert(0) += 1;
        self.record(kind, true, elapsed);
    }

    fn record(&mut self, kind: RequestKind, failed: bool, elapsed: Duration) {
        self.requests_total += 1;
        if failed {
            self.failed_total += 1;
        } else {
            self.success_total += 1;
        }

        let counters = self.by_kind.entry(kind).or_default();
        counters.requests_total += 1;
        if failed {
            counters.failed_total += 1;
        }

        let us = (elapsed.as_micros().min(u128::from(u64::MAX))) as u64;
        self.latency_us.saturating_record(us.max(1));
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total
    }

    pub fn success_total(&self) -> u64 {
        self.success_total
    }

    pub fn failed_total(&self) -> u64 {
        self.failed_total
    }

    pub fn summarize(&self, run_duration: Duration) -> RunSummary {
        let by_kind = RequestKind::ALL
            .iter()
            .filter_map(|kind| {
                self.by_kind.get(kind).map(|c| KindSummary {
                    kind: *kind,
                    requests_total: c.requests_total,
                    failed_total: c.failed_total,
                })
            })
            .collect();

        let latency_count = self.latency_us.len();
        let pct = |q: f64| -> Option<f64> {
            (latency_count > 0).then(|| (self.latency_us.value_at_quantile(q) as f64) / 1000.0)
        };

        RunSummary {
            requests_total: self.requests_total,
            success_total: self.success_total,
            failed_total: self.failed_total,
            run_duration,
            rps: (self.requests_total as f64) / run_duration.as_secs_f64().max(1e-9),
            by_kind,
            errors: self.errors.clone(),
            latency_p50_ms: pct(0.50),
            latency_p90_ms: pct(0.90),
            latency_p99_ms: pct(0.99),
            latency_mean_ms: (latency_count > 0).then(|| self.latency_us.mean() / 1000.0),
            latency_max_ms: (latency_count > 0).then(|| (self.latency_us.max() as f64) / 1000.0),
            latency_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_plus_failed_equals_total_at_every_point() {
        let mut stats = RunStats::default();

        stats.record_response(RequestKind::UserLookup, 200, Duration::from_millis(12));
        assert_eq!(stats.success_total() + stats.failed_total(), stats.requests_total());

        stats.record_response(RequestKind::Error, 500, Duration::from_millis(3));
        assert_eq!(stats.success_total() + stats.failed_total(), stats.requests_total());

        stats.record_transport_error(
            RequestKind::HealthCheck,
            HttpTransportErrorKind::Request,
            Duration::from_millis(1),
        );
        assert_eq!(stats.success_total() + stats.failed_total(), stats.requests_total());
        assert_eq!(stats.requests_total(), 3);
        assert_eq!(stats.failed_total(), 2);
    }

    #[test]
    fn errors_are_broken_down_by_status_and_kind() {
        let mut stats = RunStats::default();
        stats.record_response(RequestKind::ResourceFetch, 503, Duration::from_millis(5));
        stats.record_response(RequestKind::ResourceFetch, 503, Duration::from_millis(7));
        stats.record_transport_error(
            RequestKind::Slow,
            HttpTransportErrorKind::Timeout,
            Duration::from_secs(1),
        );

        let summary = stats.summarize(Duration::from_secs(1));
        assert_eq!(summary.errors.get("http_status:503"), Some(&2));
        assert_eq!(summary.errors.get("http_error:timeout"), Some(&1));
    }

    #[test]
    fn summary_orders_kinds_and_computes_rps() {
        let mut stats = RunStats::default();
        stats.record_response(RequestKind::Slow, 200, Duration::from_millis(2000));
        stats.record_response(RequestKind::UserLookup, 200, Duration::from_millis(30));
        stats.record_response(RequestKind::UserLookup, 200, Duration::from_millis(50));

        let summary = stats.summarize(Duration::from_secs(3));
        assert_eq!(summary.requests_total, 3);
        assert!((summary.rps - 1.0).abs() < 1e-9);

        let kinds: Vec<RequestKind> = summary.by_kind.iter().map(|k| k.kind).collect();
        assert_eq!(kinds, vec![RequestKind::UserLookup, RequestKind::Slow]);
        assert_eq!(summary.by_kind[0].requests_total, 2);
        assert_eq!(summary.latency_count, 3);
        assert!(summary.latency_max_ms.is_some_and(|v| v >= 1900.0));
    }

    #[test]
    fn empty_run_has_no_latency_numbers() {
        let stats = RunStats::default();
        let summary = stats.summarize(Duration::from_secs(1));
        assert_eq!(summary.requests_total, 0);
        assert_eq!(summary.latency_p50_ms, None);
        assert_eq!(summary.latency_mean_ms, None);
        assert_eq!(summary.latency_count, 0);
    }
}
