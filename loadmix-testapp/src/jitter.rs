use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Seedable randomness behind all simulated latency and failure injection.
///
/// Handlers share one generator through the app state so a single seed pins
/// every random decision the service makes during a test.
#[derive(Debug, Clone)]
pub struct Jitter {
    rng: Arc<Mutex<fastrand::Rng>>,
}

impl Default for Jitter {
    fn default() -> Self {
        Self::with_rng(fastrand::Rng::new())
    }
}

impl Jitter {
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(fastrand::Rng::with_seed(seed))
    }

    fn with_rng(rng: fastrand::Rng) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Uniform delay in `[range.start, range.end)` milliseconds.
    pub fn delay_ms(&self, range: Range<u64>) -> Duration {
        if range.end <= range.start {
            return Duration::from_millis(range.start);
        }
        Duration::from_millis(self.lock().u64(range))
    }

    /// True with the given probability, expressed as an integer percentage.
    pub fn chance(&self, percent: u8) -> bool {
        self.lock().u8(..100) < percent
    }

    pub fn number(&self, range: Range<u64>) -> u64 {
        if range.end <= range.start {
            return range.start;
        }
        self.lock().u64(range)
    }

    /// Pick one of a fixed set of options; empty slices yield "".
    pub fn pick(&self, options: &[&'static str]) -> &'static str {
        if options.is_empty() {
            return "";
        }
        options[self.lock().usize(..options.len())]
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, fastrand::Rng> {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
