//! Weighted request mix.
//!
//! A [`RequestMix`] maps a uniform roll in `[0, 100)` onto a request
//! category by walking cumulative thresholds. The default weights are
//! example-traffic proportions carried over from the system this load
//! shape models; they have no deeper rationale and are kept as named
//! constants rather than magic numbers.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MixError {
    #[error("mix weights must sum to 100, got {0}")]
    BadWeightSum(u32),

    #[error("mix must not contain duplicate kinds")]
    DuplicateKind,

    #[error("mix must not be empty")]
    Empty,
}

/// One request category the generator can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum RequestKind {
    /// GET /user/{id} with a random id.
    UserLookup,
    /// GET /api/{resource} with a sample resource name.
    ResourceFetch,
    /// POST /api/process with a fixed three-item batch.
    BatchSubmit,
    /// GET / (service status).
    HealthCheck,
    /// GET /slow (deterministic latency path).
    Slow,
    /// GET /error (deterministic failure path).
    Error,
}

impl RequestKind {
    pub const ALL: [RequestKind; 6] = [
        RequestKind::UserLookup,
        RequestKind::ResourceFetch,
        RequestKind::BatchSubmit,
        RequestKind::HealthCheck,
        RequestKind::Slow,
        RequestKind::Error,
    ];
}

pub const DEFAULT_WEIGHT_USER_LOOKUP: u8 = 40;
pub const DEFAULT_WEIGHT_RESOURCE_FETCH: u8 = 30;
pub const DEFAULT_WEIGHT_BATCH_SUBMIT: u8 = 15;
pub const DEFAULT_WEIGHT_HEALTH_CHECK: u8 = 10;
pub const DEFAULT_WEIGHT_SLOW: u8 = 3;
pub const DEFAULT_WEIGHT_ERROR: u8 = 2;

/// A categorical request distribution over [`RequestKind`]s.
///
/// Weights are integer percentages and must sum to exactly 100 so a
/// uniform roll in `[0, 100)` always lands in some bucket.
#[derive(Debug, Clone)]
pub struct RequestMix {
    entries: Vec<(RequestKind, u8)>,
}

impl RequestMix {
    pub fn new(entries: Vec<(RequestKind, u8)>) -> Result<Self, MixError> {
        if entries.is_empty() {
            return Err(MixError::Empty);
        }

        for (idx, (kind, _)) in entries.iter().enumerate() {
            if entries[..idx].iter().any(|(k, _)| k == kind) {
                return Err(MixError::DuplicateKind);
            }
        }

        let sum: u32 = entries.iter().map(|(_, w)| u32::from(*w)).sum();
        if sum != 100 {
            return Err(MixError::BadWeightSum(sum));
        }

        Ok(Self { entries })
    }

    /// The 40/30/15/10/3/2 example-traffic split.
    pub fn default_mix() -> Self {
        Self {
            entries: vec![
                (RequestKind::UserLookup, DEFAULT_WEIGHT_USER_LOOKUP),
                (RequestKind::ResourceFetch, DEFAULT_WEIGHT_RESOURCE_FETCH),
                (RequestKind::BatchSubmit, DEFAULT_WEIGHT_BATCH_SUBMIT),
                (RequestKind::HealthCheck, DEFAULT_WEIGHT_HEALTH_CHECK),
                (RequestKind::Slow, DEFAULT_WEIGHT_SLOW),
                (RequestKind::Error, DEFAULT_WEIGHT_ERROR),
            ],
        }
    }

    /// Map a uniform roll in `[0, 100)` onto a kind via cumulative thresholds.
    ///
    /// Rolls at or above the weight sum (possible only through misuse) land in
    /// the last bucket rather than panicking.
    pub fn pick(&self, roll: u8) -> RequestKind {
        let mut threshold = 0u32;
        for (kind, weight) in &self.entries {
            threshold += u32::from(*weight);
            if u32::from(roll) < threshold {
                return *kind;
            }
        }

        // entries is non-empty by construction
        self.entries[self.entries.len() - 1].0
    }

    pub fn entries(&self) -> &[(RequestKind, u8)] {
        &self.entries
    }
}
