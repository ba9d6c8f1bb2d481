// Error types for the upshield resilience layer
// Author: kelexine (https://github.com/kelexine)

use thiserror::Error;

/// Failure taxonomy for the cache and fault-isolation layer.
///
/// A cache miss is not an error; lookups report it as `None`. Everything a
/// caller can observe from this crate is either a value or one of the typed
/// variants below - raw backing-store errors never escape.
#[derive(Error, Debug)]
pub enum ShieldError {
    /// The shared L2 store could not be reached or rejected the operation.
    /// Reads absorb this and degrade to the remaining levels; writes and
    /// administrative operations surface it.
    #[error("backing store unavailable: {0}")]
    BackingStore(String),

    /// A value could not be encoded or decoded for a backing store. Local to
    /// that store; other cache levels are unaffected.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The named circuit breaker is open and the call was rejected without
    /// touching the upstream. Distinct from an upstream failure so callers
    /// can answer "temporarily unavailable, retry later".
    #[error("circuit breaker '{name}' is open, upstream call rejected")]
    BreakerOpen { name: String },

    /// The upstream call failed and the retry budget is exhausted. Carries
    /// the last failure unchanged.
    #[error("upstream operation '{operation}' failed after {attempts} attempt(s): {source}")]
    Upstream {
        operation: String,
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),
}

impl ShieldError {
    /// True when the error is a breaker rejection rather than a real
    /// upstream failure.
    pub fn is_breaker_open(&self) -> bool {
        matches!(self, ShieldError::BreakerOpen { .. })
    }
}

pub type Result<T> = std::result::Result<T, ShieldError>;
