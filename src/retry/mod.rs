// Bounded retry with exponential backoff for upstream calls
// Author: kelexine (https://github.com/kelexine)

use crate::error::{Result, ShieldError};
use crate::metrics;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt bound and delay curve for one call site. Immutable; build one per
/// upstream and reuse it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. A value of 0 is treated as 1.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Realize the policy as an exponential backoff source. Jitter is
    /// disabled so the delay for attempt `n` is exactly
    /// `min(base_delay * multiplier^(n-1), max_delay)`.
    pub fn to_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            randomization_factor: 0.0,
            multiplier: self.multiplier,
            max_interval: self.max_delay,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Run `f` until it succeeds or the attempt budget is spent.
///
/// The first success returns immediately. After `max_attempts` failures the
/// last failure is surfaced as [`ShieldError::Upstream`], never swallowed.
/// Each retry emits a log event and a metrics increment carrying the attempt
/// number, the chosen delay and the failure cause; neither can fail the loop.
/// The sleeps are plain `tokio::time::sleep`s, so dropping the returned
/// future cancels the loop at the next suspension point.
pub async fn execute<T, F, Fut>(operation: &str, policy: &RetryPolicy, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut backoff = policy.to_backoff();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "upstream call succeeded after retry");
                }
                return Ok(value);
            }
            Err(cause) => {
                if attempt >= policy.max_attempts {
                    return Err(ShieldError::Upstream {
                        operation: operation.to_string(),
                        attempts: attempt,
                        source: cause,
                    });
                }
                let delay = backoff.next_backoff().unwrap_or(policy.max_delay);
                warn!(
                    operation,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    cause = %cause,
                    "upstream call failed, retrying"
                );
                metrics::record_retry(operation);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
