//! Composed upstream protection: circuit breaker around bounded retry.
//!
//! The nesting order is fixed and externally visible: the breaker is the
//! outer layer, so an open circuit rejects a call before any retry runs, and
//! one fully exhausted retry loop records exactly one failure against the
//! breaker. Wrapping retry around the breaker instead would count every
//! attempt and trip far sooner.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::breaker::BreakerRegistry;
use crate::error::Result;
use crate::metrics;
use crate::retry::{self, RetryPolicy};
use std::future::Future;
use std::time::Instant;

/// Run an upstream call under the breaker registered for `name`, retrying
/// failures inside the breaker according to `policy`.
///
/// `f` is invoked once per attempt and must produce a fresh future each
/// time. The caller gets the upstream value, a typed breaker rejection, or
/// the final upstream failure - nothing else.
pub async fn call<T, F, Fut>(
    registry: &BreakerRegistry,
    name: &str,
    policy: &RetryPolicy,
    f: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let started = Instant::now();
    let result = registry
        .call(name, || retry::execute(name, policy, f))
        .await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(err) if err.is_breaker_open() => "rejected",
        Err(_) => "failure",
    };
    metrics::record_upstream_call(name, outcome, started.elapsed().as_secs_f64());
    result
}

/// [`call`] against the process-default breaker registry.
pub async fn call_default<T, F, Fut>(name: &str, policy: &RetryPolicy, f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    call(crate::breaker::global(), name, policy, f).await
}
