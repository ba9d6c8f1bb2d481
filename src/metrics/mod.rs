// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics, BREAKER_REJECTIONS, BREAKER_STATE, BREAKER_TRANSITIONS, CACHE_ENTRIES,
    CACHE_OPERATIONS, RETRY_ATTEMPTS, UPSTREAM_CALLS, UPSTREAM_DURATION,
};

use crate::breaker::CircuitState;

/// Helper to record a cache operation (l1_hit, l2_hit, l3_fetch, miss, write)
pub fn record_cache_op(cache: &str, operation: &str) {
    CACHE_OPERATIONS.with_label_values(&[cache, operation]).inc();
}

pub fn update_cache_entries(cache: &str, count: usize) {
    CACHE_ENTRIES.with_label_values(&[cache]).set(count as f64);
}

/// Helper to export a breaker's current state as a gauge
pub fn set_breaker_state(name: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::Open => 1.0,
        CircuitState::HalfOpen => 2.0,
    };
    BREAKER_STATE.with_label_values(&[name]).set(value);
}

pub fn record_breaker_transition(name: &str, to: &str) {
    BREAKER_TRANSITIONS.with_label_values(&[name, to]).inc();
}

pub fn record_breaker_rejection(name: &str) {
    BREAKER_REJECTIONS.with_label_values(&[name]).inc();
}

/// Helper to record one retry of an upstream operation
pub fn record_retry(operation: &str) {
    RETRY_ATTEMPTS.with_label_values(&[operation]).inc();
}

/// Helper to record a protected upstream call and its duration
pub fn record_upstream_call(operation: &str, outcome: &str, duration_secs: f64) {
    UPSTREAM_CALLS
        .with_label_values(&[operation, outcome])
        .inc();
    UPSTREAM_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}
