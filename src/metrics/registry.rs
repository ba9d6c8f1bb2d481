// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_gauge_vec_with_registry,
    register_histogram_vec_with_registry, CounterVec, Encoder, GaugeVec, HistogramVec, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations per tiered cache
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["cache", "operation"], // operation: l1_hit, l2_hit, l3_fetch, miss, write
        REGISTRY
    ).unwrap();

    /// Current L1 cache entries per tiered cache
    pub static ref CACHE_ENTRIES: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("cache_entries_current", "Current number of L1 cache entries"),
        &["cache"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CIRCUIT BREAKER METRICS
    // ============================================================================

    /// Breaker state per dependency (0 = closed, 1 = open, 2 = half-open)
    pub static ref BREAKER_STATE: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("breaker_state", "Circuit breaker state (0=closed, 1=open, 2=half_open)"),
        &["name"],
        REGISTRY
    ).unwrap();

    /// Breaker state transitions
    pub static ref BREAKER_TRANSITIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("breaker_transitions_total", "Total circuit breaker state transitions"),
        &["name", "to"], // to: open, closed
        REGISTRY
    ).unwrap();

    /// Calls rejected by an open breaker
    pub static ref BREAKER_REJECTIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("breaker_rejections_total", "Calls rejected without reaching the upstream"),
        &["name"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // RETRY / UPSTREAM METRICS
    // ============================================================================

    /// Retries performed per operation
    pub static ref RETRY_ATTEMPTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("retry_attempts_total", "Total retries performed"),
        &["operation"],
        REGISTRY
    ).unwrap();

    /// Protected upstream calls by outcome
    pub static ref UPSTREAM_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("upstream_calls_total", "Total protected upstream calls"),
        &["operation", "outcome"], // outcome: success, failure, rejected
        REGISTRY
    ).unwrap();

    /// Protected upstream call duration
    pub static ref UPSTREAM_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("upstream_call_duration_seconds", "Protected upstream call duration")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["operation"],
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Just verify metrics are registered without panicking
        let metrics = gather_metrics();
        assert!(metrics.contains("cache_operations_total"));
        assert!(metrics.contains("breaker_state"));
        assert!(metrics.contains("retry_attempts_total"));
        assert!(metrics.contains("upstream_calls_total"));
    }
}
