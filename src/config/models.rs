//! Configuration data structures for the upshield resilience layer.
//!
//! This module defines the schema for the application settings: cache
//! capacities and TTLs, circuit breaker thresholds, retry pacing, and
//! logging output.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The root configuration object for the library.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Cache sizing and per-domain TTLs.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Default circuit breaker thresholds.
    #[serde(default)]
    pub breaker: BreakerConfig,

    /// Default retry pacing for upstream calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cache sizing and expiry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries held by each in-process L1 cache.
    /// Default: `1000`
    #[serde(default = "default_l1_capacity")]
    pub l1_capacity: usize,

    /// TTL for cached completion responses, in seconds.
    /// Default: `7200` (2 hours)
    #[serde(default = "default_llm_ttl")]
    pub llm_ttl_secs: u64,

    /// TTL for cached place-search results, in seconds.
    /// Default: `3600` (1 hour)
    #[serde(default = "default_poi_ttl")]
    pub poi_ttl_secs: u64,

    /// TTL for cached weather lookups, in seconds.
    /// Default: `1800` (30 minutes)
    #[serde(default = "default_weather_ttl")]
    pub weather_ttl_secs: u64,
}

impl CacheConfig {
    pub fn llm_ttl(&self) -> Duration {
        Duration::from_secs(self.llm_ttl_secs)
    }

    pub fn poi_ttl(&self) -> Duration {
        Duration::from_secs(self.poi_ttl_secs)
    }

    pub fn weather_ttl(&self) -> Duration {
        Duration::from_secs(self.weather_ttl_secs)
    }
}

/// Default thresholds for lazily-created circuit breakers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before a breaker trips open.
    /// Default: `5`
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds an open breaker rejects calls before admitting a probe.
    /// Default: `60`
    #[serde(default = "default_reset_timeout")]
    pub reset_timeout_secs: u64,
}

impl BreakerConfig {
    /// Convert into the breaker module's runtime config.
    pub fn settings(&self) -> crate::breaker::BreakerConfig {
        crate::breaker::BreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: Duration::from_secs(self.reset_timeout_secs),
        }
    }
}

/// Retry pacing for upstream calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    /// Default: `3`
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    /// Default: `1000`
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound on any single retry delay, in milliseconds.
    /// Default: `10000`
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Backoff multiplier applied after each failed attempt.
    /// Default: `2.0`
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl RetryConfig {
    /// Convert into the retry module's runtime policy.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
        }
    }
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default trait implementations linking to custom logic

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_capacity: default_l1_capacity(),
            llm_ttl_secs: default_llm_ttl(),
            poi_ttl_secs: default_poi_ttl(),
            weather_ttl_secs: default_weather_ttl(),
        }
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_secs: default_reset_timeout(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Helper functions for serde defaults and shared constants

fn default_l1_capacity() -> usize {
    1000
}

fn default_llm_ttl() -> u64 {
    7200
}

fn default_poi_ttl() -> u64 {
    3600
}

fn default_weather_ttl() -> u64 {
    1800
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_reset_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    10_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}
