//! Per-dependency circuit breakers.
//!
//! Each protected upstream dependency gets its own three-state breaker
//! (closed / open / half-open), created lazily on first use and owned by a
//! process-wide registry. Tripping one breaker never affects calls against a
//! different dependency name.
//!
//! The breaker reasons about availability only: any `Err` from the wrapped
//! call is a failure, any `Ok` is a success, including application-level
//! empty results.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::error::{Result, ShieldError};
use crate::metrics;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Breaker state machine positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Trip threshold and recovery timing for one breaker.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures that trip the breaker open.
    pub failure_threshold: u32,
    /// How long an open breaker rejects calls before admitting a probe.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// Read-only view of a breaker, for the observability surface.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Seconds since the breaker last opened, when it is currently open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_for_secs: Option<u64>,
}

#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

/// One circuit breaker guarding a single named dependency.
///
/// The internal lock is held only for O(1) state transitions; the wrapped
/// call always executes outside it.
pub struct FaultBreaker {
    name: String,
    config: BreakerConfig,
    core: Mutex<BreakerCore>,
}

impl FaultBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            core: Mutex::new(BreakerCore {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            }),
        }
    }

    /// Run `f` under this breaker. An open breaker rejects the call with
    /// [`ShieldError::BreakerOpen`] without constructing the upstream future;
    /// otherwise the call outcome is recorded and returned unchanged.
    pub async fn call<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.admit()?;
        let result = f().await;
        self.record(result.is_ok());
        result
    }

    /// Decide whether a call may proceed, transitioning Open -> HalfOpen when
    /// the reset timeout has elapsed. While a half-open probe is in flight,
    /// every other call is rejected.
    fn admit(&self) -> Result<()> {
        let mut core = self.core.lock();
        match core.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let waited = core.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if waited >= self.config.reset_timeout {
                    core.state = CircuitState::HalfOpen;
                    debug!(breaker = %self.name, "reset timeout elapsed, admitting half-open probe");
                    metrics::set_breaker_state(&self.name, core.state);
                    Ok(())
                } else {
                    metrics::record_breaker_rejection(&self.name);
                    Err(ShieldError::BreakerOpen {
                        name: self.name.clone(),
                    })
                }
            }
            CircuitState::HalfOpen => {
                metrics::record_breaker_rejection(&self.name);
                Err(ShieldError::BreakerOpen {
                    name: self.name.clone(),
                })
            }
        }
    }

    fn record(&self, success: bool) {
        let mut core = self.core.lock();
        if success {
            core.success_count += 1;
            match core.state {
                CircuitState::HalfOpen => {
                    info!(breaker = %self.name, "probe succeeded, closing circuit");
                    core.state = CircuitState::Closed;
                    core.failure_count = 0;
                    core.success_count = 0;
                    core.opened_at = None;
                    metrics::record_breaker_transition(&self.name, "closed");
                }
                CircuitState::Closed => {
                    core.failure_count = 0;
                }
                // An outcome from a call admitted before the trip; the open
                // timer is authoritative.
                CircuitState::Open => {}
            }
        } else {
            core.failure_count += 1;
            match core.state {
                CircuitState::HalfOpen => {
                    warn!(breaker = %self.name, "probe failed, reopening circuit");
                    core.state = CircuitState::Open;
                    core.opened_at = Some(Instant::now());
                    metrics::record_breaker_transition(&self.name, "open");
                }
                CircuitState::Closed if core.failure_count >= self.config.failure_threshold => {
                    warn!(
                        breaker = %self.name,
                        failures = core.failure_count,
                        "failure threshold reached, opening circuit"
                    );
                    core.state = CircuitState::Open;
                    core.opened_at = Some(Instant::now());
                    metrics::record_breaker_transition(&self.name, "open");
                }
                _ => {}
            }
        }
        metrics::set_breaker_state(&self.name, core.state);
    }

    /// Force the breaker closed and zero both counters, regardless of the
    /// current state. Administrative override.
    pub fn reset(&self) {
        let mut core = self.core.lock();
        core.state = CircuitState::Closed;
        core.failure_count = 0;
        core.success_count = 0;
        core.opened_at = None;
        info!(breaker = %self.name, "breaker reset to closed");
        metrics::set_breaker_state(&self.name, core.state);
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let core = self.core.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: core.state,
            failure_count: core.failure_count,
            success_count: core.success_count,
            open_for_secs: match core.state {
                CircuitState::Open => core.opened_at.map(|t| t.elapsed().as_secs()),
                _ => None,
            },
        }
    }

    pub fn state(&self) -> CircuitState {
        self.core.lock().state
    }
}

/// Process-wide registry of breakers keyed by dependency name.
///
/// Breakers are created lazily with the registry default config unless a
/// specific config was registered for the name. The registry lock covers
/// only the map lookup, so concurrent callers against different dependency
/// names never contend on it across a call.
pub struct BreakerRegistry {
    default_config: BreakerConfig,
    breakers: RwLock<HashMap<String, Arc<FaultBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(default_config: BreakerConfig) -> Self {
        Self {
            default_config,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Pre-create the breaker for `name` with a specific config, replacing
    /// any existing breaker for that name.
    pub fn register(&self, name: &str, config: BreakerConfig) -> Arc<FaultBreaker> {
        let breaker = Arc::new(FaultBreaker::new(name, config));
        self.breakers
            .write()
            .insert(name.to_string(), breaker.clone());
        breaker
    }

    /// Look up or lazily create the breaker for `name`.
    pub fn breaker(&self, name: &str) -> Arc<FaultBreaker> {
        if let Some(breaker) = self.breakers.read().get(name) {
            return breaker.clone();
        }
        let mut breakers = self.breakers.write();
        breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(FaultBreaker::new(name, self.default_config.clone()))
            })
            .clone()
    }

    /// Run `f` under the breaker for `name`.
    pub async fn call<T, F, Fut>(&self, name: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let breaker = self.breaker(name);
        breaker.call(f).await
    }

    pub fn state(&self, name: &str) -> BreakerSnapshot {
        self.breaker(name).snapshot()
    }

    /// Snapshots of every breaker created so far.
    pub fn all_states(&self) -> Vec<BreakerSnapshot> {
        let mut states: Vec<BreakerSnapshot> = self
            .breakers
            .read()
            .values()
            .map(|b| b.snapshot())
            .collect();
        states.sort_by(|a, b| a.name.cmp(&b.name));
        states
    }

    /// Administratively reset the breaker for `name`. Returns false when no
    /// breaker with that name exists yet.
    pub fn reset(&self, name: &str) -> bool {
        match self.breakers.read().get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

static GLOBAL: Lazy<BreakerRegistry> = Lazy::new(BreakerRegistry::default);

/// Lazily-initialized process-default registry. Prefer constructing a
/// [`BreakerRegistry`] explicitly where wiring allows; this exists for
/// ergonomic top-level use.
pub fn global() -> &'static BreakerRegistry {
    &GLOBAL
}
