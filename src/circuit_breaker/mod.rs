// Circuit Breaker - Project Vigil
// "A gate that will not close is worse than no gate at all"


use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::VigilError;

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial call is allowed
    pub recovery_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
        }
    }
}

/// Breaker FSM state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::Open => f.write_str("open"),
            Self::HalfOpen => f.write_str("half_open"),
        }
    }
}

/// Error returned by a guarded call
#[derive(Error, Debug)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E: fmt::Display> From<CircuitBreakerError<E>> for VigilError {
    fn from(error: CircuitBreakerError<E>) -> Self {
        match error {
            CircuitBreakerError::CircuitOpen { name } => {
                VigilError::circuit_breaker_open(format!("'{name}' rejected the call"))
            }
            CircuitBreakerError::OperationFailed(inner) => {
                VigilError::internal(inner.to_string())
            }
        }
    }
}

/// Point-in-time breaker statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerStats {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub total_successes: u64,
    pub total_failures: u64,
    pub rejected_calls: u64,
    pub state_changes: u64,
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    /// When the circuit last opened; drives the lazy recovery transition
    opened_at: Option<Instant>,
    /// Whether the single half-open trial call is in flight
    probe_in_flight: bool,
}

/// Fail-fast guard around an unreliable dependency.
///
/// Consecutive failures open the circuit; while open, calls are rejected
/// without running. After the recovery timeout the next call transitions
/// the breaker to half-open and runs as a single trial: success closes
/// the circuit, failure re-opens it. Transitions serialize under the state
/// lock, which is never held across the guarded operation itself.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    total_calls: AtomicU64,
    total_successes: AtomicU64,
    total_failures: AtomicU64,
    rejected_calls: AtomicU64,
    state_changes: AtomicU64,
}

impl CircuitBreaker {
    pub fn new<N: Into<String>>(name: N, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
            total_calls: AtomicU64::new(0),
            total_successes: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            rejected_calls: AtomicU64::new(0),
            state_changes: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run an operation through the breaker
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        if !self.try_acquire() {
            self.rejected_calls.fetch_add(1, Ordering::Relaxed);
            debug!(breaker = %self.name, "Call rejected, circuit open");
            return Err(CircuitBreakerError::CircuitOpen {
                name: self.name.clone(),
            });
        }

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(error) => {
                self.record_failure();
                Err(CircuitBreakerError::OperationFailed(error))
            }
        }
    }

    /// Decide whether a call may proceed, applying the lazy open→half-open
    /// transition.
    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let recovered = state
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.recovery_timeout);
                if recovered {
                    state.state = CircuitState::HalfOpen;
                    state.probe_in_flight = true;
                    self.state_changes.fetch_add(1, Ordering::Relaxed);
                    info!(breaker = %self.name, "🔧 Circuit half-open, trial call allowed");
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if state.probe_in_flight {
                    false
                } else {
                    state.probe_in_flight = true;
                    true
                }
            }
        }
    }

    fn record_success(&self) {
        self.total_successes.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.state != CircuitState::Closed {
            self.state_changes.fetch_add(1, Ordering::Relaxed);
            info!(breaker = %self.name, "✅ Circuit closed");
        }
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.opened_at = None;
        state.probe_in_flight = false;
    }

    fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.consecutive_failures += 1;

        let should_open = state.state == CircuitState::HalfOpen
            || state.consecutive_failures >= self.config.failure_threshold;
        if should_open && state.state != CircuitState::Open {
            state.state = CircuitState::Open;
            self.state_changes.fetch_add(1, Ordering::Relaxed);
            warn!(
                breaker = %self.name,
                failures = state.consecutive_failures,
                "⚡ Circuit opened"
            );
        }
        if state.state == CircuitState::Open {
            state.opened_at = Some(Instant::now());
        }
        state.probe_in_flight = false;
    }

    /// Current FSM state
    pub fn state(&self) -> CircuitState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).state
    }

    /// Force the circuit closed and clear the failure counter
    pub fn reset(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.state != CircuitState::Closed {
            self.state_changes.fetch_add(1, Ordering::Relaxed);
        }
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.opened_at = None;
        state.probe_in_flight = false;
        info!(breaker = %self.name, "Circuit manually reset");
    }

    /// Force the circuit open, rejecting calls until the recovery timeout
    pub fn force_open(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.state != CircuitState::Open {
            self.state_changes.fetch_add(1, Ordering::Relaxed);
        }
        state.state = CircuitState::Open;
        state.opened_at = Some(Instant::now());
        state.probe_in_flight = false;
        warn!(breaker = %self.name, "Circuit manually opened");
    }

    /// Statistics snapshot
    pub fn stats(&self) -> CircuitBreakerStats {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        CircuitBreakerStats {
            name: self.name.clone(),
            state: state.state,
            consecutive_failures: state.consecutive_failures,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_successes: self.total_successes.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            rejected_calls: self.rejected_calls.load(Ordering::Relaxed),
            state_changes: self.state_changes.load(Ordering::Relaxed),
        }
    }
}

/// Named circuit breaker instances shared across the process
#[derive(Default)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the breaker with this name, creating it with `config` on first use
    pub fn get_or_create(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, config)))
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|b| Arc::clone(&b))
    }

    /// Statistics for every registered breaker
    pub fn all_stats(&self) -> Vec<CircuitBreakerStats> {
        let mut stats: Vec<CircuitBreakerStats> =
            self.breakers.iter().map(|b| b.stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }
}
