//! Two-state circuit breaker: Closed → Open → Closed.
//!
//! State transitions:
//! - `Closed` → `Open`:   `failure_threshold` failures without an intervening success
//! - `Open` → `Closed`:   `open_duration` has elapsed (counter reset, no probing)
//! - `Open` → `Closed`:   a success is recorded (only possible for calls already in flight)
//!
//! Time is read from `tokio::time::Instant`, so tests can drive the cooldown
//! with a paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation.
    Closed,
    /// All ledger-node calls suspended until `open_duration` elapses.
    Open,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// Configuration for the circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Cumulative failures (across all units) before opening.
    pub failure_threshold: u32,
    /// How long to stay open before resetting.
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_duration: Duration::from_secs(60),
        }
    }
}

struct CircuitInner {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
}

/// Thread-safe circuit breaker shared by every fetch unit.
#[derive(Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Arc<Mutex<CircuitInner>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker in `Closed` state.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Arc::new(Mutex::new(CircuitInner {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
            })),
        }
    }

    /// Returns the current state, closing the breaker if the cooldown has elapsed.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == CircuitState::Open {
            if let Some(opened_at) = inner.opened_at {
                if opened_at.elapsed() >= self.config.open_duration {
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.opened_at = None;
                    tracing::warn!("Circuit breaker closed; resuming ledger node calls");
                }
            }
        }
        inner.state
    }

    /// Returns `true` if the circuit allows ledger-node traffic.
    pub fn is_allowed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    /// Current failure count since the last success or reset.
    pub fn failure_count(&self) -> u32 {
        self.inner.lock().unwrap().failure_count
    }

    /// Record a successful unit. Resets the counter and closes an open breaker.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count = 0;
        if inner.state == CircuitState::Open {
            inner.state = CircuitState::Closed;
            inner.opened_at = None;
            tracing::warn!("Circuit breaker closed by a successful call");
        }
    }

    /// Record a failed attempt. Returns `true` if this failure tripped the breaker.
    pub fn record_failure(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count = inner.failure_count.saturating_add(1);
        if inner.state == CircuitState::Closed
            && inner.failure_count >= self.config.failure_threshold
        {
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
            tracing::error!(
                failures = inner.failure_count,
                cooldown_secs = self.config.open_duration.as_secs(),
                "Circuit breaker open: too many consecutive failures, pausing fetches"
            );
            return true;
        }
        false
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state())
            .field("failures", &self.failure_count())
            .finish()
    }
}
