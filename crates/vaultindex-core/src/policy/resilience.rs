//! Retry-with-backoff plus a shared circuit breaker, applied per unit of work.
//!
//! One `Resilience` instance is created per ingestion stream and shared by
//! the fetcher (which wraps each (asset, kind) unit) and whoever else needs to
//! know whether ledger-node traffic is currently suspended.
//!
//! The open breaker is checked once per `fetch_and_store` call through
//! [`Resilience::guard`]. Inside a call every unit still gets its first
//! attempt; a trip only ends the retries of the unit that tripped it.

use std::future::Future;

use tracing::{error, warn};

use crate::error::IndexerError;
use crate::policy::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::policy::retry::{RetryConfig, RetryPolicy};

/// Result of running one unit of work under the resilience policy.
#[derive(Debug)]
pub enum UnitOutcome<T> {
    /// The unit completed, possibly after retries.
    Succeeded { value: T, attempts: u32 },
    /// Every allowed attempt failed, the error was fatal, or the breaker
    /// tripped mid-retry.
    Failed { attempts: u32, error: IndexerError },
}

impl<T> UnitOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Combined retry policy and circuit breaker.
#[derive(Debug, Clone)]
pub struct Resilience {
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl Resilience {
    pub fn new(retry: RetryConfig, breaker: CircuitBreakerConfig) -> Self {
        Self {
            retry: RetryPolicy::new(retry),
            breaker: CircuitBreaker::new(breaker),
        }
    }

    /// Returns `true` if ledger-node calls are currently suspended.
    pub fn is_open(&self) -> bool {
        self.breaker.state() == CircuitState::Open
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// `Err(CircuitOpen)` while ledger-node calls are suspended.
    pub fn guard(&self) -> Result<(), IndexerError> {
        if self.is_open() {
            return Err(IndexerError::CircuitOpen);
        }
        Ok(())
    }

    /// Run `op` with retries. Every failed attempt counts against the shared
    /// breaker; once it is open, or the error is fatal, retrying stops
    /// immediately. The first attempt is always made.
    pub async fn run<T, F, Fut>(&self, context: &str, mut op: F) -> UnitOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, IndexerError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    self.breaker.record_success();
                    return UnitOutcome::Succeeded {
                        value,
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    error!(
                        context,
                        attempt,
                        node = e.is_node_error(),
                        error = %e,
                        "Unit failed"
                    );
                    if self.breaker.record_failure() || self.is_open() || e.is_fatal() {
                        return UnitOutcome::Failed {
                            attempts: attempt,
                            error: e,
                        };
                    }
                    match self.retry.next_delay(attempt) {
                        Some(delay) => {
                            warn!(
                                context,
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                "Retrying unit"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            error!(
                                context,
                                attempts = attempt,
                                "Retries exhausted; unit dropped for this cycle"
                            );
                            return UnitOutcome::Failed {
                                attempts: attempt,
                                error: e,
                            };
                        }
                    }
                }
            }
        }
    }
}

impl Default for Resilience {
    fn default() -> Self {
        Self::new(RetryConfig::default(), CircuitBreakerConfig::default())
    }
}
