//! Resilience policies applied around every ledger-node unit of work.
//!
//! ```text
//! unit → [CircuitBreaker gate] → attempt → (fail) → [RetryPolicy delay] → attempt …
//! ```

pub mod circuit_breaker;
pub mod resilience;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use resilience::{Resilience, UnitOutcome};
pub use retry::{RetryConfig, RetryPolicy};
