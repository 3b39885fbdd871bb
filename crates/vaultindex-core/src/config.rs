//! Ingestion configuration and scheduler state types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::IndexerError;
use crate::policy::{CircuitBreakerConfig, RetryConfig};
use crate::types::TrackedAsset;

/// Configuration for one ingestion stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// First block to ingest when the store is empty.
    pub genesis_block: u64,
    /// Maximum blocks per window (one `eth_getLogs` range per asset and kind).
    pub batch_size: u64,
    /// Periodic tick interval.
    pub poll_interval: Duration,
    /// Attempts per (asset, kind) unit, including the first.
    pub max_attempts: u32,
    /// Linear backoff unit between attempts.
    pub retry_base_delay: Duration,
    /// Failures without an intervening success before the breaker opens.
    pub circuit_breaker_threshold: u32,
    /// How long the breaker stays open.
    pub circuit_breaker_timeout: Duration,
    /// Vault contracts to watch.
    pub assets: Vec<TrackedAsset>,
}

impl IngestConfig {
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay: self.retry_base_delay,
        }
    }

    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker_threshold,
            open_duration: self.circuit_breaker_timeout,
        }
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), IndexerError> {
        // The cursor starts at `genesis_block - 1`; block 0 has no predecessor.
        if self.genesis_block == 0 {
            return Err(IndexerError::Config("genesis_block must be > 0".into()));
        }
        if self.batch_size == 0 {
            return Err(IndexerError::Config("batch_size must be > 0".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(IndexerError::Config("poll_interval must be > 0".into()));
        }
        if self.max_attempts == 0 {
            return Err(IndexerError::Config("max_attempts must be > 0".into()));
        }
        if self.circuit_breaker_threshold == 0 {
            return Err(IndexerError::Config(
                "circuit_breaker_threshold must be > 0".into(),
            ));
        }
        if self.assets.is_empty() {
            return Err(IndexerError::Config("at least one tracked asset is required".into()));
        }
        Ok(())
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            genesis_block: 5_000_000,
            batch_size: 1000,
            poll_interval: Duration::from_secs(30),
            max_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout: Duration::from_secs(60),
            assets: Vec::new(),
        }
    }
}

/// Runtime state of the ingestion scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestState {
    /// Not yet started.
    Idle,
    /// Periodic ticks are scheduled.
    Running,
    /// Stop requested; waiting for an in-flight tick to finish.
    Stopping,
    /// Timer cancelled.
    Stopped,
}

impl std::fmt::Display for IngestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
