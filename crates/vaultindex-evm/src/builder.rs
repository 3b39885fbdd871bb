//! Fluent builder API for ingestion configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use vaultindex_core::types::TrackedAsset;
//! use vaultindex_evm::IngestConfigBuilder;
//!
//! let config = IngestConfigBuilder::new()
//!     .genesis_block(5_000_000)
//!     .batch_size(500)
//!     .poll_interval(Duration::from_secs(15))
//!     .asset(TrackedAsset::new(
//!         "vbETH yVault",
//!         "yvvbETH",
//!         "0xE007CA01894c863d7898045ed5A3B4Abf0b18f37",
//!     ))
//!     .build()
//!     .unwrap();
//! ```

use std::time::Duration;

use vaultindex_core::config::IngestConfig;
use vaultindex_core::error::IndexerError;
use vaultindex_core::types::TrackedAsset;

/// Fluent builder for [`IngestConfig`].
#[derive(Default)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// First block to ingest when the store is empty.
    pub fn genesis_block(mut self, block: u64) -> Self {
        self.config.genesis_block = block;
        self
    }

    /// Maximum number of blocks per window.
    pub fn batch_size(mut self, size: u64) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Attempts per unit, including the first.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_base_delay(mut self, delay: Duration) -> Self {
        self.config.retry_base_delay = delay;
        self
    }

    pub fn circuit_breaker(mut self, threshold: u32, timeout: Duration) -> Self {
        self.config.circuit_breaker_threshold = threshold;
        self.config.circuit_breaker_timeout = timeout;
        self
    }

    /// Add one tracked asset.
    pub fn asset(mut self, asset: TrackedAsset) -> Self {
        self.config.assets.push(asset);
        self
    }

    /// Replace the tracked asset list.
    pub fn assets(mut self, assets: impl IntoIterator<Item = TrackedAsset>) -> Self {
        self.config.assets = assets.into_iter().collect();
        self
    }

    /// Validate and build the [`IngestConfig`].
    pub fn build(self) -> Result<IngestConfig, IndexerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth() -> TrackedAsset {
        TrackedAsset::new("vbETH yVault", "yvvbETH", "0xE007CA01894c863d7898045ed5A3B4Abf0b18f37")
    }

    #[test]
    fn builder_defaults() {
        let cfg = IngestConfigBuilder::new().asset(eth()).build().unwrap();
        assert_eq!(cfg.genesis_block, 5_000_000);
        assert_eq!(cfg.batch_size, 1000);
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.circuit_breaker_threshold, 5);
    }

    #[test]
    fn builder_custom() {
        let cfg = IngestConfigBuilder::new()
            .genesis_block(42)
            .batch_size(10)
            .poll_interval(Duration::from_secs(1))
            .max_attempts(5)
            .retry_base_delay(Duration::from_millis(10))
            .circuit_breaker(2, Duration::from_secs(5))
            .assets(vec![eth()])
            .build()
            .unwrap();

        assert_eq!(cfg.genesis_block, 42);
        assert_eq!(cfg.batch_size, 10);
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.circuit_breaker_threshold, 2);
        assert_eq!(cfg.circuit_breaker_timeout, Duration::from_secs(5));
        assert_eq!(cfg.assets.len(), 1);
    }

    #[test]
    fn build_rejects_invalid() {
        assert!(IngestConfigBuilder::new().build().is_err());
        assert!(IngestConfigBuilder::new()
            .asset(eth())
            .batch_size(0)
            .build()
            .is_err());
    }
}
