//! Error types for the vault ingestion pipeline.

use thiserror::Error;

/// Errors that can occur while ingesting or querying vault events.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Block {block_number} not found on ledger node")]
    BlockNotFound { block_number: u64 },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Circuit breaker open; ledger node calls suspended")]
    CircuitOpen,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    /// Returns `true` if the error originated at the ledger node (transport,
    /// JSON-RPC or missing data).
    pub fn is_node_error(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::BlockNotFound { .. } | Self::Decode(_))
    }

    /// Returns `true` for errors that must abort startup rather than be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
