//! vaultindex-core: foundation for the vault deposit/withdraw ingestion pipeline.
//!
//! # Architecture
//!
//! ```text
//! IngestionScheduler (cursor, window, cadence)
//!        └── LogFetcher (per asset × kind)
//!               ├── Resilience   (linear retry + shared circuit breaker)
//!               ├── LedgerClient (block height, logs, block timestamps)
//!               └── EventStore   (insert-if-absent on (tx_hash, log_index))
//! ```
//!
//! This crate holds the chain-agnostic pieces: types, the store trait, the
//! cursor arithmetic and the resilience policies. The ledger adapter and the
//! scheduler live in `vaultindex-evm`; store backends in `vaultindex-storage`.

pub mod config;
pub mod cursor;
pub mod error;
pub mod policy;
pub mod store;
pub mod types;

pub use config::{IngestConfig, IngestState};
pub use cursor::{BlockWindow, Cursor};
pub use error::IndexerError;
pub use policy::{Resilience, UnitOutcome};
pub use store::EventStore;
pub use types::{
    AggregateQuery, DailyAggregate, EventKind, EventPage, EventQuery, NewVaultEvent, Page,
    TrackedAsset, VaultEvent,
};
