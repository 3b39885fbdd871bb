//! vaultindex-storage: pluggable event store backends for VaultIndex.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing, no persistence)
//! - `sqlite`: SQLite via `sqlx` (embedded, single-file persistence)
//! - `postgres`: PostgreSQL via `sqlx` (production)
//!
//! Every backend enforces uniqueness on `(tx_hash, log_index)` and treats a
//! duplicate insert as a no-op.

mod aggregate;
pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryEventStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteEventStore;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresEventStore, PostgresOptions};
