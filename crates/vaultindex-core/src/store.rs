//! The event store contract.
//!
//! Implementations live in `vaultindex-storage` (`InMemoryEventStore`,
//! `SqliteEventStore`, `PostgresEventStore`). Stores never retry: connectivity
//! failures surface unchanged as [`IndexerError::Storage`] and the caller's
//! resilience policy decides what happens next.

use async_trait::async_trait;

use crate::error::IndexerError;
use crate::types::{AggregateQuery, DailyAggregate, EventPage, EventQuery, NewVaultEvent, Page};

/// Append-only persistence of vault events, unique on `(tx_hash, log_index)`.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Insert an event unless its natural key already exists.
    ///
    /// Returns `true` if a row was written, `false` if the key was already
    /// present. A duplicate is never an error, so re-processing a block range
    /// is always safe.
    async fn insert_if_absent(&self, event: &NewVaultEvent) -> Result<bool, IndexerError>;

    /// Highest `block_number` across all stored events, or `None` if empty.
    async fn highest_block_number(&self) -> Result<Option<u64>, IndexerError>;

    /// Filtered events ordered by `event_timestamp` descending, plus the total
    /// number of matching rows.
    async fn query_events(&self, query: &EventQuery, page: Page) -> Result<EventPage, IndexerError>;

    /// Sums of `assets` and event counts bucketed by asset, UTC day and event
    /// type, ordered by asset, day descending, then event type.
    async fn daily_aggregates(
        &self,
        query: &AggregateQuery,
    ) -> Result<Vec<DailyAggregate>, IndexerError>;

    /// Release pooled connections. Called once on shutdown.
    async fn close(&self) {}
}
