//! In-memory storage backend.
//!
//! Keeps vault events in RAM behind a single mutex. Useful for tests and
//! short-lived runs that don't need persistence.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use vaultindex_core::error::IndexerError;
use vaultindex_core::store::EventStore;
use vaultindex_core::types::{
    AggregateQuery, DailyAggregate, EventPage, EventQuery, NewVaultEvent, Page, VaultEvent,
};

use crate::aggregate::fold_daily;

#[derive(Default)]
struct Inner {
    events: Vec<VaultEvent>,
    keys: HashSet<(String, u32)>,
    next_id: i64,
}

/// In-memory event store.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryEventStore {
    inner: Mutex<Inner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored events.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored event in insertion order.
    pub fn events(&self) -> Vec<VaultEvent> {
        self.inner.lock().unwrap().events.clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn insert_if_absent(&self, event: &NewVaultEvent) -> Result<bool, IndexerError> {
        let mut inner = self.inner.lock().unwrap();
        let (tx_hash, log_index) = event.natural_key();
        if !inner.keys.insert((tx_hash.to_owned(), log_index)) {
            return Ok(false);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner
            .events
            .push(VaultEvent::from_new(id, Utc::now(), event.clone()));
        Ok(true)
    }

    async fn highest_block_number(&self) -> Result<Option<u64>, IndexerError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.events.iter().map(|e| e.block_number).max())
    }

    async fn query_events(&self, query: &EventQuery, page: Page) -> Result<EventPage, IndexerError> {
        let inner = self.inner.lock().unwrap();
        let mut matched: Vec<&VaultEvent> = inner.events.iter().filter(|e| query.matches(e)).collect();
        // newest first; later inserts win ties
        matched.sort_by(|a, b| {
            b.event_timestamp
                .cmp(&a.event_timestamp)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matched.len() as u64;
        let events = matched
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok(EventPage { events, total })
    }

    async fn daily_aggregates(
        &self,
        query: &AggregateQuery,
    ) -> Result<Vec<DailyAggregate>, IndexerError> {
        let inner = self.inner.lock().unwrap();
        let rows = inner.events.iter().filter(|e| {
            e.event_timestamp >= query.from
                && e.event_timestamp <= query.to
                && query.asset.as_deref().map_or(true, |a| a == e.asset)
        });
        fold_daily(
            rows.map(|e| (e.asset.as_str(), e.event_type, e.event_timestamp, e.assets.as_str())),
        )
    }
}
