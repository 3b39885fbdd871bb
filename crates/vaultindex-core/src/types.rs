//! Shared types for the vault ingestion pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IndexerError;

// ─── EventKind ────────────────────────────────────────────────────────────────

/// The two accounting events emitted by a tracked vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Inflow: assets deposited, shares minted.
    Deposit,
    /// Outflow: shares burned, assets withdrawn.
    Withdraw,
}

impl EventKind {
    /// Both kinds, in the order they are fetched per asset.
    pub const ALL: [EventKind; 2] = [EventKind::Deposit, EventKind::Withdraw];

    /// The value stored in the `event_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = IndexerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdraw" => Ok(Self::Withdraw),
            other => Err(IndexerError::Other(format!("unknown event type '{other}'"))),
        }
    }
}

// ─── TrackedAsset ─────────────────────────────────────────────────────────────

/// A monitored vault contract. Loaded once at startup; never changes at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAsset {
    /// Display name (e.g. `"vbETH yVault"`).
    pub name: String,
    /// Symbol recorded on every stored event (e.g. `"yvvbETH"`).
    pub symbol: String,
    /// Vault contract address (`0x…`).
    pub contract_address: String,
}

impl TrackedAsset {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        contract_address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            contract_address: contract_address.into(),
        }
    }
}

// ─── VaultEvent ───────────────────────────────────────────────────────────────

/// An observed vault log, ready to be inserted.
///
/// `(tx_hash, log_index)` is the natural key: it identifies the log uniquely
/// across all assets and event kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVaultEvent {
    pub asset: String,
    pub event_type: EventKind,
    pub tx_hash: String,
    pub log_index: u32,
    pub block_number: u64,
    /// Timestamp of the block containing the log, not ingest time.
    pub event_timestamp: DateTime<Utc>,
    pub sender: Option<String>,
    /// Always `None` for deposits.
    pub receiver: Option<String>,
    pub owner: Option<String>,
    /// Base-10 integer string; never parsed into a float.
    pub assets: String,
    /// Base-10 integer string; never parsed into a float.
    pub shares: String,
}

impl NewVaultEvent {
    /// Returns the `(tx_hash, log_index)` natural key.
    pub fn natural_key(&self) -> (&str, u32) {
        (&self.tx_hash, self.log_index)
    }
}

/// A stored vault event, with the identity and creation time assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultEvent {
    pub id: i64,
    pub asset: String,
    pub event_type: EventKind,
    pub tx_hash: String,
    pub log_index: u32,
    pub block_number: u64,
    pub event_timestamp: DateTime<Utc>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub owner: Option<String>,
    pub assets: String,
    pub shares: String,
    pub created_at: DateTime<Utc>,
}

impl VaultEvent {
    /// Materialize a stored row from an insert payload.
    pub fn from_new(id: i64, created_at: DateTime<Utc>, event: NewVaultEvent) -> Self {
        Self {
            id,
            asset: event.asset,
            event_type: event.event_type,
            tx_hash: event.tx_hash,
            log_index: event.log_index,
            block_number: event.block_number,
            event_timestamp: event.event_timestamp,
            sender: event.sender,
            receiver: event.receiver,
            owner: event.owner,
            assets: event.assets,
            shares: event.shares,
            created_at,
        }
    }
}

// ─── Queries ──────────────────────────────────────────────────────────────────

/// Filter for event listing. Every `None` field matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventQuery {
    pub asset: Option<String>,
    pub event_type: Option<EventKind>,
    /// Inclusive lower bound on `event_timestamp`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `event_timestamp`.
    pub to: Option<DateTime<Utc>>,
}

impl EventQuery {
    pub fn asset(mut self, symbol: impl Into<String>) -> Self {
        self.asset = Some(symbol.into());
        self
    }

    pub fn event_type(mut self, kind: EventKind) -> Self {
        self.event_type = Some(kind);
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Returns `true` if `event` passes every set filter.
    pub fn matches(&self, event: &VaultEvent) -> bool {
        self.asset.as_deref().map_or(true, |a| a == event.asset)
            && self.event_type.map_or(true, |k| k == event.event_type)
            && self.from.map_or(true, |from| event.event_timestamp >= from)
            && self.to.map_or(true, |to| event.event_timestamp <= to)
    }
}

/// Offset/limit pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: u64,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;

    pub fn new(limit: u32, offset: u64) -> Self {
        Self { limit, offset }
    }

    /// Page from a 1-based page number (page 0 is treated as page 1).
    pub fn number(page: u64, limit: u32) -> Self {
        Self {
            limit,
            offset: page
                .max(1)
                .saturating_sub(1)
                .saturating_mul(u64::from(limit)),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

/// One page of events plus the total number of matching rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<VaultEvent>,
    pub total: u64,
}

/// Range for daily aggregation. `asset = None` aggregates every asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateQuery {
    pub asset: Option<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl AggregateQuery {
    pub fn all_assets(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { asset: None, from, to }
    }

    pub fn for_asset(asset: impl Into<String>, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            asset: Some(asset.into()),
            from,
            to,
        }
    }
}

/// Sum of `assets` and event count for one (asset, UTC day, kind) bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub asset: String,
    pub event_type: EventKind,
    pub day: NaiveDate,
    /// Exact base-10 sum of `assets`.
    pub total_assets: String,
    pub event_count: u64,
}

// ─── Tests ────────────────────────────────────────────────────────────────────
