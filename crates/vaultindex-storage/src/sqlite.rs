//! SQLite storage backend for VaultIndex.
//!
//! Persists vault events to a single SQLite file. Amounts are stored as
//! base-10 text and summed in Rust with 256-bit arithmetic; timestamps are
//! stored as Unix seconds.
//!
//! # Usage
//! ```rust,no_run
//! use vaultindex_storage::sqlite::SqliteEventStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteEventStore::open("./vaults.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteEventStore::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use vaultindex_core::error::IndexerError;
use vaultindex_core::store::EventStore;
use vaultindex_core::types::{
    AggregateQuery, DailyAggregate, EventKind, EventPage, EventQuery, NewVaultEvent, Page,
    VaultEvent,
};

use crate::aggregate::fold_daily;

const EVENT_COLUMNS: &str = "id, asset, event_type, tx_hash, log_index, block_number, \
     event_timestamp, sender, receiver, owner, assets, shares, created_at";

/// SQLite-backed event store.
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./vaults.db"`) or a full
    /// SQLite URL (`"sqlite:./vaults.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, IndexerError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url).await.map_err(storage_err)?;

        let store = Self { pool };
        store.init_schema(true).await?;
        Ok(store)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Each SQLite connection to `:memory:` is a separate database, so the
    /// pool is pinned to one connection that never expires.
    pub async fn in_memory() -> Result<Self, IndexerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let store = Self { pool };
        store.init_schema(false).await?;
        Ok(store)
    }

    async fn init_schema(&self, wal: bool) -> Result<(), IndexerError> {
        if wal {
            sqlx::query("PRAGMA journal_mode=WAL;")
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vault_events (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                asset           TEXT    NOT NULL,
                event_type      TEXT    NOT NULL CHECK (event_type IN ('deposit', 'withdraw')),
                tx_hash         TEXT    NOT NULL,
                log_index       INTEGER NOT NULL,
                block_number    INTEGER NOT NULL,
                event_timestamp INTEGER NOT NULL,
                sender          TEXT,
                receiver        TEXT,
                owner           TEXT,
                assets          TEXT    NOT NULL,
                shares          TEXT    NOT NULL,
                created_at      INTEGER NOT NULL,
                UNIQUE (tx_hash, log_index)
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        for ddl in [
            "CREATE INDEX IF NOT EXISTS idx_vault_events_asset_ts ON vault_events (asset, event_timestamp DESC);",
            "CREATE INDEX IF NOT EXISTS idx_vault_events_ts ON vault_events (event_timestamp DESC);",
            "CREATE INDEX IF NOT EXISTS idx_vault_events_block ON vault_events (block_number DESC);",
        ] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        }

        Ok(())
    }

    /// Total number of stored events.
    pub async fn event_count(&self) -> Result<u64, IndexerError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM vault_events")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let cnt: i64 = row.try_get("cnt").map_err(storage_err)?;
        Ok(cnt as u64)
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn insert_if_absent(&self, event: &NewVaultEvent) -> Result<bool, IndexerError> {
        let result = sqlx::query(
            "INSERT INTO vault_events
             (asset, event_type, tx_hash, log_index, block_number, event_timestamp,
              sender, receiver, owner, assets, shares, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (tx_hash, log_index) DO NOTHING",
        )
        .bind(&event.asset)
        .bind(event.event_type.as_str())
        .bind(&event.tx_hash)
        .bind(i64::from(event.log_index))
        .bind(event.block_number as i64)
        .bind(event.event_timestamp.timestamp())
        .bind(&event.sender)
        .bind(&event.receiver)
        .bind(&event.owner)
        .bind(&event.assets)
        .bind(&event.shares)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        let inserted = result.rows_affected() == 1;
        if inserted {
            debug!(
                asset = %event.asset,
                kind = %event.event_type,
                block = event.block_number,
                "event stored"
            );
        }
        Ok(inserted)
    }

    async fn highest_block_number(&self) -> Result<Option<u64>, IndexerError> {
        let row = sqlx::query("SELECT MAX(block_number) AS max_block FROM vault_events")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let max: Option<i64> = row.try_get("max_block").map_err(storage_err)?;
        Ok(max.map(|b| b as u64))
    }

    async fn query_events(&self, query: &EventQuery, page: Page) -> Result<EventPage, IndexerError> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS cnt FROM vault_events WHERE 1 = 1");
        push_filters(&mut count, query);
        let row = count
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let total: i64 = row.try_get("cnt").map_err(storage_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {EVENT_COLUMNS} FROM vault_events WHERE 1 = 1"
        ));
        push_filters(&mut select, query);
        select.push(" ORDER BY event_timestamp DESC, id DESC LIMIT ");
        select.push_bind(i64::from(page.limit));
        select.push(" OFFSET ");
        select.push_bind(page.offset as i64);

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        let events = rows.iter().map(row_to_event).collect::<Result<Vec<_>, _>>()?;

        Ok(EventPage {
            events,
            total: total as u64,
        })
    }

    async fn daily_aggregates(
        &self,
        query: &AggregateQuery,
    ) -> Result<Vec<DailyAggregate>, IndexerError> {
        let mut select = QueryBuilder::<Sqlite>::new(
            "SELECT asset, event_type, event_timestamp, assets FROM vault_events
             WHERE event_timestamp >= ",
        );
        select.push_bind(lower_bound_secs(query.from));
        select.push(" AND event_timestamp <= ");
        select.push_bind(query.to.timestamp());
        if let Some(asset) = &query.asset {
            select.push(" AND asset = ");
            select.push_bind(asset.clone());
        }

        let rows = select
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        let mut parsed = Vec::with_capacity(rows.len());
        for row in &rows {
            let asset: String = row.try_get("asset").map_err(storage_err)?;
            let kind: EventKind = row
                .try_get::<String, _>("event_type")
                .map_err(storage_err)?
                .parse()?;
            let ts = from_unix(row.try_get("event_timestamp").map_err(storage_err)?)?;
            let assets: String = row.try_get("assets").map_err(storage_err)?;
            parsed.push((asset, kind, ts, assets));
        }
        fold_daily(parsed)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, query: &EventQuery) {
    if let Some(asset) = &query.asset {
        qb.push(" AND asset = ");
        qb.push_bind(asset.clone());
    }
    if let Some(kind) = query.event_type {
        qb.push(" AND event_type = ");
        qb.push_bind(kind.as_str());
    }
    if let Some(from) = query.from {
        qb.push(" AND event_timestamp >= ");
        qb.push_bind(lower_bound_secs(from));
    }
    if let Some(to) = query.to {
        qb.push(" AND event_timestamp <= ");
        qb.push_bind(to.timestamp());
    }
}

/// Timestamps are stored in whole seconds, so a fractional lower bound rounds
/// up. Upper bounds round down through `timestamp()`.
fn lower_bound_secs(from: DateTime<Utc>) -> i64 {
    if from.timestamp_subsec_nanos() > 0 {
        from.timestamp() + 1
    } else {
        from.timestamp()
    }
}

fn row_to_event(row: &SqliteRow) -> Result<VaultEvent, IndexerError> {
    Ok(VaultEvent {
        id: row.try_get("id").map_err(storage_err)?,
        asset: row.try_get("asset").map_err(storage_err)?,
        event_type: row
            .try_get::<String, _>("event_type")
            .map_err(storage_err)?
            .parse()?,
        tx_hash: row.try_get("tx_hash").map_err(storage_err)?,
        log_index: row.try_get::<i64, _>("log_index").map_err(storage_err)? as u32,
        block_number: row.try_get::<i64, _>("block_number").map_err(storage_err)? as u64,
        event_timestamp: from_unix(row.try_get("event_timestamp").map_err(storage_err)?)?,
        sender: row.try_get("sender").map_err(storage_err)?,
        receiver: row.try_get("receiver").map_err(storage_err)?,
        owner: row.try_get("owner").map_err(storage_err)?,
        assets: row.try_get("assets").map_err(storage_err)?,
        shares: row.try_get("shares").map_err(storage_err)?,
        created_at: from_unix(row.try_get("created_at").map_err(storage_err)?)?,
    })
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>, IndexerError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| IndexerError::Storage(format!("invalid stored timestamp {secs}")))
}

fn storage_err(e: sqlx::Error) -> IndexerError {
    IndexerError::Storage(e.to_string())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
