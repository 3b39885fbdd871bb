//! Log fetcher: one block window, every tracked asset, both event kinds.
//!
//! Each (asset, kind) pair is an independent unit run under the shared
//! [`Resilience`] policy. An open circuit breaker skips the whole call. Once a
//! call has started, every unit gets its attempt: a unit that fails, or trips
//! the breaker, never stops the remaining units. The caller receives a
//! [`FetchReport`] instead of an error.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tracing::{debug, info, warn};

use vaultindex_core::cursor::BlockWindow;
use vaultindex_core::error::IndexerError;
use vaultindex_core::policy::{Resilience, UnitOutcome};
use vaultindex_core::store::EventStore;
use vaultindex_core::types::{EventKind, NewVaultEvent, TrackedAsset};

use crate::abi::{self, VaultLog};
use crate::log::RawLog;
use crate::rpc::{LedgerClient, LogFilter};

/// What happened to one (asset, kind) unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitResult {
    /// Logs fetched and stored; `inserted` excludes already-present rows.
    Stored { fetched: usize, inserted: usize },
    /// Every allowed attempt failed.
    Failed { attempts: u32, error: String },
    /// The circuit breaker was open when the call started; no node calls
    /// were made.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub asset: String,
    pub kind: EventKind,
    pub result: UnitResult,
}

/// Per-unit outcomes for one `fetch_and_store` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub window: BlockWindow,
    pub units: Vec<UnitReport>,
}

impl FetchReport {
    /// `true` if every unit stored successfully.
    pub fn is_complete(&self) -> bool {
        self.units
            .iter()
            .all(|u| matches!(u.result, UnitResult::Stored { .. }))
    }

    /// Total logs returned by the node across successful units.
    pub fn fetched(&self) -> usize {
        self.units
            .iter()
            .map(|u| match u.result {
                UnitResult::Stored { fetched, .. } => fetched,
                _ => 0,
            })
            .sum()
    }

    /// Total new rows written.
    pub fn inserted(&self) -> usize {
        self.units
            .iter()
            .map(|u| match u.result {
                UnitResult::Stored { inserted, .. } => inserted,
                _ => 0,
            })
            .sum()
    }

    pub fn failed(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(u.result, UnitResult::Failed { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.units
            .iter()
            .filter(|u| matches!(u.result, UnitResult::Skipped))
            .count()
    }
}

/// Fetches vault logs from the ledger node and writes them to the store.
pub struct LogFetcher {
    client: Arc<dyn LedgerClient>,
    store: Arc<dyn EventStore>,
    assets: Vec<TrackedAsset>,
    resilience: Resilience,
}

impl LogFetcher {
    pub fn new(
        client: Arc<dyn LedgerClient>,
        store: Arc<dyn EventStore>,
        assets: Vec<TrackedAsset>,
        resilience: Resilience,
    ) -> Self {
        Self {
            client,
            store,
            assets,
            resilience,
        }
    }

    pub fn assets(&self) -> &[TrackedAsset] {
        &self.assets
    }

    pub fn resilience(&self) -> &Resilience {
        &self.resilience
    }

    /// Fetch and store every tracked asset's deposit and withdraw logs in the
    /// inclusive range `[from_block, to_block]`.
    pub async fn fetch_and_store(&self, from_block: u64, to_block: u64) -> FetchReport {
        let window = BlockWindow::new(from_block, to_block);
        let mut units = Vec::with_capacity(self.assets.len() * EventKind::ALL.len());

        if let Err(e) = self.resilience.guard() {
            warn!(%window, error = %e, "Skipping fetch to avoid hammering the node");
            for asset in &self.assets {
                for kind in EventKind::ALL {
                    units.push(UnitReport {
                        asset: asset.symbol.clone(),
                        kind,
                        result: UnitResult::Skipped,
                    });
                }
            }
            return FetchReport { window, units };
        }

        for asset in &self.assets {
            for kind in EventKind::ALL {
                let context = format!("[{}] {} fetch", asset.symbol, kind);
                let outcome = self
                    .resilience
                    .run(&context, || self.fetch_unit(asset, kind, window))
                    .await;

                let result = match outcome {
                    UnitOutcome::Succeeded {
                        value: (fetched, inserted),
                        ..
                    } => UnitResult::Stored { fetched, inserted },
                    UnitOutcome::Failed { attempts, error } => UnitResult::Failed {
                        attempts,
                        error: error.to_string(),
                    },
                };
                units.push(UnitReport {
                    asset: asset.symbol.clone(),
                    kind,
                    result,
                });
            }
        }

        FetchReport { window, units }
    }

    async fn fetch_unit(
        &self,
        asset: &TrackedAsset,
        kind: EventKind,
        window: BlockWindow,
    ) -> Result<(usize, usize), IndexerError> {
        let filter = LogFilter {
            address: asset.contract_address.clone(),
            topic0: abi::topic0(kind),
            from_block: window.from,
            to_block: window.to,
        };
        let logs = self.client.logs(&filter).await?;

        if logs.is_empty() {
            debug!(asset = %asset.symbol, %kind, %window, "No events found");
        } else {
            info!(asset = %asset.symbol, %kind, %window, count = logs.len(), "Fetched events");
        }

        let mut fetched = 0;
        let mut inserted = 0;
        for log in logs.iter().filter(|l| !l.is_removed()) {
            fetched += 1;
            let decoded = abi::decode(kind, log)?;
            let block_number = log.block_number_u64()?;
            let timestamp = self
                .client
                .block_timestamp(block_number)
                .await?
                .ok_or(IndexerError::BlockNotFound { block_number })?;

            let event = to_event(asset, kind, log, &decoded, timestamp)?;
            if self.store.insert_if_absent(&event).await? {
                inserted += 1;
            }
        }
        Ok((fetched, inserted))
    }
}

/// Map a decoded log onto the stored row. Deposits never carry a receiver.
pub fn to_event(
    asset: &TrackedAsset,
    kind: EventKind,
    log: &RawLog,
    decoded: &VaultLog,
    block_timestamp: i64,
) -> Result<NewVaultEvent, IndexerError> {
    let event_timestamp = Utc
        .timestamp_opt(block_timestamp, 0)
        .single()
        .ok_or_else(|| IndexerError::Decode(format!("invalid block timestamp {block_timestamp}")))?;

    let receiver = match kind {
        EventKind::Deposit => None,
        EventKind::Withdraw => decoded.receiver.map(|a| a.to_checksum(None)),
    };

    Ok(NewVaultEvent {
        asset: asset.symbol.clone(),
        event_type: kind,
        tx_hash: log.tx_hash.clone(),
        log_index: log.log_index_u32()?,
        block_number: log.block_number_u64()?,
        event_timestamp,
        sender: Some(decoded.sender.to_checksum(None)),
        receiver,
        owner: Some(decoded.owner.to_checksum(None)),
        assets: decoded.assets.to_string(),
        shares: decoded.shares.to_string(),
    })
}
