//! The ingestion scheduler: owns the cursor and the tick cadence.
//!
//! Every tick:
//!   - reads the node's block height
//!   - computes the next window `[cursor + 1, min(cursor + batch_size, latest)]`
//!   - runs the fetcher over it
//!   - advances the cursor to the window's end, whatever the fetch report says
//!
//! Periodic ticks and [`IngestionScheduler::run_now`] serialize on the cursor
//! mutex, so two ticks never read-then-advance the same cursor concurrently.
//!
//! A window whose report is incomplete is still marked processed. It is kept
//! in a bounded in-memory gap list for operators to backfill manually.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use vaultindex_core::config::{IngestConfig, IngestState};
use vaultindex_core::cursor::{BlockWindow, Cursor};
use vaultindex_core::error::IndexerError;
use vaultindex_core::policy::Resilience;
use vaultindex_core::store::EventStore;

use crate::fetcher::{FetchReport, LogFetcher};
use crate::rpc::LedgerClient;

/// Maximum number of gap windows remembered; oldest are dropped first.
pub const MAX_RECORDED_GAPS: usize = 1024;

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// `cursor + 1 > latest`; nothing fetched, cursor unchanged.
    NoNewBlocks { cursor: u64, latest: u64 },
    /// A window was processed and the cursor advanced to `cursor`.
    Processed { report: FetchReport, cursor: u64 },
}

struct Shared {
    config: IngestConfig,
    client: Arc<dyn LedgerClient>,
    store: Arc<dyn EventStore>,
    fetcher: LogFetcher,
    cursor: AsyncMutex<Option<Cursor>>,
    gaps: Mutex<VecDeque<BlockWindow>>,
    state: Mutex<IngestState>,
}

struct RunningTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives the [`LogFetcher`] on a fixed interval and on demand.
pub struct IngestionScheduler {
    shared: Arc<Shared>,
    task: Mutex<Option<RunningTask>>,
}

impl IngestionScheduler {
    /// Create a scheduler. The cursor is derived from the store on `start`
    /// or on the first tick, whichever comes first.
    pub fn new(
        config: IngestConfig,
        client: Arc<dyn LedgerClient>,
        store: Arc<dyn EventStore>,
    ) -> Result<Self, IndexerError> {
        config.validate()?;
        let resilience = Resilience::new(config.retry_config(), config.circuit_breaker_config());
        let fetcher = LogFetcher::new(
            Arc::clone(&client),
            Arc::clone(&store),
            config.assets.clone(),
            resilience,
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                client,
                store,
                fetcher,
                cursor: AsyncMutex::new(None),
                gaps: Mutex::new(VecDeque::new()),
                state: Mutex::new(IngestState::Idle),
            }),
            task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.shared.config
    }

    /// The fetcher, for on-demand backfill outside the cursor.
    pub fn fetcher(&self) -> &LogFetcher {
        &self.shared.fetcher
    }

    pub fn resilience(&self) -> &Resilience {
        self.shared.fetcher.resilience()
    }

    pub fn state(&self) -> IngestState {
        *self.shared.state.lock().unwrap()
    }

    /// Current cursor, or `None` before it has been derived.
    ///
    /// Waits for an in-flight tick to finish.
    pub async fn cursor(&self) -> Option<u64> {
        self.shared.cursor.lock().await.map(|c| c.block_number)
    }

    /// Windows marked processed although some unit did not store, oldest first.
    pub fn gaps(&self) -> Vec<BlockWindow> {
        self.shared.gaps.lock().unwrap().iter().copied().collect()
    }

    /// Derive the cursor and start periodic ticks, the first one immediately.
    ///
    /// Calling `start` while already running logs a warning and returns.
    pub async fn start(&self) {
        {
            let mut state = self.shared.state.lock().unwrap();
            if matches!(*state, IngestState::Running | IngestState::Stopping) {
                warn!(state = %*state, "Ingestion scheduler is already running");
                return;
            }
            *state = IngestState::Running;
        }

        {
            let mut cursor = self.shared.cursor.lock().await;
            if cursor.is_none() {
                *cursor = Some(self.shared.recover_cursor().await);
            }
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let shared = Arc::clone(&self.shared);
        let interval = shared.config.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = shared.tick().await {
                            error!(error = %e, "Ingestion tick failed");
                        }
                    }
                }
            }
            debug!("Ingestion task exited");
        });

        *self.task.lock().unwrap() = Some(RunningTask { shutdown, handle });
        info!(
            interval_secs = interval.as_secs(),
            assets = self.shared.config.assets.len(),
            "Ingestion scheduler started"
        );
    }

    /// Cancel periodic ticks and wait for an in-flight tick to finish.
    /// Safe to call when not running.
    pub async fn stop(&self) {
        let running = self.task.lock().unwrap().take();
        let Some(running) = running else {
            debug!("Ingestion scheduler not running; nothing to stop");
            return;
        };

        *self.shared.state.lock().unwrap() = IngestState::Stopping;
        let _ = running.shutdown.send(true);
        if let Err(e) = running.handle.await {
            error!(error = %e, "Ingestion task ended abnormally");
        }
        *self.shared.state.lock().unwrap() = IngestState::Stopped;
        info!("Ingestion scheduler stopped");
    }

    /// Run one tick now. Queues behind an in-flight periodic tick.
    pub async fn run_now(&self) -> Result<TickOutcome, IndexerError> {
        info!("Running ingestion tick manually");
        let outcome = self.shared.tick().await;
        info!("Manual ingestion tick completed");
        outcome
    }
}

impl Shared {
    async fn recover_cursor(&self) -> Cursor {
        let genesis = self.config.genesis_block;
        match self.store.highest_block_number().await {
            Ok(highest) => {
                let cursor = Cursor::recover(highest, genesis);
                info!(cursor = cursor.block_number, "Initialized cursor");
                cursor
            }
            Err(e) => {
                let cursor = Cursor::recover(None, genesis);
                error!(
                    error = %e,
                    cursor = cursor.block_number,
                    "Failed to read highest stored block; starting from genesis"
                );
                cursor
            }
        }
    }

    async fn tick(&self) -> Result<TickOutcome, IndexerError> {
        let mut guard = self.cursor.lock().await;
        let mut cursor = match *guard {
            Some(c) => c,
            None => {
                let c = self.recover_cursor().await;
                *guard = Some(c);
                c
            }
        };

        let latest = self.client.block_number().await?;
        let Some(window) = cursor.next_window(latest, self.config.batch_size) else {
            debug!(cursor = cursor.block_number, latest, "No new blocks to fetch");
            return Ok(TickOutcome::NoNewBlocks {
                cursor: cursor.block_number,
                latest,
            });
        };

        info!(from = window.from, to = window.to, latest, "Fetching events");
        let report = self.fetcher.fetch_and_store(window.from, window.to).await;

        cursor.advance(window.to);
        *guard = Some(cursor);

        if report.is_complete() {
            info!(
                from = window.from,
                to = window.to,
                fetched = report.fetched(),
                inserted = report.inserted(),
                "Processed window"
            );
        } else {
            warn!(
                from = window.from,
                to = window.to,
                inserted = report.inserted(),
                failed = report.failed(),
                skipped = report.skipped(),
                "Window marked processed with missing units; backfill to recover"
            );
            self.record_gap(window);
        }

        Ok(TickOutcome::Processed {
            report,
            cursor: cursor.block_number,
        })
    }

    fn record_gap(&self, window: BlockWindow) {
        let mut gaps = self.gaps.lock().unwrap();
        if gaps.len() == MAX_RECORDED_GAPS {
            gaps.pop_front();
        }
        gaps.push_back(window);
    }
}
