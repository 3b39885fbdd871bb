//! Ingestion pipeline integration tests.
//!
//! A scripted in-process ledger stands in for the node; `InMemoryEventStore`
//! is the store. Timing-sensitive tests run on a paused Tokio clock so retry
//! backoff and breaker cooldown take no wall time.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vaultindex_core::config::{IngestConfig, IngestState};
use vaultindex_core::cursor::BlockWindow;
use vaultindex_core::error::IndexerError;
use vaultindex_core::policy::{CircuitBreakerConfig, Resilience, RetryConfig};
use vaultindex_core::store::EventStore;
use vaultindex_core::types::{
    AggregateQuery, DailyAggregate, EventKind, EventPage, EventQuery, NewVaultEvent, Page,
    TrackedAsset,
};
use vaultindex_evm::abi::topic0;
use vaultindex_evm::{
    IngestionScheduler, LedgerClient, LogFetcher, LogFilter, RawLog, TickOutcome, UnitResult,
};
use vaultindex_storage::InMemoryEventStore;

// ─── Helpers ──────────────────────────────────────────────────────────────────

const GENESIS: u64 = 5_000_000;

const ALICE: &str = "0x1111111111111111111111111111111111111111";
const BOB: &str = "0x2222222222222222222222222222222222222222";
const CAROL: &str = "0x3333333333333333333333333333333333333333";

fn eth() -> TrackedAsset {
    TrackedAsset::new("vbETH yVault", "yvvbETH", "0xE007CA01894c863d7898045ed5A3B4Abf0b18f37")
}

fn usdc() -> TrackedAsset {
    TrackedAsset::new("vbUSDC yVault", "yvvbUSDC", "0x80c34BD3A3569E126e7055831036aa7b212cB159")
}

fn address_topic(addr: &str) -> String {
    format!("0x{:0>64}", addr.trim_start_matches("0x"))
}

fn amounts(assets: u128, shares: u128) -> String {
    format!("0x{assets:064x}{shares:064x}")
}

fn deposit_log(asset: &TrackedAsset, block: u64, tx: u64, log_index: u64) -> RawLog {
    RawLog {
        address: asset.contract_address.to_lowercase(),
        topics: vec![topic0(EventKind::Deposit), address_topic(ALICE), address_topic(BOB)],
        data: amounts(100, 90),
        block_number: format!("0x{block:x}"),
        block_hash: None,
        tx_hash: format!("0x{tx:064x}"),
        log_index: format!("0x{log_index:x}"),
        removed: None,
    }
}

fn withdraw_log(asset: &TrackedAsset, block: u64, tx: u64, log_index: u64) -> RawLog {
    RawLog {
        address: asset.contract_address.to_lowercase(),
        topics: vec![
            topic0(EventKind::Withdraw),
            address_topic(ALICE),
            address_topic(CAROL),
            address_topic(BOB),
        ],
        data: amounts(50, 45),
        block_number: format!("0x{block:x}"),
        block_hash: None,
        tx_hash: format!("0x{tx:064x}"),
        log_index: format!("0x{log_index:x}"),
        removed: None,
    }
}

fn block_time(block: u64) -> i64 {
    1_750_000_000 + block as i64
}

/// Scripted ledger node. Logs are keyed by (lowercase address, topic0).
#[derive(Default)]
struct ScriptedLedger {
    head: AtomicU64,
    logs: Mutex<HashMap<(String, String), Vec<RawLog>>>,
    failing_units: Mutex<HashSet<(String, String)>>,
    missing_blocks: Mutex<HashSet<u64>>,
    fail_all: AtomicBool,
    log_delay_ms: AtomicU64,
    log_ranges: Mutex<Vec<(u64, u64)>>,
    head_calls: AtomicU32,
    log_calls: AtomicU32,
    timestamp_calls: AtomicU32,
}

impl ScriptedLedger {
    fn with_head(head: u64) -> Arc<Self> {
        let ledger = Self::default();
        ledger.head.store(head, Ordering::SeqCst);
        Arc::new(ledger)
    }

    fn key(asset: &TrackedAsset, kind: EventKind) -> (String, String) {
        (asset.contract_address.to_lowercase(), topic0(kind))
    }

    fn push(&self, asset: &TrackedAsset, kind: EventKind, log: RawLog) {
        self.logs
            .lock()
            .unwrap()
            .entry(Self::key(asset, kind))
            .or_default()
            .push(log);
    }

    fn fail_unit(&self, asset: &TrackedAsset, kind: EventKind) {
        self.failing_units
            .lock()
            .unwrap()
            .insert(Self::key(asset, kind));
    }

    fn log_calls(&self) -> u32 {
        self.log_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn block_number(&self) -> Result<u64, IndexerError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn block_timestamp(&self, number: u64) -> Result<Option<i64>, IndexerError> {
        self.timestamp_calls.fetch_add(1, Ordering::SeqCst);
        if self.missing_blocks.lock().unwrap().contains(&number) {
            return Ok(None);
        }
        Ok(Some(block_time(number)))
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, IndexerError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);
        self.log_ranges
            .lock()
            .unwrap()
            .push((filter.from_block, filter.to_block));
        let delay = self.log_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let key = (filter.address.to_lowercase(), filter.topic0.clone());
        if self.fail_all.load(Ordering::SeqCst) || self.failing_units.lock().unwrap().contains(&key)
        {
            return Err(IndexerError::Rpc("503 Service Unavailable".into()));
        }
        let logs = self.logs.lock().unwrap();
        Ok(logs
            .get(&key)
            .map(|all| {
                all.iter()
                    .filter(|l| {
                        let b = l.block_number_u64().unwrap();
                        b >= filter.from_block && b <= filter.to_block
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Store whose every call fails, for cursor-fallback tests.
struct UnreachableStore;

#[async_trait]
impl EventStore for UnreachableStore {
    async fn insert_if_absent(&self, _event: &NewVaultEvent) -> Result<bool, IndexerError> {
        Err(IndexerError::Storage("connection refused".into()))
    }
    async fn highest_block_number(&self) -> Result<Option<u64>, IndexerError> {
        Err(IndexerError::Storage("connection refused".into()))
    }
    async fn query_events(&self, _q: &EventQuery, _p: Page) -> Result<EventPage, IndexerError> {
        Err(IndexerError::Storage("connection refused".into()))
    }
    async fn daily_aggregates(
        &self,
        _q: &AggregateQuery,
    ) -> Result<Vec<DailyAggregate>, IndexerError> {
        Err(IndexerError::Storage("connection refused".into()))
    }
}

fn config(assets: Vec<TrackedAsset>) -> IngestConfig {
    IngestConfig {
        genesis_block: GENESIS,
        assets,
        ..Default::default()
    }
}

fn fetcher(
    ledger: &Arc<ScriptedLedger>,
    store: &Arc<InMemoryEventStore>,
    assets: Vec<TrackedAsset>,
) -> LogFetcher {
    LogFetcher::new(
        ledger.clone(),
        store.clone(),
        assets,
        Resilience::new(RetryConfig::default(), CircuitBreakerConfig::default()),
    )
}

fn seeded_event(block: u64) -> NewVaultEvent {
    NewVaultEvent {
        asset: "yvvbETH".into(),
        event_type: EventKind::Deposit,
        tx_hash: format!("0x{block:064x}"),
        log_index: 0,
        block_number: block,
        event_timestamp: chrono::DateTime::from_timestamp(block_time(block), 0).unwrap(),
        sender: None,
        receiver: None,
        owner: None,
        assets: "1".into(),
        shares: "1".into(),
    }
}

// ─── Fetcher ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deposit_and_withdraw_field_mapping() {
    let ledger = ScriptedLedger::with_head(GENESIS + 10);
    let asset = eth();
    ledger.push(&asset, EventKind::Deposit, deposit_log(&asset, GENESIS + 1, 1, 0));
    ledger.push(&asset, EventKind::Withdraw, withdraw_log(&asset, GENESIS + 2, 2, 3));
    let store = Arc::new(InMemoryEventStore::new());

    let report = fetcher(&ledger, &store, vec![asset])
        .fetch_and_store(GENESIS, GENESIS + 10)
        .await;
    assert!(report.is_complete());
    assert_eq!(report.inserted(), 2);

    let events = store.events();
    let deposit = events
        .iter()
        .find(|e| e.event_type == EventKind::Deposit)
        .unwrap();
    assert_eq!(deposit.asset, "yvvbETH");
    assert_eq!(deposit.sender.as_deref(), Some(ALICE));
    assert_eq!(deposit.owner.as_deref(), Some(BOB));
    assert_eq!(deposit.receiver, None);
    assert_eq!(deposit.assets, "100");
    assert_eq!(deposit.shares, "90");
    assert_eq!(deposit.block_number, GENESIS + 1);
    assert_eq!(deposit.event_timestamp.timestamp(), block_time(GENESIS + 1));

    let withdraw = events
        .iter()
        .find(|e| e.event_type == EventKind::Withdraw)
        .unwrap();
    assert_eq!(withdraw.sender.as_deref(), Some(ALICE));
    assert_eq!(withdraw.receiver.as_deref(), Some(CAROL));
    assert_eq!(withdraw.owner.as_deref(), Some(BOB));
    assert_eq!(withdraw.log_index, 3);
}

#[tokio::test]
async fn refetching_a_window_is_idempotent() {
    let ledger = ScriptedLedger::with_head(GENESIS + 10);
    let asset = usdc();
    ledger.push(&asset, EventKind::Deposit, deposit_log(&asset, GENESIS + 1, 1, 0));
    ledger.push(&asset, EventKind::Deposit, deposit_log(&asset, GENESIS + 1, 1, 1));
    let store = Arc::new(InMemoryEventStore::new());
    let f = fetcher(&ledger, &store, vec![asset]);

    let first = f.fetch_and_store(GENESIS, GENESIS + 10).await;
    let second = f.fetch_and_store(GENESIS, GENESIS + 10).await;

    assert_eq!(first.inserted(), 2);
    assert_eq!(second.fetched(), 2);
    assert_eq!(second.inserted(), 0);
    assert!(second.is_complete());
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn empty_units_are_not_errors() {
    let ledger = ScriptedLedger::with_head(GENESIS + 10);
    let store = Arc::new(InMemoryEventStore::new());

    let report = fetcher(&ledger, &store, vec![eth(), usdc()])
        .fetch_and_store(GENESIS, GENESIS + 10)
        .await;

    assert_eq!(report.units.len(), 4);
    assert!(report.is_complete());
    assert_eq!(ledger.log_calls(), 4);
    assert!(store.is_empty());
}

#[tokio::test]
async fn removed_logs_are_ignored() {
    let ledger = ScriptedLedger::with_head(GENESIS + 10);
    let asset = eth();
    let mut removed = deposit_log(&asset, GENESIS + 1, 1, 0);
    removed.removed = Some(true);
    ledger.push(&asset, EventKind::Deposit, removed);
    let store = Arc::new(InMemoryEventStore::new());

    let report = fetcher(&ledger, &store, vec![asset])
        .fetch_and_store(GENESIS, GENESIS + 10)
        .await;
    assert!(report.is_complete());
    assert!(store.is_empty());
    assert_eq!(ledger.timestamp_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_block_fails_the_unit() {
    let ledger = ScriptedLedger::with_head(GENESIS + 10);
    let asset = eth();
    ledger.push(&asset, EventKind::Deposit, deposit_log(&asset, GENESIS + 4, 1, 0));
    ledger.missing_blocks.lock().unwrap().insert(GENESIS + 4);
    let store = Arc::new(InMemoryEventStore::new());

    let report = fetcher(&ledger, &store, vec![asset])
        .fetch_and_store(GENESIS, GENESIS + 10)
        .await;

    match &report.units[0].result {
        UnitResult::Failed { attempts, error } => {
            assert_eq!(*attempts, 3);
            assert!(error.contains(&(GENESIS + 4).to_string()));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(report.units[1].result, UnitResult::Stored { .. }));
}

#[tokio::test(start_paused = true)]
async fn breaker_trip_mid_call_still_attempts_every_unit_then_skips_next_call() {
    let ledger = ScriptedLedger::with_head(GENESIS + 10);
    ledger.fail_all.store(true, Ordering::SeqCst);
    let store = Arc::new(InMemoryEventStore::new());
    let f = fetcher(&ledger, &store, vec![eth(), usdc()]);

    // 3 attempts on the first unit; the 5th failure overall trips the breaker
    // during the second unit. The remaining units still get one attempt each.
    let report = f.fetch_and_store(GENESIS, GENESIS + 10).await;
    assert_eq!(ledger.log_calls(), 7);
    assert_eq!(report.failed(), 4);
    assert_eq!(report.skipped(), 0);
    let attempts: Vec<u32> = report
        .units
        .iter()
        .map(|u| match u.result {
            UnitResult::Failed { attempts, .. } => attempts,
            _ => 0,
        })
        .collect();
    assert_eq!(attempts, vec![3, 2, 1, 1]);
    assert!(f.resilience().is_open());

    // A call that starts while open performs zero node requests.
    let report = f.fetch_and_store(GENESIS, GENESIS + 10).await;
    assert_eq!(report.skipped(), 4);
    assert_eq!(ledger.log_calls(), 7);

    // After the cooldown the next call proceeds and a success resets the count.
    tokio::time::advance(Duration::from_secs(60)).await;
    ledger.fail_all.store(false, Ordering::SeqCst);
    let report = f.fetch_and_store(GENESIS, GENESIS + 10).await;
    assert!(report.is_complete());
    assert_eq!(ledger.log_calls(), 11);
    assert_eq!(f.resilience().breaker().failure_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn breaker_trip_does_not_drop_healthy_assets() {
    let (a, b) = (eth(), usdc());
    let ledger = ScriptedLedger::with_head(GENESIS + 10);
    ledger.fail_unit(&a, EventKind::Deposit);
    ledger.fail_unit(&a, EventKind::Withdraw);
    ledger.push(&b, EventKind::Deposit, deposit_log(&b, GENESIS + 3, 9, 0));
    let store = Arc::new(InMemoryEventStore::new());
    let f = fetcher(&ledger, &store, vec![a, b]);

    let report = f.fetch_and_store(GENESIS, GENESIS + 10).await;

    let results: Vec<&UnitResult> = report.units.iter().map(|u| &u.result).collect();
    assert!(matches!(results[0], UnitResult::Failed { attempts: 3, .. }));
    assert!(matches!(results[1], UnitResult::Failed { attempts: 2, .. }));
    assert_eq!(
        results[2],
        &UnitResult::Stored {
            fetched: 1,
            inserted: 1
        }
    );
    assert_eq!(
        results[3],
        &UnitResult::Stored {
            fetched: 0,
            inserted: 0
        }
    );
    assert_eq!(store.len(), 1);
    assert_eq!(store.events()[0].asset, "yvvbUSDC");
    // The healthy unit's success closed the breaker again.
    assert!(!f.resilience().is_open());
}

// ─── Scheduler ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn cursor_recovers_from_highest_stored_block() {
    let store = Arc::new(InMemoryEventStore::new());
    store.insert_if_absent(&seeded_event(GENESIS + 41)).await.unwrap();
    store.insert_if_absent(&seeded_event(GENESIS + 42)).await.unwrap();
    let ledger = ScriptedLedger::with_head(GENESIS + 42);

    let scheduler = IngestionScheduler::new(config(vec![eth()]), ledger.clone(), store).unwrap();
    let outcome = scheduler.run_now().await.unwrap();

    assert_eq!(
        outcome,
        TickOutcome::NoNewBlocks {
            cursor: GENESIS + 42,
            latest: GENESIS + 42
        }
    );
    assert_eq!(scheduler.cursor().await, Some(GENESIS + 42));
}

#[tokio::test]
async fn empty_store_starts_before_genesis() {
    let store = Arc::new(InMemoryEventStore::new());
    let ledger = ScriptedLedger::with_head(GENESIS - 1);

    let scheduler = IngestionScheduler::new(config(vec![eth()]), ledger.clone(), store).unwrap();
    assert_eq!(scheduler.cursor().await, None);
    scheduler.run_now().await.unwrap();
    assert_eq!(scheduler.cursor().await, Some(GENESIS - 1));
}

#[tokio::test]
async fn unreachable_store_falls_back_to_genesis() {
    let ledger = ScriptedLedger::with_head(GENESIS - 1);
    let scheduler =
        IngestionScheduler::new(config(vec![eth()]), ledger, Arc::new(UnreachableStore)).unwrap();

    scheduler.run_now().await.unwrap();
    assert_eq!(scheduler.cursor().await, Some(GENESIS - 1));
}

#[tokio::test]
async fn no_new_blocks_makes_no_log_queries() {
    let store = Arc::new(InMemoryEventStore::new());
    store.insert_if_absent(&seeded_event(GENESIS + 100)).await.unwrap();
    let ledger = ScriptedLedger::with_head(GENESIS + 100);

    let scheduler =
        IngestionScheduler::new(config(vec![eth(), usdc()]), ledger.clone(), store).unwrap();
    let outcome = scheduler.run_now().await.unwrap();

    assert!(matches!(outcome, TickOutcome::NoNewBlocks { .. }));
    assert_eq!(ledger.log_calls(), 0);
    assert_eq!(scheduler.cursor().await, Some(GENESIS + 100));
}

#[tokio::test]
async fn window_is_capped_at_batch_size() {
    let store = Arc::new(InMemoryEventStore::new());
    let ledger = ScriptedLedger::with_head(GENESIS + 5_000);

    let scheduler = IngestionScheduler::new(config(vec![eth()]), ledger, store).unwrap();
    match scheduler.run_now().await.unwrap() {
        TickOutcome::Processed { report, cursor } => {
            assert_eq!(report.window, BlockWindow::new(GENESIS, GENESIS + 999));
            assert_eq!(cursor, GENESIS + 999);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    // The next tick continues from the cursor.
    match scheduler.run_now().await.unwrap() {
        TickOutcome::Processed { report, .. } => {
            assert_eq!(report.window, BlockWindow::new(GENESIS + 1_000, GENESIS + 1_999));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn partial_failure_still_advances_cursor() {
    let (a, b) = (eth(), usdc());
    let ledger = ScriptedLedger::with_head(GENESIS + 500);
    ledger.push(&a, EventKind::Deposit, deposit_log(&a, GENESIS + 10, 1, 0));
    ledger.push(&a, EventKind::Withdraw, withdraw_log(&a, GENESIS + 11, 2, 0));
    ledger.push(&b, EventKind::Deposit, deposit_log(&b, GENESIS + 12, 3, 0));
    ledger.push(&b, EventKind::Withdraw, withdraw_log(&b, GENESIS + 13, 4, 0));
    ledger.fail_unit(&b, EventKind::Withdraw);
    let store = Arc::new(InMemoryEventStore::new());

    let scheduler =
        IngestionScheduler::new(config(vec![a, b]), ledger.clone(), store.clone()).unwrap();
    let outcome = scheduler.run_now().await.unwrap();

    let TickOutcome::Processed { report, cursor } = outcome else {
        panic!("expected a processed window");
    };
    assert_eq!(cursor, GENESIS + 500);
    assert_eq!(report.failed(), 1);
    assert_eq!(store.len(), 3);
    assert!(store.events().iter().all(|e| e.tx_hash != format!("0x{:064x}", 4)));
    assert_eq!(scheduler.gaps(), vec![BlockWindow::new(GENESIS, GENESIS + 500)]);
    assert!(!scheduler.resilience().is_open());
}

#[tokio::test(start_paused = true)]
async fn open_breaker_still_advances_cursor_without_log_queries() {
    let ledger = ScriptedLedger::with_head(GENESIS + 10);
    ledger.fail_all.store(true, Ordering::SeqCst);
    let store = Arc::new(InMemoryEventStore::new());
    let scheduler =
        IngestionScheduler::new(config(vec![eth(), usdc()]), ledger.clone(), store).unwrap();

    scheduler.run_now().await.unwrap();
    assert!(scheduler.resilience().is_open());
    let calls = ledger.log_calls();

    ledger.head.store(GENESIS + 20, Ordering::SeqCst);
    let outcome = scheduler.run_now().await.unwrap();
    let TickOutcome::Processed { report, cursor } = outcome else {
        panic!("expected a processed window");
    };
    assert_eq!(report.skipped(), 4);
    assert_eq!(cursor, GENESIS + 20);
    assert_eq!(ledger.log_calls(), calls);
    assert_eq!(scheduler.gaps().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn start_ticks_immediately_then_on_interval() {
    let asset = eth();
    let ledger = ScriptedLedger::with_head(GENESIS + 10);
    ledger.push(&asset, EventKind::Deposit, deposit_log(&asset, GENESIS + 5, 1, 0));
    let store = Arc::new(InMemoryEventStore::new());
    let scheduler =
        IngestionScheduler::new(config(vec![asset]), ledger.clone(), store.clone()).unwrap();

    scheduler.start().await;
    assert_eq!(scheduler.state(), IngestState::Running);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(ledger.head_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.len(), 1);
    assert_eq!(scheduler.cursor().await, Some(GENESIS + 10));

    // A second start while running is a no-op.
    scheduler.start().await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(ledger.head_calls.load(Ordering::SeqCst), 2);

    scheduler.stop().await;
    assert_eq!(scheduler.state(), IngestState::Stopped);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(ledger.head_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn run_now_queues_behind_an_in_flight_tick() {
    let ledger = ScriptedLedger::with_head(GENESIS + 1_500);
    ledger.log_delay_ms.store(5_000, Ordering::SeqCst);
    let store = Arc::new(InMemoryEventStore::new());
    let scheduler = IngestionScheduler::new(config(vec![eth()]), ledger.clone(), store).unwrap();

    scheduler.start().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    // The first periodic tick is blocked inside its first log query.
    assert_eq!(ledger.log_calls(), 1);

    let manual = scheduler.run_now().await.unwrap();
    let TickOutcome::Processed { report, cursor } = manual else {
        panic!("expected a processed window");
    };
    assert_eq!(report.window, BlockWindow::new(GENESIS + 1_000, GENESIS + 1_500));
    assert_eq!(cursor, GENESIS + 1_500);
    assert_eq!(scheduler.cursor().await, Some(GENESIS + 1_500));

    // Both units of the periodic tick ran before any unit of the manual one.
    assert_eq!(
        *ledger.log_ranges.lock().unwrap(),
        vec![
            (GENESIS, GENESIS + 999),
            (GENESIS, GENESIS + 999),
            (GENESIS + 1_000, GENESIS + 1_500),
            (GENESIS + 1_000, GENESIS + 1_500),
        ]
    );
    assert_eq!(ledger.head_calls.load(Ordering::SeqCst), 2);

    scheduler.stop().await;
}

#[tokio::test]
async fn stop_is_idempotent_when_not_running() {
    let ledger = ScriptedLedger::with_head(GENESIS);
    let store = Arc::new(InMemoryEventStore::new());
    let scheduler = IngestionScheduler::new(config(vec![eth()]), ledger, store).unwrap();

    scheduler.stop().await;
    scheduler.stop().await;
    assert_eq!(scheduler.state(), IngestState::Idle);
}

#[test]
fn rejects_config_without_assets() {
    let ledger = ScriptedLedger::with_head(GENESIS);
    let store = Arc::new(InMemoryEventStore::new());
    assert!(matches!(
        IngestionScheduler::new(config(vec![]), ledger, store),
        Err(IndexerError::Config(_))
    ));
}
