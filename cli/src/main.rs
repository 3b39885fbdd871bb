//! VaultIndex CLI: ingest ERC-4626 vault events from a Katana node.
//!
//! # Commands
//! ```text
//! vaultindex run      --config vaultindex.toml
//! vaultindex backfill --config vaultindex.toml --from 5000000 --to 5010000
//! vaultindex status   --config vaultindex.toml
//! vaultindex events   --config vaultindex.toml --asset yvvbETH --kind deposit --page 2
//! vaultindex info
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use vaultindex_core::config::IngestConfig;
use vaultindex_core::cursor::{BlockWindow, Cursor};
use vaultindex_core::store::EventStore;
use vaultindex_core::types::{EventKind, EventQuery, Page};
use vaultindex_evm::{
    abi, FetchReport, HttpLedgerClient, IngestionScheduler, LedgerClient, UnitResult,
};
use vaultindex_storage::{PostgresEventStore, SqliteEventStore};

mod config;
mod logging;

use config::Config;

#[derive(Parser)]
#[command(
    name = "vaultindex",
    about = "ERC-4626 vault event indexer for Katana",
    long_about = "
VaultIndex: polls a Katana JSON-RPC node for Deposit/Withdraw events of the
tracked yVaults and stores them in Postgres or SQLite.

ENVIRONMENT VARIABLES:
  VAULTINDEX_RPC_URL     Ledger node JSON-RPC endpoint (overrides [network].rpc_url)
  DATABASE_URL           postgres://... or sqlite:... (overrides [database].url)
  VAULTINDEX_LOG_LEVEL   Global log level (overrides [logging].level)
  RUST_LOG               Full tracing filter; wins over the configured levels
",
    version
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run periodic ingestion until Ctrl-C
    Run,

    /// Fetch and store an explicit block range, outside the cursor
    Backfill {
        /// First block (inclusive)
        #[arg(long)]
        from: u64,
        /// Last block (inclusive)
        #[arg(long)]
        to: u64,
    },

    /// Show node head, stored height and lag
    Status,

    /// List stored events, newest first
    Events {
        /// Asset symbol, e.g. yvvbETH
        #[arg(long)]
        asset: Option<String>,
        /// deposit or withdraw
        #[arg(long)]
        kind: Option<EventKind>,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u64,
        /// Rows per page
        #[arg(long, default_value_t = Page::DEFAULT_LIMIT)]
        limit: u32,
    },

    /// Show defaults and tracked assets
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Commands::Info = cli.command {
        cmd_info(cli.config.as_deref());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    logging::init_tracing(&config.logging);

    let store = open_store(&config).await?;
    let client: Arc<dyn LedgerClient> = Arc::new(
        HttpLedgerClient::new(&config.network.rpc_url, config.request_timeout())
            .context("Failed to create ledger client")?,
    );

    let result = match cli.command {
        Commands::Run => cmd_run(&config, client, Arc::clone(&store)).await,
        Commands::Backfill { from, to } => {
            cmd_backfill(&config, client, Arc::clone(&store), from, to).await
        }
        Commands::Status => cmd_status(&config, client, Arc::clone(&store)).await,
        Commands::Events {
            asset,
            kind,
            page,
            limit,
        } => cmd_events(store.as_ref(), asset, kind, page, limit).await,
        Commands::Info => unreachable!("handled before startup"),
    };

    store.close().await;
    result
}

async fn open_store(config: &Config) -> Result<Arc<dyn EventStore>> {
    let url = &config.database.url;
    if config.database.is_postgres() {
        let store =
            PostgresEventStore::connect_with_options(url, config.database.postgres_options())
                .await
                .context("Failed to connect to Postgres")?;
        Ok(Arc::new(store))
    } else {
        let store = SqliteEventStore::open(url)
            .await
            .with_context(|| format!("Failed to open SQLite database {url}"))?;
        Ok(Arc::new(store))
    }
}

// ─── run ──────────────────────────────────────────────────────────────────────

async fn cmd_run(
    config: &Config,
    client: Arc<dyn LedgerClient>,
    store: Arc<dyn EventStore>,
) -> Result<()> {
    let scheduler = IngestionScheduler::new(config.ingest_config(), client, store)
        .context("Invalid ingestion configuration")?;

    info!(
        chain_id = config.network.chain_id,
        assets = config.assets.len(),
        "Starting vault event ingestion"
    );
    scheduler.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown signal received");
    scheduler.stop().await;

    let gaps = scheduler.gaps();
    if !gaps.is_empty() {
        let ranges: Vec<String> = gaps.iter().map(ToString::to_string).collect();
        warn!(
            count = gaps.len(),
            windows = %ranges.join(", "),
            "Some windows were marked processed with missing units; run `vaultindex backfill` over them"
        );
    }
    if let Some(cursor) = scheduler.cursor().await {
        info!(cursor, "Ingestion stopped");
    }
    Ok(())
}

// ─── backfill ─────────────────────────────────────────────────────────────────

async fn cmd_backfill(
    config: &Config,
    client: Arc<dyn LedgerClient>,
    store: Arc<dyn EventStore>,
    from: u64,
    to: u64,
) -> Result<()> {
    if from > to {
        bail!("--from ({from}) must not exceed --to ({to})");
    }

    let ingest = config.ingest_config();
    let scheduler = IngestionScheduler::new(ingest.clone(), client, store)
        .context("Invalid ingestion configuration")?;

    let windows = BlockWindow::split(from, to, ingest.batch_size);
    println!(
        "Backfilling blocks {from}..={to} in {} window(s) of up to {} blocks",
        windows.len(),
        ingest.batch_size
    );

    let mut incomplete = Vec::new();
    for window in windows {
        let report = scheduler
            .fetcher()
            .fetch_and_store(window.from, window.to)
            .await;
        print_report(&report);
        if !report.is_complete() {
            incomplete.push(window);
        }
    }

    if !incomplete.is_empty() {
        let ranges: Vec<String> = incomplete.iter().map(ToString::to_string).collect();
        bail!("{} window(s) incomplete: {}", incomplete.len(), ranges.join(", "));
    }
    println!("Backfill complete");
    Ok(())
}

fn print_report(report: &FetchReport) {
    println!(
        "  {} fetched {} inserted {}",
        report.window,
        report.fetched(),
        report.inserted()
    );
    for unit in &report.units {
        match &unit.result {
            UnitResult::Stored { .. } => {}
            UnitResult::Failed { attempts, error } => println!(
                "    ✗ {} {}: failed after {attempts} attempt(s): {error}",
                unit.asset, unit.kind
            ),
            UnitResult::Skipped => {
                println!("    - {} {}: skipped (circuit open)", unit.asset, unit.kind)
            }
        }
    }
}

// ─── status ───────────────────────────────────────────────────────────────────

async fn cmd_status(
    config: &Config,
    client: Arc<dyn LedgerClient>,
    store: Arc<dyn EventStore>,
) -> Result<()> {
    let head = client
        .block_number()
        .await
        .context("Failed to read node block height")?;
    let highest = store
        .highest_block_number()
        .await
        .context("Failed to read highest stored block")?;
    let cursor = Cursor::recover(highest, config.ingest.genesis_block);

    println!("VaultIndex status");
    println!("  RPC endpoint:        {}", config.network.rpc_url);
    println!("  Chain ID:            {}", config.network.chain_id);
    println!("  Node head:           {head}");
    match highest {
        Some(block) => println!("  Highest stored:      {block}"),
        None => println!("  Highest stored:      (empty)"),
    }
    println!("  Cursor on restart:   {}", cursor.block_number);
    println!(
        "  Blocks behind:       {}",
        head.saturating_sub(cursor.block_number)
    );
    Ok(())
}

// ─── events ───────────────────────────────────────────────────────────────────

async fn cmd_events(
    store: &dyn EventStore,
    asset: Option<String>,
    kind: Option<EventKind>,
    page: u64,
    limit: u32,
) -> Result<()> {
    if limit == 0 {
        bail!("--limit must be > 0");
    }
    let query = EventQuery {
        asset,
        event_type: kind,
        ..EventQuery::default()
    };
    let result = store
        .query_events(&query, Page::number(page, limit))
        .await
        .context("Failed to query events")?;

    println!(
        "Page {} ({} of {} matching event(s))",
        page.max(1),
        result.events.len(),
        result.total
    );
    for event in &result.events {
        println!(
            "  {} {:<8} {:<8} block {} tx {}:{} assets {} shares {}",
            event.event_timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.asset,
            event.event_type,
            event.block_number,
            event.tx_hash,
            event.log_index,
            event.assets,
            event.shares
        );
    }
    Ok(())
}

// ─── info ─────────────────────────────────────────────────────────────────────

fn cmd_info(path: Option<&Path>) {
    let defaults = IngestConfig::default();
    println!("VaultIndex v{}", env!("CARGO_PKG_VERSION"));
    println!("  Default chain ID: {}", config::DEFAULT_CHAIN_ID);
    println!("  Default genesis block: {}", defaults.genesis_block);
    println!("  Default batch size: {} blocks/window", defaults.batch_size);
    println!(
        "  Default poll interval: {}s",
        defaults.poll_interval.as_secs()
    );
    println!(
        "  Retry: {} attempts, linear backoff {}ms x attempt",
        defaults.max_attempts,
        defaults.retry_base_delay.as_millis()
    );
    println!(
        "  Circuit breaker: opens after {} failures for {}s",
        defaults.circuit_breaker_threshold,
        defaults.circuit_breaker_timeout.as_secs()
    );
    println!("  Storage backends: Postgres, SQLite, in-memory (library only)");
    for kind in EventKind::ALL {
        println!("  {} topic0: {}", abi::signature(kind), abi::topic0(kind));
    }

    let assets = match path.map(|p| Config::load(Some(p))) {
        Some(Ok(cfg)) => cfg.assets,
        Some(Err(e)) => {
            println!("  (config not loaded: {e:#})");
            config::default_assets()
        }
        None => config::default_assets(),
    };
    println!("  Tracked assets:");
    for asset in assets {
        println!(
            "    {:<10} {}  {}",
            asset.symbol, asset.contract_address, asset.name
        );
    }
}
