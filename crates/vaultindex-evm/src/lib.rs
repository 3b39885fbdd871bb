//! vaultindex-evm: ledger-node adapter, ERC-4626 log decoding, log fetcher
//! and ingestion scheduler.

pub mod abi;
pub mod builder;
pub mod fetcher;
pub mod log;
pub mod rpc;
pub mod scheduler;

pub use builder::IngestConfigBuilder;
pub use fetcher::{FetchReport, LogFetcher, UnitReport, UnitResult};
pub use log::RawLog;
pub use rpc::{HttpLedgerClient, LedgerClient, LogFilter};
pub use scheduler::{IngestionScheduler, TickOutcome};
