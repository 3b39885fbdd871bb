//! Process configuration: TOML file, `${VAR}` expansion, environment overrides.
//!
//! ```toml
//! [network]
//! rpc_url  = "${KATANA_RPC_URL}"
//! chain_id = 747474
//!
//! [database]
//! url = "postgresql://localhost/vaultindex"
//!
//! [ingest]
//! genesis_block = 5000000
//! batch_size    = 1000
//!
//! [[assets]]
//! name             = "vbETH yVault"
//! symbol           = "yvvbETH"
//! contract_address = "0xE007CA01894c863d7898045ed5A3B4Abf0b18f37"
//!
//! [logging]
//! level = "info"
//! json  = false
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use vaultindex_core::config::IngestConfig;
use vaultindex_core::types::TrackedAsset;
use vaultindex_evm::abi::checksum_address;
use vaultindex_storage::PostgresOptions;

use crate::logging::LogConfig;

pub const ENV_RPC_URL: &str = "VAULTINDEX_RPC_URL";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_LOG_LEVEL: &str = "VAULTINDEX_LOG_LEVEL";

/// Katana mainnet.
pub const DEFAULT_CHAIN_ID: u64 = 747_474;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingest: IngestSection,
    #[serde(default = "default_assets")]
    pub assets: Vec<TrackedAsset>,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://…`, `postgresql://…` or `sqlite:…`
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSection {
    #[serde(default = "default_genesis_block")]
    pub genesis_block: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    #[serde(default = "default_circuit_breaker_timeout_secs")]
    pub circuit_breaker_timeout_secs: u64,
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_database_url() -> String {
    "sqlite:./vaultindex.db?mode=rwc".into()
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    1
}
fn default_acquire_timeout_ms() -> u64 {
    2_000
}
fn default_idle_timeout_ms() -> u64 {
    30_000
}
fn default_genesis_block() -> u64 {
    5_000_000
}
fn default_batch_size() -> u64 {
    1000
}
fn default_poll_interval_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    1000
}
fn default_circuit_breaker_threshold() -> u32 {
    5
}
fn default_circuit_breaker_timeout_secs() -> u64 {
    60
}

/// The four Katana yVaults tracked when no `[[assets]]` are configured.
pub fn default_assets() -> Vec<TrackedAsset> {
    vec![
        TrackedAsset::new("vbETH yVault", "yvvbETH", "0xE007CA01894c863d7898045ed5A3B4Abf0b18f37"),
        TrackedAsset::new("vbUSDC yVault", "yvvbUSDC", "0x80c34BD3A3569E126e7055831036aa7b212cB159"),
        TrackedAsset::new("vbUSDT yVault", "yvvbUSDT", "0x9A6bd7B6Fd5C4F87eb66356441502fc7dCdd185B"),
        TrackedAsset::new("vbWBTC yVault", "yvvbWBTC", "0xAa0362eCC584B985056E47812931270b99C91f9d"),
    ]
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            chain_id: default_chain_id(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            genesis_block: default_genesis_block(),
            batch_size: default_batch_size(),
            poll_interval_secs: default_poll_interval_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            circuit_breaker_timeout_secs: default_circuit_breaker_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    pub fn is_postgres(&self) -> bool {
        self.url.starts_with("postgres://") || self.url.starts_with("postgresql://")
    }

    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    pub fn postgres_options(&self) -> PostgresOptions {
        PostgresOptions {
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
        }
    }
}

impl Config {
    /// Load from `path` (or defaults when `None`), apply environment
    /// overrides, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                let expanded = expand_env_vars(&contents)?;
                toml::from_str(&expanded)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => Config::default_with_assets(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string without env overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn default_with_assets() -> Self {
        Self {
            assets: default_assets(),
            ..Default::default()
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_RPC_URL) {
            self.network.rpc_url = url;
        }
        if let Ok(url) = std::env::var(ENV_DATABASE_URL) {
            self.database.url = url;
        }
        if let Ok(level) = std::env::var(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url.is_empty() {
            bail!("Network RPC URL cannot be empty (set [network].rpc_url or {ENV_RPC_URL})");
        }
        let rpc = reqwest::Url::parse(&self.network.rpc_url)
            .with_context(|| format!("Invalid RPC URL: {}", self.network.rpc_url))?;
        if !matches!(rpc.scheme(), "http" | "https") {
            bail!("RPC URL must use http or https, got '{}'", rpc.scheme());
        }
        if self.network.chain_id == 0 {
            bail!("Chain ID must be non-zero");
        }

        if !self.database.is_postgres() && !self.database.is_sqlite() {
            bail!("Database URL must start with postgres://, postgresql:// or sqlite:");
        }

        let mut symbols = HashSet::new();
        for asset in &self.assets {
            checksum_address(&asset.contract_address).with_context(|| {
                format!(
                    "Asset {} has an invalid contract address: {}",
                    asset.symbol, asset.contract_address
                )
            })?;
            if !symbols.insert(asset.symbol.as_str()) {
                bail!("Duplicate asset symbol: {}", asset.symbol);
            }
        }

        self.ingest_config()
            .validate()
            .context("Invalid [ingest] configuration")?;
        Ok(())
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            genesis_block: self.ingest.genesis_block,
            batch_size: self.ingest.batch_size,
            poll_interval: Duration::from_secs(self.ingest.poll_interval_secs),
            max_attempts: self.ingest.max_retries,
            retry_base_delay: Duration::from_millis(self.ingest.retry_base_delay_ms),
            circuit_breaker_threshold: self.ingest.circuit_breaker_threshold,
            circuit_breaker_timeout: Duration::from_secs(self.ingest.circuit_breaker_timeout_secs),
            assets: self.assets.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.request_timeout_secs)
    }
}

/// Expand `${VAR_NAME}` placeholders from the environment. Text after a `#`
/// outside a quoted string is a TOML comment and left untouched.
pub fn expand_env_vars(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    for (i, line) in input.split_inclusive('\n').enumerate() {
        let split = comment_start(line).unwrap_or(line.len());
        let (code, comment) = line.split_at(split);
        out.push_str(&expand_line(code, i + 1)?);
        out.push_str(comment);
    }
    Ok(out)
}

fn comment_start(line: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in line.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if ch == '\\' => escaped = true,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '#' => return Some(i),
            None => {}
        }
    }
    None
}

fn expand_line(code: &str, line_no: usize) -> Result<String> {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            bail!("Unclosed environment variable placeholder on line {line_no}");
        };
        let name = &after[..end];
        if name.is_empty() {
            bail!("Empty environment variable name on line {line_no}");
        }
        let value = std::env::var(name)
            .with_context(|| format!("Environment variable {name} is not set (line {line_no})"))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
