//! Ledger-node access over JSON-RPC 2.0.
//!
//! [`LedgerClient`] is the seam the fetcher and scheduler depend on; tests
//! substitute scripted fakes. [`HttpLedgerClient`] is the production
//! implementation. It performs exactly one HTTP request per call and never
//! retries: retry and circuit breaking belong to the caller's `Resilience`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use vaultindex_core::error::IndexerError;

use crate::log::{parse_hex_u64, to_hex_quantity, RawLog};

// ─── Wire types ────────────────────────────────────────────────────────────────

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Unwrap the result value or return the error object.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ─── LedgerClient ──────────────────────────────────────────────────────────────

/// `eth_getLogs` filter for one contract and one event signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: String,
    pub topic0: String,
    pub from_block: u64,
    pub to_block: u64,
}

impl LogFilter {
    fn to_params(&self) -> Value {
        json!({
            "address": self.address,
            "topics": [self.topic0],
            "fromBlock": to_hex_quantity(self.from_block),
            "toBlock": to_hex_quantity(self.to_block),
        })
    }
}

/// Read-only view of the ledger node.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current block height.
    async fn block_number(&self) -> Result<u64, IndexerError>;

    /// Unix timestamp of block `number`, or `None` if the node doesn't have it.
    async fn block_timestamp(&self, number: u64) -> Result<Option<i64>, IndexerError>;

    /// All logs matching `filter` in its inclusive block range.
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, IndexerError>;
}

// ─── HttpLedgerClient ──────────────────────────────────────────────────────────

/// JSON-RPC client over HTTP POST, backed by `reqwest`.
pub struct HttpLedgerClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpLedgerClient {
    /// Create a client for `url`. Fails with [`IndexerError::Config`] unless
    /// the URL is a well-formed `http` or `https` URL.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, IndexerError> {
        let url = url.into();
        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| IndexerError::Config(format!("invalid RPC URL '{url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(IndexerError::Config(format!(
                "RPC URL must be http(s), got '{}'",
                parsed.scheme()
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url,
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, IndexerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(id, method, params);

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| IndexerError::Rpc(format!("{method}: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(IndexerError::Rpc(format!("{method}: HTTP {status}: {body}")));
        }

        let body: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| IndexerError::Rpc(format!("{method}: invalid response: {e}")))?;
        let result = body
            .into_result()
            .map_err(|e| IndexerError::Rpc(format!("{method}: {e}")))?;

        serde_json::from_value(result)
            .map_err(|e| IndexerError::Decode(format!("{method}: unexpected result shape: {e}")))
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn block_number(&self) -> Result<u64, IndexerError> {
        let hex: String = self.call("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&hex)
    }

    async fn block_timestamp(&self, number: u64) -> Result<Option<i64>, IndexerError> {
        let block: Option<Value> = self
            .call(
                "eth_getBlockByNumber",
                vec![json!(to_hex_quantity(number)), json!(false)],
            )
            .await?;
        block.map(|b| block_timestamp_of(&b, number)).transpose()
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, IndexerError> {
        self.call("eth_getLogs", vec![filter.to_params()]).await
    }
}

/// Unix timestamp of an `eth_getBlockByNumber` result.
fn block_timestamp_of(block: &Value, number: u64) -> Result<i64, IndexerError> {
    let ts = block["timestamp"]
        .as_str()
        .ok_or_else(|| IndexerError::Decode(format!("block {number} has no timestamp")))?;
    let secs = parse_hex_u64(ts)?;
    i64::try_from(secs).map_err(|_| {
        IndexerError::Decode(format!("block {number} timestamp {ts} is out of range"))
    })
}
