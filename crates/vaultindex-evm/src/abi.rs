//! ERC-4626 `Deposit` / `Withdraw` log decoding.
//!
//! ```text
//! Deposit(address indexed sender, address indexed owner, uint256 assets, uint256 shares)
//! Withdraw(address indexed sender, address indexed receiver, address indexed owner,
//!          uint256 assets, uint256 shares)
//! ```
//!
//! Each indexed address topic is ABI-decoded as an `address`; `data` is
//! ABI-decoded as the `(uint256 assets, uint256 shares)` tuple.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{Address, U256};
use tiny_keccak::{Hasher, Keccak};

use vaultindex_core::error::IndexerError;
use vaultindex_core::types::EventKind;

use crate::log::RawLog;

pub const DEPOSIT_SIGNATURE: &str = "Deposit(address,address,uint256,uint256)";
pub const WITHDRAW_SIGNATURE: &str = "Withdraw(address,address,address,uint256,uint256)";

/// Canonical signature for an event kind.
pub fn signature(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Deposit => DEPOSIT_SIGNATURE,
        EventKind::Withdraw => WITHDRAW_SIGNATURE,
    }
}

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(bytes);
    hasher.finalize(&mut out);
    out
}

/// `0x`-prefixed lowercase topic0 for an event kind.
pub fn topic0(kind: EventKind) -> String {
    format!("0x{}", hex::encode(keccak256(signature(kind).as_bytes())))
}

/// Decoded fields of one vault log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultLog {
    pub sender: Address,
    /// Only present on `Withdraw`.
    pub receiver: Option<Address>,
    pub owner: Address,
    pub assets: U256,
    pub shares: U256,
}

/// Decode `log` as an event of `kind`.
pub fn decode(kind: EventKind, log: &RawLog) -> Result<VaultLog, IndexerError> {
    let expected_topics = match kind {
        EventKind::Deposit => 3,
        EventKind::Withdraw => 4,
    };
    if log.topics.len() != expected_topics {
        return Err(IndexerError::Decode(format!(
            "{kind} log {}: expected {expected_topics} topics, got {}",
            log.tx_hash,
            log.topics.len()
        )));
    }
    if !log.topics[0].eq_ignore_ascii_case(&topic0(kind)) {
        return Err(IndexerError::Decode(format!(
            "{kind} log {}: topic0 {} does not match {}",
            log.tx_hash,
            log.topics[0],
            signature(kind)
        )));
    }

    let data = decode_hex(&log.data)?;
    let (assets, shares) = decode_amounts(&data)
        .map_err(|reason| IndexerError::Decode(format!("{kind} log {}: {reason}", log.tx_hash)))?;

    let sender = topic_address(&log.topics[1])?;
    let (receiver, owner) = match kind {
        EventKind::Deposit => (None, topic_address(&log.topics[2])?),
        EventKind::Withdraw => (
            Some(topic_address(&log.topics[2])?),
            topic_address(&log.topics[3])?,
        ),
    };

    Ok(VaultLog {
        sender,
        receiver,
        owner,
        assets,
        shares,
    })
}

/// Parse a contract address in any case and return it EIP-55 checksummed.
pub fn checksum_address(address: &str) -> Result<String, IndexerError> {
    let bytes = decode_hex(address)?;
    if bytes.len() != 20 {
        return Err(IndexerError::Decode(format!(
            "address '{address}' is {} bytes, expected 20",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes).to_checksum(None))
}

fn amounts_type() -> DynSolType {
    DynSolType::Tuple(vec![DynSolType::Uint(256), DynSolType::Uint(256)])
}

fn decode_amounts(data: &[u8]) -> Result<(U256, U256), String> {
    let decoded = amounts_type()
        .abi_decode(data)
        .map_err(|e| format!("data decode: {e}"))?;
    match decoded {
        DynSolValue::Tuple(values) => match values.as_slice() {
            [DynSolValue::Uint(assets, 256), DynSolValue::Uint(shares, 256)] => {
                Ok((*assets, *shares))
            }
            other => Err(format!("unexpected data values {other:?}")),
        },
        other => Err(format!("unexpected data value {other:?}")),
    }
}

fn topic_address(topic: &str) -> Result<Address, IndexerError> {
    let word = decode_hex(topic)?;
    match DynSolType::Address.abi_decode(&word) {
        Ok(DynSolValue::Address(address)) => Ok(address),
        Ok(other) => Err(IndexerError::Decode(format!(
            "topic '{topic}' decoded as {other:?}, expected an address"
        ))),
        Err(e) => Err(IndexerError::Decode(format!("topic '{topic}': {e}"))),
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, IndexerError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .map_err(|e| IndexerError::Decode(format!("invalid hex '{s}': {e}")))
}
