//! Canonical Swap Event
//!
//! The immutable output record of the ingestion pipeline and the pure builder
//! that assembles it. Events are identified by `(transactionHash, logIndex)`
//! and never mutated after construction; a consumer that needs a different
//! price uses `with_price` to obtain a new value.

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::decoder::SwapLogData;
use crate::pair::PairMetadata;

/// Canonical swap event, matching the published wire schema field for field.
///
/// Amounts and the gas price are decimal strings so that 256-bit values cross
/// the wire without precision loss. `token0_symbol`, `token1_symbol` and
/// `volume_usd` are enrichment fields filled by downstream consumers; the
/// ingester always leaves them empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapEvent {
    /// Identity key, formatted as `"{transactionHashHex}:{logIndex}"`
    pub event_id: String,
    pub block_number: i64,
    pub block_timestamp: i64,
    pub transaction_hash: String,
    pub log_index: i32,
    pub pair_address: String,
    pub token0: String,
    pub token1: String,
    pub token0_symbol: Option<String>,
    pub token1_symbol: Option<String>,
    pub sender: String,
    pub recipient: String,
    /// Token0 amount in, as a decimal string
    pub amount0_in: String,
    pub amount1_in: String,
    pub amount0_out: String,
    pub amount1_out: String,
    /// Best-effort derived exchange rate, zero when undefined
    pub price: f64,
    #[serde(rename = "volumeUSD")]
    pub volume_usd: Option<f64>,
    pub gas_used: i64,
    /// Effective gas price in wei, as a decimal string
    pub gas_price: String,
    /// Ingestion time (unix seconds), distinct from the block timestamp
    pub event_timestamp: i64,
}

impl SwapEvent {
    /// Return a copy of the event with a different price. The original is
    /// left untouched.
    pub fn with_price(&self, price: f64) -> SwapEvent {
        SwapEvent {
            price,
            ..self.clone()
        }
    }
}

/// Everything the builder needs to assemble one event. All fields are assumed
/// already validated by the upstream stages.
#[derive(Debug, Clone)]
pub struct SwapEventEnvelope {
    pub swap: SwapLogData,
    pub pair: PairMetadata,
    pub block_number: u64,
    pub block_timestamp: i64,
    pub transaction_hash: B256,
    pub log_index: u64,
    pub price: f64,
    pub gas_used: i64,
    pub gas_price: String,
    pub event_timestamp: i64,
}

/// Assemble the canonical event. Pure, no I/O, no failure path.
pub fn build_swap_event(envelope: SwapEventEnvelope) -> SwapEvent {
    SwapEvent {
        event_id: event_identifier(envelope.transaction_hash, envelope.log_index),
        block_number: envelope.block_number as i64,
        block_timestamp: envelope.block_timestamp,
        transaction_hash: format!("{:#x}", envelope.transaction_hash),
        log_index: envelope.log_index as i32,
        pair_address: format!("{:#x}", envelope.pair.pair_address),
        token0: format!("{:#x}", envelope.pair.token0),
        token1: format!("{:#x}", envelope.pair.token1),
        token0_symbol: None,
        token1_symbol: None,
        sender: format!("{:#x}", envelope.swap.sender),
        recipient: format!("{:#x}", envelope.swap.recipient),
        amount0_in: envelope.swap.amount0_in.to_string(),
        amount1_in: envelope.swap.amount1_in.to_string(),
        amount0_out: envelope.swap.amount0_out.to_string(),
        amount1_out: envelope.swap.amount1_out.to_string(),
        price: envelope.price,
        volume_usd: None,
        gas_used: envelope.gas_used,
        gas_price: envelope.gas_price,
        event_timestamp: envelope.event_timestamp,
    }
}

/// Deterministic event identity: `"{transactionHashHex}:{logIndex}"`.
pub fn event_identifier(transaction_hash: B256, log_index: u64) -> String {
    format!("{transaction_hash:#x}:{log_index}")
}

/// Current unix time in seconds, used as the ingestion timestamp.
pub fn current_timestamp_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
