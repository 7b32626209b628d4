//! Avro Wire Codec
//!
//! Binary-encodes canonical swap events against the embedded schema. The
//! schema is the contract with downstream consumers: optional fields encode
//! as an explicit null union member when absent.

use apache_avro::types::Record;
use apache_avro::{to_avro_datum, Schema};
use thiserror::Error;

use crate::events::SwapEvent;

/// The swap event wire schema, embedded at compile time.
pub const SWAP_EVENT_SCHEMA: &str = include_str!("swap_event.avsc");

/// Errors that can occur while building the codec or encoding an event.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid swap event schema: {0}")]
    Schema(apache_avro::Error),

    #[error("swap event schema is not a record")]
    NotARecord,

    #[error("failed to encode swap event: {0}")]
    Encode(apache_avro::Error),
}

/// Parsed-schema codec for [`SwapEvent`] values.
#[derive(Debug)]
pub struct SwapEventCodec {
    schema: Schema,
}

impl SwapEventCodec {
    /// Parse the embedded schema.
    ///
    /// # Errors
    /// Returns `CodecError::Schema` if the embedded schema fails to parse;
    /// this is fatal at startup.
    pub fn new() -> Result<Self, CodecError> {
        let schema = Schema::parse_str(SWAP_EVENT_SCHEMA).map_err(CodecError::Schema)?;
        Ok(Self { schema })
    }

    /// Encode one event to Avro binary (no container framing, schema-less
    /// datum as expected by the sidecar topic).
    pub fn encode(&self, event: &SwapEvent) -> Result<Vec<u8>, CodecError> {
        let mut record = Record::new(&self.schema).ok_or(CodecError::NotARecord)?;

        record.put("eventId", event.event_id.clone());
        record.put("blockNumber", event.block_number);
        record.put("blockTimestamp", event.block_timestamp);
        record.put("transactionHash", event.transaction_hash.clone());
        record.put("logIndex", event.log_index);
        record.put("pairAddress", event.pair_address.clone());
        record.put("token0", event.token0.clone());
        record.put("token1", event.token1.clone());
        record.put("token0Symbol", event.token0_symbol.clone());
        record.put("token1Symbol", event.token1_symbol.clone());
        record.put("sender", event.sender.clone());
        record.put("recipient", event.recipient.clone());
        record.put("amount0In", event.amount0_in.clone());
        record.put("amount1In", event.amount1_in.clone());
        record.put("amount0Out", event.amount0_out.clone());
        record.put("amount1Out", event.amount1_out.clone());
        record.put("price", event.price);
        record.put("volumeUSD", event.volume_usd);
        record.put("gasUsed", event.gas_used);
        record.put("gasPrice", event.gas_price.clone());
        record.put("eventTimestamp", event.event_timestamp);

        to_avro_datum(&self.schema, record).map_err(CodecError::Encode)
    }

    /// The parsed schema, exposed for consumers that decode test payloads.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}
