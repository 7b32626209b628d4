//! Swapfeed Ingester Library
//!
//! This crate provides components for ingesting Uniswap V2 swap logs from a
//! streaming chain node, normalizing them into canonical events, and
//! publishing to a Dapr pub/sub sidecar as Avro binary.

pub mod avro;
pub mod config;
pub mod decoder;
pub mod events;
pub mod health;
pub mod listener;
pub mod logctx;
pub mod pair;
pub mod pipeline;
pub mod price;
pub mod publisher;

// Re-export commonly used types
pub use avro::SwapEventCodec;
pub use config::Config;
pub use decoder::{decode_swap_log, DecodeError, SwapLogData};
pub use events::{build_swap_event, event_identifier, SwapEvent, SwapEventEnvelope};
pub use listener::{Listener, ListenerError, EVENT_CHANNEL_CAPACITY};
pub use logctx::LogContext;
pub use pair::{resolve_pair_metadata, swap_event_topic, PairMetadata};
pub use pipeline::{consume_events, PipelineError, SHUTDOWN_GRACE};
pub use price::{derive_price, ratio_to_f64};
pub use publisher::{EventSink, PublishError, Publisher};
