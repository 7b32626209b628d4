//! Blockchain Listener
//!
//! Owns the WebSocket subscription to the chain node and drives the per-log
//! pipeline: decode, enrich with block and receipt data, derive the price,
//! build the canonical event and emit it onto the bounded channel.
//!
//! Lifecycle: connect and subscribe, then stream until the caller cancels
//! (graceful) or the subscription channel itself errors (terminal). The
//! caller owns any restart policy; there is no auto-reconnect here. A
//! failure while processing a single log is logged and the log dropped;
//! streaming continues.

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256};
use alloy::providers::{Provider, ProviderBuilder, WsConnect};
use alloy::pubsub::Subscription;
use alloy::rpc::types::{Filter, Log};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::decoder::{decode_swap_log, DecodeError};
use crate::events::{build_swap_event, current_timestamp_secs, SwapEvent, SwapEventEnvelope};
use crate::logctx::LogContext;
use crate::pair::{resolve_pair_metadata, swap_event_topic, PairError, PairMetadata, WsProvider};
use crate::price::derive_price;

/// Capacity of the bounded channel between the listener and the ingestion
/// loop. When the consumer lags, emits block here and backpressure reaches
/// the streaming loop.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Errors that end the listener. All of them are terminal for the stream;
/// per-log failures are handled internally and never surface here.
#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("failed to connect to node: {0}")]
    Connection(String),

    #[error(transparent)]
    Pair(#[from] PairError),

    #[error("log subscription rejected: {0}")]
    SubscriptionFailed(String),

    #[error("subscription channel failed: {0}")]
    SubscriptionLost(String),
}

/// Failures confined to a single log: decoding problems and transient
/// enrichment RPC errors. The streaming loop logs these and moves on.
#[derive(Error, Debug)]
pub enum LogProcessingError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("log is missing block or transaction metadata")]
    PendingLog,

    #[error("block {0} not found")]
    MissingBlock(u64),

    #[error("receipt for {0:#x} not found")]
    MissingReceipt(B256),

    #[error("enrichment call failed: {0}")]
    Rpc(String),
}

/// Source of raw pair logs for the streaming loop. In production this is
/// the node's WebSocket subscription; tests script the log sequence.
#[async_trait]
pub trait LogSource: Send {
    /// Wait for the next log. An error here is terminal for the stream.
    async fn next_log(&mut self) -> Result<Log, ListenerError>;
}

/// Per-log chain lookups that enrich an event beyond what the log carries.
#[async_trait]
pub trait SwapEnricher: Send + Sync {
    async fn block_timestamp(&self, block_number: u64) -> Result<i64, LogProcessingError>;
    async fn gas_details(
        &self,
        transaction_hash: B256,
    ) -> Result<(i64, String), LogProcessingError>;
}

struct SubscriptionSource {
    subscription: Subscription<Log>,
}

#[async_trait]
impl LogSource for SubscriptionSource {
    async fn next_log(&mut self) -> Result<Log, ListenerError> {
        self.subscription
            .recv()
            .await
            .map_err(|error| ListenerError::SubscriptionLost(error.to_string()))
    }
}

/// Stream swap events from `source` onto `sender` until cancellation or a
/// terminal source error. A log that fails to decode or enrich is logged
/// and dropped; the loop keeps going.
///
/// # Errors
/// Propagates the source's terminal error. Cancellation and a closed output
/// channel both return `Ok(())`.
pub async fn stream_swap_events<L, E>(
    source: &mut L,
    enricher: &E,
    pair: &PairMetadata,
    cancel: CancellationToken,
    sender: mpsc::Sender<SwapEvent>,
    logctx: &LogContext,
) -> Result<(), ListenerError>
where
    L: LogSource,
    E: SwapEnricher,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(
                    session_id = %logctx.session_id(),
                    category = %logctx.category(),
                    "Listener cancelled"
                );
                return Ok(());
            }
            received = source.next_log() => {
                let log = received?;

                let event = match swap_event_from_log(&log, pair, enricher).await {
                    Ok(event) => event,
                    Err(error) => {
                        warn!(
                            session_id = %logctx.session_id(),
                            category = %logctx.category(),
                            error = %error,
                            "Dropping swap log"
                        );
                        continue;
                    }
                };

                // Backpressure point: blocks while the channel is full.
                // A closed channel means the consumer is gone.
                if sender.send(event).await.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

async fn swap_event_from_log<E: SwapEnricher>(
    log: &Log,
    pair: &PairMetadata,
    enricher: &E,
) -> Result<SwapEvent, LogProcessingError> {
    let swap = decode_swap_log(log)?;

    let block_number = log.block_number.ok_or(LogProcessingError::PendingLog)?;
    let transaction_hash = log
        .transaction_hash
        .ok_or(LogProcessingError::PendingLog)?;
    let log_index = log.log_index.ok_or(LogProcessingError::PendingLog)?;

    let block_timestamp = enricher.block_timestamp(block_number).await?;
    let (gas_used, gas_price) = enricher.gas_details(transaction_hash).await?;
    let price = derive_price(&swap);

    Ok(build_swap_event(SwapEventEnvelope {
        swap,
        pair: pair.clone(),
        block_number,
        block_timestamp,
        transaction_hash,
        log_index,
        price,
        gas_used,
        gas_price,
        event_timestamp: current_timestamp_secs(),
    }))
}

/// Streaming listener for one pair's swap logs.
pub struct Listener {
    provider: WsProvider,
    pair_metadata: PairMetadata,
    filter: Filter,
    logctx: LogContext,
}

impl Listener {
    /// Connect to the node over WebSocket and resolve the pair metadata.
    ///
    /// # Errors
    /// Any failure here is fatal at startup: the caller must abort process
    /// initialization rather than retry.
    pub async fn connect(
        ws_url: &str,
        pair_address: Address,
        logctx: LogContext,
    ) -> Result<Self, ListenerError> {
        info!(
            session_id = %logctx.session_id(),
            category = %logctx.category(),
            ws_url,
            "Connecting to node"
        );

        let provider = ProviderBuilder::new()
            .on_ws(WsConnect::new(ws_url))
            .await
            .map_err(|error| ListenerError::Connection(error.to_string()))?;

        let pair_metadata = resolve_pair_metadata(&provider, pair_address).await?;

        let filter = Filter::new()
            .address(pair_address)
            .event_signature(swap_event_topic());

        Ok(Self {
            provider,
            pair_metadata,
            filter,
            logctx,
        })
    }

    /// The pair metadata resolved at connect time.
    pub fn pair_metadata(&self) -> &PairMetadata {
        &self.pair_metadata
    }

    /// Subscribe to the pair's swap logs and stream events onto `sender`
    /// until cancelled or the subscription fails.
    ///
    /// # Errors
    /// `SubscriptionFailed` if the node rejects the filter,
    /// `SubscriptionLost` if the subscription channel errors mid-stream.
    /// Cancellation and a closed output channel both return `Ok(())`.
    pub async fn listen(
        &self,
        cancel: CancellationToken,
        sender: mpsc::Sender<SwapEvent>,
    ) -> Result<(), ListenerError> {
        let subscription = self
            .provider
            .subscribe_logs(&self.filter)
            .await
            .map_err(|error| ListenerError::SubscriptionFailed(error.to_string()))?;

        info!(
            session_id = %self.logctx.session_id(),
            category = %self.logctx.category(),
            pair_address = %self.pair_metadata.pair_address,
            "Streaming swap logs"
        );

        let mut source = SubscriptionSource { subscription };
        stream_swap_events(
            &mut source,
            self,
            &self.pair_metadata,
            cancel,
            sender,
            &self.logctx,
        )
        .await
    }
}

#[async_trait]
impl SwapEnricher for Listener {
    async fn block_timestamp(&self, block_number: u64) -> Result<i64, LogProcessingError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block_number), false.into())
            .await
            .map_err(|error| LogProcessingError::Rpc(error.to_string()))?
            .ok_or(LogProcessingError::MissingBlock(block_number))?;

        Ok(block.header.timestamp as i64)
    }

    async fn gas_details(
        &self,
        transaction_hash: B256,
    ) -> Result<(i64, String), LogProcessingError> {
        let receipt = self
            .provider
            .get_transaction_receipt(transaction_hash)
            .await
            .map_err(|error| LogProcessingError::Rpc(error.to_string()))?
            .ok_or(LogProcessingError::MissingReceipt(transaction_hash))?;

        Ok((
            receipt.gas_used as i64,
            receipt.effective_gas_price.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, U256};
    use std::collections::VecDeque;

    /// Hands out a scripted sequence of logs, then fails the stream the way
    /// a closed subscription channel would.
    struct ScriptedSource {
        logs: VecDeque<Log>,
    }

    impl ScriptedSource {
        fn new(logs: Vec<Log>) -> Self {
            Self { logs: logs.into() }
        }
    }

    #[async_trait]
    impl LogSource for ScriptedSource {
        async fn next_log(&mut self) -> Result<Log, ListenerError> {
            match self.logs.pop_front() {
                Some(log) => Ok(log),
                None => Err(ListenerError::SubscriptionLost("drained".to_string())),
            }
        }
    }

    /// Never yields a log; used to isolate the cancellation branch.
    struct SilentSource;

    #[async_trait]
    impl LogSource for SilentSource {
        async fn next_log(&mut self) -> Result<Log, ListenerError> {
            std::future::pending().await
        }
    }

    struct CannedEnricher;

    #[async_trait]
    impl SwapEnricher for CannedEnricher {
        async fn block_timestamp(&self, _block_number: u64) -> Result<i64, LogProcessingError> {
            Ok(1_703_000_000)
        }

        async fn gas_details(
            &self,
            _transaction_hash: B256,
        ) -> Result<(i64, String), LogProcessingError> {
            Ok((153_201, "31000000000".to_string()))
        }
    }

    struct FailingEnricher;

    #[async_trait]
    impl SwapEnricher for FailingEnricher {
        async fn block_timestamp(&self, block_number: u64) -> Result<i64, LogProcessingError> {
            Err(LogProcessingError::MissingBlock(block_number))
        }

        async fn gas_details(
            &self,
            transaction_hash: B256,
        ) -> Result<(i64, String), LogProcessingError> {
            Err(LogProcessingError::MissingReceipt(transaction_hash))
        }
    }

    fn address_topic(last_byte: u8) -> B256 {
        let mut topic = [0u8; 32];
        topic[31] = last_byte;
        B256::from(topic)
    }

    fn rpc_log(topics: Vec<B256>, data: Vec<u8>, log_index: u64) -> Log {
        Log {
            inner: alloy::primitives::Log::new_unchecked(
                Address::with_last_byte(0x01),
                topics,
                Bytes::from(data),
            ),
            block_number: Some(52_341_001),
            transaction_hash: Some(B256::repeat_byte(0xaa)),
            log_index: Some(log_index),
            ..Default::default()
        }
    }

    fn valid_swap_log(log_index: u64) -> Log {
        let topics = vec![swap_event_topic(), address_topic(0x11), address_topic(0x22)];
        let mut data = Vec::with_capacity(128);
        data.extend_from_slice(&U256::from(4u64).to_be_bytes::<32>());
        data.extend_from_slice(&U256::ZERO.to_be_bytes::<32>());
        data.extend_from_slice(&U256::ZERO.to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(2u64).to_be_bytes::<32>());
        rpc_log(topics, data, log_index)
    }

    fn malformed_swap_log(log_index: u64) -> Log {
        rpc_log(vec![swap_event_topic()], vec![0u8; 128], log_index)
    }

    fn pair_metadata() -> PairMetadata {
        PairMetadata {
            pair_address: Address::with_last_byte(0x01),
            token0: Address::with_last_byte(0x02),
            token1: Address::with_last_byte(0x03),
        }
    }

    // ==================== ListenerError tests ====================

    #[test]
    fn test_connection_error_display() {
        let error = ListenerError::Connection("refused".to_string());
        assert!(error.to_string().contains("refused"));
    }

    #[test]
    fn test_subscription_lost_is_distinct_from_failed() {
        let failed = ListenerError::SubscriptionFailed("bad filter".to_string());
        let lost = ListenerError::SubscriptionLost("closed".to_string());
        assert_ne!(failed.to_string(), lost.to_string());
    }

    // ==================== channel capacity tests ====================

    #[test]
    fn test_event_channel_capacity_is_bounded_and_small() {
        assert_eq!(EVENT_CHANNEL_CAPACITY, 100);
    }

    // ==================== stream_swap_events tests ====================

    #[tokio::test]
    async fn test_stream_drops_malformed_log_and_continues() {
        let mut source = ScriptedSource::new(vec![malformed_swap_log(0), valid_swap_log(1)]);
        let (event_tx, mut event_rx) = mpsc::channel(10);

        let outcome = stream_swap_events(
            &mut source,
            &CannedEnricher,
            &pair_metadata(),
            CancellationToken::new(),
            event_tx,
            &LogContext::new("listener"),
        )
        .await;

        // The stream ran to exhaustion, past the malformed log.
        assert!(matches!(outcome, Err(ListenerError::SubscriptionLost(_))));
        let event = event_rx.recv().await.unwrap();
        assert_eq!(event.log_index, 1);
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stream_drops_pending_log() {
        let mut pending = valid_swap_log(0);
        pending.block_number = None;
        let mut source = ScriptedSource::new(vec![pending, valid_swap_log(1)]);
        let (event_tx, mut event_rx) = mpsc::channel(10);

        let outcome = stream_swap_events(
            &mut source,
            &CannedEnricher,
            &pair_metadata(),
            CancellationToken::new(),
            event_tx,
            &LogContext::new("listener"),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(event_rx.recv().await.unwrap().log_index, 1);
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stream_drops_log_when_enrichment_fails() {
        let mut source = ScriptedSource::new(vec![valid_swap_log(0), valid_swap_log(1)]);
        let (event_tx, mut event_rx) = mpsc::channel(10);

        let outcome = stream_swap_events(
            &mut source,
            &FailingEnricher,
            &pair_metadata(),
            CancellationToken::new(),
            event_tx,
            &LogContext::new("listener"),
        )
        .await;

        assert!(outcome.is_err());
        assert!(event_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stream_stops_on_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let (event_tx, _event_rx) = mpsc::channel(10);

        let outcome = stream_swap_events(
            &mut SilentSource,
            &CannedEnricher,
            &pair_metadata(),
            cancel,
            event_tx,
            &LogContext::new("listener"),
        )
        .await;

        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn test_stream_ends_when_receiver_dropped() {
        let mut source = ScriptedSource::new(vec![valid_swap_log(0)]);
        let (event_tx, event_rx) = mpsc::channel(10);
        drop(event_rx);

        let outcome = stream_swap_events(
            &mut source,
            &CannedEnricher,
            &pair_metadata(),
            CancellationToken::new(),
            event_tx,
            &LogContext::new("listener"),
        )
        .await;

        assert!(outcome.is_ok());
    }

    // ==================== connect tests ====================

    #[tokio::test]
    async fn test_connect_to_unreachable_node_fails() {
        let result = Listener::connect(
            "ws://127.0.0.1:1",
            Address::with_last_byte(0x01),
            LogContext::new("listener"),
        )
        .await;
        assert!(matches!(result, Err(ListenerError::Connection(_))));
    }
}
