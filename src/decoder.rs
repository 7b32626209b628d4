//! Swap Log Decoder
//!
//! Decodes a raw pair-contract log into a typed swap record. Indexed fields
//! (sender, recipient) come from the log topics; the four uint256 amounts are
//! ABI-decoded from the data payload.

use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use thiserror::Error;

use crate::pair::IUniswapV2Pair;

/// Number of topics a well-formed swap log carries: the event signature plus
/// the two indexed addresses.
pub const REQUIRED_TOPIC_COUNT: usize = 3;

/// Errors that can occur while decoding a swap log.
///
/// All of them are per-log: the listener logs and drops the offending log,
/// streaming continues.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("swap log has {0} topics, expected at least {REQUIRED_TOPIC_COUNT}")]
    MissingTopics(usize),

    #[error("failed to decode swap log data: {0}")]
    Abi(alloy::sol_types::Error),
}

/// Decoded swap payload, transient per event.
///
/// In a well-formed swap exactly one "in" amount and the opposite-side "out"
/// amount are non-zero. The pair contract enforces this on-chain; the decoder
/// propagates the amounts without re-validating them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapLogData {
    /// Address that initiated the swap
    pub sender: Address,
    /// Address that received the output tokens
    pub recipient: Address,
    /// Token0 amount paid into the pair
    pub amount0_in: U256,
    /// Token1 amount paid into the pair
    pub amount1_in: U256,
    /// Token0 amount paid out of the pair
    pub amount0_out: U256,
    /// Token1 amount paid out of the pair
    pub amount1_out: U256,
}

/// Decode a swap log entry into a [`SwapLogData`].
///
/// The subscription filter already restricts logs to the swap event
/// signature, so the topic-0 hash is not re-validated here.
///
/// # Errors
/// `DecodeError::MissingTopics` if fewer than three topics are present,
/// `DecodeError::Abi` if the data payload does not match the event ABI.
pub fn decode_swap_log(log: &Log) -> Result<SwapLogData, DecodeError> {
    let topic_count = log.inner.data.topics().len();
    if topic_count < REQUIRED_TOPIC_COUNT {
        return Err(DecodeError::MissingTopics(topic_count));
    }

    let decoded = IUniswapV2Pair::Swap::decode_log(&log.inner, false).map_err(DecodeError::Abi)?;

    Ok(SwapLogData {
        sender: decoded.data.sender,
        recipient: decoded.data.to,
        amount0_in: decoded.data.amount0In,
        amount1_in: decoded.data.amount1In,
        amount0_out: decoded.data.amount0Out,
        amount1_out: decoded.data.amount1Out,
    })
}
