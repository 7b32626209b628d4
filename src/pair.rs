//! Uniswap V2 Pair Contract
//!
//! Contract bindings for the pair we listen to, plus the one-time metadata
//! lookup (`token0`/`token1`) performed at startup.

use alloy::primitives::{Address, B256};
use alloy::providers::RootProvider;
use alloy::pubsub::PubSubFrontend;
use alloy::sol;
use alloy::sol_types::SolEvent;
use thiserror::Error;

/// Provider type used throughout the ingester: a WebSocket (pub/sub capable)
/// JSON-RPC connection.
pub type WsProvider = RootProvider<PubSubFrontend>;

sol! {
    #[sol(rpc)]
    contract IUniswapV2Pair {
        event Swap(
            address indexed sender,
            uint256 amount0In,
            uint256 amount1In,
            uint256 amount0Out,
            uint256 amount1Out,
            address indexed to
        );

        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

/// Errors that can occur while resolving pair metadata.
///
/// These are fatal at startup: the listener cannot run without knowing the
/// pair's constituent tokens, so no retry is attempted.
#[derive(Error, Debug)]
pub enum PairError {
    #[error("token0 call failed: {0}")]
    Token0Call(alloy::contract::Error),

    #[error("token1 call failed: {0}")]
    Token1Call(alloy::contract::Error),
}

/// Immutable metadata of the liquidity pair, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairMetadata {
    /// The pair contract address
    pub pair_address: Address,
    /// Address of the pair's first token
    pub token0: Address,
    /// Address of the pair's second token
    pub token1: Address,
}

/// Topic hash of the `Swap` event, used as the subscription filter's topic0.
pub fn swap_event_topic() -> B256 {
    IUniswapV2Pair::Swap::SIGNATURE_HASH
}

/// Resolve a pair's constituent token addresses via two read-only calls.
///
/// # Errors
/// Returns `PairError` if either call errors or the node is unreachable.
pub async fn resolve_pair_metadata(
    provider: &WsProvider,
    pair_address: Address,
) -> Result<PairMetadata, PairError> {
    let contract = IUniswapV2Pair::new(pair_address, provider);

    let token0 = contract
        .token0()
        .call()
        .await
        .map_err(PairError::Token0Call)?
        ._0;

    let token1 = contract
        .token1()
        .call()
        .await
        .map_err(PairError::Token1Call)?
        ._0;

    Ok(PairMetadata {
        pair_address,
        token0,
        token1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    // ==================== swap_event_topic tests ====================

    #[test]
    fn test_swap_event_topic_matches_keccak_of_signature() {
        // keccak256("Swap(address,uint256,uint256,uint256,uint256,address)")
        let expected =
            b256!("d78ad95fa46c994b6551d0da85fc275fe613ce37657fb8d5e3d130840159d822");
        assert_eq!(swap_event_topic(), expected);
    }

    // ==================== PairMetadata tests ====================

    #[test]
    fn test_pair_metadata_equality() {
        let metadata = PairMetadata {
            pair_address: address!("6e7a5FAFcec6BB1e78bAE2A1F0B612012BF14827"),
            token0: address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"),
            token1: address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
        };
        assert_eq!(metadata.clone(), metadata);
    }
}
