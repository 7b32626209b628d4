//! Price Derivation
//!
//! Computes the token1/token0 exchange rate from the raw swap amounts.
//! Amounts are 256-bit integers, so the ratio is formed with exact rational
//! arithmetic and converted to f64 only once, at the very end. Casting each
//! amount to f64 first would silently lose precision above 2^53.

use alloy::primitives::U256;
use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use num_traits::ToPrimitive;

use crate::decoder::SwapLogData;

/// Derive the swap price from the decoded amounts.
///
/// A token0-in swap prices as `amount1_out / amount0_in`, a token1-in swap as
/// `amount1_in / amount0_out`. Degenerate or ambiguous amount combinations
/// (all zero, both in-amounts positive without a matching out) yield the
/// neutral value `0.0` rather than an error.
pub fn derive_price(swap: &SwapLogData) -> f64 {
    if !swap.amount0_in.is_zero() && !swap.amount1_out.is_zero() {
        return ratio_to_f64(swap.amount1_out, swap.amount0_in);
    }
    if !swap.amount1_in.is_zero() && !swap.amount0_out.is_zero() {
        return ratio_to_f64(swap.amount1_in, swap.amount0_out);
    }
    0.0
}

/// Convert `numerator / denominator` to f64 via an exact big-rational value.
///
/// A zero denominator short-circuits to `0.0`; there is no divide-by-zero
/// path.
pub fn ratio_to_f64(numerator: U256, denominator: U256) -> f64 {
    if denominator.is_zero() {
        return 0.0;
    }
    let ratio = BigRational::new(u256_to_bigint(numerator), u256_to_bigint(denominator));
    ratio.to_f64().unwrap_or(0.0)
}

fn u256_to_bigint(value: U256) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &value.to_be_bytes::<32>())
}
