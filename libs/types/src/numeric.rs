//! Fixed-point integer arithmetic
//!
//! All monetary quantities in the mirror are `i128` values scaled by
//! 10^18 ("wad"), matching the protocol's on-chain representation.
//! Multiply-then-divide widens the product to 256 bits first: ordinary
//! protocol operands (a wad price times a wad size is ~10^39) already
//! exceed `i128::MAX`, so the intermediate must not be computed in
//! 128 bits. Division truncates toward zero, which is exactly what the
//! protocol's integer math does; floating point is never used, so
//! every derived quantity stays bit-exact with the ledger being
//! mirrored.

use ethnum::I256;

/// 18-decimal fixed-point scale. One settlement-asset unit == `WAD`.
pub const WAD: i128 = 1_000_000_000_000_000_000;

/// Decimal scale of the AMM out-fee parameter as reported by the curve
/// contract. Must be rescaled to wad before combining with wad amounts.
pub const CURVE_TRADING_FEE_DECIMALS: u32 = 10;

/// `a * b / denom` with the product widened to 256 bits, truncating
/// toward zero. The quotient is assumed to fit back into `i128`, which
/// holds for every protocol quantity the mirror stores.
pub fn mul_div(a: i128, b: i128, denom: i128) -> i128 {
    (I256::from(a) * I256::from(b) / I256::from(denom)).as_i128()
}

/// Multiply two wad quantities, truncating toward zero.
///
/// `wad_mul(a, b) = a * b / WAD`
pub fn wad_mul(a: i128, b: i128) -> i128 {
    mul_div(a, b, WAD)
}

/// Divide two wad quantities, truncating toward zero.
///
/// `wad_div(a, b) = a * WAD / b`
pub fn wad_div(a: i128, b: i128) -> i128 {
    mul_div(a, WAD, b)
}

/// Rescale the AMM out-fee from its 10-decimal curve scale to wad.
pub fn fee_to_wad(out_fee: i128) -> i128 {
    out_fee * 10i128.pow(18 - CURVE_TRADING_FEE_DECIMALS)
}
