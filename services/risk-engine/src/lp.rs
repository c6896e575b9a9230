//! LP withdrawal reconstruction
//!
//! An LP's economic exposure is not what the position record says it
//! contributed: withdrawing burns the liquidity share against the live
//! AMM reserves, fees included. These functions rebuild the
//! post-withdrawal token amounts from the share balance and the
//! fee-growth snapshots, matching the protocol's own integer math.
//! Share-times-reserve products exceed `i128` for real pools, so all
//! muldivs go through the widened `mul_div`.

use ledger::store::{GlobalPosition, LpPosition, Market};
use types::numeric::{mul_div, WAD};

/// Tokens one side of the pool would pay out for `liquidity_balance`
/// shares, fees included.
///
/// The `- 1` on the share balance is the protocol's rounding-down guard
/// against over-withdrawal from integer division. Zero total liquidity
/// pays out nothing.
pub fn tokens_including_fees(
    amm_balance: i128,
    total_liquidity: i128,
    liquidity_balance: i128,
) -> i128 {
    if total_liquidity == 0 {
        return 0;
    }
    mul_div(liquidity_balance - 1, amm_balance, total_liquidity)
}

/// Tokens excluding the fee portion accrued since the account's
/// snapshot: `incl · SCALE / (SCALE + global_growth − snapshot_growth)`.
pub fn tokens_excluding_fees(
    amm_balance: i128,
    total_liquidity: i128,
    liquidity_balance: i128,
    global_growth: i128,
    snapshot_growth: i128,
) -> i128 {
    let incl = tokens_including_fees(amm_balance, total_liquidity, liquidity_balance);
    mul_div(incl, WAD, WAD + global_growth - snapshot_growth)
}

/// Reconstruct the trader-equivalent position an LP would hold after
/// withdrawing in full: contributed amounts plus the ex-fee withdrawal
/// proceeds on each side.
pub fn position_after_withdrawal(
    market: &Market,
    global: &GlobalPosition,
    lp: &LpPosition,
) -> (i128, i128) {
    let quote = tokens_excluding_fees(
        market.quote_amm_reserve,
        market.total_liquidity,
        lp.liquidity_balance,
        global.quote_fee_growth,
        lp.quote_fee_growth,
    );
    let base = tokens_excluding_fees(
        market.base_amm_reserve,
        market.total_liquidity,
        lp.liquidity_balance,
        global.base_fee_growth,
        lp.base_fee_growth,
    );
    (lp.open_notional + quote, lp.position_size + base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_pool_withdrawal_round_trip() {
        // Withdrawing the entire pool with zero fee growth returns the
        // AMM balance, short only the -1 rounding guard.
        let total = 1_000 * WAD;
        let amm = 5_000 * WAD;
        let tokens = tokens_including_fees(amm, total, total);
        // (total - 1) * amm / total == amm - 5
        assert_eq!(tokens, 5_000 * WAD - 5);
        // One share-wei of guard costs at most amm/total tokens
        assert!(amm - tokens <= amm / total + 1);
    }

    #[test]
    fn test_zero_total_liquidity_pays_nothing() {
        assert_eq!(tokens_including_fees(5_000 * WAD, 0, 100 * WAD), 0);
        assert_eq!(tokens_excluding_fees(5_000 * WAD, 0, 100 * WAD, WAD, 0), 0);
    }

    #[test]
    fn test_fee_growth_discounts_proceeds() {
        let total = 1_000 * WAD;
        let amm = 2_000 * WAD;
        let share = 100 * WAD;
        let incl = tokens_including_fees(amm, total, share);
        // 10% growth since snapshot → ex-fee amount is incl / 1.1
        let excl = tokens_excluding_fees(amm, total, share, WAD / 10, 0);
        assert_eq!(excl, mul_div(incl, WAD, WAD + WAD / 10));
        assert!(excl < incl);
    }

    #[test]
    fn test_reconstruction_at_pool_magnitudes() {
        // Reserves and shares sized like a live deployment: the raw
        // share-times-reserve product is ~5e48, far past i128::MAX
        let total = 1_000_000 * WAD;
        let amm = 50_000_000 * WAD;
        let share = 100_000 * WAD;
        let tokens = tokens_including_fees(amm, total, share);
        // 10% of the pool, short 50 wei of rounding guard
        assert_eq!(tokens, 5_000_000 * WAD - 50);
        // Zero growth delta leaves the ex-fee amount unchanged
        assert_eq!(
            tokens_excluding_fees(amm, total, share, 3 * WAD, 3 * WAD),
            tokens
        );
    }

    #[test]
    fn test_position_after_withdrawal_adds_proceeds() {
        let market = Market {
            quote_amm_reserve: 10_000 * WAD,
            base_amm_reserve: 100 * WAD,
            total_liquidity: 1_000 * WAD,
            ..Market::default()
        };
        let global = GlobalPosition::default();
        let lp = LpPosition {
            // Contributed amounts are recorded negative
            open_notional: -1_000 * WAD,
            position_size: -10 * WAD,
            liquidity_balance: 100 * WAD,
            ..LpPosition::default()
        };
        let (notional, size) = position_after_withdrawal(&market, &global, &lp);
        // 10% of each reserve comes back, minus the rounding guard
        assert!(notional > -WAD && notional <= 0);
        assert!(size > -WAD / 100 && size <= 0);
    }
}
