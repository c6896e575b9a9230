//! Per-account margin components
//!
//! Each function walks the ledger's markets and sums this account's
//! contribution, in the same truncating wad arithmetic the protocol
//! uses on-chain.

use ledger::store::{LedgerStore, Market};
use tracing::warn;
use types::ids::Address;
use types::numeric::{fee_to_wad, wad_mul, WAD};

use crate::lp;

/// Unrealized PnL across all markets, trader and LP positions alike.
///
/// Per market: `open_notional + index_price·position_size/SCALE − fee`,
/// where the fee is the AMM out-fee (rescaled to wad) on the absolute
/// virtual proceeds. LP positions are first reconstructed to their
/// post-withdrawal equivalents, then credited their accrued share of
/// trading-fee growth.
pub fn pnl(store: &LedgerStore, account: &Address) -> i128 {
    let mut total = 0;
    for (idx, market) in &store.perps {
        if let Some(pos) = store.trader_position(*idx, account) {
            total += notional_pnl(market, pos.open_notional, pos.position_size);
        }
        if let Some(lp_pos) = store.lp_position(*idx, account) {
            let global = store
                .global_positions
                .get(idx)
                .copied()
                .unwrap_or_default();
            let (notional, size) = lp::position_after_withdrawal(market, &global, lp_pos);
            total += notional_pnl(market, notional, size);
            total += wad_mul(
                lp_pos.liquidity_balance,
                global.trading_fee_growth - lp_pos.trading_fee_growth,
            );
        }
    }
    total
}

fn notional_pnl(market: &Market, open_notional: i128, position_size: i128) -> i128 {
    let proceeds = wad_mul(market.index_price, position_size);
    let trading_fees = wad_mul(proceeds.abs(), fee_to_wad(market.out_fee));
    open_notional + proceeds - trading_fees
}

/// Risk-weighted debt across all markets.
///
/// Per market: `|min(open_notional, 0) + min(size·price/SCALE, 0)|`,
/// scaled by the market's risk weight. LP debt additionally passes
/// through the market's LP debt coefficient first.
pub fn debt(store: &LedgerStore, account: &Address) -> i128 {
    let mut total = 0;
    for (idx, market) in &store.perps {
        if let Some(pos) = store.trader_position(*idx, account) {
            let exposure = market_debt(market, pos.open_notional, pos.position_size);
            total += wad_mul(exposure, market.risk_weight);
        }
        if let Some(lp_pos) = store.lp_position(*idx, account) {
            let exposure = market_debt(market, lp_pos.open_notional, lp_pos.position_size);
            let weighted = wad_mul(exposure, market.lp_debt_coefficient);
            total += wad_mul(weighted, market.risk_weight);
        }
    }
    total
}

fn market_debt(market: &Market, open_notional: i128, position_size: i128) -> i128 {
    let quote_debt = open_notional.min(0);
    let base_debt = wad_mul(position_size, market.index_price).min(0);
    (quote_debt + base_debt).abs()
}

/// Funding accrued since each position's snapshot but not yet settled.
///
/// Longs are owed `snapshot − global`, shorts `global − snapshot`, per
/// unit of absolute position size. LP positions always accrue
/// `(global_per_share − snapshot_per_share) · liquidity / SCALE`.
pub fn pending_funding(store: &LedgerStore, account: &Address) -> i128 {
    let mut total = 0;
    for (idx, global) in &store.global_positions {
        if let Some(pos) = store.trader_position(*idx, account) {
            let delta = if pos.position_size >= 0 {
                pos.cum_funding_rate - global.cum_funding_rate
            } else {
                global.cum_funding_rate - pos.cum_funding_rate
            };
            total += wad_mul(delta, pos.position_size.abs());
        }
        if let Some(lp_pos) = store.lp_position(*idx, account) {
            total += wad_mul(
                global.cum_funding_per_lp_token - lp_pos.cum_funding_per_lp_token,
                lp_pos.liquidity_balance,
            );
        }
    }
    total
}

/// Haircut value of the account's reserves in settlement units.
///
/// Only the settlement asset itself is priced; any other nonzero
/// balance is a valuation gap and contributes nothing (logged, not
/// hidden).
pub fn reserve_value(store: &LedgerStore, account: &Address) -> i128 {
    let Some(assets) = store.reserves.get(account) else {
        return 0;
    };

    let mut total = 0;
    for (asset, balance) in assets {
        if *balance == 0 {
            continue;
        }
        let Some(weight) = store.reserve_weights.get(asset).copied() else {
            warn!(%account, %asset, "reserve asset has no collateral weight, skipping");
            continue;
        };
        let weighted = wad_mul(*balance, weight);
        match oracle_price(store, asset) {
            Some(price) => total += wad_mul(weighted, price),
            None => {
                warn!(%account, %asset, balance, "no oracle price for reserve asset, skipping");
            }
        }
    }
    total
}

/// Settlement-asset price of `asset`. Only UA is priced today; anything
/// else reports as unpriced.
fn oracle_price(store: &LedgerStore, asset: &Address) -> Option<i128> {
    if *asset == store.ua_address {
        Some(WAD)
    } else {
        None
    }
}
