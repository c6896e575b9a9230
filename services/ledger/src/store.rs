//! The ledger data model
//!
//! Typed tables keyed by market index and account address, using
//! `BTreeMap` throughout for deterministic serialization of the
//! checkpoint document.
//!
//! Invariant: the store reflects the effect of every event up to and
//! including `synced_block` and nothing beyond it; checkpoint and state
//! always advance together. A position record exists iff its economic
//! exposure is nonzero; deletion happens in the same handler
//! application that zeroes it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use types::ids::{Address, MarketIdx};

// ── Per-market records ──────────────────────────────────────────────

/// One listed perpetual market.
///
/// `out_fee` stays in the curve's 10-decimal scale until the risk
/// engine rescales it; everything else is wad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Market {
    pub out_fee: i128,
    pub risk_weight: i128,
    pub lp_debt_coefficient: i128,
    pub index_price: i128,
    pub quote_amm_reserve: i128,
    pub base_amm_reserve: i128,
    pub total_liquidity: i128,
}

/// Global per-market accumulators, refreshed by point-in-time reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GlobalPosition {
    pub cum_funding_rate: i128,
    pub cum_funding_per_lp_token: i128,
    pub trading_fee_growth: i128,
    pub quote_fee_growth: i128,
    pub base_fee_growth: i128,
}

// ── Per-account records ─────────────────────────────────────────────

/// An open trader position in one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TraderPosition {
    /// Signed quote cost basis.
    pub open_notional: i128,
    /// Signed base exposure.
    pub position_size: i128,
    /// Global funding accumulator at last settlement for this account.
    pub cum_funding_rate: i128,
}

/// An open liquidity-provider position in one market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LpPosition {
    pub open_notional: i128,
    pub position_size: i128,
    pub liquidity_balance: i128,
    /// Fee-growth snapshots captured at the account's last interaction.
    pub quote_fee_growth: i128,
    pub base_fee_growth: i128,
    pub trading_fee_growth: i128,
    pub cum_funding_per_lp_token: i128,
}

/// Clearinghouse risk parameters, replaced wholesale on change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RiskParameters {
    pub min_margin: i128,
    pub ua_debt_seizure_threshold: i128,
    pub non_ua_coll_seizure_discount: i128,
    pub liquidation_reward: i128,
    pub liquidation_reward_insurance_share: i128,
}

// ── The store ───────────────────────────────────────────────────────

/// The full mirrored ledger. Serializes directly as the checkpoint
/// document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStore {
    /// Last fully applied block.
    pub synced_block: u64,
    pub perps: BTreeMap<MarketIdx, Market>,
    pub global_positions: BTreeMap<MarketIdx, GlobalPosition>,
    pub trader_positions: BTreeMap<MarketIdx, BTreeMap<Address, TraderPosition>>,
    pub lp_positions: BTreeMap<MarketIdx, BTreeMap<Address, LpPosition>>,
    /// account → asset → signed balance; negative means settlement debt.
    pub reserves: BTreeMap<Address, BTreeMap<Address, i128>>,
    pub reserve_weights: BTreeMap<Address, i128>,
    pub params: RiskParameters,
    /// The settlement asset (UA) address.
    pub ua_address: Address,
    /// Cumulative rewards earned by this keeper's own account.
    pub liquidation_rewards: i128,
}

impl LedgerStore {
    /// Fresh store starting at the protocol deployment block.
    pub fn new(deployment_block: u64, ua_address: Address) -> Self {
        Self {
            synced_block: deployment_block,
            perps: BTreeMap::new(),
            global_positions: BTreeMap::new(),
            trader_positions: BTreeMap::new(),
            lp_positions: BTreeMap::new(),
            reserves: BTreeMap::new(),
            reserve_weights: BTreeMap::new(),
            params: RiskParameters::default(),
            ua_address,
            liquidation_rewards: 0,
        }
    }

    // ── Market lifecycle ────────────────────────────────────────────

    /// Register a newly listed market's slots. Must happen before any
    /// economic event for the market is dispatched.
    pub fn register_market(&mut self, idx: MarketIdx, market: Market) {
        self.perps.insert(idx, market);
        self.global_positions.entry(idx).or_default();
        self.trader_positions.entry(idx).or_default();
        self.lp_positions.entry(idx).or_default();
    }

    /// Drop a delisted market and every position in it.
    pub fn remove_market(&mut self, idx: MarketIdx) {
        self.perps.remove(&idx);
        self.global_positions.remove(&idx);
        self.trader_positions.remove(&idx);
        self.lp_positions.remove(&idx);
    }

    pub fn has_market(&self, idx: MarketIdx) -> bool {
        self.perps.contains_key(&idx)
    }

    // ── Reserves ────────────────────────────────────────────────────

    /// Add `amount` (signed) to an account's balance of `asset`.
    pub fn credit_reserve(&mut self, account: &Address, asset: &Address, amount: i128) {
        *self
            .reserves
            .entry(account.clone())
            .or_default()
            .entry(asset.clone())
            .or_default() += amount;
    }

    pub fn reserve(&self, account: &Address, asset: &Address) -> i128 {
        self.reserves
            .get(account)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(0)
    }

    /// Add `amount` to an account's settlement-asset reserve.
    pub fn credit_ua(&mut self, account: &Address, amount: i128) {
        let ua = self.ua_address.clone();
        self.credit_reserve(account, &ua, amount);
    }

    // ── Position lookups ────────────────────────────────────────────

    pub fn trader_position(&self, idx: MarketIdx, account: &Address) -> Option<&TraderPosition> {
        self.trader_positions.get(&idx)?.get(account)
    }

    pub fn lp_position(&self, idx: MarketIdx, account: &Address) -> Option<&LpPosition> {
        self.lp_positions.get(&idx)?.get(account)
    }

    pub fn tracked_trader_positions(&self) -> usize {
        self.trader_positions.values().map(BTreeMap::len).sum()
    }

    pub fn tracked_lp_positions(&self) -> usize {
        self.lp_positions.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ua() -> Address {
        Address::new("0xua")
    }

    #[test]
    fn test_register_and_remove_market() {
        let mut store = LedgerStore::new(0, ua());
        store.register_market(MarketIdx(0), Market::default());
        assert!(store.has_market(MarketIdx(0)));
        assert!(store.global_positions.contains_key(&MarketIdx(0)));

        store.remove_market(MarketIdx(0));
        assert!(!store.has_market(MarketIdx(0)));
        assert!(store.trader_positions.get(&MarketIdx(0)).is_none());
    }

    #[test]
    fn test_credit_reserve_signed() {
        let mut store = LedgerStore::new(0, ua());
        let alice = Address::new("0xalice");
        store.credit_ua(&alice, 500);
        store.credit_ua(&alice, -800);
        // Negative reserve represents settlement-asset debt
        assert_eq!(store.reserve(&alice, &ua()), -300);
    }

    #[test]
    fn test_reserve_defaults_to_zero() {
        let store = LedgerStore::new(0, ua());
        assert_eq!(store.reserve(&Address::new("0xnobody"), &ua()), 0);
    }

    #[test]
    fn test_tracked_position_counts() {
        let mut store = LedgerStore::new(0, ua());
        store.register_market(MarketIdx(0), Market::default());
        store.register_market(MarketIdx(1), Market::default());
        store
            .trader_positions
            .get_mut(&MarketIdx(0))
            .unwrap()
            .insert(Address::new("0xa"), TraderPosition::default());
        store
            .trader_positions
            .get_mut(&MarketIdx(1))
            .unwrap()
            .insert(Address::new("0xa"), TraderPosition::default());
        store
            .lp_positions
            .get_mut(&MarketIdx(0))
            .unwrap()
            .insert(Address::new("0xb"), LpPosition::default());
        assert_eq!(store.tracked_trader_positions(), 2);
        assert_eq!(store.tracked_lp_positions(), 1);
    }

    #[test]
    fn test_checkpoint_document_field_names() {
        // The persisted document's field names are protocol-facing and
        // must not drift.
        let store = LedgerStore::new(42, ua());
        let json = serde_json::to_value(&store).unwrap();
        for field in [
            "synced_block",
            "perps",
            "trader_positions",
            "lp_positions",
            "global_positions",
            "reserves",
            "reserve_weights",
            "ua_address",
            "liquidation_rewards",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(json["synced_block"], 42);
    }
}
