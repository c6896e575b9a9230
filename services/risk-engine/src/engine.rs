//! Solvency and seizure predicates
//!
//! `free_collateral` deliberately diverges from the protocol's on-chain
//! check in two ways: it counts pending funding as collateral, and it
//! accepts a small negative tolerance. Both exist to avoid
//! false-positive liquidations from funding drift between the mirror
//! and the chain; the on-chain check has neither term.

use ledger::store::LedgerStore;
use types::ids::Address;
use types::numeric::wad_mul;

use crate::margin;

/// Default slack on the solvency check, in wad units (1e-6 of one
/// settlement unit).
pub const SOLVENCY_TOLERANCE: i128 = 1_000_000_000_000;

/// The kill/no-kill decision engine.
#[derive(Debug, Clone, Copy)]
pub struct RiskEngine {
    tolerance: i128,
}

impl RiskEngine {
    pub fn new() -> Self {
        Self {
            tolerance: SOLVENCY_TOLERANCE,
        }
    }

    pub fn with_tolerance(tolerance: i128) -> Self {
        Self { tolerance }
    }

    /// `min(c, c + pnl) − debt·min_margin/SCALE`, with
    /// `c = reserve_value + pending_funding`.
    pub fn free_collateral(&self, store: &LedgerStore, account: &Address) -> i128 {
        let collateral =
            margin::reserve_value(store, account) + margin::pending_funding(store, account);
        let pnl = margin::pnl(store, account);
        let margin_required = wad_mul(margin::debt(store, account), store.params.min_margin);
        collateral.min(collateral + pnl) - margin_required
    }

    /// True while the account is adequately collateralized.
    pub fn is_position_valid(&self, store: &LedgerStore, account: &Address) -> bool {
        self.free_collateral(store, account) >= -self.tolerance
    }

    /// True when an account's settlement-asset debt has outgrown its
    /// remaining collateral and should be seized: debt above the
    /// absolute threshold, or above the discounted value of its
    /// non-settlement reserves.
    pub fn should_seize_collateral(&self, store: &LedgerStore, account: &Address) -> bool {
        let ua_balance = store.reserve(account, &store.ua_address);
        if ua_balance >= 0 {
            return false;
        }
        let debt = -ua_balance;
        let collateral_ex_ua = margin::reserve_value(store, account) - ua_balance;

        debt > store.params.ua_debt_seizure_threshold
            || debt > wad_mul(collateral_ex_ua, store.params.non_ua_coll_seizure_discount)
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}
