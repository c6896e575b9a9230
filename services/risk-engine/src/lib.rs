//! Risk Engine — solvency math over the mirrored ledger
//!
//! Pure read-only functions reproducing the protocol's margin formulas
//! in exact wad integer arithmetic: per-account PnL, debt, pending
//! funding, reserve valuation, and the kill/no-kill predicate the
//! liquidation loop acts on. Nothing here mutates the store.
//!
//! # Modules
//! - `margin`: per-account PnL, debt, funding, and reserve valuation
//! - `lp`: LP withdrawal reconstruction
//! - `engine`: the solvency and seizure predicates

pub mod engine;
pub mod lp;
pub mod margin;

pub use engine::{RiskEngine, SOLVENCY_TOLERANCE};
