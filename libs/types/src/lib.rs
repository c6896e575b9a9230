//! Types library for the liquidation keeper
//!
//! Shared type definitions used across the keeper workspace, ensuring
//! type safety and bit-exact arithmetic with the on-chain protocol.
//!
//! # Modules
//! - `ids`: chain-level identifiers (Address, MarketIdx, PositionKind)
//! - `numeric`: 18-decimal fixed-point ("wad") integer arithmetic

pub mod ids;
pub mod numeric;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
}
