//! Chain-level identifier types
//!
//! Addresses are carried as checksummed hex strings exactly as the RPC
//! layer reports them; the mirror never derives or normalizes them, so
//! string equality is identity. Market indices are the protocol's own
//! listing indices.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An account or token contract address.
///
/// Also used to key reserve assets: the settlement asset is itself an
/// `Address`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Protocol listing index of a perpetual market.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MarketIdx(pub u32);

impl fmt::Display for MarketIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a position was opened as a trader or as a liquidity provider.
///
/// The protocol accounts for the two kinds separately and liquidates
/// them through different entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionKind {
    Trader,
    Lp,
}

impl fmt::Display for PositionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionKind::Trader => write!(f, "trader"),
            PositionKind::Lp => write!(f, "lp"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip() {
        let addr = Address::new("0x7342556EF654B12C438a7EBe0a8714fCD139Bc1c");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x7342556EF654B12C438a7EBe0a8714fCD139Bc1c\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_market_idx_as_map_key() {
        // The checkpoint document keys tables by market index; serde_json
        // must accept the newtype as a string map key.
        let mut map = std::collections::BTreeMap::new();
        map.insert(MarketIdx(0), 1u64);
        map.insert(MarketIdx(3), 2u64);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, "{\"0\":1,\"3\":2}");
        let back: std::collections::BTreeMap<MarketIdx, u64> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_position_kind_display() {
        assert_eq!(PositionKind::Trader.to_string(), "trader");
        assert_eq!(PositionKind::Lp.to_string(), "lp");
    }
}
