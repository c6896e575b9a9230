//! Decoded protocol log records
//!
//! The reader returns events in discovery order; the replicator imposes
//! the authoritative causal order by sorting on `(block_number,
//! tx_index)`. The payload enum is closed: a log whose signature the
//! transport cannot decode surfaces as `Unknown` and is treated as fatal
//! downstream, because an unapplied economic effect would silently
//! corrupt every derived risk decision.

use serde::{Deserialize, Serialize};
use types::ids::{Address, MarketIdx};

/// One decoded log record with its position in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    /// Block the log was emitted in.
    pub block_number: u64,
    /// Index of the emitting transaction within its block.
    pub tx_index: u32,
    /// Decoded event arguments.
    pub payload: EventPayload,
}

impl ChainEvent {
    /// The total-order key: `(block_number, tx_index)` ascending.
    pub fn order_key(&self) -> (u64, u32) {
        (self.block_number, self.tx_index)
    }
}

/// Event categories as fetched from the chain, one filter per category.
///
/// `MarketAdded` is structural and is fetched before everything else:
/// economic events for a market cannot be dispatched until the market's
/// accumulator slot exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    MarketAdded,
    ParametersChanged,
    CollateralChanged,
    MarketRemoved,
    Deposit,
    Withdraw,
    PositionChanged,
    LiquidityChanged,
    FundingPaid,
    Liquidation,
}

impl EventCategory {
    /// Every category except the structural `MarketAdded` one.
    pub const ECONOMIC: [EventCategory; 9] = [
        EventCategory::ParametersChanged,
        EventCategory::CollateralChanged,
        EventCategory::MarketRemoved,
        EventCategory::Deposit,
        EventCategory::Withdraw,
        EventCategory::PositionChanged,
        EventCategory::LiquidityChanged,
        EventCategory::FundingPaid,
        EventCategory::Liquidation,
    ];
}

/// Decoded arguments of one protocol event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Clearinghouse risk parameters replaced wholesale.
    ParametersChanged {
        min_margin: i128,
        ua_debt_seizure_threshold: i128,
        non_ua_coll_seizure_discount: i128,
        liquidation_reward: i128,
        liquidation_reward_insurance_share: i128,
    },
    /// A collateral asset listed or its haircut weight changed.
    CollateralWeightChanged { asset: Address, weight: i128 },
    /// A new perpetual market listed at `market`.
    MarketAdded { market: MarketIdx },
    /// Market delisted; all of its positions drop out of the mirror.
    MarketRemoved { market: MarketIdx },
    Deposit {
        account: Address,
        asset: Address,
        amount: i128,
    },
    Withdraw {
        account: Address,
        asset: Address,
        amount: i128,
    },
    /// A trader's net position changed.
    ///
    /// On reductions (`is_increase == false`) the reported
    /// `added_open_notional` already folds in realized profit and
    /// trading fees; the handler backs both out before applying it.
    PositionChanged {
        market: MarketIdx,
        account: Address,
        added_open_notional: i128,
        added_position_size: i128,
        profit: i128,
        trading_fees_paid: i128,
        is_increase: bool,
        is_closed: bool,
    },
    /// Funding settled against an account's settlement reserve.
    FundingPaid {
        market: MarketIdx,
        account: Address,
        amount: i128,
        /// Global accumulator value at settlement time; becomes the
        /// account's new snapshot if it holds a matching position.
        cumulative_rate: i128,
        is_trader: bool,
    },
    /// Liquidity provided to or removed from a market's AMM.
    ///
    /// Derived share/fee state is non-linear in protocol-wide
    /// accumulators and is re-read once per account after the batch
    /// rather than mutated inline.
    LiquidityChanged {
        market: MarketIdx,
        account: Address,
        trading_fees_earned: i128,
        /// True when the account's entire liquidity was withdrawn.
        removed_all: bool,
    },
    /// A trader or LP position forcibly closed by a liquidator.
    Liquidation {
        market: MarketIdx,
        liquidatee: Address,
        liquidator: Address,
        /// Absolute notional that was liquidated (reward base).
        notional: i128,
        /// Residual profit credited back to the liquidated account.
        profit: i128,
        is_trader: bool,
    },
    /// A protocol log the transport could not decode. Fatal downstream.
    Unknown { name: String },
}

impl EventPayload {
    /// The fetch category this payload is returned under, or `None`
    /// for undecodable logs (those surface in whichever category's
    /// filter matched their address).
    pub fn category(&self) -> Option<EventCategory> {
        match self {
            EventPayload::ParametersChanged { .. } => Some(EventCategory::ParametersChanged),
            EventPayload::CollateralWeightChanged { .. } => {
                Some(EventCategory::CollateralChanged)
            }
            EventPayload::MarketAdded { .. } => Some(EventCategory::MarketAdded),
            EventPayload::MarketRemoved { .. } => Some(EventCategory::MarketRemoved),
            EventPayload::Deposit { .. } => Some(EventCategory::Deposit),
            EventPayload::Withdraw { .. } => Some(EventCategory::Withdraw),
            EventPayload::PositionChanged { .. } => Some(EventCategory::PositionChanged),
            EventPayload::LiquidityChanged { .. } => Some(EventCategory::LiquidityChanged),
            EventPayload::FundingPaid { .. } => Some(EventCategory::FundingPaid),
            EventPayload::Liquidation { .. } => Some(EventCategory::Liquidation),
            EventPayload::Unknown { .. } => None,
        }
    }
}
