//! Chain boundary for the liquidation keeper
//!
//! Everything the keeper knows about the chain passes through the two
//! traits defined here. The concrete RPC transport, ABI decoding, and
//! transaction signing live behind them; the rest of the workspace is
//! deterministic and testable against in-memory implementations.
//!
//! # Modules
//! - `events`: decoded protocol log records and their total order
//! - `client`: `ChainReader`/`ChainWriter` traits and call payloads

pub mod client;
pub mod events;

pub use client::{
    ChainError, ChainReader, ChainWriter, LpAccountState, MarketLiveState, MarketStatics,
    PendingTx, ProtocolCall, SubmitError, TxOutcome,
};
pub use events::{ChainEvent, EventCategory, EventPayload};
