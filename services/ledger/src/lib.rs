//! Ledger Store — in-memory mirror of on-chain margin accounting
//!
//! Holds the replicated protocol state the risk engine computes over,
//! backed by a persisted checkpoint document. Single-writer: only the
//! replicator mutates a store, and only between risk evaluations.
//!
//! # Modules
//! - `store`: the data model and its mutation helpers
//! - `checkpoint`: atomic load/persist of the checkpoint document

pub mod checkpoint;
pub mod store;

pub use checkpoint::{CheckpointError, CheckpointFile};
pub use store::{
    GlobalPosition, LedgerStore, LpPosition, Market, RiskParameters, TraderPosition,
};
