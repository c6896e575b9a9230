//! Event Replicator — keeps the ledger mirror in lockstep with the chain
//!
//! Fetches new log records since the last checkpoint, totally orders
//! them, dispatches per-category handlers that mutate a working copy of
//! the ledger, then commits a new checkpoint atomically. Failure
//! anywhere discards the working copy; the committed snapshot is never
//! mutated in place.
//!
//! # Modules
//! - `sync`: the sync algorithm and commit protocol
//! - `handlers`: per-event state-transition rules

pub mod handlers;
pub mod sync;

pub use handlers::HandlerError;
pub use sync::{Replicator, SyncError};
