//! Liquidation Loop — the only component with side effects
//!
//! Drives the replicator once per new block, evaluates the risk engine
//! over every tracked account on the quiesced snapshot, and submits
//! corrective transactions with nonce-failure recovery and rate-limited
//! retry. Generic over the chain reader/writer traits; process
//! bootstrapping (network selection, keys, RPC endpoint) lives outside
//! this crate.
//!
//! # Modules
//! - `config`: keeper tuning knobs
//! - `submit`: transaction submission with nonce recovery
//! - `run`: the per-block cycle and the forever loop

pub mod config;
pub mod run;
pub mod submit;

pub use config::KeeperConfig;
pub use run::{Keeper, KeeperError};
pub use submit::{SubmitOutcome, Submitter};
