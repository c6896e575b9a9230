//! Keeper tuning knobs

use std::path::PathBuf;
use std::time::Duration;
use types::ids::Address;

/// Configuration for one keeper instance.
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// Path of the persisted checkpoint document.
    pub checkpoint_path: PathBuf,
    /// Block the protocol was deployed at; first-run sync floor.
    pub deployment_block: u64,
    /// This keeper's own account, beneficiary of its liquidations.
    pub own_account: Address,
    /// Sleep between head polls while no new block has arrived. A push
    /// subscription from the transport could replace this wait.
    pub poll_interval: Duration,
    /// Cool-down after a failed cycle or a nonce desynchronization.
    pub failure_cooldown: Duration,
    /// Wall-clock heartbeat cadence, independent of block cadence.
    pub heartbeat_interval: Duration,
}

impl KeeperConfig {
    pub fn new(
        checkpoint_path: impl Into<PathBuf>,
        deployment_block: u64,
        own_account: Address,
    ) -> Self {
        Self {
            checkpoint_path: checkpoint_path.into(),
            deployment_block,
            own_account,
            poll_interval: Duration::from_secs(20),
            failure_cooldown: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(60),
        }
    }
}
