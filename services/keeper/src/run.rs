//! The per-block cycle and the forever loop
//!
//! One logical thread of control: sync, then sequential evaluation of
//! every tracked position, then sequential submission of corrective
//! calls. The ledger is never mutated concurrently with risk-engine
//! reads; evaluation always runs on the quiesced committed snapshot.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, warn};

use chain::client::{ChainError, ChainReader, ChainWriter, SubmitError};
use ledger::checkpoint::CheckpointFile;
use replicator::{Replicator, SyncError};
use risk_engine::RiskEngine;
use types::ids::{Address, MarketIdx, PositionKind};

use crate::config::KeeperConfig;
use crate::submit::{SubmitOutcome, Submitter};

#[derive(Debug, thiserror::Error)]
pub enum KeeperError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl KeeperError {
    /// Unrecognized protocol events must stop the process; everything
    /// else is retried after a cool-down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, KeeperError::Sync(SyncError::Handler(_)))
    }
}

/// One corrective action decided by an evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Liquidate {
        market: MarketIdx,
        account: Address,
        kind: PositionKind,
    },
    Seize {
        account: Address,
    },
}

pub struct Keeper<R: ChainReader, W: ChainWriter> {
    reader: R,
    replicator: Replicator,
    engine: RiskEngine,
    submitter: Submitter<W>,
    poll_interval: Duration,
    failure_cooldown: Duration,
    heartbeat_interval: Duration,
    last_heartbeat: Instant,
}

impl<R: ChainReader, W: ChainWriter> Keeper<R, W> {
    pub async fn open(reader: R, writer: W, config: KeeperConfig) -> Result<Self, KeeperError> {
        let checkpoint = CheckpointFile::new(&config.checkpoint_path);
        let replicator = Replicator::open(
            &reader,
            checkpoint,
            config.deployment_block,
            config.own_account.clone(),
        )
        .await?;
        let submitter =
            Submitter::open(writer, config.own_account, config.failure_cooldown).await?;
        Ok(Self {
            reader,
            replicator,
            engine: RiskEngine::new(),
            submitter,
            poll_interval: config.poll_interval,
            failure_cooldown: config.failure_cooldown,
            heartbeat_interval: config.heartbeat_interval,
            last_heartbeat: Instant::now(),
        })
    }

    /// Run until process termination. Cycle failures are logged and
    /// retried after a cool-down so liquidation coverage survives
    /// transient RPC trouble. Fatal replication errors propagate out:
    /// the mirror can no longer be trusted.
    pub async fn run(mut self) -> Result<(), KeeperError> {
        loop {
            match self.cycle().await {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    error!(%err, "fatal replication error, stopping");
                    return Err(err);
                }
                Err(err) => {
                    error!(%err, "cycle failed, cooling down");
                    tokio::time::sleep(self.failure_cooldown).await;
                }
            }
            self.maybe_heartbeat();
        }
    }

    /// One pass of the state machine:
    /// `WAIT_FOR_NEW_BLOCK → SYNC → EVALUATE_ALL_POSITIONS → (LIQUIDATE)*`.
    pub async fn cycle(&mut self) -> Result<(), KeeperError> {
        let head = self.reader.latest_block().await?;
        if head <= self.replicator.synced_block() {
            tokio::time::sleep(self.poll_interval).await;
            return Ok(());
        }

        self.replicator.sync(&self.reader, head).await?;

        // Evaluation is read-only over the committed snapshot; no sync
        // runs until every decision below has been submitted.
        let actions = self.evaluate();
        for action in actions {
            match action {
                Action::Liquidate {
                    market,
                    account,
                    kind,
                } => {
                    let outcome = self
                        .submitter
                        .liquidate(&self.reader, market, &account, kind)
                        .await?;
                    self.report(&account, outcome);
                }
                Action::Seize { account } => {
                    let outcome = self.submitter.seize_collateral(&account).await?;
                    self.report(&account, outcome);
                }
            }
        }
        Ok(())
    }

    /// Sequential scan of every tracked account. Validity is an
    /// account-wide property, so it is computed once per account and
    /// an insolvent account yields one liquidation per open position.
    ///
    /// TODO: batch the read-only solvency checks with a multicall once
    /// the transport exposes one; with many open positions the
    /// per-account walk dominates the cycle.
    fn evaluate(&self) -> Vec<Action> {
        let store = self.replicator.store();
        let mut actions = Vec::new();
        let mut validity: BTreeMap<&Address, bool> = BTreeMap::new();

        for (idx, table) in &store.trader_positions {
            for account in table.keys() {
                let valid = *validity
                    .entry(account)
                    .or_insert_with(|| self.engine.is_position_valid(store, account));
                if !valid {
                    actions.push(Action::Liquidate {
                        market: *idx,
                        account: account.clone(),
                        kind: PositionKind::Trader,
                    });
                }
            }
        }
        for (idx, table) in &store.lp_positions {
            for account in table.keys() {
                let valid = *validity
                    .entry(account)
                    .or_insert_with(|| self.engine.is_position_valid(store, account));
                if !valid {
                    actions.push(Action::Liquidate {
                        market: *idx,
                        account: account.clone(),
                        kind: PositionKind::Lp,
                    });
                }
            }
        }

        for account in store.reserves.keys() {
            if self.engine.should_seize_collateral(store, account) {
                actions.push(Action::Seize {
                    account: account.clone(),
                });
            }
        }

        actions
    }

    fn report(&self, account: &Address, outcome: SubmitOutcome) {
        match outcome {
            SubmitOutcome::Confirmed => info!(%account, "corrective transaction confirmed"),
            SubmitOutcome::Reverted => warn!(%account, "corrective transaction reverted"),
            SubmitOutcome::Postponed => {
                warn!(%account, "corrective transaction postponed after nonce resync")
            }
        }
    }

    fn maybe_heartbeat(&mut self) {
        if self.last_heartbeat.elapsed() < self.heartbeat_interval {
            return;
        }
        self.last_heartbeat = Instant::now();
        let store = self.replicator.store();
        info!(
            synced_block = store.synced_block,
            trader_positions = store.tracked_trader_positions(),
            lp_positions = store.tracked_lp_positions(),
            liquidation_rewards = store.liquidation_rewards,
            "keeper heartbeat"
        );
    }
}
