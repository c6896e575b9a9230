//! The sync algorithm and commit protocol
//!
//! `sync` advances the mirror from `checkpoint+1` through a target
//! block inclusive, or leaves it untouched and reports failure. All
//! mutation happens on a working clone of the last committed snapshot;
//! the clone becomes the committed snapshot only after the checkpoint
//! document has been persisted. Retrying after any failure is therefore
//! safe by construction: partial work is simply dropped
//! (idempotent-by-discard, not idempotent-by-dedup).
//!
//! A committed checkpoint is never revisited; chain reorganizations
//! deeper than the poll cadence are a stated limitation.

use tracing::{debug, info};

use chain::client::{ChainError, ChainReader};
use chain::events::{ChainEvent, EventCategory, EventPayload};
use ledger::checkpoint::{CheckpointError, CheckpointFile};
use ledger::store::{LedgerStore, LpPosition, Market};
use types::ids::{Address, MarketIdx};

use crate::handlers::{self, HandlerError, LpRefreshSet};

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transient transport failure; retry the whole attempt.
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Fatal handler failure; the process must stop rather than drift.
    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// Drives the ledger mirror forward from checkpointed state.
pub struct Replicator {
    checkpoint: CheckpointFile,
    committed: LedgerStore,
    own_account: Address,
}

impl Replicator {
    /// Open the persisted checkpoint, creating a fresh one at
    /// `deployment_block` on first run (the settlement asset is read
    /// from the chain only in that case).
    pub async fn open<R: ChainReader>(
        reader: &R,
        checkpoint: CheckpointFile,
        deployment_block: u64,
        own_account: Address,
    ) -> Result<Self, SyncError> {
        // An existing checkpoint already carries the settlement-asset
        // address; only a first run queries the chain for it.
        let committed = if checkpoint.path().exists() {
            checkpoint.load()?
        } else {
            let ua_address = reader.settlement_asset().await?;
            checkpoint.load_or_init(deployment_block, ua_address)?
        };
        info!(
            synced_block = committed.synced_block,
            ua = %committed.ua_address,
            "replicator opened"
        );
        Ok(Self {
            checkpoint,
            committed,
            own_account,
        })
    }

    /// The last committed snapshot. Read-only; the risk engine and the
    /// liquidation loop evaluate against exactly this state.
    pub fn store(&self) -> &LedgerStore {
        &self.committed
    }

    pub fn synced_block(&self) -> u64 {
        self.committed.synced_block
    }

    /// Advance the mirror through `target_block` inclusive.
    pub async fn sync<R: ChainReader>(
        &mut self,
        reader: &R,
        target_block: u64,
    ) -> Result<(), SyncError> {
        if target_block <= self.committed.synced_block {
            return Ok(());
        }
        let from = self.committed.synced_block + 1;
        let mut working = self.committed.clone();

        // New listings first: economic dispatch for a market requires
        // its accumulator slot to already exist.
        self.register_new_markets(reader, &mut working, from, target_block)
            .await?;

        // Live fields are point-in-time reads, not event-derived:
        // accumulators drift continuously and cannot be replayed
        // cheaply from logs.
        self.refresh_markets(reader, &mut working).await?;

        // One totally ordered batch across every economic category.
        let mut events = Vec::new();
        for category in EventCategory::ECONOMIC {
            events.extend(reader.fetch_events(category, from, target_block).await?);
        }
        events.sort_by_key(ChainEvent::order_key);

        let mut lp_refresh = LpRefreshSet::new();
        for event in &events {
            handlers::apply(&mut working, &self.own_account, event, &mut lp_refresh)?;
        }

        // Deferred derived-state reads: once per touched LP account
        // after the whole batch, reflecting final post-batch state.
        for (idx, account) in &lp_refresh {
            let state = reader.lp_account_state(*idx, account).await?;
            if let Some(position) = working
                .lp_positions
                .get_mut(idx)
                .and_then(|table| table.get_mut(account))
            {
                *position = LpPosition {
                    open_notional: state.open_notional,
                    position_size: state.position_size,
                    liquidity_balance: state.liquidity_balance,
                    quote_fee_growth: state.quote_fee_growth,
                    base_fee_growth: state.base_fee_growth,
                    trading_fee_growth: state.trading_fee_growth,
                    cum_funding_per_lp_token: state.cum_funding_per_lp_token,
                };
            }
        }

        // Commit: checkpoint and state advance together or not at all.
        working.synced_block = target_block;
        self.checkpoint.persist(&working)?;
        info!(
            synced_block = target_block,
            events = events.len(),
            traders = working.tracked_trader_positions(),
            lps = working.tracked_lp_positions(),
            "sync committed"
        );
        self.committed = working;
        Ok(())
    }

    async fn register_new_markets<R: ChainReader>(
        &self,
        reader: &R,
        working: &mut LedgerStore,
        from: u64,
        to: u64,
    ) -> Result<(), SyncError> {
        let listings = reader
            .fetch_events(EventCategory::MarketAdded, from, to)
            .await?;
        for event in &listings {
            let EventPayload::MarketAdded { market } = &event.payload else {
                continue;
            };
            if working.has_market(*market) {
                continue;
            }
            let statics = reader.market_statics(*market).await?;
            working.register_market(
                *market,
                Market {
                    out_fee: statics.out_fee,
                    risk_weight: statics.risk_weight,
                    lp_debt_coefficient: statics.lp_debt_coefficient,
                    ..Market::default()
                },
            );
            debug!(market = %market, "registered newly listed market");
        }
        Ok(())
    }

    async fn refresh_markets<R: ChainReader>(
        &self,
        reader: &R,
        working: &mut LedgerStore,
    ) -> Result<(), SyncError> {
        let indices: Vec<MarketIdx> = working.perps.keys().copied().collect();
        for idx in indices {
            let live = reader.market_live_state(idx).await?;
            if let Some(market) = working.perps.get_mut(&idx) {
                market.index_price = live.index_price;
                market.quote_amm_reserve = live.quote_amm_reserve;
                market.base_amm_reserve = live.base_amm_reserve;
                market.total_liquidity = live.total_liquidity;
            }
            let global = working.global_positions.entry(idx).or_default();
            global.cum_funding_rate = live.cum_funding_rate;
            global.cum_funding_per_lp_token = live.cum_funding_per_lp_token;
            global.trading_fee_growth = live.trading_fee_growth;
            global.quote_fee_growth = live.quote_fee_growth;
            global.base_fee_growth = live.base_fee_growth;
        }
        Ok(())
    }
}
