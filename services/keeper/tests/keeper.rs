//! Keeper cycle tests against an in-memory chain and writer
//!
//! Covers the decision path end to end: an undercollateralized trader
//! triggers a liquidation submission, a healthy one does not, a
//! settlement-asset debtor is seized, and a nonce desynchronization is
//! recovered without a hot retry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chain::client::{
    ChainError, ChainReader, ChainWriter, LpAccountState, MarketLiveState, MarketStatics,
    PendingTx, ProtocolCall, SubmitError, TxOutcome,
};
use chain::events::{ChainEvent, EventCategory, EventPayload};
use keeper::{Keeper, KeeperConfig};
use types::ids::{Address, MarketIdx, PositionKind};
use types::numeric::WAD;

// ── Mock chain (read side) ──────────────────────────────────────────

struct ChainState {
    head: AtomicU64,
    ua: Address,
    events: Mutex<Vec<ChainEvent>>,
    statics: BTreeMap<MarketIdx, MarketStatics>,
    live: BTreeMap<MarketIdx, MarketLiveState>,
    proposed_amount: i128,
}

#[derive(Clone)]
struct MockChain(Arc<ChainState>);

impl MockChain {
    fn new(head: u64) -> Self {
        Self(Arc::new(ChainState {
            head: AtomicU64::new(head),
            ua: Address::new("0xua"),
            events: Mutex::new(Vec::new()),
            statics: BTreeMap::new(),
            live: BTreeMap::new(),
            proposed_amount: WAD,
        }))
    }

    fn with_market(mut self, idx: MarketIdx, index_price: i128) -> Self {
        let state = Arc::get_mut(&mut self.0).unwrap();
        state.statics.insert(
            idx,
            MarketStatics {
                out_fee: 30_000_000, // 0.3% in 10-decimal curve scale
                risk_weight: WAD,
                lp_debt_coefficient: WAD,
            },
        );
        state.live.insert(
            idx,
            MarketLiveState {
                index_price,
                quote_amm_reserve: 10_000 * WAD,
                base_amm_reserve: 100 * WAD,
                total_liquidity: 1_000 * WAD,
                cum_funding_rate: 0,
                cum_funding_per_lp_token: 0,
                trading_fee_growth: 0,
                quote_fee_growth: 0,
                base_fee_growth: 0,
            },
        );
        state
            .events
            .get_mut()
            .unwrap()
            .push(at(1, 0, EventPayload::MarketAdded { market: idx }));
        self
    }

    fn push(&self, block: u64, tx_index: u32, payload: EventPayload) {
        self.0.events.lock().unwrap().push(at(block, tx_index, payload));
    }

    fn advance_head(&self, head: u64) {
        self.0.head.store(head, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn latest_block(&self) -> Result<u64, ChainError> {
        Ok(self.0.head.load(Ordering::SeqCst))
    }

    async fn settlement_asset(&self) -> Result<Address, ChainError> {
        Ok(self.0.ua.clone())
    }

    async fn fetch_events(
        &self,
        category: EventCategory,
        from: u64,
        to: u64,
    ) -> Result<Vec<ChainEvent>, ChainError> {
        Ok(self
            .0
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|ev| ev.block_number >= from && ev.block_number <= to)
            .filter(|ev| ev.payload.category() == Some(category))
            .cloned()
            .collect())
    }

    async fn market_statics(&self, market: MarketIdx) -> Result<MarketStatics, ChainError> {
        self.0
            .statics
            .get(&market)
            .copied()
            .ok_or_else(|| ChainError::Rpc(format!("no such market {market}")))
    }

    async fn market_live_state(
        &self,
        market: MarketIdx,
    ) -> Result<MarketLiveState, ChainError> {
        self.0
            .live
            .get(&market)
            .copied()
            .ok_or_else(|| ChainError::Rpc(format!("no such market {market}")))
    }

    async fn lp_account_state(
        &self,
        _market: MarketIdx,
        account: &Address,
    ) -> Result<LpAccountState, ChainError> {
        Err(ChainError::Rpc(format!("no lp state for {account}")))
    }

    async fn proposed_close_amount(
        &self,
        _market: MarketIdx,
        _account: &Address,
        _kind: PositionKind,
    ) -> Result<i128, ChainError> {
        Ok(self.0.proposed_amount)
    }
}

// ── Mock writer ─────────────────────────────────────────────────────

#[derive(Default)]
struct WriterState {
    chain_nonce: AtomicU64,
    submissions: Mutex<Vec<(ProtocolCall, u64)>>,
    reject_next_as_stale: AtomicBool,
    revert_all: AtomicBool,
}

#[derive(Clone, Default)]
struct MockWriter(Arc<WriterState>);

impl MockWriter {
    fn submissions(&self) -> Vec<(ProtocolCall, u64)> {
        self.0.submissions.lock().unwrap().clone()
    }

    /// Simulate transactions landed outside the keeper.
    fn desync_nonce(&self, chain_nonce: u64) {
        self.0.chain_nonce.store(chain_nonce, Ordering::SeqCst);
        self.0.reject_next_as_stale.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainWriter for MockWriter {
    async fn nonce(&self, _account: &Address) -> Result<u64, ChainError> {
        Ok(self.0.chain_nonce.load(Ordering::SeqCst))
    }

    async fn submit(&self, call: ProtocolCall, nonce: u64) -> Result<PendingTx, SubmitError> {
        if self.0.reject_next_as_stale.swap(false, Ordering::SeqCst) {
            return Err(SubmitError::InvalidNonce);
        }
        let mut submissions = self.0.submissions.lock().unwrap();
        submissions.push((call, nonce));
        self.0.chain_nonce.store(nonce + 1, Ordering::SeqCst);
        Ok(PendingTx(format!("0xtx{}", submissions.len())))
    }

    async fn wait_for_inclusion(&self, _tx: PendingTx) -> Result<TxOutcome, SubmitError> {
        Ok(TxOutcome {
            success: !self.0.revert_all.load(Ordering::SeqCst),
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn alice() -> Address {
    Address::new("0xalice")
}

fn keeper_account() -> Address {
    Address::new("0xkeeper")
}

fn at(block: u64, tx_index: u32, payload: EventPayload) -> ChainEvent {
    ChainEvent {
        block_number: block,
        tx_index,
        payload,
    }
}

fn protocol_params() -> EventPayload {
    EventPayload::ParametersChanged {
        min_margin: WAD / 40, // 2.5%
        ua_debt_seizure_threshold: 5 * WAD,
        non_ua_coll_seizure_discount: WAD / 2,
        liquidation_reward: WAD / 66,
        liquidation_reward_insurance_share: WAD / 2,
    }
}

fn ua_weight() -> EventPayload {
    EventPayload::CollateralWeightChanged {
        asset: Address::new("0xua"),
        weight: WAD,
    }
}

fn deposit(amount: i128) -> EventPayload {
    EventPayload::Deposit {
        account: alice(),
        asset: Address::new("0xua"),
        amount,
    }
}

fn long_ten_at_hundred() -> EventPayload {
    EventPayload::PositionChanged {
        market: MarketIdx(0),
        account: alice(),
        added_open_notional: -1_000 * WAD,
        added_position_size: 10 * WAD,
        profit: 0,
        trading_fees_paid: 0,
        is_increase: true,
        is_closed: false,
    }
}

/// Market at price 100 plus protocol parameters; the caller adds the
/// account history.
fn chain_at_hundred(head: u64) -> MockChain {
    let chain = MockChain::new(head).with_market(MarketIdx(0), 100 * WAD);
    chain.push(1, 1, protocol_params());
    chain.push(1, 2, ua_weight());
    chain
}

async fn keeper_for(
    chain: &MockChain,
    writer: &MockWriter,
    dir: &tempfile::TempDir,
) -> Keeper<MockChain, MockWriter> {
    let config = KeeperConfig::new(dir.path().join("state.json"), 0, keeper_account());
    Keeper::open(chain.clone(), writer.clone(), config)
        .await
        .unwrap()
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn insolvent_trader_is_liquidated() {
    let chain = chain_at_hundred(10);
    // 10 deposited against a 1000-notional long: margin requirement 25
    chain.push(2, 0, deposit(10 * WAD));
    chain.push(3, 0, long_ten_at_hundred());

    let writer = MockWriter::default();
    let dir = tempfile::tempdir().unwrap();
    let mut keeper = keeper_for(&chain, &writer, &dir).await;

    keeper.cycle().await.unwrap();

    let submissions = writer.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(
        submissions[0],
        (
            ProtocolCall::LiquidateTrader {
                market: MarketIdx(0),
                account: alice(),
                proposed_amount: WAD,
                min_amount: 0,
            },
            0,
        )
    );
}

#[tokio::test]
async fn healthy_account_is_left_alone() {
    let chain = chain_at_hundred(10);
    chain.push(2, 0, deposit(1_000 * WAD));
    chain.push(3, 0, long_ten_at_hundred());

    let writer = MockWriter::default();
    let dir = tempfile::tempdir().unwrap();
    let mut keeper = keeper_for(&chain, &writer, &dir).await;

    keeper.cycle().await.unwrap();

    assert!(writer.submissions().is_empty());
}

#[tokio::test]
async fn settlement_debtor_is_seized() {
    let chain = chain_at_hundred(10);
    // Funding loss pushes the settlement balance below the threshold
    chain.push(
        2,
        0,
        EventPayload::FundingPaid {
            market: MarketIdx(0),
            account: alice(),
            amount: -10 * WAD,
            cumulative_rate: WAD,
            is_trader: true,
        },
    );

    let writer = MockWriter::default();
    let dir = tempfile::tempdir().unwrap();
    let mut keeper = keeper_for(&chain, &writer, &dir).await;

    keeper.cycle().await.unwrap();

    let submissions = writer.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(
        submissions[0].0,
        ProtocolCall::SeizeCollateral { account: alice() },
    );
}

#[tokio::test(start_paused = true)]
async fn nonce_desync_is_recovered_on_the_next_cycle() {
    let chain = chain_at_hundred(10);
    chain.push(2, 0, deposit(10 * WAD));
    chain.push(3, 0, long_ten_at_hundred());

    let writer = MockWriter::default();
    let dir = tempfile::tempdir().unwrap();
    let mut keeper = keeper_for(&chain, &writer, &dir).await;

    // Transactions landed outside the keeper after the nonce was seeded
    writer.desync_nonce(7);

    // First attempt is postponed: nothing broadcast, cool-down served
    keeper.cycle().await.unwrap();
    assert!(writer.submissions().is_empty());

    // Still insolvent at the next block; resynced nonce is used
    chain.advance_head(11);
    keeper.cycle().await.unwrap();

    let submissions = writer.submissions();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].1, 7);
}

#[tokio::test(start_paused = true)]
async fn no_new_block_is_a_quiet_cycle() {
    let chain = chain_at_hundred(10);
    chain.push(2, 0, deposit(10 * WAD));
    chain.push(3, 0, long_ten_at_hundred());

    let writer = MockWriter::default();
    let dir = tempfile::tempdir().unwrap();
    let mut keeper = keeper_for(&chain, &writer, &dir).await;

    keeper.cycle().await.unwrap();
    assert_eq!(writer.submissions().len(), 1);

    // Head unchanged: wait out the poll interval, submit nothing new,
    // even though the mirror still holds the stale insolvent position
    keeper.cycle().await.unwrap();
    assert_eq!(writer.submissions().len(), 1);
}

#[tokio::test]
async fn reverted_transaction_does_not_stop_the_cycle() {
    let chain = chain_at_hundred(10);
    chain.push(2, 0, deposit(10 * WAD));
    chain.push(3, 0, long_ten_at_hundred());

    let writer = MockWriter::default();
    writer.0.revert_all.store(true, Ordering::SeqCst);
    let dir = tempfile::tempdir().unwrap();
    let mut keeper = keeper_for(&chain, &writer, &dir).await;

    keeper.cycle().await.unwrap();

    // Broadcast went out and the nonce advanced despite the revert
    assert_eq!(writer.submissions().len(), 1);
    chain.advance_head(11);
    keeper.cycle().await.unwrap();
    assert_eq!(writer.submissions()[1].1, 1);
}
