//! Reader/writer traits at the chain boundary
//!
//! `ChainReader` covers log queries and point-in-time contract state
//! reads; `ChainWriter` covers transaction submission and inclusion.
//! Both are object-safe async traits so the keeper can run against a
//! real RPC transport in production and an in-memory mock in tests.

use async_trait::async_trait;
use thiserror::Error;
use types::ids::{Address, MarketIdx, PositionKind};

use crate::events::{ChainEvent, EventCategory};

// ── Errors ──────────────────────────────────────────────────────────

/// Read-path failures. All variants are transient: the replicator
/// discards the in-progress sync attempt and retries from the last
/// committed checkpoint.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("rpc request timed out")]
    Timeout,

    #[error("rpc error: {0}")]
    Rpc(String),
}

/// Write-path failures.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// The tracked nonce no longer matches the chain. Recovered by
    /// re-querying the nonce and cooling down, never by hot retry.
    #[error("invalid nonce")]
    InvalidNonce,

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

// ── Point-in-time read results ──────────────────────────────────────

/// Static per-market contract bindings, read once at listing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketStatics {
    /// AMM out-fee in the curve's 10-decimal scale.
    pub out_fee: i128,
    /// Risk weight applied to this market's debt.
    pub risk_weight: i128,
    /// Extra coefficient applied to LP debt before risk weighting.
    pub lp_debt_coefficient: i128,
}

/// Live per-market fields refreshed by direct state reads each sync.
///
/// Accumulators drift continuously and cannot be replayed cheaply from
/// logs, so they are point-in-time reads rather than event-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketLiveState {
    pub index_price: i128,
    pub quote_amm_reserve: i128,
    pub base_amm_reserve: i128,
    pub total_liquidity: i128,
    pub cum_funding_rate: i128,
    pub cum_funding_per_lp_token: i128,
    pub trading_fee_growth: i128,
    pub quote_fee_growth: i128,
    pub base_fee_growth: i128,
}

/// Derived LP position state, re-read after each sync batch for every
/// account whose liquidity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LpAccountState {
    pub open_notional: i128,
    pub position_size: i128,
    pub liquidity_balance: i128,
    pub quote_fee_growth: i128,
    pub base_fee_growth: i128,
    pub trading_fee_growth: i128,
    pub cum_funding_per_lp_token: i128,
}

// ── Outbound calls ──────────────────────────────────────────────────

/// Protocol-specific corrective calls the keeper can submit.
///
/// `proposed_amount` comes from the protocol's own proposed-amount view
/// call; the slippage bound is pinned to zero as the reference deployment
/// submits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolCall {
    LiquidateTrader {
        market: MarketIdx,
        account: Address,
        proposed_amount: i128,
        min_amount: i128,
    },
    LiquidateLp {
        market: MarketIdx,
        account: Address,
        proposed_amount: i128,
        min_amounts: [i128; 2],
    },
    SeizeCollateral { account: Address },
}

/// Broadcast handle returned by `ChainWriter::submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx(pub String);

/// Inclusion result of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOutcome {
    pub success: bool,
}

// ── Traits ──────────────────────────────────────────────────────────

/// Read side of the chain boundary.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current chain head.
    async fn latest_block(&self) -> Result<u64, ChainError>;

    /// The vault's settlement-asset (UA) address.
    async fn settlement_asset(&self) -> Result<Address, ChainError>;

    /// All events of one category in `[from, to]`, in discovery order.
    async fn fetch_events(
        &self,
        category: EventCategory,
        from: u64,
        to: u64,
    ) -> Result<Vec<ChainEvent>, ChainError>;

    /// Static bindings of a newly listed market.
    async fn market_statics(&self, market: MarketIdx) -> Result<MarketStatics, ChainError>;

    /// Live fields of a known market.
    async fn market_live_state(&self, market: MarketIdx)
        -> Result<MarketLiveState, ChainError>;

    /// Derived LP position state for one account.
    async fn lp_account_state(
        &self,
        market: MarketIdx,
        account: &Address,
    ) -> Result<LpAccountState, ChainError>;

    /// The protocol-suggested close amount for a liquidation.
    async fn proposed_close_amount(
        &self,
        market: MarketIdx,
        account: &Address,
        kind: PositionKind,
    ) -> Result<i128, ChainError>;
}

/// Write side of the chain boundary. Signing happens behind `submit`.
#[async_trait]
pub trait ChainWriter: Send + Sync {
    /// Current transaction count of `account` on the chain.
    async fn nonce(&self, account: &Address) -> Result<u64, ChainError>;

    /// Sign and broadcast `call` with the given nonce.
    async fn submit(&self, call: ProtocolCall, nonce: u64) -> Result<PendingTx, SubmitError>;

    /// Block until `tx` is included and report its status.
    async fn wait_for_inclusion(&self, tx: PendingTx) -> Result<TxOutcome, SubmitError>;
}
