//! Transaction submission with nonce recovery
//!
//! The submitter tracks its own nonce locally and only falls back to
//! the chain when a submission reports a nonce mismatch. Recovery is
//! deliberately slow: re-query the nonce, then cool down before the
//! caller may try again. The cool-down is the safety valve against a
//! hot retry loop hammering a transiently desynchronized node.

use std::time::Duration;
use tracing::{info, warn};

use chain::client::{ChainError, ChainReader, ChainWriter, ProtocolCall, SubmitError};
use types::ids::{Address, MarketIdx, PositionKind};

/// What became of one corrective transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Included and successful.
    Confirmed,
    /// Included but reverted on-chain.
    Reverted,
    /// Not broadcast: nonce resynchronized, cool-down served.
    Postponed,
}

pub struct Submitter<W: ChainWriter> {
    writer: W,
    own_account: Address,
    nonce: u64,
    cooldown: Duration,
}

impl<W: ChainWriter> Submitter<W> {
    /// Seed the local nonce from the chain.
    pub async fn open(
        writer: W,
        own_account: Address,
        cooldown: Duration,
    ) -> Result<Self, ChainError> {
        let nonce = writer.nonce(&own_account).await?;
        Ok(Self {
            writer,
            own_account,
            nonce,
            cooldown,
        })
    }

    /// Liquidate one position, sized by the protocol's own proposed
    /// close amount with a zero slippage bound.
    pub async fn liquidate<R: ChainReader>(
        &mut self,
        reader: &R,
        market: MarketIdx,
        account: &Address,
        kind: PositionKind,
    ) -> Result<SubmitOutcome, SubmitError> {
        let proposed_amount = reader.proposed_close_amount(market, account, kind).await?;
        let call = match kind {
            PositionKind::Trader => ProtocolCall::LiquidateTrader {
                market,
                account: account.clone(),
                proposed_amount,
                min_amount: 0,
            },
            PositionKind::Lp => ProtocolCall::LiquidateLp {
                market,
                account: account.clone(),
                proposed_amount,
                min_amounts: [0, 0],
            },
        };
        info!(%market, %account, %kind, proposed_amount, "submitting liquidation");
        self.send(call).await
    }

    /// Seize a debt-ridden account's remaining collateral.
    pub async fn seize_collateral(
        &mut self,
        account: &Address,
    ) -> Result<SubmitOutcome, SubmitError> {
        info!(%account, "submitting collateral seizure");
        self.send(ProtocolCall::SeizeCollateral {
            account: account.clone(),
        })
        .await
    }

    async fn send(&mut self, call: ProtocolCall) -> Result<SubmitOutcome, SubmitError> {
        match self.writer.submit(call, self.nonce).await {
            Ok(pending) => {
                let outcome = self.writer.wait_for_inclusion(pending).await?;
                self.nonce += 1;
                if outcome.success {
                    Ok(SubmitOutcome::Confirmed)
                } else {
                    Ok(SubmitOutcome::Reverted)
                }
            }
            Err(SubmitError::InvalidNonce) => {
                let fresh = self.writer.nonce(&self.own_account).await?;
                warn!(
                    stale = self.nonce,
                    fresh, "nonce desynchronized, resyncing and cooling down"
                );
                self.nonce = fresh;
                tokio::time::sleep(self.cooldown).await;
                Ok(SubmitOutcome::Postponed)
            }
            Err(err) => Err(err),
        }
    }
}
