//! Per-event state-transition rules
//!
//! Each handler is a pure mutation of the working ledger copy given one
//! event's decoded arguments. Handlers run strictly in `(block,
//! tx_index)` order, never grouped by category. An event the handler
//! set does not recognize stops the replicator: an unapplied economic
//! effect would be invisible to the mirror and corrupt every derived
//! risk decision downstream.

use std::collections::BTreeSet;
use thiserror::Error;
use tracing::debug;

use chain::events::{ChainEvent, EventPayload};
use ledger::store::{LedgerStore, RiskParameters, TraderPosition};
use types::ids::{Address, MarketIdx};
use types::numeric::wad_mul;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// Fatal: stopping is the only option that keeps the mirror honest.
    #[error("unrecognized protocol event '{0}'")]
    UnrecognizedEvent(String),

    /// An economic event referenced a market that was never registered.
    #[error("event for unregistered market {0}")]
    UnknownMarket(MarketIdx),
}

/// Accounts whose LP derived state must be re-read after the batch.
pub type LpRefreshSet = BTreeSet<(MarketIdx, Address)>;

/// Apply one event to the working store.
///
/// `own_account` is the keeper's own address, used only to accumulate
/// the self-earned-rewards counter.
pub fn apply(
    store: &mut LedgerStore,
    own_account: &Address,
    event: &ChainEvent,
    lp_refresh: &mut LpRefreshSet,
) -> Result<(), HandlerError> {
    match &event.payload {
        EventPayload::ParametersChanged {
            min_margin,
            ua_debt_seizure_threshold,
            non_ua_coll_seizure_discount,
            liquidation_reward,
            liquidation_reward_insurance_share,
        } => {
            store.params = RiskParameters {
                min_margin: *min_margin,
                ua_debt_seizure_threshold: *ua_debt_seizure_threshold,
                non_ua_coll_seizure_discount: *non_ua_coll_seizure_discount,
                liquidation_reward: *liquidation_reward,
                liquidation_reward_insurance_share: *liquidation_reward_insurance_share,
            };
        }

        EventPayload::CollateralWeightChanged { asset, weight } => {
            store.reserve_weights.insert(asset.clone(), *weight);
        }

        // Registration happens before economic dispatch (sync step 2);
        // seeing the log again in the merged stream is expected.
        EventPayload::MarketAdded { market } => {
            debug!(%market, "market already registered, skipping structural event");
        }

        EventPayload::MarketRemoved { market } => {
            store.remove_market(*market);
            lp_refresh.retain(|(idx, _)| idx != market);
        }

        EventPayload::Deposit {
            account,
            asset,
            amount,
        } => {
            store.credit_reserve(account, asset, *amount);
        }

        EventPayload::Withdraw {
            account,
            asset,
            amount,
        } => {
            store.credit_reserve(account, asset, -*amount);
        }

        EventPayload::PositionChanged {
            market,
            account,
            added_open_notional,
            added_position_size,
            profit,
            trading_fees_paid,
            is_increase,
            is_closed,
        } => {
            let snapshot = store
                .global_positions
                .get(market)
                .ok_or(HandlerError::UnknownMarket(*market))?
                .cum_funding_rate;

            // Realized profit settles into the reserve immediately.
            store.credit_ua(account, *profit);

            // On reductions the protocol reports a profit-and-fee
            // inclusive notional delta; back both out before applying.
            let mut added_open_notional = *added_open_notional;
            if !is_increase {
                added_open_notional -= profit + trading_fees_paid;
            }

            let table = store
                .trader_positions
                .get_mut(market)
                .ok_or(HandlerError::UnknownMarket(*market))?;
            let position = table.entry(account.clone()).or_insert(TraderPosition {
                open_notional: 0,
                position_size: 0,
                cum_funding_rate: snapshot,
            });
            position.open_notional += added_open_notional;
            position.position_size += *added_position_size;

            if *is_closed {
                table.remove(account);
            }
        }

        EventPayload::FundingPaid {
            market,
            account,
            amount,
            cumulative_rate,
            is_trader,
        } => {
            store.credit_ua(account, *amount);

            // Snapshot advances only for a tracked position of the
            // matching kind; otherwise the event is reserve-only.
            if *is_trader {
                if let Some(position) = store
                    .trader_positions
                    .get_mut(market)
                    .and_then(|t| t.get_mut(account))
                {
                    position.cum_funding_rate = *cumulative_rate;
                }
            } else if let Some(position) = store
                .lp_positions
                .get_mut(market)
                .and_then(|t| t.get_mut(account))
            {
                position.cum_funding_per_lp_token = *cumulative_rate;
            }
        }

        EventPayload::LiquidityChanged {
            market,
            account,
            trading_fees_earned,
            removed_all,
        } => {
            if !store.has_market(*market) {
                return Err(HandlerError::UnknownMarket(*market));
            }

            store.credit_ua(account, *trading_fees_earned);

            let table = store
                .lp_positions
                .get_mut(market)
                .ok_or(HandlerError::UnknownMarket(*market))?;
            if *removed_all {
                table.remove(account);
                lp_refresh.remove(&(*market, account.clone()));
            } else {
                // Shares and fee snapshots are non-linear functions of
                // protocol-wide accumulators; re-read once after the
                // batch instead of mutating them inline.
                table.entry(account.clone()).or_default();
                lp_refresh.insert((*market, account.clone()));
            }
        }

        EventPayload::Liquidation {
            market,
            liquidatee,
            liquidator,
            notional,
            profit,
            is_trader,
        } => {
            if !store.has_market(*market) {
                return Err(HandlerError::UnknownMarket(*market));
            }

            let total_reward = wad_mul(*notional, store.params.liquidation_reward);
            let insurance_share =
                wad_mul(total_reward, store.params.liquidation_reward_insurance_share);
            let liquidator_share = total_reward - insurance_share;

            store.credit_ua(liquidator, liquidator_share);
            store.credit_ua(liquidatee, *profit);

            if *is_trader {
                if let Some(table) = store.trader_positions.get_mut(market) {
                    table.remove(liquidatee);
                }
            } else {
                if let Some(table) = store.lp_positions.get_mut(market) {
                    table.remove(liquidatee);
                }
                lp_refresh.remove(&(*market, liquidatee.clone()));
            }

            if liquidator == own_account {
                store.liquidation_rewards += liquidator_share;
            }
        }

        EventPayload::Unknown { name } => {
            return Err(HandlerError::UnrecognizedEvent(name.clone()));
        }
    }

    Ok(())
}
