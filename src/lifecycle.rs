//! Match lifecycle state machine.
//!
//! Owns every status write. Transitions fire on wall-clock deadlines,
//! capture oracle readings at the boundaries that need them, and are
//! single-shot: once a status has been left it is never revisited, and
//! re-invoking `advance` when no condition holds is a no-op rather than an
//! error. If the oracle fails at a capture point the match is left exactly
//! as it was and the next sweep retries.

use tracing::{debug, info};

use crate::error::{ArenaError, ArenaResult};
use crate::ledger::PoolLedger;
use crate::models::{Match, MatchStatus};
use crate::oracle::{Clock, PriceOracle};
use crate::settlement::{self, Settlement};

/// What an `advance` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No transition condition held.
    None,
    /// Open -> InProgress, start price captured.
    Started,
    /// Reached Cancelled; all stakes refunded in full.
    Cancelled,
    /// InProgress -> Completed, end price captured and settled.
    Completed,
}

/// Advance one match by at most one transition.
///
/// At the prediction deadline the match either starts (both sides have
/// stake; start price captured) or cancels with a full refund (the only
/// refund path besides administrative cancellation). At resolution time
/// the end price is captured and settlement runs immediately, writing
/// every entry's winnings. Oracle errors propagate with no state change.
pub async fn advance(
    mtch: &mut Match,
    ledger: &mut PoolLedger,
    clock: &dyn Clock,
    oracle: &dyn PriceOracle,
) -> ArenaResult<(Transition, Option<Settlement>)> {
    match mtch.status {
        MatchStatus::Open => {
            let now = clock.now();
            if now < mtch.prediction_deadline() {
                return Ok((Transition::None, None));
            }
            if !ledger.has_both_sides() {
                let settlement = Settlement::refund(mtch.match_id, ledger.entries());
                ledger.apply_settlement(&settlement);
                mtch.status = MatchStatus::Cancelled;
                mtch.resolved_at = Some(now);
                info!(
                    match_id = mtch.match_id,
                    refunded = settlement.payouts.len(),
                    "Match cancelled at deadline: no opposing stake"
                );
                return Ok((Transition::Cancelled, Some(settlement)));
            }

            let reading = oracle.read(&mtch.config.symbol).await?;
            mtch.start_price = Some(reading.price);
            mtch.status = MatchStatus::InProgress;
            mtch.started_at = Some(now);
            info!(
                match_id = mtch.match_id,
                symbol = %mtch.config.symbol,
                start_price = reading.price,
                "Match started"
            );
            Ok((Transition::Started, None))
        }
        MatchStatus::InProgress => {
            let now = clock.now();
            if now < mtch.resolution_time() {
                return Ok((Transition::None, None));
            }
            let start_price = mtch.start_price.ok_or(ArenaError::NotResolved)?;

            let reading = oracle.read(&mtch.config.symbol).await?;
            let settlement = settlement::settle(
                mtch.match_id,
                start_price,
                reading.price,
                mtch.config.fee_bps,
                ledger,
            )?;
            ledger.apply_settlement(&settlement);
            mtch.end_price = Some(reading.price);
            mtch.winning_side = settlement.winning_side;
            mtch.status = MatchStatus::Completed;
            mtch.resolved_at = Some(now);
            info!(
                match_id = mtch.match_id,
                start_price,
                end_price = reading.price,
                winning_side = settlement
                    .winning_side
                    .map(|s| s.as_str())
                    .unwrap_or("refund"),
                protocol_fee = settlement.protocol_fee,
                "Match completed"
            );
            Ok((Transition::Completed, Some(settlement)))
        }
        MatchStatus::Completed | MatchStatus::Cancelled => {
            debug!(match_id = mtch.match_id, "Advance on terminal match, no-op");
            Ok((Transition::None, None))
        }
    }
}

/// Administrative cancellation. Full refund, same policy as the
/// no-opposing-stake path. Idempotent once Cancelled; rejected after
/// Completed (terminal states never regress).
pub fn cancel(
    mtch: &mut Match,
    ledger: &mut PoolLedger,
    now: i64,
) -> ArenaResult<Option<Settlement>> {
    match mtch.status {
        MatchStatus::Cancelled => Ok(None),
        MatchStatus::Completed => Err(ArenaError::MatchClosed(
            "match already resolved".to_string(),
        )),
        MatchStatus::Open | MatchStatus::InProgress => {
            let settlement = Settlement::refund(mtch.match_id, ledger.entries());
            ledger.apply_settlement(&settlement);
            mtch.status = MatchStatus::Cancelled;
            mtch.resolved_at = Some(now);
            info!(
                match_id = mtch.match_id,
                refunded = settlement.payouts.len(),
                "Match cancelled by administrator"
            );
            Ok(Some(settlement))
        }
    }
}
