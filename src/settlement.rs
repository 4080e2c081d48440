//! Settlement engine: exact pari-mutuel payouts from captured prices.
//!
//! Pure integer arithmetic over already-immutable inputs. Identical inputs
//! always produce identical outputs, and the conservation invariant holds
//! to the last unit: `sum(winnings) + protocol_fee == higher_pool +
//! lower_pool`. Every flooring remainder is accounted for explicitly and
//! retained by the protocol fee rather than silently vanishing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ArenaError, ArenaResult};
use crate::ledger::PoolLedger;
use crate::models::{PlayerEntry, Side, BASIS_POINTS};

/// One participant's settled amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
    pub player: Uuid,
    pub side: Side,
    pub staked: u64,
    pub winnings: u64,
}

/// Result of settling one match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub match_id: u64,
    /// None encodes the refund cases: tie, cancellation, one-sided pool.
    pub winning_side: Option<Side>,
    pub total_pot: u64,
    pub protocol_fee: u64,
    pub payouts: Vec<Payout>,
}

impl Settlement {
    pub fn payout_for(&self, player: Uuid) -> Option<u64> {
        self.payouts
            .iter()
            .find(|p| p.player == player)
            .map(|p| p.winnings)
    }

    /// Full refund: every entry gets its own stake back, no fee.
    pub fn refund<'a>(match_id: u64, entries: impl Iterator<Item = &'a PlayerEntry>) -> Self {
        let payouts: Vec<Payout> = entries
            .map(|e| Payout {
                player: e.player,
                side: e.side,
                staked: e.amount_staked,
                winnings: e.amount_staked,
            })
            .collect();
        let total_pot = payouts.iter().map(|p| p.staked).sum();
        Self {
            match_id,
            winning_side: None,
            total_pot,
            protocol_fee: 0,
            payouts,
        }
    }
}

/// Price movement over the match window.
fn compare_prices(start_price: u64, end_price: u64) -> Option<Side> {
    if end_price > start_price {
        Some(Side::Higher)
    } else if end_price < start_price {
        Some(Side::Lower)
    } else {
        None
    }
}

/// Settle a match from its captured prices and final ledger.
///
/// Payouts are pari-mutuel: a winning stake `s` in a winning pool `W`
/// against a losing pool `L` receives
///
/// ```text
/// gross     = s + floor(L * s / W)
/// fee_share = floor(protocol_fee * s / W)
/// winnings  = gross - fee_share
/// ```
///
/// Products are taken in u128 before any division; dividing first (a
/// normalized stake/pool ratio) truncates to zero for any stake smaller
/// than its pool. A tie or a one-sided pool refunds every stake in full
/// with no fee.
pub fn settle(
    match_id: u64,
    start_price: u64,
    end_price: u64,
    fee_bps: u16,
    ledger: &PoolLedger,
) -> ArenaResult<Settlement> {
    if fee_bps as u64 > BASIS_POINTS {
        return Err(ArenaError::InvalidConfiguration(format!(
            "fee {fee_bps} bps exceeds {BASIS_POINTS}"
        )));
    }
    let (higher_pool, lower_pool) = ledger.pool_totals();
    let total_pot = higher_pool
        .checked_add(lower_pool)
        .ok_or_else(|| ArenaError::InvalidStake("combined pools overflow".to_string()))?;
    if total_pot == 0 {
        return Err(ArenaError::EmptyPools);
    }

    let winning_side = match compare_prices(start_price, end_price) {
        Some(side) => side,
        None => return Ok(Settlement::refund(match_id, ledger.entries())),
    };

    let (winning_pool, losing_pool) = match winning_side {
        Side::Higher => (higher_pool, lower_pool),
        Side::Lower => (lower_pool, higher_pool),
    };
    // One-sided pools never reach InProgress, but a direct call must not
    // divide by zero or award a phantom pot.
    if winning_pool == 0 || losing_pool == 0 {
        return Ok(Settlement::refund(match_id, ledger.entries()));
    }

    let base_fee = (total_pot as u128 * fee_bps as u128 / BASIS_POINTS as u128) as u64;

    let mut payouts = Vec::new();
    let mut paid: u64 = 0;
    for entry in ledger.entries() {
        let winnings = if entry.side == winning_side {
            let s = entry.amount_staked as u128;
            let w = winning_pool as u128;
            let gross = entry.amount_staked + (losing_pool as u128 * s / w) as u64;
            let fee_share = (base_fee as u128 * s / w) as u64;
            gross - fee_share
        } else {
            0
        };
        paid += winnings;
        payouts.push(Payout {
            player: entry.player,
            side: entry.side,
            staked: entry.amount_staked,
            winnings,
        });
    }

    // The realized fee is whatever the winners did not receive: the base
    // fee plus any gross-payout flooring remainder, minus the units the
    // per-entry fee-share floors gave back. Computed explicitly so no unit
    // silently vanishes.
    let protocol_fee = total_pot - paid;
    debug_assert!(
        (protocol_fee as i128 - base_fee as i128).unsigned_abs() <= payouts.len() as u128
    );

    Ok(Settlement {
        match_id,
        winning_side: Some(winning_side),
        total_pot,
        protocol_fee,
        payouts,
    })
}
