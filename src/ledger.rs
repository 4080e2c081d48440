//! Pool ledger: authoritative stake aggregation for one match.
//!
//! The ledger owns the entries and the per-side running totals. The two
//! must never diverge: `higher_pool + lower_pool` equals the sum of all
//! recorded stakes at all times. Callers serialize access per match, so
//! the capacity check and the append below are atomic with respect to
//! concurrent submissions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ArenaError, ArenaResult};
use crate::models::{EntryId, Match, MatchStatus, PlayerEntry, Side};
use crate::settlement::Settlement;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolLedger {
    match_id: u64,
    entries: Vec<PlayerEntry>,
    higher_pool: u64,
    lower_pool: u64,
}

impl PoolLedger {
    pub fn new(match_id: u64) -> Self {
        Self {
            match_id,
            entries: Vec::new(),
            higher_pool: 0,
            lower_pool: 0,
        }
    }

    /// Record one stake. Rejects stakes against a match that is not open,
    /// past its prediction deadline, full, already entered by this
    /// participant, or outside the configured amount bounds. On success the
    /// entry is appended, the side's pool grows by `amount`, and the match
    /// player count is bumped in the same critical section.
    pub fn record_stake(
        &mut self,
        mtch: &mut Match,
        player: Uuid,
        side: Side,
        amount: u64,
        now: i64,
    ) -> ArenaResult<EntryId> {
        if mtch.status != MatchStatus::Open {
            return Err(ArenaError::MatchClosed(format!(
                "match is {}",
                mtch.status.as_str()
            )));
        }
        if now > mtch.prediction_deadline() {
            return Err(ArenaError::MatchClosed(
                "prediction window has closed".to_string(),
            ));
        }
        if mtch.current_players >= mtch.config.max_players {
            return Err(ArenaError::MatchClosed("match is full".to_string()));
        }
        if amount == 0 {
            return Err(ArenaError::InvalidStake("stake must be positive".to_string()));
        }
        if amount < mtch.config.min_stake || amount > mtch.config.max_stake {
            return Err(ArenaError::InvalidStake(format!(
                "stake {} outside bounds [{}, {}]",
                amount, mtch.config.min_stake, mtch.config.max_stake
            )));
        }
        if self.entries.iter().any(|e| e.player == player) {
            return Err(ArenaError::DuplicateEntry);
        }

        // Settlement sums both pools, so the combined pot must stay within
        // u64, not just the side being staked.
        self.higher_pool
            .checked_add(self.lower_pool)
            .and_then(|pot| pot.checked_add(amount))
            .ok_or_else(|| ArenaError::InvalidStake("pool overflow".to_string()))?;

        let pool = match side {
            Side::Higher => &mut self.higher_pool,
            Side::Lower => &mut self.lower_pool,
        };
        *pool += amount;

        let seq = self.entries.len() as u32;
        self.entries.push(PlayerEntry {
            match_id: self.match_id,
            player,
            side,
            amount_staked: amount,
            locked_at: now,
            winnings: 0,
            claimed: false,
        });
        mtch.current_players += 1;

        Ok(EntryId {
            match_id: self.match_id,
            seq,
        })
    }

    /// Aggregate stake per side: `(higher_pool, lower_pool)`.
    pub fn pool_totals(&self) -> (u64, u64) {
        (self.higher_pool, self.lower_pool)
    }

    /// Cannot overflow: `record_stake` bounds the combined pot.
    pub fn total_pot(&self) -> u64 {
        self.higher_pool + self.lower_pool
    }

    pub fn entries(&self) -> impl Iterator<Item = &PlayerEntry> {
        self.entries.iter()
    }

    pub fn entry_for(&self, player: Uuid) -> Option<&PlayerEntry> {
        self.entries.iter().find(|e| e.player == player)
    }

    /// True once both a Higher and a Lower entry exist with stake.
    pub fn has_both_sides(&self) -> bool {
        self.higher_pool > 0 && self.lower_pool > 0
    }

    /// Write computed winnings back onto the entries. Called exactly once,
    /// by the lifecycle transition that produced the settlement.
    pub(crate) fn apply_settlement(&mut self, settlement: &Settlement) {
        for entry in &mut self.entries {
            if let Some(payout) = settlement.payout_for(entry.player) {
                entry.winnings = payout;
            }
        }
    }

    /// Withdraw one participant's winnings (or refund). Single-shot.
    pub fn claim(&mut self, player: Uuid) -> ArenaResult<u64> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.player == player)
            .ok_or(ArenaError::NothingToClaim)?;
        if entry.claimed {
            return Err(ArenaError::AlreadyClaimed);
        }
        if entry.winnings == 0 {
            return Err(ArenaError::NothingToClaim);
        }
        entry.claimed = true;
        Ok(entry.winnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchConfig;

    fn open_match(max_players: u8) -> Match {
        Match {
            match_id: 7,
            creator: Uuid::new_v4(),
            config: MatchConfig {
                symbol: "SOL/USD".to_string(),
                fee_bps: 250,
                max_players,
                min_stake: 100,
                max_stake: 1_000_000,
                prediction_window_secs: 60,
                match_duration_secs: 300,
            },
            status: MatchStatus::Open,
            current_players: 0,
            start_price: None,
            end_price: None,
            winning_side: None,
            created_at: 0,
            started_at: None,
            resolved_at: None,
        }
    }

    #[test]
    fn pools_track_entries() {
        let mut m = open_match(4);
        let mut ledger = PoolLedger::new(7);
        ledger
            .record_stake(&mut m, Uuid::new_v4(), Side::Higher, 300, 10)
            .unwrap();
        ledger
            .record_stake(&mut m, Uuid::new_v4(), Side::Lower, 700, 11)
            .unwrap();

        assert_eq!(ledger.pool_totals(), (300, 700));
        assert_eq!(ledger.total_pot(), 1_000);
        assert_eq!(
            ledger.entries().map(|e| e.amount_staked).sum::<u64>(),
            ledger.total_pot()
        );
        assert_eq!(m.current_players, 2);
        assert!(ledger.has_both_sides());
    }

    #[test]
    fn rejects_duplicate_participant() {
        let mut m = open_match(4);
        let mut ledger = PoolLedger::new(7);
        let player = Uuid::new_v4();
        ledger
            .record_stake(&mut m, player, Side::Higher, 300, 10)
            .unwrap();
        let err = ledger
            .record_stake(&mut m, player, Side::Lower, 300, 11)
            .unwrap_err();
        assert!(matches!(err, ArenaError::DuplicateEntry));
        assert_eq!(ledger.total_pot(), 300);
        assert_eq!(m.current_players, 1);
    }

    #[test]
    fn rejects_zero_and_out_of_bounds_stakes() {
        let mut m = open_match(4);
        let mut ledger = PoolLedger::new(7);
        for amount in [0u64, 99, 1_000_001] {
            let err = ledger
                .record_stake(&mut m, Uuid::new_v4(), Side::Higher, amount, 10)
                .unwrap_err();
            assert!(matches!(err, ArenaError::InvalidStake(_)), "amount {amount}");
        }
        assert_eq!(ledger.total_pot(), 0);
    }

    #[test]
    fn rejects_stake_that_overflows_the_combined_pot() {
        let mut m = open_match(4);
        m.config.min_stake = 1;
        m.config.max_stake = u64::MAX;
        let mut ledger = PoolLedger::new(7);
        ledger
            .record_stake(&mut m, Uuid::new_v4(), Side::Higher, u64::MAX - 10, 10)
            .unwrap();
        let err = ledger
            .record_stake(&mut m, Uuid::new_v4(), Side::Lower, 100, 10)
            .unwrap_err();
        assert!(matches!(err, ArenaError::InvalidStake(_)));
        assert_eq!(ledger.pool_totals(), (u64::MAX - 10, 0));
        assert_eq!(m.current_players, 1);
    }

    #[test]
    fn rejects_when_full() {
        let mut m = open_match(2);
        let mut ledger = PoolLedger::new(7);
        ledger
            .record_stake(&mut m, Uuid::new_v4(), Side::Higher, 300, 10)
            .unwrap();
        ledger
            .record_stake(&mut m, Uuid::new_v4(), Side::Lower, 300, 10)
            .unwrap();
        let err = ledger
            .record_stake(&mut m, Uuid::new_v4(), Side::Higher, 300, 10)
            .unwrap_err();
        assert!(matches!(err, ArenaError::MatchClosed(_)));
    }

    #[test]
    fn rejects_after_deadline() {
        let mut m = open_match(4);
        let mut ledger = PoolLedger::new(7);
        let err = ledger
            .record_stake(&mut m, Uuid::new_v4(), Side::Higher, 300, 61)
            .unwrap_err();
        assert!(matches!(err, ArenaError::MatchClosed(_)));
    }

    #[test]
    fn claim_is_single_shot() {
        let mut m = open_match(4);
        let mut ledger = PoolLedger::new(7);
        let player = Uuid::new_v4();
        ledger
            .record_stake(&mut m, player, Side::Higher, 300, 10)
            .unwrap();

        // Simulate a settlement write-back.
        let settlement = Settlement::refund(7, ledger.entries());
        ledger.apply_settlement(&settlement);

        assert_eq!(ledger.claim(player).unwrap(), 300);
        assert!(matches!(
            ledger.claim(player).unwrap_err(),
            ArenaError::AlreadyClaimed
        ));
        assert!(matches!(
            ledger.claim(Uuid::new_v4()).unwrap_err(),
            ArenaError::NothingToClaim
        ));
    }
}
