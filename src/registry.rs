//! Match registry: the concurrent front door of the engine.
//!
//! The map of matches sits behind a `parking_lot::RwLock` (faster than the
//! tokio lock for short critical sections); each match record sits behind
//! its own `tokio::sync::Mutex` because lifecycle transitions hold the
//! record across an oracle await. Stakes against different matches never
//! contend; two stakes against the same match serialize, which is what
//! makes the last-slot capacity check sound.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{ArenaError, ArenaResult};
use crate::ledger::PoolLedger;
use crate::lifecycle::{self, Transition};
use crate::models::{
    EntryId, Match, MatchConfig, MatchFilters, MatchStatus, PlayerProfile, Side,
};
use crate::oracle::{Clock, PriceOracle};
use crate::settlement::Settlement;

/// One match plus everything settlement wrote about it.
#[derive(Debug)]
pub struct MatchRecord {
    pub mtch: Match,
    pub ledger: PoolLedger,
    /// Present once the match is terminal.
    pub settlement: Option<Settlement>,
}

/// Counters from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub started: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Transitions skipped this pass because the oracle was unavailable.
    pub deferred: usize,
}

pub struct MatchRegistry {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    oracle: Arc<dyn PriceOracle>,
    matches: RwLock<HashMap<u64, Arc<Mutex<MatchRecord>>>>,
    profiles: RwLock<HashMap<Uuid, PlayerProfile>>,
    next_match_id: AtomicU64,
}

impl MatchRegistry {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>, oracle: Arc<dyn PriceOracle>) -> Self {
        Self {
            config,
            clock,
            oracle,
            matches: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
            next_match_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn record(&self, match_id: u64) -> ArenaResult<Arc<Mutex<MatchRecord>>> {
        self.matches
            .read()
            .get(&match_id)
            .cloned()
            .ok_or(ArenaError::MatchNotFound(match_id))
    }

    /// Register a new match. The configuration is validated against the
    /// engine bounds and frozen.
    pub fn create_match(&self, creator: Uuid, config: MatchConfig) -> ArenaResult<Match> {
        if self.config.paused {
            return Err(ArenaError::EnginePaused);
        }
        self.config.validate_match_config(&config)?;

        let match_id = self.next_match_id.fetch_add(1, Ordering::SeqCst);
        let mtch = Match {
            match_id,
            creator,
            config,
            status: MatchStatus::Open,
            current_players: 0,
            start_price: None,
            end_price: None,
            winning_side: None,
            created_at: self.clock.now(),
            started_at: None,
            resolved_at: None,
        };
        let record = MatchRecord {
            mtch: mtch.clone(),
            ledger: PoolLedger::new(match_id),
            settlement: None,
        };
        self.matches
            .write()
            .insert(match_id, Arc::new(Mutex::new(record)));
        info!(
            match_id,
            symbol = %mtch.config.symbol,
            fee_bps = mtch.config.fee_bps,
            "Match created"
        );
        Ok(mtch)
    }

    /// Lock one participant's stake into a match.
    pub async fn submit_stake(
        &self,
        match_id: u64,
        player: Uuid,
        side: Side,
        amount: u64,
    ) -> ArenaResult<EntryId> {
        if self.config.paused {
            return Err(ArenaError::EnginePaused);
        }
        let record = self.record(match_id)?;
        let mut guard = record.lock().await;
        let now = self.clock.now();
        let rec = &mut *guard;
        let entry_id = rec
            .ledger
            .record_stake(&mut rec.mtch, player, side, amount, now)?;

        self.profiles
            .write()
            .entry(player)
            .or_insert_with(|| PlayerProfile::new(player))
            .total_wagered += amount;

        info!(
            match_id,
            player = %player,
            side = side.as_str(),
            amount,
            "Stake locked"
        );
        Ok(entry_id)
    }

    /// Re-examine every live match and fire whatever transitions are due.
    /// Oracle failures defer the affected match to the next pass; they
    /// never abort the sweep or touch other matches.
    pub async fn sweep(&self) -> SweepStats {
        let live: Vec<(u64, Arc<Mutex<MatchRecord>>)> = self
            .matches
            .read()
            .iter()
            .map(|(id, rec)| (*id, rec.clone()))
            .collect();

        let mut stats = SweepStats::default();
        for (match_id, record) in live {
            let mut guard = record.lock().await;
            if guard.mtch.is_terminal() {
                continue;
            }
            let rec = &mut *guard;
            match lifecycle::advance(
                &mut rec.mtch,
                &mut rec.ledger,
                self.clock.as_ref(),
                self.oracle.as_ref(),
            )
            .await
            {
                Ok((Transition::None, _)) => {}
                Ok((Transition::Started, _)) => stats.started += 1,
                Ok((transition, Some(outcome))) => {
                    match transition {
                        Transition::Completed => stats.completed += 1,
                        _ => stats.cancelled += 1,
                    }
                    self.record_outcome(&rec.ledger, &outcome);
                    rec.settlement = Some(outcome);
                }
                Ok((_, None)) => {}
                Err(e) if e.is_transient() => {
                    stats.deferred += 1;
                    warn!(match_id, error = %e, "Transition deferred, oracle unavailable");
                }
                Err(e) => {
                    warn!(match_id, error = %e, "Transition failed");
                }
            }
        }
        stats
    }

    /// Administratively cancel a match, refunding all stakes. Returns
    /// `false` if it was already cancelled.
    pub async fn cancel_match(&self, match_id: u64) -> ArenaResult<bool> {
        let record = self.record(match_id)?;
        let mut guard = record.lock().await;
        let now = self.clock.now();
        let rec = &mut *guard;
        match lifecycle::cancel(&mut rec.mtch, &mut rec.ledger, now)? {
            Some(outcome) => {
                self.record_outcome(&rec.ledger, &outcome);
                rec.settlement = Some(outcome);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Withdraw a participant's winnings or refund. Requires a terminal
    /// match; single-shot per participant.
    pub async fn claim(&self, match_id: u64, player: Uuid) -> ArenaResult<u64> {
        let record = self.record(match_id)?;
        let mut guard = record.lock().await;
        if !guard.mtch.is_terminal() {
            return Err(ArenaError::NotResolved);
        }
        let amount = guard.ledger.claim(player)?;
        info!(match_id, player = %player, amount, "Winnings claimed");
        Ok(amount)
    }

    pub async fn get_match(&self, match_id: u64) -> ArenaResult<Match> {
        let record = self.record(match_id)?;
        let guard = record.lock().await;
        Ok(guard.mtch.clone())
    }

    /// The settlement produced for a terminal match.
    pub async fn settlement_for(&self, match_id: u64) -> ArenaResult<Settlement> {
        let record = self.record(match_id)?;
        let guard = record.lock().await;
        guard.settlement.clone().ok_or(ArenaError::NotResolved)
    }

    /// Matches passing the given filters, newest first.
    pub async fn list_matches(&self, filters: &MatchFilters) -> Vec<Match> {
        let records: Vec<Arc<Mutex<MatchRecord>>> =
            self.matches.read().values().cloned().collect();
        let mut out = Vec::new();
        for record in records {
            let guard = record.lock().await;
            if filters.matches(&guard.mtch) {
                out.push(guard.mtch.clone());
            }
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.match_id.cmp(&a.match_id)));
        out
    }

    /// Every match the given participant has an entry in.
    pub async fn matches_for_participant(&self, player: Uuid) -> Vec<Match> {
        let records: Vec<Arc<Mutex<MatchRecord>>> =
            self.matches.read().values().cloned().collect();
        let mut out = Vec::new();
        for record in records {
            let guard = record.lock().await;
            if guard.ledger.entry_for(player).is_some() {
                out.push(guard.mtch.clone());
            }
        }
        out.sort_by_key(|m| m.match_id);
        out
    }

    pub fn profile(&self, player: Uuid) -> Option<PlayerProfile> {
        self.profiles.read().get(&player).cloned()
    }

    /// Fold a terminal settlement into the participant profiles. A decided
    /// match scores a win or loss per entry; a refund only counts as
    /// played.
    fn record_outcome(&self, ledger: &PoolLedger, outcome: &Settlement) {
        let mut profiles = self.profiles.write();
        for entry in ledger.entries() {
            let profile = profiles
                .entry(entry.player)
                .or_insert_with(|| PlayerProfile::new(entry.player));
            match outcome.winning_side {
                Some(winner) if entry.side == winner => profile.record_win(entry.winnings),
                Some(_) => profile.record_loss(),
                None => profile.record_refund(entry.winnings),
            }
        }
    }
}
