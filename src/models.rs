use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed-point price precision: all oracle prices carry 6 decimals.
pub const PRICE_PRECISION: u64 = 1_000_000;

/// Fee rates are expressed in basis points out of 10_000.
pub const BASIS_POINTS: u64 = 10_000;

/// The two sides of a head-to-head price prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Higher,
    Lower,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Higher => "higher",
            Side::Lower => "lower",
        }
    }

    pub fn opposite(&self) -> Side {
        match self {
            Side::Higher => Side::Lower,
            Side::Lower => Side::Higher,
        }
    }
}

/// Match lifecycle states. Transitions are strictly forward:
/// `Open -> InProgress -> Completed`, with `Cancelled` reachable from
/// `Open` or `InProgress`. Never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Open => "open",
            MatchStatus::InProgress => "in_progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }
}

/// Per-match configuration, immutable after creation. No global settings
/// object: everything settlement needs travels with the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Asset symbol being predicted, e.g. "SOL/USD".
    pub symbol: String,
    /// Protocol fee rate in basis points (0..=10000).
    pub fee_bps: u16,
    /// Maximum number of participants.
    pub max_players: u8,
    /// Smallest accepted stake, in the smallest currency unit.
    pub min_stake: u64,
    /// Largest accepted stake.
    pub max_stake: u64,
    /// Seconds after creation during which stakes are accepted.
    pub prediction_window_secs: i64,
    /// Seconds the price runs after the prediction window closes.
    pub match_duration_secs: i64,
}

/// One prediction contest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub match_id: u64,
    pub creator: Uuid,
    pub config: MatchConfig,
    pub status: MatchStatus,
    pub current_players: u8,
    /// Captured at the Open -> InProgress transition.
    pub start_price: Option<u64>,
    /// Captured at the InProgress -> Completed transition.
    pub end_price: Option<u64>,
    /// Set exactly once, by settlement. None on a tie or cancellation.
    pub winning_side: Option<Side>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub resolved_at: Option<i64>,
}

impl Match {
    /// Last instant at which stakes are accepted.
    pub fn prediction_deadline(&self) -> i64 {
        self.created_at + self.config.prediction_window_secs
    }

    /// Instant at which the match resolves.
    pub fn resolution_time(&self) -> i64 {
        self.created_at + self.config.prediction_window_secs + self.config.match_duration_secs
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Identifies one entry within one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId {
    pub match_id: u64,
    pub seq: u32,
}

/// One participant's position in one match. Created at stake submission,
/// immutable afterwards except for `winnings` (written once by settlement)
/// and `claimed` (flipped once by the claim path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub match_id: u64,
    pub player: Uuid,
    pub side: Side,
    pub amount_staked: u64,
    pub locked_at: i64,
    pub winnings: u64,
    pub claimed: bool,
}

/// Query filters for the registry's match listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchFilters {
    pub status: Option<MatchStatus>,
    pub symbol: Option<String>,
    pub min_stake: Option<u64>,
    pub max_stake: Option<u64>,
    pub created_after: Option<i64>,
    pub created_before: Option<i64>,
}

impl MatchFilters {
    pub fn matches(&self, m: &Match) -> bool {
        if let Some(status) = self.status {
            if m.status != status {
                return false;
            }
        }
        if let Some(ref symbol) = self.symbol {
            if &m.config.symbol != symbol {
                return false;
            }
        }
        if let Some(min) = self.min_stake {
            if m.config.min_stake < min {
                return false;
            }
        }
        if let Some(max) = self.max_stake {
            if m.config.max_stake > max {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if m.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if m.created_at > before {
                return false;
            }
        }
        true
    }
}

/// Running per-participant record, updated once per terminal match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub player: Uuid,
    pub total_matches: u64,
    pub wins: u64,
    pub losses: u64,
    pub total_wagered: u64,
    pub total_won: u64,
    pub current_streak: u32,
    pub best_streak: u32,
}

impl PlayerProfile {
    pub fn new(player: Uuid) -> Self {
        Self {
            player,
            total_matches: 0,
            wins: 0,
            losses: 0,
            total_wagered: 0,
            total_won: 0,
            current_streak: 0,
            best_streak: 0,
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.total_matches == 0 {
            return 0.0;
        }
        (self.wins as f64 / self.total_matches as f64) * 100.0
    }

    pub fn net_profit(&self) -> i64 {
        self.total_won as i64 - self.total_wagered as i64
    }

    pub(crate) fn record_win(&mut self, winnings: u64) {
        self.total_matches += 1;
        self.wins += 1;
        self.total_won = self.total_won.saturating_add(winnings);
        self.current_streak += 1;
        self.best_streak = self.best_streak.max(self.current_streak);
    }

    pub(crate) fn record_loss(&mut self) {
        self.total_matches += 1;
        self.losses += 1;
        self.current_streak = 0;
    }

    /// Refunded matches count as played but leave win/loss and the streak
    /// untouched. The returned stake is credited so the refund nets to
    /// zero against the wager recorded at stake time.
    pub(crate) fn record_refund(&mut self, refunded: u64) {
        self.total_matches += 1;
        self.total_won = self.total_won.saturating_add(refunded);
    }
}
