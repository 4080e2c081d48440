use thiserror::Error;

/// Errors surfaced by the settlement core.
///
/// Every mutating operation is all-or-nothing: an error return means no
/// state changed. `OracleUnavailable` is the only transient condition and
/// is retried automatically by the next sweep; everything else must be
/// resubmitted by the caller with corrected input.
#[derive(Error, Debug)]
pub enum ArenaError {
    /// Bad match parameters at creation time. Nothing is created.
    #[error("Invalid match configuration: {0}")]
    InvalidConfiguration(String),

    /// Match creation and staking are disabled engine-wide.
    #[error("Engine is paused")]
    EnginePaused,

    /// No match with this id.
    #[error("Match {0} not found")]
    MatchNotFound(u64),

    /// Stake submitted outside `Open`, after the prediction deadline, or
    /// against a full match.
    #[error("Match closed to new stakes: {0}")]
    MatchClosed(String),

    /// Stake amount is zero or outside the configured bounds.
    #[error("Invalid stake amount: {0}")]
    InvalidStake(String),

    /// Participant already has an entry in this match.
    #[error("Participant already staked in this match")]
    DuplicateEntry,

    /// Settlement queried before the match reached a terminal state.
    #[error("Match has not been resolved yet")]
    NotResolved,

    /// Settlement invoked with no stake on either side. Unreachable through
    /// the lifecycle (one-sided matches cancel at the deadline), checked
    /// anyway.
    #[error("Both pools are empty, nothing to settle")]
    EmptyPools,

    /// Price reading failed at a capture point. The transition is deferred
    /// and retried on the next sweep.
    #[error("Price oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Winnings for this entry were already withdrawn.
    #[error("Winnings already claimed")]
    AlreadyClaimed,

    /// Entry has nothing to withdraw (losing side, or no entry).
    #[error("No winnings to claim")]
    NothingToClaim,
}

/// Result alias for the core.
pub type ArenaResult<T> = Result<T, ArenaError>;

impl ArenaError {
    /// True for the one condition the sweep retries instead of reporting.
    pub fn is_transient(&self) -> bool {
        matches!(self, ArenaError::OracleUnavailable(_))
    }
}
