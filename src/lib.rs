//! FATE Arena settlement core.
//!
//! Head-to-head price prediction matches with pari-mutuel settlement:
//! winners split the losing pool pro rata, a basis-point fee is held back,
//! ties and one-sided matches refund in full. All accounting is integer
//! and conserves the pot exactly.

pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod models;
pub mod oracle;
pub mod registry;
pub mod settlement;

pub use config::EngineConfig;
pub use error::{ArenaError, ArenaResult};
pub use ledger::PoolLedger;
pub use models::{
    EntryId, Match, MatchConfig, MatchFilters, MatchStatus, PlayerEntry, PlayerProfile, Side,
};
pub use oracle::{Clock, PriceOracle, PriceReading, SimulatedOracle, SystemClock};
pub use registry::{MatchRegistry, SweepStats};
pub use settlement::{Payout, Settlement};
