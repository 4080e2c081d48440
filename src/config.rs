//! Engine configuration.
//!
//! Every knob has a sane default and an `ARENA_*` environment override, so
//! the binary runs with no configuration at all. Per-match parameters are
//! validated against these bounds at creation and then travel with the
//! match, immutable.

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{ArenaError, ArenaResult};
use crate::models::MatchConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Symbols matches may be created against.
    pub symbols: Vec<String>,
    /// Default protocol fee in basis points, applied when a creator does
    /// not specify one.
    pub default_fee_bps: u16,
    /// Hard cap on any match's fee rate.
    pub max_fee_bps: u16,
    /// Global stake floor; per-match `min_stake` may not go below it.
    pub min_stake: u64,
    /// Global stake ceiling; per-match `max_stake` may not exceed it.
    pub max_stake: u64,
    /// Per-match participant cap.
    pub max_players: u8,
    /// Accepted range for prediction windows, seconds.
    pub min_prediction_window_secs: i64,
    pub max_prediction_window_secs: i64,
    /// Accepted range for match durations, seconds.
    pub min_match_duration_secs: i64,
    pub max_match_duration_secs: i64,
    /// How often the sweep loop re-examines live matches.
    pub sweep_interval_secs: u64,
    /// When set, match creation and staking are refused.
    pub paused: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: vec![
                "SOL/USD".to_string(),
                "BTC/USD".to_string(),
                "ETH/USD".to_string(),
            ],
            default_fee_bps: 250,
            max_fee_bps: 1_000,
            min_stake: 1_000,
            max_stake: 1_000_000_000_000,
            max_players: 10,
            min_prediction_window_secs: 10,
            max_prediction_window_secs: 3_600,
            min_match_duration_secs: 30,
            max_match_duration_secs: 86_400,
            sweep_interval_secs: 5,
            paused: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    /// Build from the environment, falling back to defaults per field.
    pub fn from_env() -> Self {
        let d = Self::default();
        let symbols = env::var("ARENA_SYMBOLS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(d.symbols);

        Self {
            symbols,
            default_fee_bps: env_parse("ARENA_DEFAULT_FEE_BPS", d.default_fee_bps),
            max_fee_bps: env_parse("ARENA_MAX_FEE_BPS", d.max_fee_bps),
            min_stake: env_parse("ARENA_MIN_STAKE", d.min_stake),
            max_stake: env_parse("ARENA_MAX_STAKE", d.max_stake),
            max_players: env_parse("ARENA_MAX_PLAYERS", d.max_players),
            min_prediction_window_secs: env_parse(
                "ARENA_MIN_PREDICTION_WINDOW_SECS",
                d.min_prediction_window_secs,
            ),
            max_prediction_window_secs: env_parse(
                "ARENA_MAX_PREDICTION_WINDOW_SECS",
                d.max_prediction_window_secs,
            ),
            min_match_duration_secs: env_parse(
                "ARENA_MIN_MATCH_DURATION_SECS",
                d.min_match_duration_secs,
            ),
            max_match_duration_secs: env_parse(
                "ARENA_MAX_MATCH_DURATION_SECS",
                d.max_match_duration_secs,
            ),
            sweep_interval_secs: env_parse("ARENA_SWEEP_INTERVAL_SECS", d.sweep_interval_secs),
            paused: env::var("ARENA_PAUSED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(d.paused),
        }
    }

    /// Validate a creator-supplied match configuration against the engine
    /// bounds. Every rejection names the offending field.
    pub fn validate_match_config(&self, cfg: &MatchConfig) -> ArenaResult<()> {
        if !self.symbols.iter().any(|s| s == &cfg.symbol) {
            return Err(ArenaError::InvalidConfiguration(format!(
                "unknown symbol {}",
                cfg.symbol
            )));
        }
        if cfg.fee_bps > self.max_fee_bps {
            return Err(ArenaError::InvalidConfiguration(format!(
                "fee {} bps exceeds cap {} bps",
                cfg.fee_bps, self.max_fee_bps
            )));
        }
        if cfg.max_players < 2 || cfg.max_players > self.max_players {
            return Err(ArenaError::InvalidConfiguration(format!(
                "max_players {} outside [2, {}]",
                cfg.max_players, self.max_players
            )));
        }
        if cfg.min_stake < self.min_stake
            || cfg.max_stake > self.max_stake
            || cfg.min_stake > cfg.max_stake
        {
            return Err(ArenaError::InvalidConfiguration(format!(
                "stake bounds [{}, {}] invalid for engine bounds [{}, {}]",
                cfg.min_stake, cfg.max_stake, self.min_stake, self.max_stake
            )));
        }
        if cfg.prediction_window_secs < self.min_prediction_window_secs
            || cfg.prediction_window_secs > self.max_prediction_window_secs
        {
            return Err(ArenaError::InvalidConfiguration(format!(
                "prediction window {}s outside [{}s, {}s]",
                cfg.prediction_window_secs,
                self.min_prediction_window_secs,
                self.max_prediction_window_secs
            )));
        }
        if cfg.match_duration_secs < self.min_match_duration_secs
            || cfg.match_duration_secs > self.max_match_duration_secs
        {
            return Err(ArenaError::InvalidConfiguration(format!(
                "match duration {}s outside [{}s, {}s]",
                cfg.match_duration_secs, self.min_match_duration_secs, self.max_match_duration_secs
            )));
        }
        Ok(())
    }
}
