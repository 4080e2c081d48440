//! Collaborator contracts: wall-clock time and price observations.
//!
//! The core never fetches prices itself. A `PriceOracle` implementation is
//! handed in at construction and consulted only at the two capture points
//! (window close and resolution). Readings are assumed pre-validated; no
//! staleness or confidence filtering happens here.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ArenaError, ArenaResult};
use crate::models::PRICE_PRECISION;

/// One price observation for a symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceReading {
    pub symbol: String,
    /// Fixed-point price, 6 decimals.
    pub price: u64,
    /// Confidence interval around `price`, same units.
    pub confidence: u64,
    /// UTC seconds at which the reading was published.
    pub timestamp: i64,
}

/// Monotonic wall-clock source, UTC seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// On-demand price source for a symbol. Fallible, bounded-latency.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn read(&self, symbol: &str) -> ArenaResult<PriceReading>;
}

/// Random-walk oracle for the demo runner and tests. Each read nudges the
/// cached price by up to ±0.5%.
pub struct SimulatedOracle {
    prices: Mutex<HashMap<String, u64>>,
}

impl SimulatedOracle {
    pub fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a starting price for a symbol (6-decimal fixed point).
    pub fn with_price(self, symbol: &str, price: u64) -> Self {
        self.prices.lock().insert(symbol.to_string(), price);
        self
    }
}

impl Default for SimulatedOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceOracle for SimulatedOracle {
    async fn read(&self, symbol: &str) -> ArenaResult<PriceReading> {
        let mut prices = self.prices.lock();
        let price = prices
            .entry(symbol.to_string())
            .or_insert(100 * PRICE_PRECISION);

        // Walk by up to 50 bps in either direction.
        let step_bps: i64 = rand::thread_rng().gen_range(-50..=50);
        let delta = (*price as i128 * step_bps as i128 / 10_000) as i64;
        *price = (*price as i64 + delta).max(1) as u64;

        Ok(PriceReading {
            symbol: symbol.to_string(),
            price: *price,
            confidence: *price / 1_000,
            timestamp: Utc::now().timestamp(),
        })
    }
}

/// Oracle that always fails. Exercises the deferral path in tests.
pub struct UnavailableOracle;

#[async_trait]
impl PriceOracle for UnavailableOracle {
    async fn read(&self, symbol: &str) -> ArenaResult<PriceReading> {
        Err(ArenaError::OracleUnavailable(format!(
            "no feed for {symbol}"
        )))
    }
}
