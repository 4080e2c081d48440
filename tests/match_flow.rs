//! End-to-end match flows through the public registry API.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use fate_arena::{
    ArenaError, ArenaResult, Clock, EngineConfig, MatchConfig, MatchFilters, MatchRegistry,
    MatchStatus, PriceOracle, PriceReading, Side,
};

struct TestClock(AtomicI64);

impl TestClock {
    fn at(t: i64) -> Arc<Self> {
        Arc::new(Self(AtomicI64::new(t)))
    }
    fn set(&self, t: i64) {
        self.0.store(t, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pops one scripted price per read; errs when the script runs dry.
struct ScriptedOracle(Mutex<Vec<u64>>);

impl ScriptedOracle {
    fn with_prices(prices: &[u64]) -> Arc<Self> {
        let mut v = prices.to_vec();
        v.reverse();
        Arc::new(Self(Mutex::new(v)))
    }
}

#[async_trait]
impl PriceOracle for ScriptedOracle {
    async fn read(&self, symbol: &str) -> ArenaResult<PriceReading> {
        let price = self
            .0
            .lock()
            .pop()
            .ok_or_else(|| ArenaError::OracleUnavailable("script exhausted".to_string()))?;
        Ok(PriceReading {
            symbol: symbol.to_string(),
            price,
            confidence: 0,
            timestamp: 0,
        })
    }
}

fn sol_match(fee_bps: u16) -> MatchConfig {
    MatchConfig {
        symbol: "SOL/USD".to_string(),
        fee_bps,
        max_players: 4,
        min_stake: 1_000,
        max_stake: 1_000_000,
        prediction_window_secs: 60,
        match_duration_secs: 300,
    }
}

#[tokio::test]
async fn lower_side_wins_and_splits_the_pot() {
    let clock = TestClock::at(0);
    let oracle = ScriptedOracle::with_prices(&[150_000_000, 149_000_000]);
    let reg = MatchRegistry::new(EngineConfig::default(), clock.clone(), oracle);

    let mtch = reg.create_match(Uuid::new_v4(), sol_match(500)).unwrap();
    let higher = Uuid::new_v4();
    let lower_a = Uuid::new_v4();
    let lower_b = Uuid::new_v4();
    reg.submit_stake(mtch.match_id, higher, Side::Higher, 600_000)
        .await
        .unwrap();
    reg.submit_stake(mtch.match_id, lower_a, Side::Lower, 100_000)
        .await
        .unwrap();
    reg.submit_stake(mtch.match_id, lower_b, Side::Lower, 300_000)
        .await
        .unwrap();

    clock.set(60);
    assert_eq!(reg.sweep().await.started, 1);
    clock.set(360);
    assert_eq!(reg.sweep().await.completed, 1);

    let resolved = reg.get_match(mtch.match_id).await.unwrap();
    assert_eq!(resolved.status, MatchStatus::Completed);
    assert_eq!(resolved.winning_side, Some(Side::Lower));
    assert_eq!(resolved.start_price, Some(150_000_000));
    assert_eq!(resolved.end_price, Some(149_000_000));

    let settlement = reg.settlement_for(mtch.match_id).await.unwrap();
    // pot 1_000_000, base fee 50_000; winners split the 600_000 losing
    // pool pro rata and carry the fee the same way.
    // 100k stake: 100k + 150k - 12_500 = 237_500
    // 300k stake: 300k + 450k - 37_500 = 712_500
    assert_eq!(settlement.payout_for(lower_a), Some(237_500));
    assert_eq!(settlement.payout_for(lower_b), Some(712_500));
    assert_eq!(settlement.payout_for(higher), Some(0));
    assert_eq!(settlement.protocol_fee, 50_000);
    let paid: u64 = settlement.payouts.iter().map(|p| p.winnings).sum();
    assert_eq!(paid + settlement.protocol_fee, settlement.total_pot);

    assert_eq!(reg.claim(mtch.match_id, lower_a).await.unwrap(), 237_500);
    assert!(matches!(
        reg.claim(mtch.match_id, lower_a).await.unwrap_err(),
        ArenaError::AlreadyClaimed
    ));
    assert!(matches!(
        reg.claim(mtch.match_id, higher).await.unwrap_err(),
        ArenaError::NothingToClaim
    ));

    let profile = reg.profile(lower_b).unwrap();
    assert_eq!(profile.wins, 1);
    assert_eq!(profile.total_won, 712_500);
    assert_eq!(reg.profile(higher).unwrap().losses, 1);
}

#[tokio::test]
async fn unchanged_price_refunds_both_sides() {
    let clock = TestClock::at(0);
    let oracle = ScriptedOracle::with_prices(&[99_000_000, 99_000_000]);
    let reg = MatchRegistry::new(EngineConfig::default(), clock.clone(), oracle);

    let mtch = reg.create_match(Uuid::new_v4(), sol_match(500)).unwrap();
    let p1 = Uuid::new_v4();
    let p2 = Uuid::new_v4();
    reg.submit_stake(mtch.match_id, p1, Side::Higher, 250_000)
        .await
        .unwrap();
    reg.submit_stake(mtch.match_id, p2, Side::Lower, 750_000)
        .await
        .unwrap();

    clock.set(60);
    reg.sweep().await;
    clock.set(360);
    reg.sweep().await;

    let resolved = reg.get_match(mtch.match_id).await.unwrap();
    assert_eq!(resolved.status, MatchStatus::Completed);
    assert_eq!(resolved.winning_side, None);

    let settlement = reg.settlement_for(mtch.match_id).await.unwrap();
    assert_eq!(settlement.protocol_fee, 0);
    assert_eq!(reg.claim(mtch.match_id, p1).await.unwrap(), 250_000);
    assert_eq!(reg.claim(mtch.match_id, p2).await.unwrap(), 750_000);

    // Refunds count as played but decide nothing, and the returned stake
    // cancels the wager exactly.
    let profile = reg.profile(p1).unwrap();
    assert_eq!(profile.total_matches, 1);
    assert_eq!(profile.wins + profile.losses, 0);
    assert_eq!(profile.net_profit(), 0);
    assert_eq!(reg.profile(p2).unwrap().net_profit(), 0);
}

#[tokio::test]
async fn oracle_outage_holds_resolution_until_recovery() {
    let clock = TestClock::at(0);
    let oracle = ScriptedOracle::with_prices(&[80_000_000]);
    let reg = MatchRegistry::new(EngineConfig::default(), clock.clone(), oracle.clone());

    let mtch = reg.create_match(Uuid::new_v4(), sol_match(250)).unwrap();
    reg.submit_stake(mtch.match_id, Uuid::new_v4(), Side::Higher, 10_000)
        .await
        .unwrap();
    reg.submit_stake(mtch.match_id, Uuid::new_v4(), Side::Lower, 10_000)
        .await
        .unwrap();

    clock.set(60);
    assert_eq!(reg.sweep().await.started, 1);

    // Script is exhausted at resolution time: the match stays InProgress.
    clock.set(360);
    let stats = reg.sweep().await;
    assert_eq!(stats.deferred, 1);
    assert_eq!(
        reg.get_match(mtch.match_id).await.unwrap().status,
        MatchStatus::InProgress
    );

    oracle.0.lock().push(81_000_000);
    assert_eq!(reg.sweep().await.completed, 1);
    assert_eq!(
        reg.get_match(mtch.match_id).await.unwrap().winning_side,
        Some(Side::Higher)
    );
}

#[tokio::test]
async fn late_and_duplicate_stakes_are_rejected() {
    let clock = TestClock::at(0);
    let reg = MatchRegistry::new(
        EngineConfig::default(),
        clock.clone(),
        ScriptedOracle::with_prices(&[]),
    );
    let mtch = reg.create_match(Uuid::new_v4(), sol_match(250)).unwrap();
    let p = Uuid::new_v4();
    reg.submit_stake(mtch.match_id, p, Side::Higher, 10_000)
        .await
        .unwrap();
    assert!(matches!(
        reg.submit_stake(mtch.match_id, p, Side::Lower, 10_000)
            .await
            .unwrap_err(),
        ArenaError::DuplicateEntry
    ));

    clock.set(61);
    assert!(matches!(
        reg.submit_stake(mtch.match_id, Uuid::new_v4(), Side::Lower, 10_000)
            .await
            .unwrap_err(),
        ArenaError::MatchClosed(_)
    ));
}

#[tokio::test]
async fn listing_tracks_lifecycle_status() {
    let clock = TestClock::at(0);
    let reg = MatchRegistry::new(
        EngineConfig::default(),
        clock.clone(),
        ScriptedOracle::with_prices(&[]),
    );
    let open = reg.create_match(Uuid::new_v4(), sol_match(250)).unwrap();
    let doomed = reg.create_match(Uuid::new_v4(), sol_match(250)).unwrap();
    reg.submit_stake(doomed.match_id, Uuid::new_v4(), Side::Higher, 10_000)
        .await
        .unwrap();
    reg.cancel_match(doomed.match_id).await.unwrap();

    let cancelled = MatchFilters {
        status: Some(MatchStatus::Cancelled),
        ..Default::default()
    };
    let listed = reg.list_matches(&cancelled).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].match_id, doomed.match_id);

    let still_open = MatchFilters {
        status: Some(MatchStatus::Open),
        ..Default::default()
    };
    assert_eq!(reg.list_matches(&still_open).await[0].match_id, open.match_id);
}
