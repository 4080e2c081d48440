//! Arena demo runner: spins up the settlement engine with the simulated
//! oracle, plays one short match between two participants, and prints the
//! settlement once it resolves.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dotenv::dotenv;
use tokio::time::interval;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use fate_arena::{
    EngineConfig, MatchConfig, MatchRegistry, Side, SimulatedOracle, SystemClock,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs.max(1));
    let registry = Arc::new(MatchRegistry::new(
        config,
        Arc::new(SystemClock),
        Arc::new(SimulatedOracle::new()),
    ));

    let creator = Uuid::new_v4();
    let mtch = registry.create_match(
        creator,
        MatchConfig {
            symbol: "SOL/USD".to_string(),
            fee_bps: 250,
            max_players: 2,
            min_stake: 1_000,
            max_stake: 1_000_000,
            prediction_window_secs: 10,
            match_duration_secs: 30,
        },
    )?;
    info!(match_id = mtch.match_id, "Demo match created");

    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    registry
        .submit_stake(mtch.match_id, alice, Side::Higher, 30_000)
        .await?;
    registry
        .submit_stake(mtch.match_id, bob, Side::Lower, 70_000)
        .await?;

    let mut ticker = interval(sweep_interval);
    loop {
        ticker.tick().await;
        let stats = registry.sweep().await;
        if stats.completed + stats.cancelled > 0 {
            break;
        }
    }

    let resolved = registry.get_match(mtch.match_id).await?;
    let settlement = registry.settlement_for(mtch.match_id).await?;
    info!(
        status = resolved.status.as_str(),
        winning_side = resolved.winning_side.map(|s| s.as_str()).unwrap_or("none"),
        "Demo match resolved"
    );
    println!("{}", serde_json::to_string_pretty(&settlement)?);

    for player in [alice, bob] {
        if let Ok(amount) = registry.claim(resolved.match_id, player).await {
            info!(player = %player, amount, "Claimed");
        }
        if let Some(profile) = registry.profile(player) {
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }
    Ok(())
}
