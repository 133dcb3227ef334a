//! Demo runner: one table, simulated bettors, rendered to the log
//!
//! Stands in for the chat collaborator so the engine can be watched
//! end to end without a messaging platform attached.

use clap::Parser;
use hilo::notify::TracingNotifier;
use hilo::{EngineConfig, Side, TableRegistry};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hilo")]
#[command(about = "Timed high/low dice betting engine demo", long_about = None)]
struct Args {
    /// Length of each wagering window in seconds
    #[arg(long, default_value = "10")]
    round_secs: u64,

    /// Starting balance granted to each actor
    #[arg(long, default_value = "200000")]
    starting_balance: u64,

    /// House fee on gross winnings, in basis points
    #[arg(long, default_value = "0")]
    fee_bps: u32,

    /// How many rounds to run before shutting down
    #[arg(long, default_value = "3")]
    rounds: u64,

    /// Number of simulated bettors
    #[arg(long, default_value = "4")]
    bettors: i64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = EngineConfig {
        round_secs: args.round_secs,
        starting_balance: args.starting_balance,
        fee_bps: args.fee_bps,
        ..EngineConfig::default()
    };
    config.validate()?;

    let registry = Arc::new(TableRegistry::with_parts(
        config,
        Arc::new(TracingNotifier),
        Arc::new(hilo::ThreadRngDice),
    ));

    let table_id = -1001;
    registry.enable(table_id).await;
    // Give the driver a beat to open the first round
    tokio::time::sleep(Duration::from_millis(50)).await;

    for _ in 0..args.rounds {
        for actor in 1..=args.bettors {
            let side = if rand::thread_rng().gen_bool(0.5) {
                Side::High
            } else {
                Side::Low
            };
            let stake = rand::thread_rng().gen_range(1_000..=20_000);
            if let Err(e) = registry.place_wager(table_id, actor, side, stake) {
                tracing::warn!(actor, error = %e, "wager rejected");
            }
        }
        tokio::time::sleep(Duration::from_secs(args.round_secs + 1)).await;
    }

    for row in registry.query_leaderboard(args.bettors as usize) {
        tracing::info!(
            actor = row.actor,
            balance = row.balance,
            won = row.lifetime_won,
            lost = row.lifetime_lost,
            "final standings"
        );
    }

    registry.shutdown().await;
    Ok(())
}
