//! Arena - headless simulation server.
//!
//! Runs the tick loop and logs what a transport layer would forward to clients.

use arena::{Config, GameEvent, GameState, TickOutput, run_tick_loop};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "arena.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Arena v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);
    info!("  World: {}x{}", config.world.width, config.world.height);
    info!("  Tick rate: {}/s", config.server.tick_rate);
    info!("  Bots: {}", config.bots.count);

    let state = Arc::new(RwLock::new(GameState::new(config)));
    let (tx, rx) = broadcast::channel::<Arc<TickOutput>>(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reporter = tokio::spawn(report_ticks(rx));
    let game_loop = tokio::spawn(run_tick_loop(state, tx, shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    shutdown_tx.send(true)?;
    game_loop.await?;
    reporter.await?;

    Ok(())
}

/// Log leaderboards and life-cycle events until the loop closes the channel.
async fn report_ticks(mut rx: broadcast::Receiver<Arc<TickOutput>>) {
    loop {
        let output = match rx.recv().await {
            Ok(output) => output,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!("Reporter lagged behind by {} ticks", missed);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        for event in &output.events {
            match event {
                GameEvent::ActorDied { actor, killer: Some(killer) } => info!("{} was eaten by {}", actor, killer),
                GameEvent::ActorKicked { actor, reason } => info!("{} kicked: {}", actor, reason),
                other => debug!("Tick #{}: {:?}", output.tick, other),
            }
        }

        if let Some(leaderboard) = &output.leaderboard {
            let top: Vec<String> = leaderboard
                .iter()
                .take(3)
                .map(|entry| format!("{} ({:.0})", entry.name, entry.mass))
                .collect();
            info!("Tick #{} leaderboard: {}", output.tick, top.join(", "));
        }
    }
}
