//! Tick pipeline, life-cycle events and the async driver that runs them.

use crate::actor::ActorId;
use crate::map::PlayerView;
use futures_util::FutureExt;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

pub mod game;
pub mod schedule;

pub use crate::map::LeaderboardEntry;
pub use game::{GameState, PlayerAction};
pub use schedule::{ScheduledTask, Scheduler};

/// Life-cycle notifications for the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    ActorSpawned { actor: ActorId },
    /// One cell of `loser` was consumed by `winner`.
    ActorAte { winner: ActorId, loser: ActorId },
    /// The actor lost its last cell.
    ActorDied { actor: ActorId, killer: Option<ActorId> },
    ActorKicked { actor: ActorId, reason: String },
}

/// Everything a tick produced.
#[derive(Debug, Clone, Serialize)]
pub struct TickOutput {
    pub tick: u64,
    /// One view per human player.
    pub views: Vec<PlayerView>,
    pub events: Vec<GameEvent>,
    /// Present on balance ticks.
    pub leaderboard: Option<Vec<LeaderboardEntry>>,
}

/// Drive `state` at its configured tick rate until `shutdown` flips to `true`.
///
/// Each tick's output is published on `tx`; having no subscribers is fine.
pub async fn run_tick_loop(
    state: Arc<RwLock<GameState>>,
    tx: broadcast::Sender<Arc<TickOutput>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let tick_interval: Duration = state.read().await.config.tick_interval();
    let start = Instant::now() + tick_interval;
    let mut ticker = interval_at(start, tick_interval);
    // Skip keeps the game speed constant after a stall.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!("Tick loop started ({:?} per tick)", tick_interval);

    loop {
        let scheduled = tokio::select! {
            instant = ticker.tick() => instant,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        };

        // Drain any backlog so intents are applied against the most recent tick.
        let mut skipped = 0u32;
        while ticker.tick().now_or_never().is_some() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!(
                "Skipped {} ticks to stay current (lag: {:?})",
                skipped,
                Instant::now().saturating_duration_since(scheduled)
            );
        }

        let output = {
            let mut game = state.write().await;
            let tick_start = std::time::Instant::now();
            let output = game.tick();
            let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

            game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

            let tick_budget = tick_interval.as_secs_f64() * 1000.0 * 0.9;
            if tick_ms > tick_budget {
                warn!(
                    "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} players, {} bots",
                    game.tick_count,
                    tick_ms,
                    tick_budget,
                    game.map.players.len(),
                    game.map.bots.len()
                );
            }
            output
        };

        let _ = tx.send(Arc::new(output));
    }

    info!("Tick loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_tick_loop_broadcasts_until_shutdown() {
        let mut config = Config::default();
        config.server.tick_rate = 200;
        config.food.max_amount = 0;
        config.virus.max_amount = 0;
        config.bots.count = 0;

        let state = Arc::new(RwLock::new(GameState::new(config)));
        state.write().await.on_player_join(1, "watcher", false).unwrap();

        let (tx, mut rx) = broadcast::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_tick_loop(state.clone(), tx, shutdown_rx));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(second.tick > first.tick);
        assert_eq!(first.views.len(), 1);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(state.read().await.tick_count >= 2);
    }
}
