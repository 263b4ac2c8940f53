//! Authoritative simulation core of a multiplayer cell-growth arena.

pub mod actor;
pub mod ai;
pub mod collision;
pub mod config;
pub mod entity;
pub mod error;
pub mod map;
pub mod server;
pub mod spatial;
pub mod util;

// Re-export commonly used types
pub use actor::{Actor, ActorId, ScreenSize};
pub use config::Config;
pub use error::ArenaError;
pub use map::{ActorSnapshot, LeaderboardEntry, PlayerView};
pub use server::{GameEvent, GameState, TickOutput, run_tick_loop};
