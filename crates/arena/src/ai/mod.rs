//! Bot actors and their decision making.

pub mod bot_manager;
pub mod bot_player;

pub use bot_manager::BotManager;
pub use bot_player::{AiState, Bot, Neighbour, Sighting, Surroundings};
