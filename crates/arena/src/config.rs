//! Simulation configuration.

use crate::error::ArenaError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub virus: VirusConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub bots: BotConfig,
    #[serde(default)]
    pub rules: RulesConfig,
}

impl Config {
    /// Load configuration from `path`, writing the defaults there if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<Self>(&contents)?
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ArenaError> {
        let invalid = |field: &'static str, reason: &str| ArenaError::InvalidConfig {
            field,
            reason: reason.to_string(),
        };

        if self.world.width <= 0.0 || self.world.height <= 0.0 {
            return Err(invalid("world", "width and height must be positive"));
        }
        if self.world.slow_base <= 1.0 {
            return Err(invalid("world.slow_base", "logarithm base must be greater than 1"));
        }
        if self.food.mass <= 0.0 {
            return Err(invalid("food.mass", "must be positive"));
        }
        if self.virus.default_mass.from > self.virus.default_mass.to {
            return Err(invalid("virus.default_mass", "`from` must not exceed `to`"));
        }
        if self.virus.split_threshold <= self.virus.default_mass.from {
            return Err(invalid(
                "virus.split_threshold",
                "must be larger than the base virus mass",
            ));
        }
        if self.player.default_mass < 1.0 {
            return Err(invalid("player.default_mass", "must be at least 1"));
        }
        if self.player.limit_split == 0 {
            return Err(invalid("player.limit_split", "must allow at least one cell"));
        }
        if self.bots.start_mass.from > self.bots.start_mass.to {
            return Err(invalid("bots.start_mass", "`from` must not exceed `to`"));
        }
        if self.rules.eat_threshold < 1.0 || self.rules.ai_mass_ratio < 1.0 {
            return Err(invalid("rules", "mass ratios must be at least 1.0"));
        }
        if self.server.tick_rate == 0 {
            return Err(invalid("server.tick_rate", "must be positive"));
        }
        Ok(())
    }

    /// Convert a duration in milliseconds into whole ticks (at least one).
    pub fn ms_to_ticks(&self, ms: u64) -> u64 {
        (ms * u64::from(self.server.tick_rate) / 1000).max(1)
    }

    /// Interval between ticks.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_micros(1_000_000 / u64::from(self.server.tick_rate))
    }
}

/// An inclusive-exclusive mass range used for random initial masses.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct MassRange {
    pub from: f32,
    pub to: f32,
}

/// Tick cadence settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Ticks between mass balancing / mass decay passes.
    #[serde(default = "default_balance_interval")]
    pub balance_interval_ticks: u64,
    /// Number of entries reported on the leaderboard.
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            balance_interval_ticks: default_balance_interval(),
            leaderboard_size: default_leaderboard_size(),
        }
    }
}

fn default_tick_rate() -> u32 {
    60
}
fn default_balance_interval() -> u64 {
    60
}
fn default_leaderboard_size() -> usize {
    10
}

/// World dimensions and global mass budget.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_size")]
    pub width: f32,
    #[serde(default = "default_world_size")]
    pub height: f32,
    /// Target total mass (food + actors) the balancer steers toward.
    #[serde(default = "default_game_mass")]
    pub game_mass: f32,
    /// Logarithm base of the large-cell slowdown.
    #[serde(default = "default_slow_base")]
    pub slow_base: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_size(),
            height: default_world_size(),
            game_mass: default_game_mass(),
            slow_base: default_slow_base(),
        }
    }
}

fn default_world_size() -> f32 {
    5000.0
}
fn default_game_mass() -> f32 {
    50000.0
}
fn default_slow_base() -> f32 {
    4.5
}

/// Food pellet configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    #[serde(default = "default_food_mass")]
    pub mass: f32,
    #[serde(default = "default_food_max_amount")]
    pub max_amount: usize,
    /// Spread new food away from existing pellets instead of dropping it anywhere.
    #[serde(default = "default_true")]
    pub uniform_disposition: bool,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            mass: default_food_mass(),
            max_amount: default_food_max_amount(),
            uniform_disposition: true,
        }
    }
}

fn default_food_mass() -> f32 {
    1.0
}
fn default_food_max_amount() -> usize {
    3000
}
fn default_true() -> bool {
    true
}

/// Virus configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirusConfig {
    /// Mass range for freshly spawned viruses; `from` is also the post-split mass.
    #[serde(default = "default_virus_mass")]
    pub default_mass: MassRange,
    #[serde(default = "default_virus_split_threshold")]
    pub split_threshold: f32,
    #[serde(default = "default_virus_split_speed")]
    pub split_speed: f32,
    #[serde(default = "default_virus_max_amount")]
    pub max_amount: usize,
    #[serde(default = "default_true")]
    pub uniform_disposition: bool,
}

impl Default for VirusConfig {
    fn default() -> Self {
        Self {
            default_mass: default_virus_mass(),
            split_threshold: default_virus_split_threshold(),
            split_speed: default_virus_split_speed(),
            max_amount: default_virus_max_amount(),
            uniform_disposition: true,
        }
    }
}

fn default_virus_mass() -> MassRange {
    MassRange { from: 100.0, to: 150.0 }
}
fn default_virus_split_threshold() -> f32 {
    180.0
}
fn default_virus_split_speed() -> f32 {
    22.0
}
fn default_virus_max_amount() -> usize {
    50
}

/// Where newly joined players are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpawnPosition {
    /// As far from other players as a handful of random candidates allows.
    #[default]
    Farthest,
    /// Anywhere inside the world.
    Random,
}

/// Human player configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_player_mass")]
    pub default_mass: f32,
    /// Mass of a single ejected pellet.
    #[serde(default = "default_fire_food")]
    pub fire_food: f32,
    /// Maximum number of cells a player may own.
    #[serde(default = "default_limit_split")]
    pub limit_split: usize,
    #[serde(default = "default_merge_time")]
    pub merge_time_secs: u64,
    /// Per-mille of cell mass lost on each decay pass.
    #[serde(default = "default_mass_loss_rate")]
    pub mass_loss_rate: f32,
    /// Actors at or below this total mass do not decay.
    #[serde(default = "default_min_mass_loss")]
    pub min_mass_loss: f32,
    #[serde(default)]
    pub spawn_position: SpawnPosition,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_mass: default_player_mass(),
            fire_food: default_fire_food(),
            limit_split: default_limit_split(),
            merge_time_secs: default_merge_time(),
            mass_loss_rate: default_mass_loss_rate(),
            min_mass_loss: default_min_mass_loss(),
            spawn_position: SpawnPosition::default(),
        }
    }
}

fn default_player_mass() -> f32 {
    10.0
}
fn default_fire_food() -> f32 {
    20.0
}
fn default_limit_split() -> usize {
    16
}
fn default_merge_time() -> u64 {
    15
}
fn default_mass_loss_rate() -> f32 {
    1.0
}
fn default_min_mass_loss() -> f32 {
    50.0
}

/// Bot population and AI configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Target bot population.
    #[serde(default = "default_bot_count")]
    pub count: usize,
    #[serde(default = "default_detection_range")]
    pub detection_range: f32,
    #[serde(default = "default_bot_start_mass")]
    pub start_mass: MassRange,
    #[serde(default = "default_bot_max_mass")]
    pub max_mass: f32,
    /// Minimum ticks between AI re-evaluations.
    #[serde(default = "default_ai_update_interval")]
    pub ai_update_interval: u32,
    #[serde(default = "default_respawn_delay")]
    pub respawn_delay_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            count: default_bot_count(),
            detection_range: default_detection_range(),
            start_mass: default_bot_start_mass(),
            max_mass: default_bot_max_mass(),
            ai_update_interval: default_ai_update_interval(),
            respawn_delay_ms: default_respawn_delay(),
        }
    }
}

fn default_bot_count() -> usize {
    20
}
fn default_detection_range() -> f32 {
    200.0
}
fn default_bot_start_mass() -> MassRange {
    MassRange { from: 20.0, to: 200.0 }
}
fn default_bot_max_mass() -> f32 {
    1000.0
}
fn default_ai_update_interval() -> u32 {
    3
}
fn default_respawn_delay() -> u64 {
    2000
}

/// Mass ratios that decide who may eat whom.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RulesConfig {
    /// Winner mass must exceed loser mass times this to consume it.
    #[serde(default = "default_eat_threshold")]
    pub eat_threshold: f32,
    /// Ratio at which bots classify a neighbour as threat or prey.
    #[serde(default = "default_ai_mass_ratio")]
    pub ai_mass_ratio: f32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            eat_threshold: default_eat_threshold(),
            ai_mass_ratio: default_ai_mass_ratio(),
        }
    }
}

fn default_eat_threshold() -> f32 {
    1.25
}
fn default_ai_mass_ratio() -> f32 {
    1.1
}
