//! The world: every entity manager plus balancing, visibility and ranking.

use crate::actor::{Actor, ActorId, Player, PlayerManager};
use crate::ai::BotManager;
use crate::config::Config;
use crate::entity::{Cell, Food, FoodManager, MassFood, MassFoodManager, Virus, VirusManager};
use serde::Serialize;
use tracing::debug;

/// Everything that lives in the arena.
#[derive(Debug)]
pub struct Map {
    /// Static pellets.
    pub food: FoodManager,
    pub viruses: VirusManager,
    /// Ejected mass, moving or at rest.
    pub mass_food: MassFoodManager,
    /// Human-controlled actors.
    pub players: PlayerManager,
    /// Server-controlled actors.
    pub bots: BotManager,
    /// World width in world units.
    pub width: f32,
    /// World height in world units.
    pub height: f32,
}

/// What a [`Map::balance_mass`] pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalanceReport {
    /// Pellets spawned to fill the mass budget.
    pub food_added: usize,
    /// Pellets dropped because the budget was exceeded.
    pub food_removed: usize,
    pub viruses_added: usize,
}

/// Public state of one actor as seen by a client.
#[derive(Debug, Clone, Serialize)]
pub struct ActorSnapshot {
    pub id: ActorId,
    /// Actor center.
    pub x: f32,
    pub y: f32,
    pub cells: Vec<Cell>,
    /// Total mass rounded for display.
    pub mass_total: u32,
    /// Display hue in degrees.
    pub hue: u16,
    pub name: String,
}

impl ActorSnapshot {
    pub fn of(actor: &dyn Actor) -> Self {
        let position = actor.position();
        Self {
            id: actor.id(),
            x: position.x,
            y: position.y,
            cells: actor.cells().to_vec(),
            mass_total: actor.mass_total().round() as u32,
            hue: actor.hue(),
            name: actor.name().to_string(),
        }
    }
}

/// Everything one player is allowed to see this tick.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    /// The viewing player itself.
    pub me: ActorSnapshot,
    /// Other actors with at least one visible cell.
    pub visible_actors: Vec<ActorSnapshot>,
    /// Pellets inside the unpadded viewport.
    pub visible_food: Vec<Food>,
    /// Ejected mass inside the padded viewport.
    pub visible_mass_food: Vec<MassFood>,
    /// Viruses inside the padded viewport.
    pub visible_viruses: Vec<Virus>,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub id: ActorId,
    pub name: String,
    /// Total mass across all cells.
    pub mass: f32,
}

impl Map {
    pub fn new(config: &Config) -> Self {
        Self {
            food: FoodManager::new(config.food.mass, config.food.uniform_disposition),
            viruses: VirusManager::new(config.virus.clone()),
            mass_food: MassFoodManager::new(),
            players: PlayerManager::new(),
            bots: BotManager::new(config.bots.clone()),
            width: config.world.width,
            height: config.world.height,
        }
    }

    /// Players first, then bots.
    pub fn actors(&self) -> Vec<&dyn Actor> {
        self.players
            .data
            .iter()
            .map(|p| p as &dyn Actor)
            .chain(self.bots.data.iter().map(|b| b as &dyn Actor))
            .collect()
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut dyn Actor> {
        match id {
            ActorId::Player(id) => self.players.get_mut(id).map(|p| p as &mut dyn Actor),
            ActorId::Bot(id) => self.bots.get_mut(id).map(|b| b as &mut dyn Actor),
        }
    }

    /// Mass held by food and actors. Viruses and ejected mass are not counted.
    pub fn total_mass(&self) -> f32 {
        self.food.len() as f32 * self.food.food_mass() + self.players.total_mass() + self.bots.total_mass()
    }

    /// Steer food toward `game_mass` and top viruses up to `max_virus`.
    pub fn balance_mass(&mut self, food_mass: f32, game_mass: f32, max_food: usize, max_virus: usize) -> BalanceReport {
        let mut report = BalanceReport::default();
        let food_count = self.food.len();
        let total = food_count as f32 * food_mass + self.players.total_mass() + self.bots.total_mass();

        let by_mass = ((game_mass - total) / food_mass).trunc() as i64;
        let by_capacity = max_food as i64 - food_count as i64;
        let food_diff = by_mass.min(by_capacity);

        if food_diff > 0 {
            report.food_added = food_diff as usize;
            self.food.add_new(report.food_added, self.width, self.height);
        } else if food_diff != 0 && !self.food.is_empty() {
            report.food_removed = (-food_diff) as usize;
            self.food.remove_excess(report.food_removed);
        }

        let missing = max_virus.saturating_sub(self.viruses.len());
        if missing > 0 {
            report.viruses_added = self.viruses.add_new(missing, self.width, self.height);
        }

        if report != BalanceReport::default() {
            debug!(
                "Balanced mass: +{} food, -{} food, +{} viruses (total {:.0} / {:.0})",
                report.food_added, report.food_removed, report.viruses_added, total, game_mass
            );
        }
        report
    }

    /// The filtered view of every human player.
    pub fn enumerate_what_players_see(&self) -> Vec<PlayerView> {
        let actors = self.actors();
        self.players.data.iter().map(|player| self.view_of(player, &actors)).collect()
    }

    fn view_of(&self, player: &Player, actors: &[&dyn Actor]) -> PlayerView {
        let me = player.id();
        PlayerView {
            me: ActorSnapshot::of(player),
            visible_actors: actors
                .iter()
                .filter(|a| a.id() != me && player.sees_actor(**a))
                .map(|a| ActorSnapshot::of(*a))
                .collect(),
            visible_food: self
                .food
                .data
                .iter()
                .filter(|f| player.sees(f.position, f.radius, false))
                .cloned()
                .collect(),
            visible_mass_food: self
                .mass_food
                .data
                .iter()
                .filter(|m| player.sees(m.position, m.radius, true))
                .cloned()
                .collect(),
            visible_viruses: self
                .viruses
                .data
                .iter()
                .filter(|v| player.sees(v.body.position, v.body.radius(), true))
                .cloned()
                .collect(),
        }
    }

    /// Heaviest actors first.
    pub fn leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .actors()
            .into_iter()
            .map(|a| LeaderboardEntry {
                id: a.id(),
                name: a.name().to_string(),
                mass: a.mass_total(),
            })
            .collect();
        entries.sort_by(|a, b| b.mass.total_cmp(&a.mass).then_with(|| a.id.cmp(&b.id)));
        entries.truncate(limit);
        entries
    }
}
