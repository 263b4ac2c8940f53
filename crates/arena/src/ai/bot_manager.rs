use super::bot_player::{Bot, FOOD_RANGE_FACTOR, Neighbour};
use crate::actor::{Actor, Player};
use crate::config::BotConfig;
use crate::entity::Food;
use crate::spatial::SpatialGrid;
use crate::util::{mass_to_radius, random_in_range};
use glam::Vec2;
use tracing::{debug, info};

/// Bot manager.
#[derive(Debug)]
pub struct BotManager {
    /// Active bots.
    pub data: Vec<Bot>,
    config: BotConfig,
    /// Next bot number.
    next_bot_number: u32,
}

impl BotManager {
    /// Create a new bot manager.
    pub fn new(config: BotConfig) -> Self {
        Self {
            data: Vec::with_capacity(config.count),
            config,
            next_bot_number: 1,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Target bot population.
    #[inline]
    pub fn target_count(&self) -> usize {
        self.config.count
    }

    /// Spawn a bot at a random point; returns its number.
    pub fn spawn_bot(&mut self, width: f32, height: f32) -> u32 {
        let id = self.next_bot_number;
        self.next_bot_number += 1;

        let position = self.generate_spawnpoint(width, height);
        let mass = random_in_range(self.config.start_mass.from, self.config.start_mass.to);
        self.data.push(Bot::new(id, position, mass, self.config.max_mass));

        debug!("Bot {} spawned at ({:.0}, {:.0}) with mass {:.0}", id, position.x, position.y, mass);
        id
    }

    /// Spawn point far enough from the border for the largest start mass.
    fn generate_spawnpoint(&self, width: f32, height: f32) -> Vec2 {
        let radius = mass_to_radius(self.config.start_mass.to);
        Vec2::new(
            random_in_range(radius, width - radius),
            random_in_range(radius, height - radius),
        )
    }

    /// Fill the population up to the configured count.
    pub fn initialize_bots(&mut self, width: f32, height: f32) {
        while self.data.len() < self.config.count {
            self.spawn_bot(width, height);
        }
        info!("Initialized {} bots", self.data.len());
    }

    /// Spawn a replacement if the population is below target.
    pub fn respawn_bot(&mut self, width: f32, height: f32) -> Option<u32> {
        (self.data.len() < self.config.count).then(|| self.spawn_bot(width, height))
    }

    pub fn get(&self, id: u32) -> Option<&Bot> {
        self.data.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Bot> {
        self.data.iter_mut().find(|b| b.id == id)
    }

    /// Remove a bot by identity.
    pub fn remove_by_id(&mut self, id: u32) -> Option<Bot> {
        let index = self.data.iter().position(|b| b.id == id)?;
        Some(self.data.remove(index))
    }

    /// Run the throttled AI for every bot.
    /// Re-evaluate every bot whose decision is due. `food_grid` must index `food`.
    pub fn update_ai(&mut self, players: &[Player], food: &[Food], food_grid: &SpatialGrid, mass_ratio: f32) {
        let neighbours: Vec<Neighbour> = players
            .iter()
            .map(|p| p as &dyn Actor)
            .chain(self.data.iter().map(|b| b as &dyn Actor))
            .map(|actor| Neighbour {
                id: actor.id(),
                position: actor.position(),
                mass: actor.mass_total(),
            })
            .collect();

        let detection_range = self.config.detection_range;
        let update_interval = self.config.ai_update_interval;
        for bot in &mut self.data {
            if !bot.tick_ai_clock(update_interval) {
                continue;
            }
            let nearby_food = food_grid
                .find_in_radius(bot.position, detection_range * FOOD_RANGE_FACTOR)
                .into_iter()
                .filter_map(|i| food.get(i));
            let surroundings = bot.scan(&neighbours, nearby_food, detection_range, mass_ratio);
            bot.decide(&surroundings);
        }
    }

    pub fn step(&mut self, slow_base: f32, width: f32, height: f32, init_mass_log: f32) {
        for bot in &mut self.data {
            bot.step(slow_base, width, height, init_mass_log);
        }
    }

    pub fn shrink_cells(&mut self, mass_loss_rate: f32, default_mass: f32, min_mass_loss: f32) {
        for bot in &mut self.data {
            bot.lose_mass_if_needed(mass_loss_rate, default_mass, min_mass_loss);
        }
    }

    pub fn total_mass(&self) -> f32 {
        self.data.iter().map(|b| b.mass_total()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ScreenSize;
    use crate::ai::AiState;
    use crate::config::MassRange;
    use crate::entity::FoodManager;

    fn test_config(count: usize) -> BotConfig {
        BotConfig {
            count,
            detection_range: 200.0,
            start_mass: MassRange { from: 50.0, to: 50.0 },
            max_mass: 1000.0,
            ai_update_interval: 1,
            respawn_delay_ms: 2000,
        }
    }

    #[test]
    fn test_initialize_and_respawn_up_to_count() {
        let mut bots = BotManager::new(test_config(3));
        bots.initialize_bots(5000.0, 5000.0);
        assert_eq!(bots.len(), 3);
        assert_eq!(bots.total_mass(), 150.0);
        assert!(bots.respawn_bot(5000.0, 5000.0).is_none());

        let first = bots.data[0].id;
        assert!(bots.remove_by_id(first).is_some());
        let replacement = bots.respawn_bot(5000.0, 5000.0).unwrap();
        assert_ne!(replacement, first);
        assert_eq!(bots.len(), 3);
    }

    #[test]
    fn test_update_ai_flees_from_bigger_player() {
        let mut bots = BotManager::new(test_config(1));
        bots.initialize_bots(5000.0, 5000.0);
        let bot_position = bots.data[0].position;

        let big = Player::new(
            7,
            "big".into(),
            false,
            bot_position + Vec2::new(50.0, 0.0),
            500.0,
            ScreenSize::new(1920.0, 1080.0),
        );
        bots.update_ai(&[big], &[], &SpatialGrid::for_world(5000.0, 5000.0), 1.1);

        let bot = &bots.data[0];
        assert_eq!(bot.ai_state, AiState::Fleeing);
        assert!(bot.target.x < 0.0);
    }

    #[test]
    fn test_bots_see_each_other() {
        let mut bots = BotManager::new(test_config(2));
        bots.initialize_bots(5000.0, 5000.0);
        bots.data[0].position = Vec2::new(1000.0, 1000.0);
        bots.data[1].position = Vec2::new(1100.0, 1000.0);
        bots.data[1].change_cell_mass(0, 100.0);

        bots.update_ai(&[], &[], &SpatialGrid::for_world(5000.0, 5000.0), 1.1);
        assert_eq!(bots.data[0].ai_state, AiState::Fleeing);
        assert_eq!(bots.data[1].ai_state, AiState::Hunting);
    }

    #[test]
    fn test_update_ai_chases_indexed_food() {
        let mut bots = BotManager::new(test_config(1));
        bots.initialize_bots(5000.0, 5000.0);
        bots.data[0].position = Vec2::new(1000.0, 1000.0);

        let mut food = FoodManager::new(1.0, false);
        food.add_new(2, 5000.0, 5000.0);
        food.data[0].position = Vec2::new(3000.0, 3000.0);
        food.data[1].position = Vec2::new(1050.0, 1000.0);
        let grid = food.spatial_index(5000.0, 5000.0);

        bots.update_ai(&[], &food.data, &grid, 1.1);
        let bot = &bots.data[0];
        assert_eq!(bot.ai_state, AiState::ChasingFood);
        assert_eq!(bot.ai_target, Some(Vec2::new(1050.0, 1000.0)));
    }
}
