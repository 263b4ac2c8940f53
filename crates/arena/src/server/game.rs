//! Game state and the per-tick simulation pipeline.

use crate::actor::{Actor, ActorId, Player, ScreenSize};
use crate::collision::{CellRef, resolve_actor_collisions, resolve_pellets, resolve_virus_feeding};
use crate::config::{Config, SpawnPosition};
use crate::error::ArenaError;
use crate::map::Map;
use crate::util::{mass_to_radius, math_log, random_position, uniform_position};
use glam::Vec2;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::schedule::{ScheduledTask, Scheduler};
use super::{GameEvent, TickOutput};

/// Viewport assumed until the client reports its own.
const DEFAULT_SCREEN: ScreenSize = ScreenSize { width: 1920.0, height: 1080.0 };
/// Ticks between timing reports.
const TIMING_LOG_INTERVAL: u64 = 400;

/// One-shot player requests applied at the start of the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Split,
    Eject,
}

/// Authoritative simulation state.
#[derive(Debug)]
pub struct GameState {
    pub config: Config,
    pub map: Map,
    pub tick_count: u64,
    /// Slowdown offset so a cell of the default mass moves at full speed.
    init_mass_log: f32,
    /// Latest movement target per player; last intent wins.
    pending_targets: HashMap<u32, Vec2>,
    pending_actions: VecDeque<(u32, PlayerAction)>,
    scheduler: Scheduler,
    /// Events gathered since the last tick output.
    events: Vec<GameEvent>,
    /// Smoothed tick duration in milliseconds.
    pub update_time_avg: f64,
}

impl GameState {
    /// Create the world and seed food, viruses and bots.
    pub fn new(config: Config) -> Self {
        let mut map = Map::new(&config);
        map.bots.initialize_bots(map.width, map.height);
        map.balance_mass(
            config.food.mass,
            config.world.game_mass,
            config.food.max_amount,
            config.virus.max_amount,
        );
        info!(
            "World initialized: {} food, {} viruses, {} bots",
            map.food.len(),
            map.viruses.len(),
            map.bots.len()
        );

        Self {
            init_mass_log: math_log(config.player.default_mass, config.world.slow_base),
            config,
            map,
            tick_count: 0,
            pending_targets: HashMap::new(),
            pending_actions: VecDeque::new(),
            scheduler: Scheduler::new(),
            events: Vec::new(),
            update_time_avg: 0.0,
        }
    }

    fn ensure_player(&self, id: u32) -> Result<(), ArenaError> {
        if self.map.players.get(id).is_some() {
            Ok(())
        } else {
            Err(ArenaError::UnknownActor(ActorId::Player(id)))
        }
    }

    fn player_spawn_point(&self) -> Vec2 {
        let radius = mass_to_radius(self.config.player.default_mass);
        let (width, height) = (self.map.width, self.map.height);
        match self.config.player.spawn_position {
            SpawnPosition::Farthest => uniform_position(
                self.map
                    .players
                    .data
                    .iter()
                    .flat_map(|p| p.cells.iter().map(|c| (c.position, c.radius()))),
                radius,
                width,
                height,
            ),
            SpawnPosition::Random => random_position(radius, width, height),
        }
    }

    /// Spawn a player for a client that finished its handshake.
    pub fn on_player_join(&mut self, id: u32, name: &str, admin: bool) -> Result<ActorId, ArenaError> {
        let actor = ActorId::Player(id);
        if self.map.players.get(id).is_some() {
            return Err(ArenaError::DuplicateActor(actor));
        }

        let position = self.player_spawn_point();
        let player = Player::new(
            id,
            name.trim().to_string(),
            admin,
            position,
            self.config.player.default_mass,
            DEFAULT_SCREEN,
        );
        self.map.players.push_new(player);
        self.events.push(GameEvent::ActorSpawned { actor });

        info!("Player {} '{}' joined at ({:.0}, {:.0})", id, name, position.x, position.y);
        Ok(actor)
    }

    fn forget_player(&mut self, id: u32) -> Option<Player> {
        self.pending_targets.remove(&id);
        self.pending_actions.retain(|(player, _)| *player != id);
        self.map.players.remove_by_id(id)
    }

    /// Remove a player whose client disconnected.
    pub fn on_player_leave(&mut self, id: u32) -> Result<(), ArenaError> {
        let player = self
            .forget_player(id)
            .ok_or(ArenaError::UnknownActor(ActorId::Player(id)))?;
        info!("Player {} '{}' left", id, player.name);
        Ok(())
    }

    /// Remove a player immediately and report why.
    pub fn kick_player(&mut self, id: u32, reason: &str) -> Result<(), ArenaError> {
        let actor = ActorId::Player(id);
        let player = self.forget_player(id).ok_or(ArenaError::UnknownActor(actor))?;
        self.events.push(GameEvent::ActorKicked {
            actor,
            reason: reason.to_string(),
        });
        warn!("Kicked player {} '{}': {}", id, player.name, reason);
        Ok(())
    }

    /// Buffer a movement target relative to the player's center.
    pub fn apply_movement_intent(&mut self, id: u32, target: Vec2) -> Result<(), ArenaError> {
        self.ensure_player(id)?;
        if !target.is_finite() {
            warn!("Dropping non-finite movement target from player {}", id);
            return Ok(());
        }
        self.pending_targets.insert(id, target);
        Ok(())
    }

    pub fn apply_split_intent(&mut self, id: u32) -> Result<(), ArenaError> {
        self.ensure_player(id)?;
        self.pending_actions.push_back((id, PlayerAction::Split));
        Ok(())
    }

    pub fn apply_eject_intent(&mut self, id: u32) -> Result<(), ArenaError> {
        self.ensure_player(id)?;
        self.pending_actions.push_back((id, PlayerAction::Eject));
        Ok(())
    }

    /// Update the viewport used for this player's visibility.
    pub fn apply_screen_resize(&mut self, id: u32, width: f32, height: f32) -> Result<(), ArenaError> {
        let player = self
            .map
            .players
            .get_mut(id)
            .ok_or(ArenaError::UnknownActor(ActorId::Player(id)))?;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            warn!("Dropping invalid screen size {}x{} from player {}", width, height, id);
            return Ok(());
        }
        player.screen = ScreenSize::new(width, height);
        Ok(())
    }

    fn merge_ticks(&self) -> u64 {
        self.config.ms_to_ticks(self.config.player.merge_time_secs * 1000)
    }

    fn apply_pending_intents(&mut self) {
        for (id, target) in self.pending_targets.drain() {
            if let Some(player) = self.map.players.get_mut(id) {
                player.target = target;
            }
        }

        let now = self.tick_count;
        let merge_ticks = self.merge_ticks();
        let player_config = &self.config.player;
        while let Some((id, action)) = self.pending_actions.pop_front() {
            let Some(player) = self.map.players.get_mut(id) else {
                continue;
            };
            match action {
                PlayerAction::Split => {
                    player.user_split(player_config.limit_split, player_config.default_mass, now, merge_ticks);
                }
                PlayerAction::Eject => {
                    let owner = player.id();
                    let hue = player.hue;
                    let launches = player.eject(player_config.fire_food, player_config.default_mass);
                    for launch in launches {
                        self.map
                            .mass_food
                            .add_new(owner, launch.cell_index, launch.origin, launch.direction, launch.mass, hue);
                    }
                }
            }
        }
    }

    fn run_scheduled_tasks(&mut self) {
        for task in self.scheduler.drain_due(self.tick_count) {
            match task {
                ScheduledTask::RespawnBot => {
                    if let Some(id) = self.map.bots.respawn_bot(self.map.width, self.map.height) {
                        self.events.push(GameEvent::ActorSpawned { actor: ActorId::Bot(id) });
                    }
                }
            }
        }
    }

    fn step_entities(&mut self) {
        let (width, height) = (self.map.width, self.map.height);
        let slow_base = self.config.world.slow_base;
        self.map
            .players
            .step(slow_base, width, height, self.init_mass_log, self.tick_count);
        self.map.bots.step(slow_base, width, height, self.init_mass_log);
        self.map.mass_food.step(width, height);
        self.map.viruses.step(width, height);
    }

    fn cell_mass(&self, cell: CellRef) -> Option<f32> {
        let cells = match cell.actor {
            ActorId::Player(id) => &self.map.players.get(id)?.cells,
            ActorId::Bot(id) => &self.map.bots.get(id)?.cells,
        };
        cells.get(cell.cell).map(|c| c.mass())
    }

    fn grow_cell(&mut self, cell: CellRef, delta: f32) {
        if let Some(actor) = self.map.actor_mut(cell.actor) {
            actor.change_cell_mass(cell.cell, delta);
        }
    }

    /// Detect every consumption against this tick's positions, then apply it.
    fn resolve_collisions(&mut self) {
        let threshold = self.config.rules.eat_threshold;
        let food_grid = self.map.food.spatial_index(self.map.width, self.map.height);
        let (eats, pellets, feeds) = {
            let actors = self.map.actors();
            (
                resolve_actor_collisions(&actors, threshold),
                resolve_pellets(
                    &actors,
                    &self.map.food.data,
                    &food_grid,
                    &self.map.mass_food.data,
                    &self.map.viruses.data,
                    threshold,
                ),
                resolve_virus_feeding(&self.map.viruses.data, &self.map.mass_food.data, threshold),
            )
        };

        let mut consumed: HashSet<CellRef> = HashSet::new();
        let mut killers: HashMap<ActorId, ActorId> = HashMap::new();
        for eat in eats {
            if consumed.contains(&eat.winner) || consumed.contains(&eat.loser) {
                continue;
            }
            let Some(mass) = self.cell_mass(eat.loser) else {
                continue;
            };
            self.grow_cell(eat.winner, mass);
            consumed.insert(eat.loser);
            killers.insert(eat.loser.actor, eat.winner.actor);
            self.events.push(GameEvent::ActorAte {
                winner: eat.winner.actor,
                loser: eat.loser.actor,
            });
        }

        let food_mass = self.map.food.food_mass();
        let mut eaten_food = Vec::new();
        for (eater, food_id) in pellets.food {
            if consumed.contains(&eater) {
                continue;
            }
            self.grow_cell(eater, food_mass);
            eaten_food.push(food_id);
        }

        let mut eaten_mass_food = Vec::new();
        for (eater, pellet_id) in pellets.mass_food {
            if consumed.contains(&eater) {
                continue;
            }
            let Some(mass) = self.map.mass_food.get(pellet_id).map(|m| m.mass) else {
                continue;
            };
            self.grow_cell(eater, mass);
            eaten_mass_food.push(pellet_id);
        }

        let mut eaten_viruses = Vec::new();
        let mut popped: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (eater, virus_id) in pellets.viruses {
            let ActorId::Player(player_id) = eater.actor else {
                continue;
            };
            if consumed.contains(&eater) {
                continue;
            }
            eaten_viruses.push(virus_id);
            popped.entry(player_id).or_default().push(eater.cell);
        }

        for feed in feeds {
            if eaten_viruses.contains(&feed.virus) || eaten_mass_food.contains(&feed.mass_food) {
                continue;
            }
            let Some(pellet) = self.map.mass_food.get(feed.mass_food) else {
                continue;
            };
            let (mass, direction) = (pellet.mass, pellet.direction);
            self.map.viruses.feed(feed.virus, mass, direction);
            eaten_mass_food.push(feed.mass_food);
        }

        self.map.food.delete(&eaten_food);
        self.map.mass_food.remove(&eaten_mass_food);
        self.map.viruses.delete(&eaten_viruses);

        // Virus pops only append cells, so the indexes in `consumed` stay valid.
        let now = self.tick_count;
        let merge_ticks = self.merge_ticks();
        let player_config = &self.config.player;
        for (player_id, cells) in popped {
            if let Some(player) = self.map.players.get_mut(player_id) {
                player.virus_split(&cells, player_config.limit_split, player_config.default_mass, now, merge_ticks);
                debug!("Player {} popped on {} virus(es)", player_id, cells.len());
            }
        }

        self.remove_consumed_cells(consumed, &killers);
    }

    /// Drop consumed cells, highest index first, and handle actors left without cells.
    fn remove_consumed_cells(&mut self, consumed: HashSet<CellRef>, killers: &HashMap<ActorId, ActorId>) {
        let mut by_actor: BTreeMap<ActorId, Vec<usize>> = BTreeMap::new();
        for cell in consumed {
            by_actor.entry(cell.actor).or_default().push(cell.cell);
        }

        for (actor, mut indexes) in by_actor {
            indexes.sort_unstable_by(|a, b| b.cmp(a));
            let Some(target) = self.map.actor_mut(actor) else {
                continue;
            };
            let mut dead = false;
            for index in indexes {
                dead = target.remove_cell(index);
            }
            if dead {
                self.on_actor_death(actor, killers.get(&actor).copied());
            }
        }
    }

    fn on_actor_death(&mut self, actor: ActorId, killer: Option<ActorId>) {
        match actor {
            ActorId::Player(id) => {
                if let Some(player) = self.forget_player(id) {
                    info!("Player {} '{}' was eaten", id, player.name);
                }
            }
            ActorId::Bot(id) => {
                self.map.bots.remove_by_id(id);
                let due = self.tick_count + self.config.ms_to_ticks(self.config.bots.respawn_delay_ms);
                self.scheduler.schedule(due, ScheduledTask::RespawnBot);
                debug!("Bot {} died, respawn due at tick {}", id, due);
            }
        }
        self.events.push(GameEvent::ActorDied { actor, killer });
    }

    /// Mass decay plus food and virus top-up.
    fn balance(&mut self) {
        let player_config = &self.config.player;
        self.map.players.shrink_cells(
            player_config.mass_loss_rate,
            player_config.default_mass,
            player_config.min_mass_loss,
        );
        self.map.bots.shrink_cells(
            player_config.mass_loss_rate,
            player_config.default_mass,
            player_config.min_mass_loss,
        );
        self.map.balance_mass(
            self.config.food.mass,
            self.config.world.game_mass,
            self.config.food.max_amount,
            self.config.virus.max_amount,
        );
    }

    #[cfg(debug_assertions)]
    fn debug_check_invariants(&self) {
        for actor in self.map.actors() {
            actor.debug_check_mass_total();
        }
        debug_assert!(
            self.map
                .players
                .data
                .iter()
                .all(|p| p.cells.len() <= self.config.player.limit_split),
            "player exceeded the split limit"
        );
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) -> TickOutput {
        let tick_start = Instant::now();
        self.tick_count += 1;

        self.apply_pending_intents();
        self.run_scheduled_tasks();

        let movement_start = Instant::now();
        self.step_entities();
        let movement_time = movement_start.elapsed();

        let collision_start = Instant::now();
        self.resolve_collisions();
        let collision_time = collision_start.elapsed();

        let leaderboard = if self.tick_count % self.config.server.balance_interval_ticks.max(1) == 0 {
            self.balance();
            Some(self.map.leaderboard(self.config.server.leaderboard_size))
        } else {
            None
        };

        let ai_start = Instant::now();
        let food_grid = self.map.food.spatial_index(self.map.width, self.map.height);
        self.map.bots.update_ai(
            &self.map.players.data,
            &self.map.food.data,
            &food_grid,
            self.config.rules.ai_mass_ratio,
        );
        let ai_time = ai_start.elapsed();

        let views = self.map.enumerate_what_players_see();
        #[cfg(debug_assertions)]
        self.debug_check_invariants();

        if self.tick_count % TIMING_LOG_INTERVAL == 0 {
            debug!(
                "Tick #{}: {:.2}ms total | move={:.2}ms collision={:.2}ms ai={:.2}ms | {} food, {} viruses, {} players, {} bots",
                self.tick_count,
                tick_start.elapsed().as_secs_f64() * 1000.0,
                movement_time.as_secs_f64() * 1000.0,
                collision_time.as_secs_f64() * 1000.0,
                ai_time.as_secs_f64() * 1000.0,
                self.map.food.len(),
                self.map.viruses.len(),
                self.map.players.len(),
                self.map.bots.len()
            );
        }

        TickOutput {
            tick: self.tick_count,
            views,
            events: std::mem::take(&mut self.events),
            leaderboard,
        }
    }
}
