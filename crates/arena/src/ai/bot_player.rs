use crate::actor::{Actor, ActorId};
use crate::entity::{Cell, Food, MIN_SPEED};
use crate::util::clamp_to_bounds;
use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

/// Ticks a hunt or flee decision is kept before re-evaluating.
const MAX_TARGET_PERSISTENCE: i32 = 30;
/// Food is only noticed within this fraction of the detection range.
pub(super) const FOOD_RANGE_FACTOR: f32 = 0.6;

const FLEE_DISTANCE: f32 = 200.0;
const HUNT_DISTANCE: f32 = 150.0;
const FOOD_DISTANCE: f32 = 100.0;
const WANDER_DISTANCE: f32 = 80.0;

/// AI state of a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AiState {
    #[default]
    Idle,
    Fleeing,
    Hunting,
    ChasingFood,
}

/// Something a bot noticed during a scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub position: Vec2,
    /// Distance from the scanning bot.
    pub distance: f32,
}

/// Result of a neighbourhood scan, split by how the bot should react.
#[derive(Debug, Clone, Default)]
pub struct Surroundings {
    /// Actors heavy enough to eat the bot.
    pub threats: Vec<Sighting>,
    /// Actors light enough for the bot to eat.
    pub prey: Vec<Sighting>,
    pub food: Vec<Sighting>,
}

impl Surroundings {
    fn nearest(sightings: &[Sighting]) -> Option<&Sighting> {
        sightings.iter().min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Read-only view of another actor used for threat/prey classification.
#[derive(Debug, Clone, Copy)]
pub struct Neighbour {
    pub id: ActorId,
    /// Actor center.
    pub position: Vec2,
    /// Total mass across all cells.
    pub mass: f32,
}

/// A single-celled, AI-driven actor.
#[derive(Debug, Clone)]
pub struct Bot {
    /// Bot number.
    pub id: u32,
    pub name: String,
    /// Display hue in degrees.
    pub hue: u16,
    /// Always exactly one cell while alive.
    pub cells: Vec<Cell>,
    mass_total: f32,
    /// Center of the single cell.
    pub position: Vec2,
    /// Movement target relative to `position`.
    pub target: Vec2,
    /// Mass ceiling for the cell.
    max_mass: f32,

    /// Current decision.
    pub ai_state: AiState,
    /// World position of whatever the current decision reacts to.
    pub ai_target: Option<Vec2>,
    /// Ticks left before the current decision may be replaced.
    pub target_persistence: i32,
    /// Ticks since the last evaluation.
    pub update_counter: u32,
}

impl Bot {
    /// Create a bot with a single cell.
    pub fn new(id: u32, position: Vec2, mass: f32, max_mass: f32) -> Self {
        let mut rng = rand::rng();
        let mass = mass.min(max_mass);
        Self {
            id,
            name: format!("Bot{}", rng.random_range(1..=1000)),
            hue: rng.random_range(0..360),
            cells: vec![Cell::new(position, mass, MIN_SPEED)],
            mass_total: mass,
            position,
            target: Vec2::ZERO,
            max_mass,
            ai_state: AiState::Idle,
            ai_target: None,
            target_persistence: 0,
            update_counter: 0,
        }
    }

    /// Classify neighbours and nearby food.
    ///
    /// Neighbours within the mass-ratio band are ignored.
    pub fn scan<'a, 'b>(
        &self,
        neighbours: impl IntoIterator<Item = &'a Neighbour>,
        food: impl IntoIterator<Item = &'b Food>,
        detection_range: f32,
        mass_ratio: f32,
    ) -> Surroundings {
        let mut surroundings = Surroundings::default();
        let me = ActorId::Bot(self.id);

        for other in neighbours {
            if other.id == me {
                continue;
            }
            let distance = other.position.distance(self.position);
            if distance > detection_range {
                continue;
            }
            let sighting = Sighting { position: other.position, distance };
            if other.mass > self.mass_total * mass_ratio {
                surroundings.threats.push(sighting);
            } else if self.mass_total > other.mass * mass_ratio {
                surroundings.prey.push(sighting);
            }
        }

        let food_range = detection_range * FOOD_RANGE_FACTOR;
        for pellet in food {
            let distance = pellet.position.distance(self.position);
            if distance <= food_range {
                surroundings.food.push(Sighting { position: pellet.position, distance });
            }
        }

        surroundings
    }

    /// Pick a state and target. Flee beats hunt beats food beats wander.
    pub fn decide(&mut self, surroundings: &Surroundings) {
        if !surroundings.threats.is_empty() {
            let centroid = surroundings.threats.iter().map(|s| s.position).sum::<Vec2>()
                / surroundings.threats.len() as f32;
            self.ai_state = AiState::Fleeing;
            self.ai_target = Some(centroid);
            self.target = Self::heading(centroid, self.position) * FLEE_DISTANCE;
            self.target_persistence = MAX_TARGET_PERSISTENCE;
        } else if let Some(prey) = Surroundings::nearest(&surroundings.prey) {
            self.ai_state = AiState::Hunting;
            self.ai_target = Some(prey.position);
            self.target = Self::heading(self.position, prey.position) * HUNT_DISTANCE;
            self.target_persistence = MAX_TARGET_PERSISTENCE;
        } else if let Some(food) = Surroundings::nearest(&surroundings.food) {
            self.ai_state = AiState::ChasingFood;
            self.ai_target = Some(food.position);
            self.target = Self::heading(self.position, food.position) * FOOD_DISTANCE;
            self.target_persistence = MAX_TARGET_PERSISTENCE / 2;
        } else {
            let angle = rand::rng().random_range(0.0..TAU);
            self.ai_state = AiState::Idle;
            self.ai_target = None;
            self.target = Vec2::from_angle(angle) * WANDER_DISTANCE;
            self.target_persistence = MAX_TARGET_PERSISTENCE * 2;
        }
    }

    /// Unit vector from `from` toward `to` via atan2 (a zero offset heads along +x).
    fn heading(from: Vec2, to: Vec2) -> Vec2 {
        let offset = to - from;
        Vec2::from_angle(offset.y.atan2(offset.x))
    }

    /// Advance the throttle counters; returns whether a re-evaluation is due.
    pub fn tick_ai_clock(&mut self, update_interval: u32) -> bool {
        self.update_counter += 1;
        self.target_persistence -= 1;

        if self.update_counter < update_interval || self.target_persistence > 0 {
            return false;
        }
        self.update_counter = 0;
        true
    }

    /// Steer the single cell toward the target.
    pub fn step(&mut self, slow_base: f32, width: f32, height: f32, init_mass_log: f32) {
        let Some(cell) = self.cells.first_mut() else {
            return;
        };
        cell.step_toward(self.position, self.target, slow_base, init_mass_log);
        let radius = cell.radius();
        clamp_to_bounds(&mut cell.position, radius / 3.0, 0.0, width, height);
        self.position = cell.position;
    }
}

impl Actor for Bot {
    fn id(&self) -> ActorId {
        ActorId::Bot(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn hue(&self) -> u16 {
        self.hue
    }

    fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn mass_total(&self) -> f32 {
        self.mass_total
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn target(&self) -> Vec2 {
        self.target
    }

    fn change_cell_mass(&mut self, index: usize, delta: f32) {
        let max_mass = self.max_mass;
        if let Some(cell) = self.cells.get_mut(index) {
            let before = cell.mass();
            cell.set_mass((before + delta).min(max_mass));
            self.mass_total += cell.mass() - before;
        }
    }

    fn remove_cell(&mut self, index: usize) -> bool {
        if index < self.cells.len() {
            let cell = self.cells.remove(index);
            self.mass_total -= cell.mass();
        }
        self.cells.is_empty()
    }
}
