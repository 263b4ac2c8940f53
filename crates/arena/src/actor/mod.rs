//! Multi-cell actors: human players and bots.
//!
//! The set of actor kinds is closed; [`ActorId`] tags which manager owns an
//! actor and [`Actor`] is the capability set the collision, balancing and
//! visibility code works against.

pub mod player;

pub use player::{Player, PlayerManager};

use crate::entity::Cell;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an actor, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActorId {
    Player(u32),
    Bot(u32),
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorId::Player(id) => write!(f, "player#{id}"),
            ActorId::Bot(id) => write!(f, "bot#{id}"),
        }
    }
}

/// Client viewport dimensions forwarded by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    /// Viewport width in world units.
    pub width: f32,
    /// Viewport height in world units.
    pub height: f32,
}

impl ScreenSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Half extents of the view rectangle.
    #[inline]
    pub fn half(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Shared capability set of players and bots.
pub trait Actor {
    fn id(&self) -> ActorId;

    fn name(&self) -> &str;

    fn hue(&self) -> u16;

    fn cells(&self) -> &[Cell];

    /// Sum of cell masses.
    fn mass_total(&self) -> f32;

    /// Center of the actor (mean of its cell centers).
    fn position(&self) -> Vec2;

    /// Movement target relative to [`Actor::position`].
    fn target(&self) -> Vec2;

    /// Add `delta` to one cell, keeping the mass total in step.
    fn change_cell_mass(&mut self, index: usize, delta: f32);

    /// Remove one cell; returns `true` when the actor has no cells left.
    fn remove_cell(&mut self, index: usize) -> bool;

    /// Whether eating a virus pops this actor's cell.
    fn splits_on_virus(&self) -> bool {
        false
    }

    /// Decay every cell that is still above the floor.
    fn lose_mass_if_needed(&mut self, mass_loss_rate: f32, default_mass: f32, min_mass_loss: f32) {
        let factor = mass_loss_rate / 1000.0;
        for index in 0..self.cells().len() {
            let mass = self.cells()[index].mass();
            if mass * (1.0 - factor) > default_mass && self.mass_total() > min_mass_loss {
                self.change_cell_mass(index, -mass * factor);
            }
        }
    }

    /// Panics in debug builds if the cached mass total drifted from the cell sum.
    fn debug_check_mass_total(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let sum: f32 = self.cells().iter().map(Cell::mass).sum();
        debug_assert!(
            (sum - self.mass_total()).abs() <= 1e-3 * sum.max(1.0),
            "{} mass total {} drifted from cell sum {}",
            self.id(),
            self.mass_total(),
            sum
        );
    }
}
