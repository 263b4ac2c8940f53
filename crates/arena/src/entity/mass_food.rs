//! Mass ejected by actors.

use super::cell::Circular;
use crate::actor::ActorId;
use crate::util::{clamp_to_bounds, mass_to_radius};
use glam::Vec2;
use serde::Serialize;

/// Launch speed of an ejected pellet.
pub const EJECT_SPEED: f32 = 25.0;
/// Per-tick deceleration of an ejected pellet.
const EJECT_DECELERATION: f32 = 0.5;
/// Extra distance kept between a sliding pellet and the world border.
const BORDER_OFFSET: f32 = 5.0;

/// A decelerating pellet of ejected mass.
#[derive(Debug, Clone, Serialize)]
pub struct MassFood {
    /// Unique pellet id.
    pub id: u32,
    /// Actor that fired it. Only used to stop a cell re-absorbing its own shot.
    pub owner: ActorId,
    /// Index of the firing cell at the time of ejection.
    pub source_cell: usize,
    pub position: Vec2,
    pub mass: f32,
    pub radius: f32,
    /// Normalized travel direction.
    pub direction: Vec2,
    /// Distance travelled next tick; decays to zero.
    pub speed: f32,
    /// Inherited from the firing actor.
    pub hue: u16,
}

impl MassFood {
    /// Whether this pellet is still sliding away from the cell that fired it.
    #[inline]
    pub fn is_in_flight_from(&self, owner: ActorId, cell_index: usize) -> bool {
        self.owner == owner && self.source_cell == cell_index && self.speed > 0.0
    }

    /// Advance one tick and decelerate.
    pub fn step(&mut self, width: f32, height: f32) {
        let delta = self.direction * self.speed;

        self.speed -= EJECT_DECELERATION;
        if self.speed < 0.0 {
            self.speed = 0.0;
        }

        if delta.x.is_finite() {
            self.position.x += delta.x;
        }
        if delta.y.is_finite() {
            self.position.y += delta.y;
        }

        clamp_to_bounds(&mut self.position, self.radius, BORDER_OFFSET, width, height);
    }
}

impl Circular for MassFood {
    fn position(&self) -> Vec2 {
        self.position
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn mass(&self) -> f32 {
        self.mass
    }
}

/// Owns every ejected pellet.
#[derive(Debug, Default)]
pub struct MassFoodManager {
    /// Live pellets in firing order.
    pub data: Vec<MassFood>,
    next_id: u32,
}

impl MassFoodManager {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(256),
            next_id: 1,
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

    /// Launch a pellet of `mass` from `origin` along `direction` (normalized here).
    pub fn add_new(
        &mut self,
        owner: ActorId,
        source_cell: usize,
        origin: Vec2,
        direction: Vec2,
        mass: f32,
        hue: u16,
    ) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.data.push(MassFood {
            id,
            owner,
            source_cell,
            position: origin,
            mass,
            radius: mass_to_radius(mass),
            direction: direction.normalize_or_zero(),
            speed: EJECT_SPEED,
            hue,
        });
        id
    }

    /// Move every pellet that still has speed.
    pub fn step(&mut self, width: f32, height: f32) {
        for mass in self.data.iter_mut().filter(|m| m.speed > 0.0) {
            mass.step(width, height);
        }
    }

    /// Look up a pellet by id.
    pub fn get(&self, id: u32) -> Option<&MassFood> {
        self.data.iter().find(|m| m.id == id)
    }

    /// Remove pellets by id; unknown ids are ignored.
    pub fn remove(&mut self, ids: &[u32]) {
        if ids.is_empty() {
            return;
        }
        self.data.retain(|m| !ids.contains(&m.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pellet_decelerates_and_stops() {
        let mut manager = MassFoodManager::new();
        let owner = ActorId::Player(1);
        manager.add_new(owner, 0, Vec2::new(500.0, 500.0), Vec2::new(3.0, 0.0), 20.0, 90);

        for _ in 0..100 {
            manager.step(5000.0, 5000.0);
        }

        let pellet = &manager.data[0];
        assert_eq!(pellet.speed, 0.0);
        assert_eq!(pellet.direction, Vec2::X);
        // 25 + 24.5 + ... + 0.5 = 637.5
        assert!((pellet.position.x - 1137.5).abs() < 1e-2);
        assert!(!pellet.is_in_flight_from(owner, 0));
    }

    #[test]
    fn test_pellet_clamped_to_border() {
        let mut manager = MassFoodManager::new();
        manager.add_new(ActorId::Bot(3), 0, Vec2::new(990.0, 10.0), Vec2::new(1.0, -1.0), 20.0, 0);
        manager.step(1000.0, 1000.0);
        let pellet = &manager.data[0];
        let margin = pellet.radius + 5.0;
        assert_eq!(pellet.position, Vec2::new(1000.0 - margin, margin));
    }

    #[test]
    fn test_remove_by_id() {
        let mut manager = MassFoodManager::new();
        let a = manager.add_new(ActorId::Player(1), 0, Vec2::ZERO, Vec2::X, 5.0, 0);
        let b = manager.add_new(ActorId::Player(1), 1, Vec2::ZERO, Vec2::Y, 5.0, 0);
        manager.remove(&[a]);
        assert_eq!(manager.len(), 1);
        assert!(manager.get(a).is_none());
        assert!(manager.get(b).is_some());
    }
}
