//! Viruses and their feed/split state machine.
//!
//! A virus sits still at its base mass. Ejected mass that it absorbs accumulates
//! on top of that; once the total reaches the split threshold the virus resets
//! to the base mass and launches an identical copy along the feeding direction.

use super::cell::{Cell, Circular};
use crate::config::VirusConfig;
use crate::util::{clamp_to_bounds, mass_to_radius, random_in_range, random_position, uniform_position};
use glam::Vec2;
use serde::Serialize;
use tracing::debug;

/// Per-tick deceleration of a launched virus.
const VIRUS_DECELERATION: f32 = 0.5;
/// Extra distance kept between a sliding virus and the world border.
const BORDER_OFFSET: f32 = 5.0;

/// Where a virus is in its feed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirusPhase {
    /// At (or below) the base mass.
    Stable,
    /// Holding absorbed mass below the split threshold.
    Fed,
}

/// A virus; pops player cells that eat it and splits when overfed.
#[derive(Debug, Clone, Serialize)]
pub struct Virus {
    /// Unique virus id.
    pub id: u32,
    /// Position, mass and launch speed.
    pub body: Cell,
    /// Launch direction (zero while resting).
    pub direction: Vec2,
}

impl Virus {
    fn new(id: u32, position: Vec2, mass: f32) -> Self {
        Self {
            id,
            body: Cell::new(position, mass, 0.0),
            direction: Vec2::ZERO,
        }
    }

    /// Feed-cycle phase relative to `base_mass`.
    pub fn phase(&self, base_mass: f32) -> VirusPhase {
        if self.body.mass() > base_mass {
            VirusPhase::Fed
        } else {
            VirusPhase::Stable
        }
    }

    fn launch(&mut self, direction: Vec2, speed: f32) {
        self.direction = direction.normalize_or_zero();
        self.body.speed = speed;
    }

    /// Slide along the launch direction, decelerating to rest.
    fn step(&mut self, width: f32, height: f32) {
        if self.body.speed <= 0.0 {
            return;
        }

        let delta = self.direction * self.body.speed;
        self.body.speed = (self.body.speed - VIRUS_DECELERATION).max(0.0);

        if delta.x.is_finite() {
            self.body.position.x += delta.x;
        }
        if delta.y.is_finite() {
            self.body.position.y += delta.y;
        }

        let radius = self.body.radius();
        clamp_to_bounds(&mut self.body.position, radius, BORDER_OFFSET, width, height);
    }
}

impl Circular for Virus {
    fn position(&self) -> Vec2 {
        self.body.position
    }

    fn radius(&self) -> f32 {
        self.body.radius()
    }

    fn mass(&self) -> f32 {
        self.body.mass()
    }
}

/// Owns every virus in the world.
#[derive(Debug)]
pub struct VirusManager {
    /// Live viruses in spawn order.
    pub data: Vec<Virus>,
    config: VirusConfig,
    next_id: u32,
}

impl VirusManager {
    pub fn new(config: VirusConfig) -> Self {
        Self {
            data: Vec::with_capacity(64),
            config,
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

    /// Mass a virus returns to after splitting.
    #[inline]
    pub fn base_mass(&self) -> f32 {
        self.config.default_mass.from
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    /// Place a virus of exactly `mass` at `position`.
    pub fn push_new(&mut self, position: Vec2, mass: f32) -> u32 {
        let id = self.next_id();
        self.data.push(Virus::new(id, position, mass));
        id
    }

    /// Spawn up to `count` resting viruses, never exceeding the configured population cap.
    pub fn add_new(&mut self, count: usize, width: f32, height: f32) -> usize {
        let count = count.min(self.config.max_amount.saturating_sub(self.data.len()));
        for _ in 0..count {
            let mass = random_in_range(self.config.default_mass.from, self.config.default_mass.to);
            let radius = mass_to_radius(mass);
            let position = if self.config.uniform_disposition {
                uniform_position(
                    self.data.iter().map(|v| (v.body.position, v.body.radius())),
                    radius,
                    width,
                    height,
                )
            } else {
                random_position(radius, width, height)
            };
            self.push_new(position, mass);
        }
        count
    }

    pub fn get(&self, id: u32) -> Option<&Virus> {
        self.data.iter().find(|v| v.id == id)
    }

    /// Remove viruses by id; unknown ids are ignored.
    pub fn delete(&mut self, ids: &[u32]) {
        if ids.is_empty() {
            return;
        }
        self.data.retain(|v| !ids.contains(&v.id));
    }

    /// Move launched viruses.
    pub fn step(&mut self, width: f32, height: f32) {
        for virus in &mut self.data {
            virus.step(width, height);
        }
    }

    /// Absorb `mass` into the virus `id`.
    ///
    /// Reaching the split threshold splits immediately; the id of the newly
    /// launched virus is returned. Unknown ids are a no-op.
    pub fn feed(&mut self, id: u32, mass: f32, direction: Vec2) -> Option<u32> {
        let index = self.data.iter().position(|v| v.id == id)?;
        self.data[index].body.add_mass(mass);

        if self.data[index].body.mass() >= self.config.split_threshold {
            return Some(self.split(index, direction));
        }
        None
    }

    fn split(&mut self, index: usize, direction: Vec2) -> u32 {
        let base_mass = self.base_mass();
        let split_speed = self.config.split_speed;

        let origin = &mut self.data[index];
        origin.body.set_mass(base_mass);
        let position = origin.body.position;
        let origin_id = origin.id;

        let id = self.next_id();
        let mut child = Virus::new(id, position, base_mass);
        child.launch(direction, split_speed);
        self.data.push(child);

        debug!("Virus {} split, launched virus {}", origin_id, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MassRange;

    fn test_config() -> VirusConfig {
        VirusConfig {
            default_mass: MassRange { from: 100.0, to: 150.0 },
            split_threshold: 180.0,
            split_speed: 22.0,
            max_amount: 5,
            uniform_disposition: false,
        }
    }

    #[test]
    fn test_feed_below_threshold_accumulates() {
        let mut viruses = VirusManager::new(test_config());
        let id = viruses.push_new(Vec2::new(500.0, 500.0), 100.0);
        assert_eq!(viruses.data[0].phase(100.0), VirusPhase::Stable);

        assert_eq!(viruses.feed(id, 40.0, Vec2::X), None);
        let virus = viruses.get(id).unwrap();
        assert_eq!(virus.body.mass(), 140.0);
        assert_eq!(virus.body.radius(), mass_to_radius(140.0));
        assert_eq!(virus.phase(100.0), VirusPhase::Fed);
        assert_eq!(viruses.len(), 1);
    }

    #[test]
    fn test_feed_crossing_threshold_splits_once() {
        let mut viruses = VirusManager::new(test_config());
        let id = viruses.push_new(Vec2::new(500.0, 500.0), 100.0);

        let child = viruses.feed(id, 85.0, Vec2::new(0.0, 4.0)).expect("virus should split");

        assert_eq!(viruses.len(), 2);
        let original = viruses.get(id).unwrap();
        assert_eq!(original.body.mass(), 100.0);
        assert_eq!(original.body.radius(), mass_to_radius(100.0));
        assert_eq!(original.body.speed, 0.0);

        let spawned = viruses.get(child).unwrap();
        assert_eq!(spawned.body.mass(), 100.0);
        assert_eq!(spawned.body.position, Vec2::new(500.0, 500.0));
        assert_eq!(spawned.direction, Vec2::Y);
        assert_eq!(spawned.body.speed, 22.0);
    }

    #[test]
    fn test_repeated_feeding_splits_again() {
        let mut viruses = VirusManager::new(test_config());
        let id = viruses.push_new(Vec2::new(500.0, 500.0), 100.0);

        assert!(viruses.feed(id, 50.0, Vec2::X).is_none());
        assert!(viruses.feed(id, 30.0, Vec2::X).is_some());
        assert!(viruses.feed(id, 50.0, Vec2::X).is_none());
        assert!(viruses.feed(id, 50.0, Vec2::X).is_some());
        assert_eq!(viruses.len(), 3);
    }

    #[test]
    fn test_feed_unknown_virus_is_noop() {
        let mut viruses = VirusManager::new(test_config());
        viruses.push_new(Vec2::new(500.0, 500.0), 100.0);
        assert_eq!(viruses.feed(999, 500.0, Vec2::X), None);
        assert_eq!(viruses.len(), 1);
    }

    #[test]
    fn test_launched_virus_slides_then_rests() {
        let mut viruses = VirusManager::new(test_config());
        let id = viruses.push_new(Vec2::new(1000.0, 1000.0), 100.0);
        let child = viruses.feed(id, 100.0, Vec2::X).unwrap();

        for _ in 0..100 {
            viruses.step(5000.0, 5000.0);
        }

        let spawned = viruses.get(child).unwrap();
        assert_eq!(spawned.body.speed, 0.0);
        // 22 + 21.5 + ... + 0.5 = 495
        assert!((spawned.body.position.x - 1495.0).abs() < 1e-2);
        assert_eq!(viruses.get(id).unwrap().body.position, Vec2::new(1000.0, 1000.0));
    }

    #[test]
    fn test_add_new_respects_cap() {
        let mut viruses = VirusManager::new(test_config());
        assert_eq!(viruses.add_new(3, 2000.0, 2000.0), 3);
        assert_eq!(viruses.add_new(10, 2000.0, 2000.0), 2);
        assert_eq!(viruses.add_new(1, 2000.0, 2000.0), 0);
        assert_eq!(viruses.len(), 5);
        assert!(viruses.data.iter().all(|v| (100.0..150.0).contains(&v.body.mass())));
    }
}
