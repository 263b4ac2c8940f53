//! Food pellets.

use super::cell::Circular;
use crate::spatial::SpatialGrid;
use crate::util::{mass_to_radius, random_position, uniform_position};
use glam::Vec2;
use rand::Rng;
use serde::Serialize;

/// A food pellet that can be eaten by any cell.
#[derive(Debug, Clone, Serialize)]
pub struct Food {
    /// Unique pellet id.
    pub id: u32,
    /// Center in world units.
    pub position: Vec2,
    pub mass: f32,
    /// Derived from `mass` at spawn.
    pub radius: f32,
    /// Display hue in degrees.
    pub hue: u16,
}

impl Circular for Food {
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

/// Owns every food pellet in the world.
#[derive(Debug)]
pub struct FoodManager {
    /// Live pellets, oldest first.
    pub data: Vec<Food>,
    food_mass: f32,
    uniform_disposition: bool,
    next_id: u32,
}

impl FoodManager {
    pub fn new(food_mass: f32, uniform_disposition: bool) -> Self {
        Self {
            data: Vec::with_capacity(1024),
            food_mass,
            uniform_disposition,
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

    /// Mass of a single pellet.
    #[inline]
    pub fn food_mass(&self) -> f32 {
        self.food_mass
    }

    /// Spawn `count` pellets inside a `width` x `height` world.
    pub fn add_new(&mut self, count: usize, width: f32, height: f32) {
        let radius = mass_to_radius(self.food_mass);
        let mut rng = rand::rng();
        self.data.reserve(count);
        for _ in 0..count {
            let position = if self.uniform_disposition {
                uniform_position(
                    self.data.iter().map(|f| (f.position, f.radius)),
                    radius,
                    width,
                    height,
                )
            } else {
                random_position(radius, width, height)
            };
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            self.data.push(Food {
                id,
                position,
                mass: self.food_mass,
                radius,
                hue: rng.random_range(0..360),
            });
        }
    }

    /// Grid over the current pellets, addressed by index into `data`.
    pub fn spatial_index(&self, width: f32, height: f32) -> SpatialGrid {
        SpatialGrid::build(width, height, self.data.iter().map(|f| (f.position, f.radius)))
    }

    /// Drop up to `count` of the most recently spawned pellets.
    pub fn remove_excess(&mut self, count: usize) {
        let keep = self.data.len().saturating_sub(count);
        self.data.truncate(keep);
    }

    /// Remove pellets by id; unknown ids are ignored.
    pub fn delete(&mut self, ids: &[u32]) {
        if ids.is_empty() {
            return;
        }
        self.data.retain(|f| !ids.contains(&f.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_excess() {
        let mut food = FoodManager::new(1.0, false);
        food.add_new(25, 1000.0, 1000.0);
        assert_eq!(food.len(), 25);
        assert!(food.data.iter().all(|f| f.mass == 1.0 && f.radius == mass_to_radius(1.0)));

        food.remove_excess(10);
        assert_eq!(food.len(), 15);
        food.remove_excess(100);
        assert!(food.is_empty());
    }

    #[test]
    fn test_delete_by_id() {
        let mut food = FoodManager::new(1.0, true);
        food.add_new(5, 500.0, 500.0);
        let doomed = vec![food.data[1].id, food.data[3].id, 9999];
        food.delete(&doomed);
        assert_eq!(food.len(), 3);
        assert!(food.data.iter().all(|f| !doomed.contains(&f.id)));
    }

    #[test]
    fn test_spatial_index_matches_data() {
        let mut food = FoodManager::new(1.0, false);
        food.add_new(40, 1000.0, 1000.0);
        let grid = food.spatial_index(1000.0, 1000.0);
        assert_eq!(grid.len(), food.len());

        let target = food.data[7].position;
        let hits = grid.find_in_radius(target, 1.0);
        assert!(hits.contains(&7));
        assert!(hits.iter().all(|&i| food.data[i].position.distance(target) < 4.0));
    }
}
