//! Base circular mass unit and the movement physics shared by players and bots.

use crate::util::{mass_to_radius, speed_log_decay};
use glam::Vec2;
use serde::Serialize;

/// Speed floor; once reached the large-cell slowdown kicks in.
pub const MIN_SPEED: f32 = 6.25;
/// Initial speed of a freshly split piece.
pub const SPLIT_CELL_SPEED: f32 = 20.0;
/// Per-tick deceleration toward [`MIN_SPEED`].
pub const SPEED_DECREMENT: f32 = 0.5;
/// Arrival damping starts within this distance (plus the cell radius).
pub const MIN_DISTANCE: f32 = 50.0;

/// Anything with a center, a radius and a mass.
pub trait Circular {
    fn position(&self) -> Vec2;

    fn radius(&self) -> f32;

    fn mass(&self) -> f32;
}

/// A single circular mass unit owned by one actor (or wrapped by a virus).
#[derive(Debug, Clone, Serialize)]
pub struct Cell {
    /// Center in world coordinates.
    pub position: Vec2,
    mass: f32,
    radius: f32,
    /// Current movement speed budget.
    pub speed: f32,
}

impl Cell {
    /// Create a new cell; the radius is derived from `mass`.
    pub fn new(position: Vec2, mass: f32, speed: f32) -> Self {
        Self {
            position,
            mass,
            radius: mass_to_radius(mass),
            speed,
        }
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Replace the mass and recompute the radius.
    #[inline]
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass.max(0.0);
        self.radius = mass_to_radius(self.mass);
    }

    #[inline]
    pub fn add_mass(&mut self, delta: f32) {
        self.set_mass(self.mass + delta);
    }

    /// Move one tick toward `target`, expressed relative to the owning actor's center.
    ///
    /// Speed decays toward [`MIN_SPEED`]; at the floor heavier cells are slowed by
    /// `log(mass) - init_mass_log + 1`. Close to the target the step is damped so the
    /// cell settles instead of jittering. Non-finite deltas are dropped.
    pub fn step_toward(&mut self, actor_center: Vec2, target: Vec2, slow_base: f32, init_mass_log: f32) {
        let relative = actor_center - self.position + target;
        let dist = relative.y.hypot(relative.x);
        let deg = relative.y.atan2(relative.x);

        let mut slow_down = 1.0;
        if self.speed <= MIN_SPEED {
            slow_down = speed_log_decay(self.mass, slow_base) - init_mass_log + 1.0;
        }

        let mut delta = Vec2::new(deg.cos(), deg.sin()) * self.speed / slow_down;

        if self.speed > MIN_SPEED {
            self.speed -= SPEED_DECREMENT;
        }

        let approach = MIN_DISTANCE + self.radius;
        if dist < approach {
            delta *= dist / approach;
        }

        if delta.x.is_finite() {
            self.position.x += delta.x;
        }
        if delta.y.is_finite() {
            self.position.y += delta.y;
        }
    }
}

impl Circular for Cell {
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
