//! Geometry helpers shared by every entity type.

use glam::Vec2;
use rand::Rng;

/// Radius growth per square root of mass.
const RADIUS_PER_ROOT_MASS: f32 = 6.0;
/// Number of random candidates tried by [`uniform_position`].
const UNIFORM_CANDIDATES: usize = 10;

/// Convert a mass into a circle radius.
///
/// Strictly increasing and concave for positive masses; massless entities have no extent.
#[inline]
pub fn mass_to_radius(mass: f32) -> f32 {
    if mass > 0.0 {
        RADIUS_PER_ROOT_MASS * mass.sqrt()
    } else {
        0.0
    }
}

/// Logarithm of `n` in `base`.
#[inline]
pub fn math_log(n: f32, base: f32) -> f32 {
    n.ln() / base.ln()
}

/// Slowdown scalar for large cells; grows with mass and is defined from mass 1 upward.
#[inline]
pub fn speed_log_decay(mass: f32, base: f32) -> f32 {
    math_log(mass.max(1.0), base)
}

/// Uniform random value in `[lo, hi)`, or `lo` for an empty range.
pub fn random_in_range(lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rand::rng().random_range(lo..hi)
    } else {
        lo
    }
}

/// Clamp a center so the circle plus `border_offset` stays inside `[0, width] x [0, height]`.
pub fn clamp_to_bounds(position: &mut Vec2, radius: f32, border_offset: f32, width: f32, height: f32) {
    let margin = radius + border_offset;
    if position.x > width - margin {
        position.x = width - margin;
    }
    if position.y > height - margin {
        position.y = height - margin;
    }
    if position.x < margin {
        position.x = margin;
    }
    if position.y < margin {
        position.y = margin;
    }
}

/// Random point that keeps a circle of `radius` inside the world.
pub fn random_position(radius: f32, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        random_in_range(radius, width - radius),
        random_in_range(radius, height - radius),
    )
}

/// Best-candidate sampling: the random point whose nearest existing circle is farthest away.
///
/// `points` yields `(center, radius)` of the entities to stay away from.
pub fn uniform_position<I>(points: I, radius: f32, width: f32, height: f32) -> Vec2
where
    I: IntoIterator<Item = (Vec2, f32)>,
    I::IntoIter: Clone,
{
    let points = points.into_iter();
    let mut best = random_position(radius, width, height);
    let mut best_distance = f32::NEG_INFINITY;

    for _ in 0..UNIFORM_CANDIDATES {
        let candidate = random_position(radius, width, height);
        let nearest = points
            .clone()
            .map(|(center, other_radius)| edge_distance(candidate, radius, center, other_radius))
            .fold(f32::INFINITY, f32::min);

        // No existing points: any candidate is as good as another.
        if nearest == f32::INFINITY {
            return candidate;
        }
        if nearest > best_distance {
            best_distance = nearest;
            best = candidate;
        }
    }

    best
}

/// Distance between two circle edges (negative when they overlap).
#[inline]
pub fn edge_distance(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> f32 {
    a.distance(b) - a_radius - b_radius
}

/// Overlap test for two axis-aligned rectangles given by center and half extents.
#[inline]
pub fn rects_overlap(a_center: Vec2, a_half: Vec2, b_center: Vec2, b_half: Vec2) -> bool {
    a_center.x + a_half.x > b_center.x - b_half.x
        && a_center.x - a_half.x < b_center.x + b_half.x
        && a_center.y + a_half.y > b_center.y - b_half.y
        && a_center.y - a_half.y < b_center.y + b_half.y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radius_is_monotonic() {
        assert_eq!(mass_to_radius(0.0), 0.0);
        let masses = [0.0, 0.5, 1.0, 10.0, 100.0, 1000.0, 50000.0];
        for pair in masses.windows(2) {
            assert!(mass_to_radius(pair[0]) < mass_to_radius(pair[1]));
        }
    }

    #[test]
    fn test_speed_log_decay_grows_with_mass() {
        assert_eq!(speed_log_decay(1.0, 4.5), 0.0);
        assert!(speed_log_decay(10.0, 4.5) < speed_log_decay(100.0, 4.5));
        // Sub-unit masses are treated as mass 1.
        assert_eq!(speed_log_decay(0.2, 4.5), 0.0);
    }

    #[test]
    fn test_clamp_to_bounds() {
        let mut pos = Vec2::new(-20.0, 1020.0);
        clamp_to_bounds(&mut pos, 10.0, 5.0, 1000.0, 1000.0);
        assert_eq!(pos, Vec2::new(15.0, 985.0));

        let mut inside = Vec2::new(500.0, 500.0);
        clamp_to_bounds(&mut inside, 10.0, 5.0, 1000.0, 1000.0);
        assert_eq!(inside, Vec2::new(500.0, 500.0));
    }

    #[test]
    fn test_random_in_range_degenerate() {
        assert_eq!(random_in_range(5.0, 5.0), 5.0);
        let v = random_in_range(1.0, 2.0);
        assert!((1.0..2.0).contains(&v));
    }

    #[test]
    fn test_uniform_position_stays_in_world() {
        let existing = vec![(Vec2::new(100.0, 100.0), 10.0), (Vec2::new(900.0, 900.0), 10.0)];
        for _ in 0..50 {
            let pos = uniform_position(existing.iter().copied(), 20.0, 1000.0, 1000.0);
            assert!(pos.x >= 20.0 && pos.x <= 980.0);
            assert!(pos.y >= 20.0 && pos.y <= 980.0);
        }
    }

    #[test]
    fn test_rects_overlap() {
        let half = Vec2::splat(10.0);
        assert!(rects_overlap(Vec2::ZERO, half, Vec2::new(15.0, 0.0), half));
        assert!(!rects_overlap(Vec2::ZERO, half, Vec2::new(25.0, 0.0), half));
    }
}
