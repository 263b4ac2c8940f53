//! Uniform hash grid over circles, used to narrow pellet lookups.
//!
//! Items are addressed by their index in the slice the grid was built from,
//! so the grid is rebuilt whenever that slice changes.

use fixedbitset::FixedBitSet;
use glam::Vec2;

/// Cells per axis.
const GRID_SIZE: usize = 32;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    /// Left edge.
    pub min_x: f32,
    /// Top edge.
    pub min_y: f32,
    /// Right edge.
    pub max_x: f32,
    /// Bottom edge.
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Square box around a circle.
    #[inline]
    pub fn from_center(center: Vec2, radius: f32) -> Self {
        Self {
            min_x: center.x - radius,
            min_y: center.y - radius,
            max_x: center.x + radius,
            max_y: center.y + radius,
        }
    }

    /// Check if two bounds intersect.
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.min_x >= self.max_x
            || other.max_x <= self.min_x
            || other.min_y >= self.max_y
            || other.max_y <= self.min_y)
    }
}

/// Hash grid of item bounds.
#[derive(Debug)]
pub struct SpatialGrid {
    /// World bounds.
    bounds: Bounds,
    cell_width: f32,
    cell_height: f32,
    /// Item indexes per grid cell.
    cells: Vec<Vec<usize>>,
    /// Cached bounds per item index.
    items: Vec<Bounds>,
}

impl SpatialGrid {
    /// An empty grid covering `[0, width] x [0, height]`.
    pub fn for_world(width: f32, height: f32) -> Self {
        Self {
            bounds: Bounds::new(0.0, 0.0, width, height),
            cell_width: (width / GRID_SIZE as f32).max(f32::MIN_POSITIVE),
            cell_height: (height / GRID_SIZE as f32).max(f32::MIN_POSITIVE),
            cells: vec![Vec::new(); GRID_SIZE * GRID_SIZE],
            items: Vec::new(),
        }
    }

    /// Index every `(center, radius)` under its position in `items`.
    pub fn build<I>(width: f32, height: f32, items: I) -> Self
    where
        I: IntoIterator<Item = (Vec2, f32)>,
    {
        let mut grid = Self::for_world(width, height);
        for (center, radius) in items {
            grid.push(Bounds::from_center(center, radius));
        }
        grid
    }

    /// Grid cell range covered by `bound`, clamped to the world.
    fn cell_range(&self, bound: &Bounds) -> (usize, usize, usize, usize) {
        let last = (GRID_SIZE - 1) as f32;
        let column = |x: f32| ((x - self.bounds.min_x) / self.cell_width).floor().clamp(0.0, last) as usize;
        let row = |y: f32| ((y - self.bounds.min_y) / self.cell_height).floor().clamp(0.0, last) as usize;
        (column(bound.min_x), column(bound.max_x), row(bound.min_y), row(bound.max_y))
    }

    fn push(&mut self, bound: Bounds) {
        let index = self.items.len();
        let (min_gx, max_gx, min_gy, max_gy) = self.cell_range(&bound);
        for gy in min_gy..=max_gy {
            let row_start = gy * GRID_SIZE;
            for gx in min_gx..=max_gx {
                self.cells[row_start + gx].push(index);
            }
        }
        self.items.push(bound);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Indexes of all items whose bounds intersect `bound`, ascending.
    pub fn find_in_bounds(&self, bound: &Bounds) -> Vec<usize> {
        let mut seen = FixedBitSet::with_capacity(self.items.len());
        let mut result = Vec::new();
        let (min_gx, max_gx, min_gy, max_gy) = self.cell_range(bound);
        for gy in min_gy..=max_gy {
            let row_start = gy * GRID_SIZE;
            for gx in min_gx..=max_gx {
                for &index in &self.cells[row_start + gx] {
                    if !seen.put(index) && self.items[index].intersects(bound) {
                        result.push(index);
                    }
                }
            }
        }
        result.sort_unstable();
        result
    }

    /// Indexes of all items whose bounds touch the box around a circle, ascending.
    #[inline]
    pub fn find_in_radius(&self, center: Vec2, radius: f32) -> Vec<usize> {
        self.find_in_bounds(&Bounds::from_center(center, radius))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_intersects() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(5.0, 5.0, 15.0, 15.0);
        let c = Bounds::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!c.intersects(&a));
    }

    #[test]
    fn test_grid_insert_find() {
        let grid = SpatialGrid::build(
            1000.0,
            1000.0,
            [
                (Vec2::new(500.0, 500.0), 10.0),
                (Vec2::new(550.0, 550.0), 10.0),
                (Vec2::new(100.0, 900.0), 10.0),
            ],
        );
        assert_eq!(grid.len(), 3);

        assert_eq!(grid.find_in_radius(Vec2::new(500.0, 500.0), 20.0), vec![0]);
        assert_eq!(grid.find_in_radius(Vec2::new(525.0, 525.0), 30.0), vec![0, 1]);
        assert_eq!(grid.find_in_radius(Vec2::new(100.0, 900.0), 5.0), vec![2]);
    }

    #[test]
    fn test_items_spanning_cells_are_reported_once() {
        // Cells are 31.25 wide; this item straddles four of them.
        let grid = SpatialGrid::build(1000.0, 1000.0, [(Vec2::new(125.0, 125.0), 40.0)]);
        assert_eq!(grid.find_in_radius(Vec2::new(125.0, 125.0), 200.0), vec![0]);
    }

    #[test]
    fn test_out_of_world_queries_are_clamped() {
        let grid = SpatialGrid::build(1000.0, 1000.0, [(Vec2::new(995.0, 5.0), 10.0)]);
        assert_eq!(grid.find_in_radius(Vec2::new(1200.0, -200.0), 250.0), vec![0]);
        assert!(grid.find_in_radius(Vec2::new(-500.0, -500.0), 10.0).is_empty());
    }
}
