//! Spatial indexing utilities.

mod grid;

pub use grid::{Bounds, SpatialGrid};
