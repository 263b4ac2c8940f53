//! Passive and semi-active world entities.
//!
//! Cells belong to actors; food, ejected mass and viruses are owned by their managers.

mod cell;
mod food;
mod mass_food;
mod virus;

pub use cell::{Cell, Circular, MIN_DISTANCE, MIN_SPEED, SPEED_DECREMENT, SPLIT_CELL_SPEED};
pub use food::{Food, FoodManager};
pub use mass_food::{EJECT_SPEED, MassFood, MassFoodManager};
pub use virus::{Virus, VirusManager, VirusPhase};
