//! Collision detection and eat resolution.
//!
//! Everything here is read-only: resolvers report who consumes what and the
//! game state applies the effects afterwards.

use crate::actor::{Actor, ActorId};
use crate::entity::{Circular, Food, MassFood, Virus};
use crate::spatial::SpatialGrid;
use fixedbitset::FixedBitSet;
use glam::Vec2;

/// Result of an overlapping circle-circle test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    /// Distance between centers.
    pub distance: f32,
    /// How far the circles intersect along the center line.
    pub depth: f32,
    /// First circle lies entirely within the second.
    pub a_in_b: bool,
    /// Second circle lies entirely within the first.
    pub b_in_a: bool,
}

/// Separating-axis circle test. `None` when the circles do not touch.
#[inline]
pub fn test_circle_circle(a_pos: Vec2, a_radius: f32, b_pos: Vec2, b_radius: f32) -> Option<Overlap> {
    let total_radius = a_radius + b_radius;
    let distance_sq = a_pos.distance_squared(b_pos);
    if distance_sq > total_radius * total_radius {
        return None;
    }

    let distance = distance_sq.sqrt();
    Some(Overlap {
        distance,
        depth: total_radius - distance,
        a_in_b: a_radius <= b_radius && distance <= b_radius - a_radius,
        b_in_a: b_radius <= a_radius && distance <= a_radius - b_radius,
    })
}

/// Outcome of [`who_ate_who`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No interaction (0).
    None = 0,
    /// The first entity eats the second (1).
    FirstEats = 1,
    /// The second entity eats the first (2).
    SecondEats = 2,
}

/// Decide whether one circle consumes the other.
///
/// Eating needs overlap, full containment of the loser and a winner mass above
/// `loser * threshold`. Both directions can never hold at once.
pub fn who_ate_who<A, B>(a: &A, b: &B, threshold: f32) -> Outcome
where
    A: Circular + ?Sized,
    B: Circular + ?Sized,
{
    let Some(overlap) = test_circle_circle(a.position(), a.radius(), b.position(), b.radius()) else {
        return Outcome::None;
    };

    if overlap.b_in_a && a.mass() > b.mass() * threshold {
        Outcome::FirstEats
    } else if overlap.a_in_b && b.mass() > a.mass() * threshold {
        Outcome::SecondEats
    } else {
        Outcome::None
    }
}

/// Identity of a cell within the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub actor: ActorId,
    /// Index into the actor's cells at detection time.
    pub cell: usize,
}

/// One actor cell consuming another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EatEvent {
    /// Cell that grows.
    pub winner: CellRef,
    /// Cell that is removed.
    pub loser: CellRef,
}

/// Every cell-vs-cell eat between distinct actors, in scan order.
pub fn resolve_actor_collisions(actors: &[&dyn Actor], threshold: f32) -> Vec<EatEvent> {
    let mut events = Vec::new();
    for (i, first) in actors.iter().enumerate() {
        for second in &actors[i + 1..] {
            for (a_index, a_cell) in first.cells().iter().enumerate() {
                for (b_index, b_cell) in second.cells().iter().enumerate() {
                    let a = CellRef { actor: first.id(), cell: a_index };
                    let b = CellRef { actor: second.id(), cell: b_index };
                    match who_ate_who(a_cell, b_cell, threshold) {
                        Outcome::FirstEats => events.push(EatEvent { winner: a, loser: b }),
                        Outcome::SecondEats => events.push(EatEvent { winner: b, loser: a }),
                        Outcome::None => {}
                    }
                }
            }
        }
    }
    events
}

/// Pellets consumed by actor cells this tick, keyed by pellet id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PelletHits {
    /// Eater and food id.
    pub food: Vec<(CellRef, u32)>,
    /// Eater and ejected pellet id.
    pub mass_food: Vec<(CellRef, u32)>,
    /// Viruses swallowed by cells that pop on contact.
    pub viruses: Vec<(CellRef, u32)>,
}

impl PelletHits {
    pub fn is_empty(&self) -> bool {
        self.food.is_empty() && self.mass_food.is_empty() && self.viruses.is_empty()
    }
}

/// Food, ejected mass and viruses eaten by actor cells.
///
/// Each pellet goes to the first cell that can eat it. A cell never takes back
/// mass it ejected itself while that pellet is still moving. Viruses only
/// interact with actors that split on them. `food_grid` must index `food`.
pub fn resolve_pellets(
    actors: &[&dyn Actor],
    food: &[Food],
    food_grid: &SpatialGrid,
    mass_food: &[MassFood],
    viruses: &[Virus],
    threshold: f32,
) -> PelletHits {
    let mut hits = PelletHits::default();
    let mut food_taken = FixedBitSet::with_capacity(food.len());
    let mut mass_taken = FixedBitSet::with_capacity(mass_food.len());
    let mut virus_taken = FixedBitSet::with_capacity(viruses.len());

    for actor in actors {
        let actor_id = actor.id();
        for (cell_index, cell) in actor.cells().iter().enumerate() {
            let eater = CellRef { actor: actor_id, cell: cell_index };

            for i in food_grid.find_in_radius(cell.position, cell.radius()) {
                let Some(pellet) = food.get(i) else {
                    continue;
                };
                if !food_taken.contains(i) && who_ate_who(cell, pellet, threshold) == Outcome::FirstEats {
                    food_taken.insert(i);
                    hits.food.push((eater, pellet.id));
                }
            }

            for (i, pellet) in mass_food.iter().enumerate() {
                if mass_taken.contains(i) || pellet.is_in_flight_from(actor_id, cell_index) {
                    continue;
                }
                if who_ate_who(cell, pellet, threshold) == Outcome::FirstEats {
                    mass_taken.insert(i);
                    hits.mass_food.push((eater, pellet.id));
                }
            }

            if !actor.splits_on_virus() {
                continue;
            }
            for (i, virus) in viruses.iter().enumerate() {
                if !virus_taken.contains(i) && who_ate_who(cell, virus, threshold) == Outcome::FirstEats {
                    virus_taken.insert(i);
                    hits.viruses.push((eater, virus.id));
                }
            }
        }
    }

    hits
}

/// A virus absorbing a pellet of ejected mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedEvent {
    /// Id of the growing virus.
    pub virus: u32,
    /// Id of the absorbed pellet.
    pub mass_food: u32,
}

/// Ejected mass absorbed by viruses; each pellet feeds at most one virus.
pub fn resolve_virus_feeding(viruses: &[Virus], mass_food: &[MassFood], threshold: f32) -> Vec<FeedEvent> {
    let mut events = Vec::new();
    let mut taken = FixedBitSet::with_capacity(mass_food.len());
    for virus in viruses {
        for (i, pellet) in mass_food.iter().enumerate() {
            if !taken.contains(i) && who_ate_who(virus, pellet, threshold) == Outcome::FirstEats {
                taken.insert(i);
                events.push(FeedEvent { virus: virus.id, mass_food: pellet.id });
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Player, ScreenSize};
    use crate::ai::Bot;
    use crate::entity::{Cell, MIN_SPEED, MassFoodManager, VirusManager};
    use crate::config::VirusConfig;

    fn food_grid(food: &[Food]) -> SpatialGrid {
        SpatialGrid::build(5000.0, 5000.0, food.iter().map(|f| (f.position, f.radius)))
    }

    fn cell(x: f32, mass: f32) -> Cell {
        Cell::new(Vec2::new(x, 0.0), mass, MIN_SPEED)
    }

    fn player(id: u32, x: f32, mass: f32) -> Player {
        Player::new(id, format!("p{id}"), false, Vec2::new(x, 500.0), mass, ScreenSize::new(1920.0, 1080.0))
    }

    #[test]
    fn test_collision_check() {
        let result = test_circle_circle(Vec2::new(0.0, 0.0), 50.0, Vec2::new(30.0, 0.0), 20.0).unwrap();
        assert_eq!(result.distance, 30.0);
        assert_eq!(result.depth, 40.0);
        assert!(result.b_in_a);
        assert!(!result.a_in_b);
    }

    #[test]
    fn test_no_collision() {
        assert!(test_circle_circle(Vec2::new(0.0, 0.0), 10.0, Vec2::new(100.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn test_larger_cell_eats_contained_smaller() {
        let a = cell(0.0, 150.0);
        let b = cell(5.0, 100.0);
        assert_eq!(who_ate_who(&a, &b, 1.25), Outcome::FirstEats);
        assert_eq!(who_ate_who(&b, &a, 1.25), Outcome::SecondEats);
    }

    #[test]
    fn test_ratio_below_threshold_never_eats() {
        let a = cell(0.0, 150.0);
        let b = cell(5.0, 130.0);
        assert_eq!(who_ate_who(&a, &b, 1.25), Outcome::None);
    }

    #[test]
    fn test_equal_masses_never_eat() {
        let a = cell(0.0, 100.0);
        let b = cell(0.0, 100.0);
        assert_eq!(who_ate_who(&a, &b, 1.25), Outcome::None);
        assert_eq!(who_ate_who(&a, &b, 1.0), Outcome::None);
    }

    #[test]
    fn test_overlap_without_containment_never_eats() {
        let a = cell(0.0, 400.0); // radius 120
        let b = cell(110.0, 10.0); // radius ~19, pokes out of `a`
        assert!(test_circle_circle(a.position, a.radius(), b.position, b.radius()).is_some());
        assert_eq!(who_ate_who(&a, &b, 1.25), Outcome::None);
    }

    #[test]
    fn test_resolve_actor_collisions_reports_pairs() {
        let big = player(1, 500.0, 300.0);
        let small = player(2, 505.0, 20.0);
        let far = Bot::new(1, Vec2::new(3000.0, 3000.0), 50.0, 1000.0);
        let prey_bot = Bot::new(2, Vec2::new(495.0, 500.0), 30.0, 1000.0);

        let actors: Vec<&dyn Actor> = vec![&big, &small, &far, &prey_bot];
        let events = resolve_actor_collisions(&actors, 1.25);

        assert_eq!(
            events,
            vec![
                EatEvent {
                    winner: CellRef { actor: ActorId::Player(1), cell: 0 },
                    loser: CellRef { actor: ActorId::Player(2), cell: 0 },
                },
                EatEvent {
                    winner: CellRef { actor: ActorId::Player(1), cell: 0 },
                    loser: CellRef { actor: ActorId::Bot(2), cell: 0 },
                },
            ]
        );
    }

    #[test]
    fn test_own_cells_are_not_reported() {
        let mut split = player(1, 500.0, 400.0);
        split.cells.push(Cell::new(Vec2::new(500.0, 500.0), 10.0, MIN_SPEED));
        let actors: Vec<&dyn Actor> = vec![&split];
        assert!(resolve_actor_collisions(&actors, 1.25).is_empty());
    }

    #[test]
    fn test_pellets_are_claimed_once() {
        let first = player(1, 500.0, 100.0);
        let second = player(2, 502.0, 100.0);
        let food = vec![Food { id: 9, position: Vec2::new(501.0, 500.0), mass: 1.0, radius: 6.0, hue: 0 }];
        let actors: Vec<&dyn Actor> = vec![&first, &second];

        let hits = resolve_pellets(&actors, &food, &food_grid(&food), &[], &[], 1.25);
        assert_eq!(hits.food, vec![(CellRef { actor: ActorId::Player(1), cell: 0 }, 9)]);
    }

    #[test]
    fn test_only_contained_food_is_eaten() {
        let eater = player(1, 2500.0, 400.0); // radius 120
        let pellet = |id: u32, x: f32, y: f32| Food { id, position: Vec2::new(x, y), mass: 1.0, radius: 6.0, hue: 0 };
        let food = vec![
            pellet(1, 2600.0, 500.0),
            pellet(2, 2500.0, 500.0),
            pellet(3, 2620.0, 500.0), // edge pokes out
            pellet(4, 100.0, 100.0),
            pellet(5, 2420.0, 560.0),
        ];
        let actors: Vec<&dyn Actor> = vec![&eater];

        let hits = resolve_pellets(&actors, &food, &food_grid(&food), &[], &[], 1.25);
        let eaten: Vec<u32> = hits.food.iter().map(|(_, id)| *id).collect();
        assert_eq!(eaten, vec![1, 2, 5]);
    }

    #[test]
    fn test_own_moving_pellet_is_not_reabsorbed() {
        let shooter = player(1, 500.0, 100.0);
        let mut mass_food = MassFoodManager::new();
        mass_food.add_new(ActorId::Player(1), 0, Vec2::new(500.0, 500.0), Vec2::X, 5.0, 0);
        let actors: Vec<&dyn Actor> = vec![&shooter];

        let hits = resolve_pellets(&actors, &[], &food_grid(&[]), &mass_food.data, &[], 1.25);
        assert!(hits.is_empty());

        mass_food.data[0].speed = 0.0;
        let hits = resolve_pellets(&actors, &[], &food_grid(&[]), &mass_food.data, &[], 1.25);
        assert_eq!(hits.mass_food.len(), 1);
    }

    #[test]
    fn test_only_players_pop_on_viruses() {
        let mut viruses = VirusManager::new(VirusConfig::default());
        let virus_id = viruses.push_new(Vec2::new(500.0, 500.0), 100.0);
        let big_player = player(1, 500.0, 400.0);
        let big_bot = Bot::new(1, Vec2::new(500.0, 500.0), 400.0, 1000.0);

        let actors: Vec<&dyn Actor> = vec![&big_bot, &big_player];
        let hits = resolve_pellets(&actors, &[], &food_grid(&[]), &[], &viruses.data, 1.25);
        assert_eq!(hits.viruses, vec![(CellRef { actor: ActorId::Player(1), cell: 0 }, virus_id)]);
    }

    #[test]
    fn test_virus_feeding_resolution() {
        let mut viruses = VirusManager::new(VirusConfig::default());
        let virus_id = viruses.push_new(Vec2::new(500.0, 500.0), 100.0);
        let mut mass_food = MassFoodManager::new();
        let inside = mass_food.add_new(ActorId::Player(1), 0, Vec2::new(510.0, 500.0), Vec2::X, 20.0, 0);
        mass_food.add_new(ActorId::Player(1), 0, Vec2::new(900.0, 500.0), Vec2::X, 20.0, 0);

        let feeds = resolve_virus_feeding(&viruses.data, &mass_food.data, 1.25);
        assert_eq!(feeds, vec![FeedEvent { virus: virus_id, mass_food: inside }]);
    }
}
