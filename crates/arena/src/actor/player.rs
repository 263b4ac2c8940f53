//! Human-controlled players.

use super::{Actor, ActorId, ScreenSize};
use crate::collision::test_circle_circle;
use crate::entity::{Cell, MIN_SPEED, SPLIT_CELL_SPEED};
use crate::util::{clamp_to_bounds, rects_overlap};
use glam::Vec2;
use rand::Rng;
use tracing::debug;

/// Distance overlapping sibling cells are pushed apart per tick.
const PUSHING_AWAY_SPEED: f32 = 1.1;
/// Entities other than food are padded by this fraction when testing visibility.
const VISIBILITY_PADDING: f32 = 0.1;

/// A player controlled by a connected client.
#[derive(Debug, Clone)]
pub struct Player {
    /// Connection-assigned id.
    pub id: u32,
    pub name: String,
    /// Display hue in degrees.
    pub hue: u16,
    /// May run privileged commands.
    pub admin: bool,
    /// Viewport of the client, used for visibility.
    pub screen: ScreenSize,
    /// Owned cells; never empty while the player is alive.
    pub cells: Vec<Cell>,
    mass_total: f32,
    /// Mean of the cell centers.
    pub position: Vec2,
    /// Movement target relative to `position`.
    pub target: Vec2,
    /// Tick from which split cells may merge again.
    merge_at_tick: Option<u64>,
}

/// A pellet launch requested by [`Player::eject`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ejection {
    /// Cell that shed the mass.
    pub cell_index: usize,
    pub origin: Vec2,
    /// Unit launch direction, zero when the cell sits on the target.
    pub direction: Vec2,
    pub mass: f32,
}

impl Player {
    /// Create a player with a single cell of `mass` at `position`.
    pub fn new(id: u32, name: String, admin: bool, position: Vec2, mass: f32, screen: ScreenSize) -> Self {
        Self {
            id,
            name,
            hue: rand::rng().random_range(0..360),
            admin,
            screen,
            cells: vec![Cell::new(position, mass, MIN_SPEED)],
            mass_total: mass,
            position,
            target: Vec2::ZERO,
            merge_at_tick: None,
        }
    }

    fn recompute_mass_total(&mut self) {
        self.mass_total = self.cells.iter().map(Cell::mass).sum();
    }

    /// Re-center on the mean of the cells; kept as is once no cell is left.
    fn recompute_position(&mut self) {
        if self.cells.is_empty() {
            return;
        }
        let sum: Vec2 = self.cells.iter().map(|c| c.position).sum();
        self.position = sum / self.cells.len() as f32;
    }

    fn start_merge_timer(&mut self, now: u64, merge_ticks: u64) {
        self.merge_at_tick = Some(now + merge_ticks);
    }

    /// Whether sibling cells are currently allowed to merge.
    pub fn can_merge(&self, now: u64) -> bool {
        self.merge_at_tick.is_none_or(|at| now >= at)
    }

    /// Split one cell into up to `requested` equal pieces.
    ///
    /// Pieces never fall below `default_mass` and the player never exceeds
    /// `limit_split` cells. Returns the number of cells added.
    pub fn split_cell(
        &mut self,
        index: usize,
        requested: usize,
        default_mass: f32,
        limit_split: usize,
        now: u64,
        merge_ticks: u64,
    ) -> usize {
        let Some(cell) = self.cells.get(index) else {
            return 0;
        };

        let allowed_by_mass = (cell.mass() / default_mass).floor() as usize;
        let allowed_by_limit = limit_split.saturating_sub(self.cells.len()) + 1;
        let pieces = requested.min(allowed_by_mass).min(allowed_by_limit);
        if pieces < 2 {
            return 0;
        }

        let piece_mass = cell.mass() / pieces as f32;
        let origin = cell.position;
        for _ in 1..pieces {
            self.cells.push(Cell::new(origin, piece_mass, SPLIT_CELL_SPEED));
        }
        self.cells[index].set_mass(piece_mass);
        self.recompute_mass_total();
        self.recompute_position();
        self.start_merge_timer(now, merge_ticks);
        pieces - 1
    }

    /// Pop every cell in `indexes` after it swallowed a virus.
    pub fn virus_split(&mut self, indexes: &[usize], limit_split: usize, default_mass: f32, now: u64, merge_ticks: u64) {
        for &index in indexes {
            let requested = limit_split.saturating_sub(self.cells.len()) + 1;
            self.split_cell(index, requested, default_mass, limit_split, now, merge_ticks);
        }
    }

    /// Player-requested split: every cell halves while there is room; near the
    /// limit only the largest cells split.
    pub fn user_split(&mut self, limit_split: usize, default_mass: f32, now: u64, merge_ticks: u64) {
        let cells_to_split = if self.cells.len() > limit_split / 2 {
            self.cells.sort_by(|a, b| b.mass().total_cmp(&a.mass()));
            (limit_split + 1).saturating_sub(self.cells.len())
        } else {
            self.cells.len()
        };

        for index in 0..cells_to_split {
            self.split_cell(index, 2, default_mass, limit_split, now, merge_ticks);
        }
        debug!("Player {} split into {} cells", self.id, self.cells.len());
    }

    /// Shed `fire_food` mass from every cell big enough to afford it.
    pub fn eject(&mut self, fire_food: f32, default_mass: f32) -> Vec<Ejection> {
        let min_cell_mass = default_mass + fire_food;
        let mut launches = Vec::new();
        for index in 0..self.cells.len() {
            if self.cells[index].mass() < min_cell_mass {
                continue;
            }
            self.change_cell_mass(index, -fire_food);
            let origin = self.cells[index].position;
            launches.push(Ejection {
                cell_index: index,
                origin,
                direction: (self.position - origin + self.target).normalize_or_zero(),
                mass: fire_food,
            });
        }
        launches
    }

    /// Merge overlapping siblings into the lower-indexed cell.
    fn merge_colliding_cells(&mut self) {
        let count = self.cells.len();
        let mut merged = vec![false; count];
        for a in 0..count {
            if merged[a] {
                continue;
            }
            for b in (a + 1)..count {
                if merged[b] {
                    continue;
                }
                let (first, second) = (&self.cells[a], &self.cells[b]);
                if test_circle_circle(first.position, first.radius(), second.position, second.radius()).is_some() {
                    let mass = self.cells[b].mass();
                    self.cells[a].add_mass(mass);
                    merged[b] = true;
                }
            }
        }

        if merged.iter().any(|&m| m) {
            let mut index = 0;
            self.cells.retain(|_| {
                let keep = !merged[index];
                index += 1;
                keep
            });
            self.recompute_mass_total();
        }
    }

    /// Nudge overlapping siblings apart while they may not merge yet.
    fn push_away_colliding_cells(&mut self) {
        let count = self.cells.len();
        for a in 0..count {
            for b in (a + 1)..count {
                let (first, second) = (&self.cells[a], &self.cells[b]);
                if test_circle_circle(first.position, first.radius(), second.position, second.radius()).is_none() {
                    continue;
                }
                let mut push = (second.position - first.position).normalize_or_zero() * PUSHING_AWAY_SPEED;
                if push == Vec2::ZERO {
                    push = Vec2::Y;
                }
                self.cells[a].position -= push;
                self.cells[b].position += push;
            }
        }
    }

    /// One tick of movement: merge or separate siblings, then steer every cell.
    pub fn step(&mut self, slow_base: f32, width: f32, height: f32, init_mass_log: f32, now: u64) {
        if self.cells.len() > 1 {
            if self.can_merge(now) {
                self.merge_colliding_cells();
            } else {
                self.push_away_colliding_cells();
            }
        }

        if self.cells.is_empty() {
            return;
        }

        for cell in &mut self.cells {
            cell.step_toward(self.position, self.target, slow_base, init_mass_log);
            let radius = cell.radius();
            clamp_to_bounds(&mut cell.position, radius / 3.0, 0.0, width, height);
        }
        self.recompute_position();
    }

    /// Whether a circle at `position` falls inside this player's view.
    pub fn sees(&self, position: Vec2, radius: f32, padded: bool) -> bool {
        let half_size = if padded {
            radius + radius * VISIBILITY_PADDING
        } else {
            radius
        };
        rects_overlap(position, Vec2::splat(half_size), self.position, self.screen.half())
    }

    /// Whether any of `other`'s cells is visible to this player.
    pub fn sees_actor(&self, other: &dyn Actor) -> bool {
        other.cells().iter().any(|cell| self.sees(cell.position, cell.radius(), true))
    }
}

impl Actor for Player {
    fn id(&self) -> ActorId {
        ActorId::Player(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn hue(&self) -> u16 {
        self.hue
    }

    fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn mass_total(&self) -> f32 {
        self.mass_total
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn target(&self) -> Vec2 {
        self.target
    }

    fn change_cell_mass(&mut self, index: usize, delta: f32) {
        if let Some(cell) = self.cells.get_mut(index) {
            let before = cell.mass();
            cell.add_mass(delta);
            self.mass_total += cell.mass() - before;
        }
    }

    fn remove_cell(&mut self, index: usize) -> bool {
        if index < self.cells.len() {
            let cell = self.cells.remove(index);
            self.mass_total -= cell.mass();
            self.recompute_position();
        }
        self.cells.is_empty()
    }

    fn splits_on_virus(&self) -> bool {
        true
    }
}

/// Owns every connected player.
#[derive(Debug, Default)]
pub struct PlayerManager {
    /// Connected players in join order.
    pub data: Vec<Player>,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self { data: Vec::with_capacity(64) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn push_new(&mut self, player: Player) {
        self.data.push(player);
    }

    pub fn find_index_by_id(&self, id: u32) -> Option<usize> {
        self.data.iter().position(|p| p.id == id)
    }

    pub fn get(&self, id: u32) -> Option<&Player> {
        self.data.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Player> {
        self.data.iter_mut().find(|p| p.id == id)
    }

    /// Remove a player by identity.
    pub fn remove_by_id(&mut self, id: u32) -> Option<Player> {
        let index = self.find_index_by_id(id)?;
        Some(self.data.remove(index))
    }

    pub fn shrink_cells(&mut self, mass_loss_rate: f32, default_mass: f32, min_mass_loss: f32) {
        for player in &mut self.data {
            player.lose_mass_if_needed(mass_loss_rate, default_mass, min_mass_loss);
        }
    }

    pub fn step(&mut self, slow_base: f32, width: f32, height: f32, init_mass_log: f32, now: u64) {
        for player in &mut self.data {
            player.step(slow_base, width, height, init_mass_log, now);
        }
    }

    pub fn total_mass(&self) -> f32 {
        self.data.iter().map(|p| p.mass_total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_with_mass(mass: f32) -> Player {
        Player::new(1, "tester".into(), false, Vec2::new(500.0, 500.0), mass, ScreenSize::new(1920.0, 1080.0))
    }

    #[test]
    fn test_change_cell_mass_tracks_total() {
        let mut player = player_with_mass(100.0);
        player.change_cell_mass(0, 50.0);
        assert_eq!(player.mass_total(), 150.0);
        player.change_cell_mass(3, 50.0);
        assert_eq!(player.mass_total(), 150.0);
        player.debug_check_mass_total();
    }

    #[test]
    fn test_user_split_halves_cells() {
        let mut player = player_with_mass(100.0);
        player.user_split(16, 10.0, 0, 900);
        assert_eq!(player.cells.len(), 2);
        assert!(player.cells.iter().all(|c| c.mass() == 50.0));
        assert_eq!(player.mass_total(), 100.0);
        assert_eq!(player.cells[1].speed, SPLIT_CELL_SPEED);
        assert!(!player.can_merge(10));
        assert!(player.can_merge(900));
    }

    #[test]
    fn test_split_respects_default_mass() {
        let mut player = player_with_mass(15.0);
        player.user_split(16, 10.0, 0, 900);
        assert_eq!(player.cells.len(), 1);
        assert!(player.can_merge(0));
    }

    #[test]
    fn test_split_never_exceeds_limit() {
        let mut player = player_with_mass(1600.0);
        for _ in 0..10 {
            player.user_split(16, 10.0, 0, 900);
        }
        assert_eq!(player.cells.len(), 16);
        assert!((player.mass_total() - 1600.0).abs() < 1e-2);
    }

    #[test]
    fn test_virus_split_fills_up_to_limit() {
        let mut player = player_with_mass(200.0);
        player.virus_split(&[0], 16, 10.0, 0, 900);
        assert_eq!(player.cells.len(), 16);
        assert!(player.cells.iter().all(|c| (c.mass() - 12.5).abs() < 1e-4));

        let mut small = player_with_mass(35.0);
        small.virus_split(&[0], 16, 10.0, 0, 900);
        assert_eq!(small.cells.len(), 3);
    }

    #[test]
    fn test_eject_sheds_mass_toward_target() {
        let mut player = player_with_mass(100.0);
        player.target = Vec2::new(0.0, -300.0);
        let launches = player.eject(20.0, 10.0);
        assert_eq!(launches.len(), 1);
        assert_eq!(launches[0].direction, Vec2::NEG_Y);
        assert_eq!(player.mass_total(), 80.0);

        let mut tiny = player_with_mass(25.0);
        assert!(tiny.eject(20.0, 10.0).is_empty());
        assert_eq!(tiny.mass_total(), 25.0);
    }

    #[test]
    fn test_cells_merge_after_timer() {
        let mut player = player_with_mass(100.0);
        player.user_split(16, 10.0, 0, 5);

        player.step(4.5, 5000.0, 5000.0, 1.0, 1);
        assert_eq!(player.cells.len(), 2);

        player.step(4.5, 5000.0, 5000.0, 1.0, 5);
        assert_eq!(player.cells.len(), 1);
        assert!((player.mass_total() - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_remove_last_cell_reports_death() {
        let mut player = player_with_mass(100.0);
        player.user_split(16, 10.0, 0, 900);
        assert!(!player.remove_cell(1));
        assert_eq!(player.mass_total(), 50.0);
        assert!(player.remove_cell(0));
        assert_eq!(player.mass_total(), 0.0);
    }

    #[test]
    fn test_removing_a_cell_recenters_player() {
        let mut player = player_with_mass(100.0);
        player.user_split(16, 10.0, 0, 900);
        player.cells[0].position = Vec2::new(1000.0, 500.0);
        player.cells[1].position = Vec2::new(3000.0, 500.0);

        assert!(!player.remove_cell(0));
        assert_eq!(player.position, Vec2::new(3000.0, 500.0));
    }

    #[test]
    fn test_mass_loss_respects_floors() {
        let mut player = player_with_mass(100.0);
        player.lose_mass_if_needed(1.0, 10.0, 50.0);
        assert!((player.mass_total() - 99.9).abs() < 1e-4);

        let mut light = player_with_mass(40.0);
        light.lose_mass_if_needed(1.0, 10.0, 50.0);
        assert_eq!(light.mass_total(), 40.0);
    }

    #[test]
    fn test_visibility_uses_screen_bounds() {
        let player = player_with_mass(10.0);
        assert!(player.sees(Vec2::new(500.0 + 950.0, 500.0), 5.0, false));
        assert!(!player.sees(Vec2::new(500.0 + 970.0, 500.0), 5.0, false));
        // Padding widens the test by 10% of the radius.
        assert!(player.sees(Vec2::new(500.0 + 965.0, 500.0), 5.0, true));
    }

    #[test]
    fn test_manager_remove_by_identity() {
        let mut players = PlayerManager::new();
        players.push_new(player_with_mass(10.0));
        let mut other = player_with_mass(20.0);
        other.id = 2;
        players.push_new(other);

        assert!(players.remove_by_id(1).is_some());
        assert!(players.remove_by_id(1).is_none());
        assert_eq!(players.len(), 1);
        assert_eq!(players.total_mass(), 20.0);
    }
}
