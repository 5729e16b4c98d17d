//! Destructible grids: asteroids, structures and player-placed blocks
//!
//! A grid is an irregular set of axis-aligned cells anchored at `pos`.
//! Cell `(col, row)` covers `pos + (col, row) * cell_size` to one cell
//! further along each axis.

use std::collections::HashMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{Rect, segment_closest_approach_to_circle, segment_rect_entry_time};
use super::material::Material;
use crate::consts::*;

/// Structures that spawn in chunks alongside asteroids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureKind {
    /// Abandoned hulk; drops extra loot when destroyed
    Derelict,
    /// Rigged hulk; detonates when destroyed
    Trap,
}

/// What a grid represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridKind {
    Asteroid,
    Structure(StructureKind),
    /// Blocks placed by the player
    Placed,
}

/// One HP-bearing cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
    pub material: Material,
    pub hp: f32,
    pub max_hp: f32,
    pub alive: bool,
}

impl Cell {
    pub fn new(col: i32, row: i32, material: Material, hp: f32) -> Self {
        Self {
            col,
            row,
            material,
            hp,
            max_hp: hp,
            alive: true,
        }
    }
}

/// Outcome of damaging a single cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellDamage {
    /// Damage actually removed from the cell
    pub applied: f32,
    /// The cell died from this hit
    pub cell_destroyed: bool,
    /// That was the last live cell
    pub grid_destroyed: bool,
}

impl CellDamage {
    fn none() -> Self {
        Self {
            applied: 0.0,
            cell_destroyed: false,
            grid_destroyed: false,
        }
    }
}

/// An asteroid, structure or placed-block field
#[derive(Debug, Clone, PartialEq)]
pub struct DestructibleGrid {
    pub id: u64,
    pub kind: GridKind,
    /// World position of cell (0, 0)'s minimum corner
    pub pos: Vec2,
    pub vel: Vec2,
    pub cell_size: f32,
    cells: Vec<Cell>,
    index: HashMap<(i32, i32), usize>,
    live: usize,
}

impl DestructibleGrid {
    pub fn new(id: u64, kind: GridKind, pos: Vec2, cell_size: f32) -> Self {
        Self {
            id,
            kind,
            pos,
            vel: Vec2::ZERO,
            cell_size,
            cells: Vec::new(),
            index: HashMap::new(),
            live: 0,
        }
    }

    /// Add a cell during construction; duplicates are ignored
    pub fn push_cell(&mut self, cell: Cell) -> bool {
        let key = (cell.col, cell.row);
        if self.index.contains_key(&key) {
            return false;
        }
        if cell.alive {
            self.live += 1;
        }
        self.index.insert(key, self.cells.len());
        self.cells.push(cell);
        true
    }

    /// Insert a live cell, failing if a live cell already occupies the slot
    ///
    /// A dead cell in the slot is replaced.
    pub fn insert_cell(&mut self, col: i32, row: i32, material: Material, hp: f32) -> bool {
        match self.index.get(&(col, row)) {
            Some(&idx) => {
                if self.cells[idx].alive {
                    return false;
                }
                self.cells[idx] = Cell::new(col, row, material, hp);
                self.live += 1;
                true
            }
            None => self.push_cell(Cell::new(col, row, material, hp)),
        }
    }

    pub fn has_cell(&self, col: i32, row: i32) -> bool {
        self.index.contains_key(&(col, row))
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, idx: usize) -> Option<&Cell> {
        self.cells.get(idx)
    }

    /// Live cells with their slot index
    pub fn live_cells(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells.iter().enumerate().filter(|(_, c)| c.alive)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }

    /// True once every cell is dead
    pub fn is_destroyed(&self) -> bool {
        self.live == 0
    }

    /// Mass used by the physics kernel (never below one cell)
    pub fn mass(&self) -> f32 {
        self.live.max(1) as f32 * CELL_MASS
    }

    /// Sum of max HP over all cells, for XP awards
    pub fn total_max_hp(&self) -> f32 {
        self.cells.iter().map(|c| c.max_hp).sum()
    }

    pub fn cell_rect(&self, idx: usize) -> Option<Rect> {
        self.cells.get(idx).map(|c| self.rect_for(c.col, c.row))
    }

    fn rect_for(&self, col: i32, row: i32) -> Rect {
        let min = self.pos + Vec2::new(col as f32, row as f32) * self.cell_size;
        Rect::new(min, min + Vec2::splat(self.cell_size))
    }

    pub fn cell_center(&self, idx: usize) -> Option<Vec2> {
        self.cell_rect(idx).map(|r| r.center())
    }

    /// Grid key of the slot containing a world point
    pub fn key_at(&self, point: Vec2) -> (i32, i32) {
        let local = (point - self.pos) / self.cell_size;
        (local.x.floor() as i32, local.y.floor() as i32)
    }

    /// Live cell containing a world point
    pub fn cell_at_point(&self, point: Vec2) -> Option<usize> {
        let idx = *self.index.get(&self.key_at(point))?;
        self.cells[idx].alive.then_some(idx)
    }

    /// Centroid of live cells and a radius enclosing all of them
    pub fn bounding_circle(&self) -> (Vec2, f32) {
        if self.live == 0 {
            return (self.pos, 0.0);
        }
        let half = Vec2::splat(self.cell_size * 0.5);
        let sum: Vec2 = self
            .live_cells()
            .map(|(_, c)| self.rect_for(c.col, c.row).min + half)
            .sum();
        let center = sum / self.live as f32;
        let half_diag = half.length();
        let max_sq = self
            .live_cells()
            .map(|(_, c)| (self.rect_for(c.col, c.row).min + half - center).length_squared())
            .fold(0.0_f32, f32::max);
        (center, max_sq.sqrt() + half_diag)
    }

    /// Axis-aligned bounds of all live cells
    pub fn bounds(&self) -> Option<Rect> {
        self.live_cells()
            .map(|(_, c)| self.rect_for(c.col, c.row))
            .reduce(|a, b| Rect::new(a.min.min(b.min), a.max.max(b.max)))
    }

    /// Apply damage to one cell, clamping at zero
    ///
    /// Damage against a dead or missing cell is ignored.
    pub fn damage_cell(&mut self, idx: usize, amount: f32) -> CellDamage {
        let Some(cell) = self.cells.get_mut(idx) else {
            return CellDamage::none();
        };
        if !cell.alive || amount <= 0.0 {
            return CellDamage::none();
        }
        let applied = amount.min(cell.hp);
        cell.hp = (cell.hp - amount).max(0.0);
        let cell_destroyed = cell.hp <= 0.0;
        if cell_destroyed {
            cell.alive = false;
            self.live -= 1;
        }
        CellDamage {
            applied,
            cell_destroyed,
            grid_destroyed: cell_destroyed && self.live == 0,
        }
    }

    /// Find the cell a projectile moving `prev -> pos` strikes this tick
    ///
    /// The cell under `pos` wins outright. Otherwise every live cell is
    /// tested against the swept path (and both end positions), and the one
    /// entered earliest along the path is returned so a shot never hits a
    /// far cell while passing through a near one.
    pub fn hit_test(&self, prev: Vec2, pos: Vec2, radius: f32) -> Option<usize> {
        if self.live == 0 {
            return None;
        }
        if let Some(idx) = self.cell_at_point(pos) {
            return Some(idx);
        }

        let (center, bound) = self.bounding_circle();
        let reach = bound + radius;
        if segment_closest_approach_to_circle(prev, pos, center).distance_sq > reach * reach {
            return None;
        }

        let mut best: Option<(f32, usize)> = None;
        for (idx, cell) in self.live_cells() {
            let rect = self.rect_for(cell.col, cell.row);
            if let Some(t) = swept_entry(&rect, prev, pos, radius) {
                if best.is_none_or(|(best_t, _)| t < best_t) {
                    best = Some((t, idx));
                }
            }
        }
        best.map(|(_, idx)| idx)
    }

    /// When a projectile of `radius` moving `prev -> pos` first touches cell `idx`
    pub fn entry_time(&self, idx: usize, prev: Vec2, pos: Vec2, radius: f32) -> Option<f32> {
        swept_entry(&self.cell_rect(idx)?, prev, pos, radius)
    }

    /// Integrate drift
    pub fn advance(&mut self, dt: f32) {
        self.pos += self.vel * dt;
    }
}

/// Earliest contact of a square of half-size `radius` swept `prev -> pos`
/// with `rect`, falling back to the end position for very short sweeps
fn swept_entry(rect: &Rect, prev: Vec2, pos: Vec2, radius: f32) -> Option<f32> {
    let half = Vec2::splat(radius);
    if Rect::from_center_half(prev, half).overlaps(rect) {
        Some(0.0)
    } else if let Some(t) = segment_rect_entry_time(prev, pos, &rect.expanded(radius)) {
        Some(t)
    } else if Rect::from_center_half(pos, half).overlaps(rect) {
        Some(1.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(cells: &[(i32, i32)]) -> DestructibleGrid {
        let mut grid = DestructibleGrid::new(1, GridKind::Asteroid, Vec2::ZERO, 20.0);
        for &(c, r) in cells {
            grid.push_cell(Cell::new(c, r, Material::Rock, 30.0));
        }
        grid
    }

    #[test]
    fn test_swept_projectile_hits_cell_between_endpoints() {
        // One cell covering [20, 40] x [-10, 10]
        let mut grid = DestructibleGrid::new(1, GridKind::Asteroid, Vec2::new(20.0, -10.0), 20.0);
        grid.push_cell(Cell::new(0, 0, Material::Rock, 30.0));

        let hit = grid.hit_test(Vec2::ZERO, Vec2::new(50.0, 0.0), 0.0);
        assert_eq!(hit, Some(0));
    }

    #[test]
    fn test_earliest_cell_wins() {
        // Two cells along the path; the shot crosses both in one tick
        let grid = strip(&[(3, 0), (1, 0)]);
        let hit = grid.hit_test(Vec2::new(0.0, 10.0), Vec2::new(100.0, 10.0), 1.0);
        assert_eq!(grid.cell(hit.unwrap()).unwrap().col, 1);
    }

    #[test]
    fn test_occupied_cell_wins_outright() {
        let grid = strip(&[(0, 0), (2, 0)]);
        let hit = grid.hit_test(Vec2::new(-30.0, 10.0), Vec2::new(45.0, 10.0), 1.0);
        assert_eq!(grid.cell(hit.unwrap()).unwrap().col, 2);
    }

    #[test]
    fn test_miss_far_away() {
        let grid = strip(&[(0, 0)]);
        assert_eq!(
            grid.hit_test(Vec2::new(0.0, 500.0), Vec2::new(100.0, 500.0), 2.0),
            None
        );
    }

    #[test]
    fn test_damage_clamps_and_destroys() {
        let mut grid = strip(&[(0, 0), (1, 0)]);
        let dmg = grid.damage_cell(0, 50.0);
        assert!(dmg.cell_destroyed);
        assert!(!dmg.grid_destroyed);
        assert_eq!(grid.cell(0).unwrap().hp, 0.0);
        assert_eq!(dmg.applied, 30.0);

        // Dead cell ignores further damage
        let again = grid.damage_cell(0, 10.0);
        assert_eq!(again.applied, 0.0);
        assert_eq!(grid.live_count(), 1);

        let last = grid.damage_cell(1, 30.0);
        assert!(last.grid_destroyed);
        assert!(grid.is_destroyed());
        assert_eq!(grid.mass(), CELL_MASS);
    }

    #[test]
    fn test_insert_cell_fails_on_live_slot() {
        let mut grid = DestructibleGrid::new(9, GridKind::Placed, Vec2::ZERO, 24.0);
        assert!(grid.insert_cell(2, 3, Material::Iron, 60.0));
        assert!(!grid.insert_cell(2, 3, Material::Rock, 60.0));
        grid.damage_cell(0, 100.0);
        assert!(grid.insert_cell(2, 3, Material::Rock, 60.0));
        assert_eq!(grid.live_count(), 1);
        assert_eq!(grid.cells().len(), 1);
    }

    #[test]
    fn test_bounding_circle_covers_cells() {
        let grid = strip(&[(0, 0), (4, 0), (0, 3)]);
        let (center, radius) = grid.bounding_circle();
        for (idx, _) in grid.live_cells() {
            let rect = grid.cell_rect(idx).unwrap();
            for corner in [rect.min, rect.max, Vec2::new(rect.min.x, rect.max.y)] {
                assert!((corner - center).length() <= radius + 1e-3);
            }
        }
        assert_eq!(grid.mass(), 3.0 * CELL_MASS);
    }
}
