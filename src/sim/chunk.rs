//! Deterministic chunk generation
//!
//! A chunk's population is a pure function of its coordinates and the
//! world seed. Every draw comes from one local `Pcg32` stream in a fixed
//! order (decorations, asteroids, structures, enemies), so generating the
//! same chunk twice gives identical output no matter what else has run.

use std::collections::HashSet;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::enemy::{Enemy, EnemyClass};
use super::grid::{Cell, DestructibleGrid, GridKind, StructureKind};
use super::material::Material;
use crate::consts::*;

/// Integer chunk coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
}

impl ChunkCoord {
    pub const fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    /// Chunk containing a world position
    pub fn from_world(pos: Vec2) -> Self {
        Self {
            cx: (pos.x / CHUNK_SIZE).floor() as i32,
            cy: (pos.y / CHUNK_SIZE).floor() as i32,
        }
    }

    /// Store key packing both coordinates
    #[inline]
    pub fn key(&self) -> u64 {
        ((self.cx as u32 as u64) << 32) | self.cy as u32 as u64
    }

    /// Low 16 bits of `cx` in the high half, low 16 bits of `cy` in the low half
    #[inline]
    pub fn seed_bits(&self) -> u32 {
        ((self.cx as u16 as u32) << 16) | self.cy as u16 as u32
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.cx as f32, self.cy as f32) * CHUNK_SIZE
    }

    pub fn center(&self) -> Vec2 {
        (Vec2::new(self.cx as f32, self.cy as f32) + 0.5) * CHUNK_SIZE
    }

    pub fn bounds(&self) -> Rect {
        let origin = self.origin();
        Rect::new(origin, origin + Vec2::splat(CHUNK_SIZE))
    }

    pub fn chebyshev_from_origin(&self) -> i32 {
        self.cx.abs().max(self.cy.abs())
    }

    pub fn in_safe_zone(&self) -> bool {
        self.chebyshev_from_origin() <= SAFE_ZONE_RADIUS
    }
}

/// Purely visual background props
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecorationKind {
    Star,
    Nebula,
    DustCloud,
    Wreckage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decoration {
    pub pos: Vec2,
    pub kind: DecorationKind,
    pub scale: f32,
}

/// Everything one chunk owns
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub asteroids: Vec<DestructibleGrid>,
    pub structures: Vec<DestructibleGrid>,
    pub enemies: Vec<Enemy>,
    pub decorations: Vec<Decoration>,
}

impl Chunk {
    fn empty(coord: ChunkCoord) -> Self {
        Self {
            coord,
            asteroids: Vec::new(),
            structures: Vec::new(),
            enemies: Vec::new(),
            decorations: Vec::new(),
        }
    }

    /// Drop destroyed grids and dead ships
    pub fn remove_dead(&mut self) {
        self.asteroids.retain(|g| !g.is_destroyed());
        self.structures.retain(|g| !g.is_destroyed());
        self.enemies.retain(|e| e.is_alive());
    }

    pub fn live_enemy_count(&self) -> usize {
        self.enemies.iter().filter(|e| e.is_alive()).count()
    }
}

// Id layout: chunk seed bits, then category, then index within the chunk
const ID_ASTEROID: u64 = 1;
const ID_STRUCTURE: u64 = 2;
const ID_ENEMY: u64 = 3;

fn entity_id(coord: ChunkCoord, category: u64, index: usize) -> u64 {
    ((coord.seed_bits() as u64) << 24) | (category << 16) | (index as u64 & 0xFFFF)
}

/// Local stream for a chunk
pub fn chunk_rng(coord: ChunkCoord, world_seed: u64) -> Pcg32 {
    let mixed = world_seed ^ (coord.seed_bits() as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    Pcg32::seed_from_u64(mixed)
}

/// Generate a chunk from its coordinates and the world seed
///
/// Reads and writes no shared state.
pub fn generate(coord: ChunkCoord, world_seed: u64) -> Chunk {
    let mut rng = chunk_rng(coord, world_seed);
    let mut chunk = Chunk::empty(coord);
    let distance = coord.center().length();

    generate_decorations(&mut chunk, &mut rng);
    if coord.in_safe_zone() {
        log::debug!(
            "Generated safe chunk ({}, {}) with {} decorations",
            coord.cx,
            coord.cy,
            chunk.decorations.len()
        );
        return chunk;
    }

    generate_asteroids(&mut chunk, &mut rng, distance);
    generate_structures(&mut chunk, &mut rng, distance);
    generate_enemies(&mut chunk, &mut rng, distance);

    log::debug!(
        "Generated chunk ({}, {}): {} asteroids, {} structures, {} enemies",
        coord.cx,
        coord.cy,
        chunk.asteroids.len(),
        chunk.structures.len(),
        chunk.enemies.len()
    );
    chunk
}

fn point_in_chunk(rng: &mut Pcg32, coord: ChunkCoord, margin: f32) -> Vec2 {
    let origin = coord.origin();
    Vec2::new(
        origin.x + rng.random_range(margin..CHUNK_SIZE - margin),
        origin.y + rng.random_range(margin..CHUNK_SIZE - margin),
    )
}

fn generate_decorations(chunk: &mut Chunk, rng: &mut Pcg32) {
    let count = rng.random_range(3..=8);
    for _ in 0..count {
        let pos = point_in_chunk(rng, chunk.coord, 0.0);
        let kind = match rng.random_range(0..10) {
            0..=4 => DecorationKind::Star,
            5..=6 => DecorationKind::DustCloud,
            7..=8 => DecorationKind::Nebula,
            _ => DecorationKind::Wreckage,
        };
        let scale = rng.random_range(0.5..2.0);
        chunk.decorations.push(Decoration { pos, kind, scale });
    }
}

/// Grow a connected blob of `size` cells by random walk from `(0, 0)`
fn grow_blob(rng: &mut Pcg32, size: usize) -> Vec<(i32, i32)> {
    const STEPS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
    let mut cells = vec![(0, 0)];
    let mut taken: HashSet<(i32, i32)> = cells.iter().copied().collect();
    let mut attempts = 0;
    while cells.len() < size && attempts < size * 20 {
        attempts += 1;
        let (col, row) = cells[rng.random_range(0..cells.len())];
        let (dc, dr) = STEPS[rng.random_range(0..STEPS.len())];
        let next = (col + dc, row + dr);
        if taken.insert(next) {
            cells.push(next);
        }
    }
    cells
}

fn generate_asteroids(chunk: &mut Chunk, rng: &mut Pcg32, distance: f32) {
    let count = rng.random_range(3..=MAX_ASTEROIDS_PER_CHUNK);
    // Farther out, rocks carry more ore
    let ore_fraction = 0.12 + (distance / 40_000.0).min(0.2);
    for i in 0..count as usize {
        let center = point_in_chunk(rng, chunk.coord, 200.0);
        let size = rng.random_range(6..=40);
        let shape = grow_blob(rng, size);

        let mut grid = DestructibleGrid::new(
            entity_id(chunk.coord, ID_ASTEROID, i),
            GridKind::Asteroid,
            center,
            CELL_SIZE,
        );
        for (col, row) in shape {
            let material = if rng.random::<f32>() < ore_fraction {
                Material::pick_ore(rng, distance)
            } else {
                Material::pick_filler(rng)
            };
            grid.push_cell(Cell::new(col, row, material, material.cell_hp()));
        }
        // Re-anchor so the blob sits around the chosen centre
        let (blob_center, _) = grid.bounding_circle();
        grid.pos += center - blob_center;

        let drift = rng.random_range(0.0..ASTEROID_MAX_SPEED * 0.3);
        grid.vel = Vec2::from_angle(rng.random_range(0.0..std::f32::consts::TAU)) * drift;
        chunk.asteroids.push(grid);
    }
}

fn generate_structures(chunk: &mut Chunk, rng: &mut Pcg32, distance: f32) {
    let count = match rng.random_range(0..10) {
        0..=5 => 0,
        6..=8 => 1,
        _ => 2,
    };
    for i in 0..count {
        let kind = if distance > 3_000.0 && rng.random_bool(0.35) {
            StructureKind::Trap
        } else {
            StructureKind::Derelict
        };
        let pos = point_in_chunk(rng, chunk.coord, 250.0);
        let width: i32 = rng.random_range(3..=6);
        let height: i32 = rng.random_range(2..=4);
        let mut grid = DestructibleGrid::new(
            entity_id(chunk.coord, ID_STRUCTURE, i),
            GridKind::Structure(kind),
            pos,
            CELL_SIZE,
        );
        for col in 0..width {
            for row in 0..height {
                // Interior holes make hulks look wrecked; the frame stays whole
                let edge = col == 0 || row == 0 || col == width - 1 || row == height - 1;
                let hole = rng.random_bool(0.25);
                if hole && !edge {
                    continue;
                }
                let material = match kind {
                    StructureKind::Trap => Material::Copper,
                    StructureKind::Derelict => Material::Iron,
                };
                grid.push_cell(Cell::new(col, row, material, material.cell_hp() * 1.5));
            }
        }
        chunk.structures.push(grid);
    }
}

/// Distance tier used to scale enemy HP (1 near the origin)
pub fn difficulty_tier(distance: f32) -> u32 {
    (1 + (distance / 5_000.0) as u32).min(6)
}

fn generate_enemies(chunk: &mut Chunk, rng: &mut Pcg32, distance: f32) {
    let max = (1 + (distance / 3_000.0) as u32).min(MAX_ENEMIES_PER_CHUNK);
    let count = rng.random_range(0..=max);
    let tier = difficulty_tier(distance);
    let hp_scale = 1.0 + 0.25 * (tier - 1) as f32;

    for i in 0..count as usize {
        // Draw everything up front so a skipped enemy does not shift the stream
        let pos = point_in_chunk(rng, chunk.coord, 100.0);
        let class = EnemyClass::for_roll(rng.random(), distance);
        let heading = rng.random_range(-std::f32::consts::PI..std::f32::consts::PI);
        let behaviour_seed: u64 = rng.random();

        let id = entity_id(chunk.coord, ID_ENEMY, i);
        match Enemy::new(id, class, pos, heading, hp_scale, behaviour_seed) {
            Ok(enemy) => chunk.enemies.push(enemy),
            Err(err) => log::warn!("Skipping {:?} in chunk {:?}: {}", class, chunk.coord, err),
        }
    }
}
