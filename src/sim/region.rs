//! Chunk cache and the active window around the reference point

use std::collections::HashMap;

use glam::Vec2;

use super::chunk::{Chunk, ChunkCoord, generate};

/// Owned cache of generated chunks, keyed by `ChunkCoord::key()`
///
/// A key is generated at most once per store; there is no eviction.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    world_seed: u64,
    chunks: HashMap<u64, Chunk>,
    generated: u64,
}

impl ChunkStore {
    pub fn new(world_seed: u64) -> Self {
        Self {
            world_seed,
            chunks: HashMap::new(),
            generated: 0,
        }
    }

    pub fn world_seed(&self) -> u64 {
        self.world_seed
    }

    pub fn get_or_generate(&mut self, coord: ChunkCoord) -> &mut Chunk {
        let seed = self.world_seed;
        let generated = &mut self.generated;
        self.chunks.entry(coord.key()).or_insert_with(|| {
            *generated += 1;
            generate(coord, seed)
        })
    }

    pub fn get(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord.key())
    }

    pub fn get_mut(&mut self, coord: ChunkCoord) -> Option<&mut Chunk> {
        self.chunks.get_mut(&coord.key())
    }

    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord.key())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total generator invocations since creation or the last `clear`
    pub fn generated_count(&self) -> u64 {
        self.generated
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.generated = 0;
    }

    /// Move chunks out for the duration of a tick, generating missing ones
    ///
    /// Every checked-out chunk must come back through [`ChunkStore::restore`]
    /// before the store is queried again.
    pub fn checkout(&mut self, coords: &[ChunkCoord]) -> Vec<Chunk> {
        coords
            .iter()
            .filter_map(|&coord| {
                self.get_or_generate(coord);
                self.chunks.remove(&coord.key())
            })
            .collect()
    }

    pub fn restore(&mut self, chunks: Vec<Chunk>) {
        for chunk in chunks {
            self.chunks.insert(chunk.coord.key(), chunk);
        }
    }
}

/// Square window of chunk coordinates around a reference point
#[derive(Debug, Clone)]
pub struct ActiveRegion {
    radius: i32,
    reference: Option<ChunkCoord>,
    coords: Vec<ChunkCoord>,
    recomputations: u64,
}

impl ActiveRegion {
    pub fn new(radius: i32) -> Self {
        Self {
            radius: radius.max(0),
            reference: None,
            coords: Vec::new(),
            recomputations: 0,
        }
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Coordinates of the `(2r+1)^2` chunks around `reference_point`
    ///
    /// Row-major, top row first. The list is rebuilt (and missing chunks
    /// generated) only when the reference point moves into another chunk.
    pub fn active_chunks(&mut self, reference_point: Vec2, store: &mut ChunkStore) -> &[ChunkCoord] {
        let cell = ChunkCoord::from_world(reference_point);
        if self.reference != Some(cell) {
            self.coords.clear();
            for cy in cell.cy - self.radius..=cell.cy + self.radius {
                for cx in cell.cx - self.radius..=cell.cx + self.radius {
                    let coord = ChunkCoord::new(cx, cy);
                    store.get_or_generate(coord);
                    self.coords.push(coord);
                }
            }
            self.reference = Some(cell);
            self.recomputations += 1;
            log::debug!(
                "Active region moved to ({}, {}); {} chunks cached",
                cell.cx,
                cell.cy,
                store.len()
            );
        }
        &self.coords
    }

    /// Last computed window (empty before the first call)
    pub fn coords(&self) -> &[ChunkCoord] {
        &self.coords
    }

    pub fn reference(&self) -> Option<ChunkCoord> {
        self.reference
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Forget the cached window so the next call rebuilds it
    pub fn invalidate(&mut self) {
        self.reference = None;
        self.coords.clear();
    }
}
