//! Read-only snapshots handed to the renderer and UI
//!
//! Everything here is an owned copy; nothing borrows from the world, so
//! the host may keep or upload it however it likes.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use super::collision::Rect;
use super::material::Material;
use super::ship::ModuleKind;

/// What a sprite depicts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteKind {
    AsteroidCell(Material),
    StructureCell(Material),
    PlacedBlock(Material),
    Module(ModuleKind),
    Station,
    Pickup,
    Debris,
}

/// One drawable thing at one place
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteInstance {
    pub kind: SpriteKind,
    pub pos: Vec2,
    pub rotation: f32,
    pub size: f32,
    /// Remaining health, 0..=1 (1 for things without health)
    pub health: f32,
}

/// Minimap categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimapCategory {
    Asteroid,
    Structure,
    Enemy,
    Station,
    Pickup,
    PlacedBlock,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapBlip {
    pub category: MinimapCategory,
    pub pos: Vec2,
}

/// Axis-aligned shadow caster for the lighting post-process
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct OccluderQuad {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl OccluderQuad {
    pub fn from_rect(rect: &Rect) -> Self {
        Self {
            min: rect.min.to_array(),
            max: rect.max.to_array(),
        }
    }

    /// Raw bytes for a GPU buffer upload
    pub fn as_bytes(quads: &[OccluderQuad]) -> &[u8] {
        bytemuck::cast_slice(quads)
    }
}
