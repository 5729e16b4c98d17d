//! Free-floating debris from shattered cells and detached modules
//!
//! Once detached, a module has nothing to do with its former ship: its HP
//! and position evolve on their own here.

use glam::Vec2;

use super::material::Material;
use super::ship::{DetachedModule, Module, ModuleKind};
use crate::consts::*;

/// Where a piece of debris came from
#[derive(Debug, Clone, PartialEq)]
pub enum DebrisSource {
    Module(Module),
    Cell(Material),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Debris {
    pub pos: Vec2,
    pub vel: Vec2,
    pub angle: f32,
    /// Radians per second
    pub spin: f32,
    pub size: f32,
    pub ttl: f32,
    pub source: DebrisSource,
}

impl Debris {
    /// Fling a detached module away from the ship it left
    pub fn from_module(detached: DetachedModule, ship_pos: Vec2, ship_vel: Vec2, heading: f32) -> Self {
        let outward = (detached.world_pos - ship_pos).normalize_or(Vec2::from_angle(heading));
        // Deterministic spin from the module's old slot
        let spin = ((detached.module.col * 7 + detached.module.row * 13) % 5) as f32 * 0.4 - 0.8;
        Self {
            pos: detached.world_pos,
            vel: ship_vel + outward * 40.0,
            angle: heading,
            spin,
            size: MODULE_SIZE,
            ttl: DEBRIS_TTL,
            source: DebrisSource::Module(detached.module),
        }
    }

    /// A chunk of a destroyed cell
    pub fn from_cell(pos: Vec2, vel: Vec2, material: Material) -> Self {
        Self {
            pos,
            vel,
            angle: 0.0,
            spin: 1.2,
            size: CELL_SIZE * 0.5,
            ttl: DEBRIS_TTL * 0.5,
            source: DebrisSource::Cell(material),
        }
    }

    pub fn module_kind(&self) -> Option<ModuleKind> {
        match &self.source {
            DebrisSource::Module(m) => Some(m.kind),
            DebrisSource::Cell(_) => None,
        }
    }

    pub fn update(&mut self, dt: f32) {
        self.pos += self.vel * dt;
        self.angle += self.spin * dt;
        self.vel *= 1.0 - (0.3 * dt).min(1.0);
        self.ttl -= dt;
    }

    pub fn is_expired(&self) -> bool {
        self.ttl <= 0.0
    }
}
