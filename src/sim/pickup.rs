//! Loot and health pickups dropped by destroyed targets

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::material::Material;
use super::player::PlayerHandle;
use crate::consts::*;

/// Pickup types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PickupKind {
    Resource { material: Material, amount: u32 },
    Health(f32),
}

/// A pickup entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    pub pos: Vec2,
    pub vel: Vec2,
    pub kind: PickupKind,
    pub ttl: f32,
}

impl Pickup {
    pub fn new(pos: Vec2, vel: Vec2, kind: PickupKind) -> Self {
        Self {
            pos,
            vel,
            kind,
            ttl: PICKUP_TTL,
        }
    }

    /// Drift, and get pulled toward the player once inside the magnet radius
    pub fn update(&mut self, dt: f32, player_pos: Vec2) {
        let to_player = player_pos - self.pos;
        let dist_sq = to_player.length_squared();
        if dist_sq < PICKUP_MAGNET_RADIUS * PICKUP_MAGNET_RADIUS && dist_sq > GEOMETRY_EPSILON {
            self.vel += to_player / dist_sq.sqrt() * PICKUP_MAGNET_ACCEL * dt;
        } else {
            self.vel *= 1.0 - (1.5 * dt).min(1.0);
        }
        self.pos += self.vel * dt;
        self.ttl -= dt;
    }

    pub fn is_expired(&self) -> bool {
        self.ttl <= 0.0
    }

    pub fn touches(&self, player_pos: Vec2, player_radius: f32) -> bool {
        let reach = player_radius + PICKUP_RADIUS;
        (player_pos - self.pos).length_squared() <= reach * reach
    }

    /// Hand the pickup's contents to the player
    pub fn apply_to(&self, player: &mut dyn PlayerHandle) {
        match self.kind {
            PickupKind::Resource { material, amount } => player.add_resource(material, amount),
            PickupKind::Health(amount) => {
                player.heal(amount);
            }
        }
    }
}
