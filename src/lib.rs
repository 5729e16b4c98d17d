//! Starwake - simulation core for an infinite top-down space-combat game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (chunk generation, physics, combat, AI)
//! - `config`: Runtime configuration loaded from JSON
//! - `error`: Error types for the few fallible constructors and loaders

pub mod config;
pub mod error;
pub mod sim;

pub use config::{QualityPreset, SimConfig};
pub use error::{SimError, SimResult};

use glam::Vec2;

/// Simulation tuning constants
pub mod consts {
    /// Largest step a single `update` call integrates (frame hitches are clamped to this)
    pub const MAX_STEP: f32 = 1.0 / 20.0;

    /// World seed used when the config does not supply one
    pub const DEFAULT_WORLD_SEED: u64 = 0x5EED_57A2_D00D;

    // === World layout ===
    /// Side length of a chunk in world units
    pub const CHUNK_SIZE: f32 = 1600.0;
    /// Square radius (in chunks) of the active region around the reference point
    pub const ACTIVE_RADIUS: i32 = 2;
    /// Chunks within this Chebyshev distance of the origin spawn no hostiles
    pub const SAFE_ZONE_RADIUS: i32 = 1;
    /// Upper bound on enemies generated per chunk
    pub const MAX_ENEMIES_PER_CHUNK: u32 = 5;
    /// Upper bound on asteroids generated per chunk
    pub const MAX_ASTEROIDS_PER_CHUNK: u32 = 9;

    // === Destructible grids ===
    pub const CELL_SIZE: f32 = 24.0;
    /// Mass contributed by each live cell
    pub const CELL_MASS: f32 = 1.0;
    /// Snap grid for player-placed blocks
    pub const PLACE_GRID: f32 = CELL_SIZE;
    pub const PLACED_BLOCK_HP: f32 = 60.0;
    pub const ASTEROID_MAX_SPEED: f32 = 60.0;

    // === Modular ships ===
    pub const MODULE_SIZE: f32 = 20.0;
    pub const MODULE_MASS: f32 = 2.0;

    // === Physics kernel ===
    pub const RESTITUTION: f32 = 0.5;
    /// Distances below this are treated as degenerate
    pub const GEOMETRY_EPSILON: f32 = 1e-4;
    /// Seconds of travel projected forward by obstacle steering
    pub const STEER_LOOKAHEAD: f32 = 0.75;
    /// How quickly the avoidance direction is blended into velocity (per second)
    pub const STEER_BLEND_RATE: f32 = 4.0;
    /// Extra clearance kept around obstacles
    pub const STEER_MARGIN: f32 = 8.0;

    // === Behaviour ===
    pub const SIGHT_RADIUS: f32 = 700.0;
    pub const ATTACK_RANGE: f32 = 380.0;
    /// Looser range that must be exceeded before attack falls back to chase
    pub const ATTACK_BREAK_RANGE: f32 = 520.0;
    pub const ORBIT_DISTANCE: f32 = 260.0;
    pub const CHASE_GIVE_UP_MIN: f32 = 5.0;
    pub const CHASE_GIVE_UP_MAX: f32 = 9.0;
    pub const WANDER_RADIUS: f32 = 320.0;
    pub const WANDER_INTERVAL: f32 = 4.0;
    pub const RETREAT_HP_FRACTION: f32 = 0.3;
    pub const RETREAT_SPEED_MULT: f32 = 1.4;
    pub const RETREAT_SAFE_DISTANCE: f32 = 1100.0;
    /// Fraction of max HP restored when a retreat completes
    pub const RETREAT_RECOVERY: f32 = 0.25;
    /// Retreat recovery never lifts aggregate HP above this fraction of max
    pub const RETREAT_RECOVERY_CAP: f32 = 0.6;
    /// Seconds after a retreat ends before the ship may retreat again
    pub const RETREAT_COOLDOWN: f32 = 10.0;
    pub const SNIPER_MIN_RANGE: f32 = 420.0;
    pub const SNIPER_ATTACK_RANGE: f32 = 760.0;
    pub const RAM_DAMAGE: f32 = 30.0;
    pub const RAM_RECOIL_SECS: f32 = 0.8;
    pub const DRONE_SWARM_SIZE: u32 = 6;

    // === Projectiles ===
    pub const BOLT_SPEED: f32 = 900.0;
    pub const BOLT_TTL: f32 = 1.5;
    pub const BOLT_RADIUS: f32 = 3.0;
    pub const MISSILE_SPEED: f32 = 420.0;
    pub const MISSILE_TTL: f32 = 4.0;
    /// Radians per second a homing missile may turn
    pub const MISSILE_TURN_RATE: f32 = 2.5;
    pub const BEAM_SPEED: f32 = 1800.0;
    pub const BEAM_TTL: f32 = 0.7;

    // === Station ===
    pub const STATION_RADIUS: f32 = 120.0;
    pub const STATION_MAX_HP: f32 = 2000.0;
    pub const STATION_BEAM_RANGE: f32 = 1000.0;
    pub const STATION_BEAM_COOLDOWN: f32 = 0.6;
    pub const STATION_BEAM_DAMAGE: f32 = 40.0;
    /// Enemies farther than this from the station shrug off station beams
    pub const STATION_ARMOR_DISTANCE: f32 = 800.0;

    // === Loot / debris ===
    pub const PICKUP_RADIUS: f32 = 10.0;
    pub const PICKUP_MAGNET_RADIUS: f32 = 180.0;
    pub const PICKUP_MAGNET_ACCEL: f32 = 900.0;
    pub const PICKUP_TTL: f32 = 30.0;
    pub const HEALTH_PICKUP_AMOUNT: f32 = 20.0;
    pub const DEBRIS_TTL: f32 = 6.0;
    /// XP granted per point of max HP destroyed
    pub const XP_PER_HP: f32 = 0.1;
    pub const TRAP_BLAST_RADIUS: f32 = 220.0;
    pub const TRAP_BLAST_DAMAGE: f32 = 35.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Convert polar (r, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Rotate a local-space offset by `heading` radians
#[inline]
pub fn rotate_local(offset: Vec2, heading: f32) -> Vec2 {
    Vec2::from_angle(heading).rotate(offset)
}

/// Rescale `vel` so its length does not exceed `max_speed`
///
/// Direction is preserved; axes are never clamped independently.
#[inline]
pub fn clamp_speed(vel: Vec2, max_speed: f32) -> Vec2 {
    let speed_sq = vel.length_squared();
    if speed_sq > max_speed * max_speed && speed_sq > 0.0 {
        vel * (max_speed / speed_sq.sqrt())
    } else {
        vel
    }
}
