//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Capped timestep; no wall-clock reads
//! - Seeded RNG only (per-chunk streams for generation, one ambient stream for loot)
//! - Stable iteration order (row-major chunks, insertion-ordered entities)
//! - No rendering or platform dependencies

pub mod chunk;
pub mod collision;
pub mod combat;
pub mod debris;
pub mod draw;
pub mod enemy;
pub mod events;
pub mod grid;
pub mod material;
pub mod physics;
pub mod pickup;
pub mod player;
pub mod projectile;
pub mod region;
pub mod ship;
pub mod station;
pub mod world;

pub use chunk::{Chunk, ChunkCoord, Decoration, DecorationKind, chunk_rng, difficulty_tier, generate};
pub use collision::{Body, Obstacle, Rect, resolve_circle_collision, steer_around_obstacles};
pub use combat::{CombatOutcome, Effects, resolve_projectiles};
pub use debris::{Debris, DebrisSource};
pub use draw::{MinimapBlip, MinimapCategory, OccluderQuad, SpriteInstance, SpriteKind};
pub use enemy::{BehaviorState, Enemy, EnemyClass};
pub use events::{
    BurstKind, EventSink, GameEvent, HitTarget, NullSink, ParticleBuffer, ParticleBurst, ParticleSink,
};
pub use grid::{Cell, CellDamage, DestructibleGrid, GridKind, StructureKind};
pub use material::Material;
pub use physics::{PhysicsReport, resolve_bodies};
pub use pickup::{Pickup, PickupKind};
pub use player::{PlayerHandle, PlayerState};
pub use projectile::{Faction, Projectile, ProjectileKind};
pub use region::{ActiveRegion, ChunkStore};
pub use ship::{ModularShip, Module, ModuleKind, ShipDamage, WeaponKind};
pub use station::{Station, StationDamage};
pub use world::{Arena, TickStats, World};
