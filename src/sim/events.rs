//! Outbound events and particle bursts
//!
//! The simulation never renders or plays sound; it reports what happened
//! through these sinks and lets the host decide what to do with it.

use glam::Vec2;

use super::enemy::EnemyClass;
use super::grid::GridKind;
use super::material::Material;
use super::pickup::PickupKind;
use super::ship::ModuleKind;
use crate::config::QualityPreset;

/// What a projectile struck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Grid(GridKind),
    Enemy(EnemyClass),
    Station,
    Player,
}

/// Something gameplay-relevant that happened during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ProjectileHit {
        pos: Vec2,
        target: HitTarget,
        damage: f32,
    },
    CellDestroyed {
        pos: Vec2,
        material: Material,
    },
    GridDestroyed {
        id: u64,
        kind: GridKind,
        pos: Vec2,
    },
    ModuleDestroyed {
        pos: Vec2,
        kind: ModuleKind,
    },
    ModulesDetached {
        pos: Vec2,
        count: usize,
    },
    EnemyKilled {
        class: EnemyClass,
        pos: Vec2,
        by_player: bool,
    },
    EnemyAlerted {
        pos: Vec2,
    },
    DroneSwarmLaunched {
        pos: Vec2,
        count: u32,
    },
    TrapDetonated {
        pos: Vec2,
    },
    PlayerDamaged {
        amount: f32,
    },
    StationDamaged {
        amount: f32,
        hp: f32,
    },
    StationDestroyed,
    PickupCollected {
        kind: PickupKind,
    },
    XpGained {
        amount: u32,
    },
    BlockPlaced {
        col: i32,
        row: i32,
        material: Material,
    },
}

/// Receiver for gameplay events
pub trait EventSink {
    fn emit(&mut self, event: GameEvent);
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}

/// Visual flavour of a particle burst
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstKind {
    Impact,
    Shatter(Material),
    Explosion,
    Sparks,
}

/// Request for the host's particle system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleBurst {
    pub pos: Vec2,
    /// Inherited velocity of the source
    pub vel: Vec2,
    pub kind: BurstKind,
    pub count: u32,
}

/// Receiver for particle bursts
pub trait ParticleSink {
    fn burst(&mut self, burst: ParticleBurst);
}

impl ParticleSink for Vec<ParticleBurst> {
    fn burst(&mut self, burst: ParticleBurst) {
        self.push(burst);
    }
}

/// Sink that swallows everything (headless runs, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: GameEvent) {}
}

impl ParticleSink for NullSink {
    fn burst(&mut self, _burst: ParticleBurst) {}
}

/// Particle sink with a hard cap per drain, sized from the quality preset
#[derive(Debug, Clone)]
pub struct ParticleBuffer {
    bursts: Vec<ParticleBurst>,
    cap: usize,
    dropped: usize,
}

impl ParticleBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            bursts: Vec::with_capacity(cap.min(1024)),
            cap,
            dropped: 0,
        }
    }

    pub fn for_quality(quality: QualityPreset) -> Self {
        Self::new(quality.max_particles())
    }

    pub fn len(&self) -> usize {
        self.bursts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bursts.is_empty()
    }

    /// Bursts rejected because the buffer was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Hand everything buffered so far to the renderer
    pub fn drain(&mut self) -> std::vec::Drain<'_, ParticleBurst> {
        self.dropped = 0;
        self.bursts.drain(..)
    }
}

impl ParticleSink for ParticleBuffer {
    fn burst(&mut self, burst: ParticleBurst) {
        if self.bursts.len() < self.cap {
            self.bursts.push(burst);
        } else {
            self.dropped += 1;
        }
    }
}
