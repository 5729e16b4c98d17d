//! Projectiles fired by the player, enemies and the station

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::normalize_angle;

/// Who fired a projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    Bolt,
    /// Turns toward a target position supplied each tick
    Missile,
    /// Fired by the home station; harmless against armored targets
    StationBeam,
}

/// A projectile in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub pos: Vec2,
    /// Position at the start of the last advance, for swept hit tests
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub damage: f32,
    pub radius: f32,
    pub faction: Faction,
    pub kind: ProjectileKind,
    /// Seconds of flight remaining
    pub ttl: f32,
    pub alive: bool,
}

impl Projectile {
    pub fn new(pos: Vec2, vel: Vec2, damage: f32, faction: Faction, kind: ProjectileKind) -> Self {
        let (radius, ttl) = match kind {
            ProjectileKind::Bolt => (BOLT_RADIUS, BOLT_TTL),
            ProjectileKind::Missile => (BOLT_RADIUS * 2.0, MISSILE_TTL),
            ProjectileKind::StationBeam => (BOLT_RADIUS, BEAM_TTL),
        };
        Self {
            pos,
            prev_pos: pos,
            vel,
            damage,
            radius,
            faction,
            kind,
            ttl,
            alive: true,
        }
    }

    /// A straight bolt travelling along `dir`
    pub fn bolt(pos: Vec2, dir: Vec2, faction: Faction, damage: f32) -> Self {
        let dir = dir.normalize_or(Vec2::X);
        Self::new(pos, dir * BOLT_SPEED, damage, faction, ProjectileKind::Bolt)
    }

    /// An enemy homing missile launched along `dir`
    pub fn missile(pos: Vec2, dir: Vec2, damage: f32) -> Self {
        let dir = dir.normalize_or(Vec2::X);
        Self::new(
            pos,
            dir * MISSILE_SPEED,
            damage,
            Faction::Enemy,
            ProjectileKind::Missile,
        )
    }

    /// A station beam shot
    pub fn station_beam(pos: Vec2, dir: Vec2) -> Self {
        let dir = dir.normalize_or(Vec2::X);
        Self::new(
            pos,
            dir * BEAM_SPEED,
            STATION_BEAM_DAMAGE,
            Faction::Player,
            ProjectileKind::StationBeam,
        )
    }

    /// Move one step; homing kinds steer toward `homing_target` if given
    ///
    /// Running out of TTL does not deactivate the projectile here: the
    /// segment it just swept still gets hit tested, then `expire` retires it.
    pub fn advance(&mut self, dt: f32, homing_target: Option<Vec2>) {
        if !self.alive || self.is_spent() {
            return;
        }
        if self.kind == ProjectileKind::Missile {
            if let Some(target) = homing_target {
                self.turn_toward(target, MISSILE_TURN_RATE * dt);
            }
        }
        self.prev_pos = self.pos;
        self.pos += self.vel * dt;
        self.ttl -= dt;
    }

    pub fn is_spent(&self) -> bool {
        self.ttl <= 0.0
    }

    /// Deactivate a spent projectile with no other effect; true if this
    /// call retired it
    pub fn expire(&mut self) -> bool {
        self.alive && self.is_spent() && self.deactivate()
    }

    fn turn_toward(&mut self, target: Vec2, max_turn: f32) {
        let to_target = target - self.pos;
        let speed = self.vel.length();
        if to_target.length_squared() < GEOMETRY_EPSILON || speed < GEOMETRY_EPSILON {
            return;
        }
        let current = self.vel.y.atan2(self.vel.x);
        let desired = to_target.y.atan2(to_target.x);
        let turn = normalize_angle(desired - current).clamp(-max_turn, max_turn);
        self.vel = Vec2::from_angle(current + turn) * speed;
    }

    /// Mark the projectile spent; true only the first time
    pub fn deactivate(&mut self) -> bool {
        std::mem::replace(&mut self.alive, false)
    }
}
