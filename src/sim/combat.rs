//! Projectile resolution and destruction side effects
//!
//! Each live projectile is tested against destructible grids, modular ships,
//! the station and the player; whatever its swept segment touches first is
//! struck. The strike deactivates the projectile (at most once) before any
//! damage is applied.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::collision::{segment_circle_entry_time, segment_closest_approach_to_circle};
use super::debris::Debris;
use super::enemy::{BehaviorState, EnemyClass};
use super::events::{BurstKind, EventSink, GameEvent, HitTarget, ParticleBurst, ParticleSink};
use super::grid::{DestructibleGrid, GridKind, StructureKind};
use super::material::Material;
use super::pickup::{Pickup, PickupKind};
use super::player::PlayerHandle;
use super::projectile::{Faction, Projectile, ProjectileKind};
use super::world::Arena;
use crate::consts::*;

/// Where side effects of destruction go
pub struct Effects<'a> {
    pub pickups: &'a mut Vec<Pickup>,
    pub debris: &'a mut Vec<Debris>,
    /// Ambient stream for loot rolls; never used by chunk generation
    pub rng: &'a mut Pcg32,
    pub particles: &'a mut dyn ParticleSink,
    pub events: &'a mut dyn EventSink,
    pub health_drop_chance: f32,
}

impl Effects<'_> {
    fn scatter(&mut self, speed: f32) -> Vec2 {
        let angle = self.rng.random_range(0.0..std::f32::consts::TAU);
        Vec2::from_angle(angle) * self.rng.random_range(speed * 0.3..speed)
    }

    fn burst(&mut self, pos: Vec2, vel: Vec2, kind: BurstKind, count: u32) {
        self.particles.burst(ParticleBurst {
            pos,
            vel,
            kind,
            count,
        });
    }

    fn spawn_resource(&mut self, pos: Vec2, material: Material, amount: u32) {
        let vel = self.scatter(60.0);
        self.pickups
            .push(Pickup::new(pos, vel, PickupKind::Resource { material, amount }));
    }

    fn maybe_drop_health(&mut self, pos: Vec2) {
        if self.rng.random::<f32>() < self.health_drop_chance {
            let vel = self.scatter(40.0);
            self.pickups
                .push(Pickup::new(pos, vel, PickupKind::Health(HEALTH_PICKUP_AMOUNT)));
        }
    }

    /// XP proportional to the destroyed target's max HP
    fn award_xp(&mut self, player: &mut dyn PlayerHandle, max_hp: f32) {
        let amount = (max_hp * XP_PER_HP).round() as u32;
        if amount > 0 {
            player.gain_xp(amount);
            self.events.emit(GameEvent::XpGained { amount });
        }
    }
}

/// Summary of one combat pass
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CombatOutcome {
    pub hits: usize,
    pub kills: usize,
    /// Where destroyed motherships release their drones
    pub swarm_origins: Vec<Vec2>,
}

/// Resolved target of a projectile this tick
#[derive(Debug, Clone, Copy, PartialEq)]
enum Strike {
    Grid { grid: usize, cell: usize },
    Placed { cell: usize },
    Enemy { enemy: usize, module: usize },
    Station,
    Player,
}

/// Kills and loot count as the player's only for shots the player fired
fn player_sourced(projectile: &Projectile) -> bool {
    projectile.faction == Faction::Player && projectile.kind != ProjectileKind::StationBeam
}

/// A candidate target and how far along the swept segment it is touched
type Candidate = (f32, Strike);

/// Keep whichever candidate is touched first; ties keep the earlier one
fn earliest(best: Option<Candidate>, next: Option<Candidate>) -> Option<Candidate> {
    match (best, next) {
        (Some(b), Some(n)) if n.0 < b.0 => Some(n),
        (None, n) => n,
        (b, _) => b,
    }
}

fn grid_candidate(projectile: &Projectile, grid: &DestructibleGrid) -> Option<(f32, usize)> {
    let (prev, pos, radius) = (projectile.prev_pos, projectile.pos, projectile.radius);
    let cell = grid.hit_test(prev, pos, radius)?;
    let t = grid.entry_time(cell, prev, pos, radius).unwrap_or(1.0);
    Some((t, cell))
}

fn find_grid_strike(projectile: &Projectile, arena: &Arena<'_>) -> Option<Candidate> {
    let mut best = None;
    for (i, grid) in arena.grids.iter().enumerate() {
        if grid.is_destroyed() {
            continue;
        }
        let next = grid_candidate(projectile, grid);
        best = earliest(best, next.map(|(t, cell)| (t, Strike::Grid { grid: i, cell })));
    }
    // Player shots pass through the player's own blocks
    if projectile.faction == Faction::Enemy {
        let next = grid_candidate(projectile, &*arena.placed);
        best = earliest(best, next.map(|(t, cell)| (t, Strike::Placed { cell })));
    }
    best
}

/// Entry time into a circle of `reach` around `center`, plus the closest
/// point of the segment to `center`
fn circle_candidate(projectile: &Projectile, center: Vec2, reach: f32) -> Option<(f32, Vec2)> {
    let (prev, pos) = (projectile.prev_pos, projectile.pos);
    let approach = segment_closest_approach_to_circle(prev, pos, center);
    if approach.distance_sq > reach * reach {
        return None;
    }
    let t = segment_circle_entry_time(prev, pos, center, reach).unwrap_or(approach.t);
    Some((t, approach.point))
}

fn find_ship_strike(projectile: &Projectile, arena: &Arena<'_>) -> Option<Candidate> {
    match projectile.faction {
        Faction::Player => {
            let mut best = None;
            for (i, enemy) in arena.enemies.iter().enumerate() {
                if !enemy.is_alive() {
                    continue;
                }
                let reach = enemy.radius() + projectile.radius;
                let Some((t, aim)) = circle_candidate(projectile, enemy.pos(), reach) else {
                    continue;
                };
                let Some(module) = enemy.ship.nearest_module(aim) else {
                    continue;
                };
                best = earliest(best, Some((t, Strike::Enemy { enemy: i, module })));
            }
            best
        }
        Faction::Enemy => {
            let mut best = None;
            if arena.station.is_alive() {
                let reach = arena.station.radius + projectile.radius;
                let next = circle_candidate(projectile, arena.station.pos, reach);
                best = earliest(best, next.map(|(t, _)| (t, Strike::Station)));
            }
            if arena.player.is_alive() {
                let reach = arena.player.radius() + projectile.radius;
                let next = circle_candidate(projectile, arena.player.position(), reach);
                best = earliest(best, next.map(|(t, _)| (t, Strike::Player)));
            }
            best
        }
    }
}

/// The first thing along the projectile's swept segment
///
/// Grids win ties with ships. Station beams only ever target ships.
fn find_strike(projectile: &Projectile, arena: &Arena<'_>) -> Option<Strike> {
    let grid = if projectile.kind == ProjectileKind::StationBeam {
        None
    } else {
        find_grid_strike(projectile, arena)
    };
    earliest(grid, find_ship_strike(projectile, arena)).map(|(_, strike)| strike)
}

/// Run the combat pass over every live projectile
///
/// Spent projectiles are left in place with `alive == false`; the caller
/// sweeps them out.
pub fn resolve_projectiles(
    projectiles: &mut [Projectile],
    arena: &mut Arena<'_>,
    fx: &mut Effects<'_>,
) -> CombatOutcome {
    let mut outcome = CombatOutcome::default();
    for projectile in projectiles.iter_mut().filter(|p| p.alive) {
        let Some(strike) = find_strike(projectile, arena) else {
            continue;
        };
        if !projectile.deactivate() {
            continue;
        }
        outcome.hits += 1;
        let shot = &*projectile;
        match strike {
            Strike::Grid { grid, cell } => {
                hit_grid(&mut *arena.grids[grid], cell, shot, &mut *arena.player, fx)
            }
            Strike::Placed { cell } => {
                hit_grid(&mut *arena.placed, cell, shot, &mut *arena.player, fx)
            }
            Strike::Enemy { enemy, module } => hit_enemy(arena, enemy, module, shot, fx, &mut outcome),
            Strike::Station => hit_station(arena, shot, fx),
            Strike::Player => {
                let taken = arena.player.damage(shot.damage);
                fx.events.emit(GameEvent::ProjectileHit {
                    pos: shot.pos,
                    target: HitTarget::Player,
                    damage: shot.damage,
                });
                fx.events.emit(GameEvent::PlayerDamaged { amount: taken });
                fx.burst(shot.pos, arena.player.velocity(), BurstKind::Sparks, 6);
            }
        }
    }
    if outcome.hits > 0 {
        log::trace!("Combat pass: {} hits, {} kills", outcome.hits, outcome.kills);
    }
    outcome
}

fn hit_grid(
    grid: &mut DestructibleGrid,
    cell: usize,
    shot: &Projectile,
    player: &mut dyn PlayerHandle,
    fx: &mut Effects<'_>,
) {
    let Some(material) = grid.cell(cell).map(|c| c.material) else {
        return;
    };
    let cell_pos = grid.cell_center(cell).unwrap_or(shot.pos);
    let result = grid.damage_cell(cell, shot.damage);
    fx.events.emit(GameEvent::ProjectileHit {
        pos: shot.pos,
        target: HitTarget::Grid(grid.kind),
        damage: result.applied,
    });
    fx.burst(shot.pos, grid.vel, BurstKind::Impact, 6);

    let by_player = player_sourced(shot);
    if result.cell_destroyed {
        fx.events.emit(GameEvent::CellDestroyed {
            pos: cell_pos,
            material,
        });
        fx.burst(cell_pos, grid.vel, BurstKind::Shatter(material), 12);
        let vel = grid.vel + fx.scatter(50.0);
        fx.debris.push(Debris::from_cell(cell_pos, vel, material));
        if by_player && material.drops_loot() {
            fx.spawn_resource(cell_pos, material, 1);
        }
    }

    if !result.grid_destroyed {
        return;
    }
    fx.events.emit(GameEvent::GridDestroyed {
        id: grid.id,
        kind: grid.kind,
        pos: cell_pos,
    });
    if by_player {
        fx.award_xp(player, grid.total_max_hp());
        fx.maybe_drop_health(cell_pos);
    }
    match grid.kind {
        GridKind::Structure(StructureKind::Derelict) if by_player => {
            let extra = fx.rng.random_range(2..=4);
            for _ in 0..extra {
                let material = Material::pick_ore(fx.rng, cell_pos.length());
                fx.spawn_resource(cell_pos, material, 2);
            }
        }
        GridKind::Structure(StructureKind::Trap) => detonate_trap(cell_pos, player, fx),
        _ => {}
    }
}

fn detonate_trap(pos: Vec2, player: &mut dyn PlayerHandle, fx: &mut Effects<'_>) {
    fx.events.emit(GameEvent::TrapDetonated { pos });
    fx.burst(pos, Vec2::ZERO, BurstKind::Explosion, 40);
    if !player.is_alive() {
        return;
    }
    let reach = TRAP_BLAST_RADIUS + player.radius();
    if (player.position() - pos).length_squared() <= reach * reach {
        let taken = player.damage(TRAP_BLAST_DAMAGE);
        fx.events.emit(GameEvent::PlayerDamaged { amount: taken });
    }
}

fn hit_enemy(
    arena: &mut Arena<'_>,
    index: usize,
    module: usize,
    shot: &Projectile,
    fx: &mut Effects<'_>,
    outcome: &mut CombatOutcome,
) {
    let enemy = &mut *arena.enemies[index];
    // Station beams cannot hurt ships that stay far enough out
    let armored = shot.kind == ProjectileKind::StationBeam && enemy.beyond_station_armor;
    let damage = if armored { 0.0 } else { shot.damage };

    let module_kind = enemy.ship.module(module).map(|m| m.kind);
    let module_pos = enemy.ship.module_world_pos(module).unwrap_or(shot.pos);
    let result = enemy.ship.damage_module(module, damage);
    fx.events.emit(GameEvent::ProjectileHit {
        pos: shot.pos,
        target: HitTarget::Enemy(enemy.class),
        damage: result.applied,
    });
    let burst = if armored { BurstKind::Sparks } else { BurstKind::Impact };
    fx.burst(shot.pos, enemy.ship.vel, burst, 6);

    if enemy.is_alive() && enemy.state() == BehaviorState::Patrol {
        enemy.alert();
        fx.events.emit(GameEvent::EnemyAlerted { pos: enemy.pos() });
    }

    if let (true, Some(kind)) = (result.module_destroyed, module_kind) {
        fx.events.emit(GameEvent::ModuleDestroyed {
            pos: module_pos,
            kind,
        });
        fx.burst(module_pos, enemy.ship.vel, BurstKind::Explosion, 10);
    }

    if !result.detached.is_empty() {
        log::debug!(
            "Enemy {} shed {} modules",
            enemy.id,
            result.detached.len()
        );
        fx.events.emit(GameEvent::ModulesDetached {
            pos: enemy.pos(),
            count: result.detached.len(),
        });
        for detached in result.detached {
            fx.debris.push(Debris::from_module(
                detached,
                enemy.ship.pos,
                enemy.ship.vel,
                enemy.ship.heading,
            ));
        }
    }

    if !result.core_destroyed {
        return;
    }
    let by_player = player_sourced(shot);
    let pos = enemy.pos();
    let class = enemy.class;
    let max_hp = enemy.ship.aggregate_max_hp();
    outcome.kills += 1;
    log::debug!("Enemy {} ({:?}) destroyed at {:?}", enemy.id, class, pos);
    fx.events.emit(GameEvent::EnemyKilled {
        class,
        pos,
        by_player,
    });
    fx.burst(pos, enemy.ship.vel, BurstKind::Explosion, 30);

    if by_player {
        fx.award_xp(&mut *arena.player, max_hp);
        let material = Material::pick_ore(fx.rng, pos.length());
        fx.spawn_resource(pos, material, 1 + (max_hp / 150.0) as u32);
        fx.maybe_drop_health(pos);
    }
    if class == EnemyClass::Mothership {
        outcome.swarm_origins.push(pos);
    }
}

fn hit_station(arena: &mut Arena<'_>, shot: &Projectile, fx: &mut Effects<'_>) {
    let station = &mut *arena.station;
    let result = station.damage(shot.damage);
    fx.events.emit(GameEvent::ProjectileHit {
        pos: shot.pos,
        target: HitTarget::Station,
        damage: result.applied,
    });
    fx.events.emit(GameEvent::StationDamaged {
        amount: result.applied,
        hp: station.hp,
    });
    fx.burst(shot.pos, Vec2::ZERO, BurstKind::Impact, 6);
    if result.destroyed {
        log::info!("Station destroyed");
        fx.events.emit(GameEvent::StationDestroyed);
        fx.burst(station.pos, Vec2::ZERO, BurstKind::Explosion, 60);
    }
}
