//! Body-vs-body resolution for one tick
//!
//! Runs after behaviours have moved everything and before combat. Pairs
//! are brute-forced over the active set only; the chunk window is the only
//! broad phase.

use glam::Vec2;

use super::collision::{Body, Rect, circle_vs_rect, resolve_circle_collision, separate_along};
use super::enemy::{BehaviorState, Enemy, EnemyClass};
use super::events::{BurstKind, EventSink, GameEvent, ParticleBurst, ParticleSink};
use super::grid::{DestructibleGrid, GridKind};
use super::world::Arena;
use crate::clamp_speed;
use crate::consts::*;

/// Contact counts for one pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsReport {
    pub grid_contacts: usize,
    pub ship_contacts: usize,
    pub rams: usize,
}

/// Only asteroids get pushed around; structures and placed blocks are anchored
fn grid_mass(grid: &DestructibleGrid) -> f32 {
    match grid.kind {
        GridKind::Asteroid => grid.mass(),
        GridKind::Structure(_) | GridKind::Placed => f32::INFINITY,
    }
}

fn ship_body(enemy: &Enemy) -> Body {
    // Turrets are bolted in place
    let mass = if enemy.class.is_stationary() {
        f32::INFINITY
    } else {
        enemy.ship.mass()
    };
    Body::new(enemy.ship.pos, enemy.ship.vel, enemy.radius(), mass)
}

fn write_back_ship(enemy: &mut Enemy, body: &Body) {
    enemy.ship.pos = body.pos;
    enemy.ship.vel = body.vel;
}

/// Asteroid vs asteroid, using bounding circles
fn resolve_grid_pairs(grids: &mut [&mut DestructibleGrid]) -> usize {
    let mut contacts = 0;
    for j in 1..grids.len() {
        let (left, right) = grids.split_at_mut(j);
        let b = &mut *right[0];
        for a in left.iter_mut() {
            if a.is_destroyed() || b.is_destroyed() {
                continue;
            }
            let (mass_a, mass_b) = (grid_mass(a), grid_mass(b));
            if !mass_a.is_finite() && !mass_b.is_finite() {
                continue;
            }
            let (center_a, radius_a) = a.bounding_circle();
            let (center_b, radius_b) = b.bounding_circle();
            let mut body_a = Body::new(center_a, a.vel, radius_a, mass_a);
            let mut body_b = Body::new(center_b, b.vel, radius_b, mass_b);
            if resolve_circle_collision(&mut body_a, &mut body_b) {
                a.pos += body_a.pos - center_a;
                a.vel = clamp_speed(body_a.vel, ASTEROID_MAX_SPEED);
                b.pos += body_b.pos - center_b;
                b.vel = clamp_speed(body_b.vel, ASTEROID_MAX_SPEED);
                contacts += 1;
            }
        }
    }
    contacts
}

/// Where a ship circle overlaps a cell
#[derive(Debug, Clone, Copy, PartialEq)]
struct CellContact {
    point: Vec2,
    /// Unit vector from the ship toward the cell
    normal: Vec2,
    penetration: f32,
}

fn cell_contact(rect: &Rect, center: Vec2, radius: f32) -> Option<CellContact> {
    let point = rect.closest_point(center);
    let delta = point - center;
    let dist_sq = delta.length_squared();
    if dist_sq > radius * radius {
        return None;
    }
    let dist = dist_sq.sqrt();
    if dist >= GEOMETRY_EPSILON {
        return Some(CellContact {
            point,
            normal: delta / dist,
            penetration: radius - dist,
        });
    }
    // Centre inside the cell: leave through the nearest face
    let faces = [
        (center.x - rect.min.x, Vec2::X),
        (rect.max.x - center.x, Vec2::NEG_X),
        (center.y - rect.min.y, Vec2::Y),
        (rect.max.y - center.y, Vec2::NEG_Y),
    ];
    let (depth, normal) = faces
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))?;
    Some(CellContact {
        point: center - normal * depth,
        normal,
        penetration: depth + radius,
    })
}

/// Deepest contact between a ship circle and a grid's live cells
///
/// The coarse bounding circle only gates the per-cell confirmation.
fn ship_grid_contact(grid: &DestructibleGrid, center: Vec2, radius: f32) -> Option<CellContact> {
    let (grid_center, grid_radius) = grid.bounding_circle();
    let reach = grid_radius + radius;
    if (center - grid_center).length_squared() > reach * reach {
        return None;
    }
    let mut best: Option<CellContact> = None;
    for (idx, _) in grid.live_cells() {
        let Some(rect) = grid.cell_rect(idx) else {
            continue;
        };
        if !circle_vs_rect(center, radius, &rect) {
            continue;
        }
        let Some(contact) = cell_contact(&rect, center, radius) else {
            continue;
        };
        if best.is_none_or(|b| contact.penetration > b.penetration) {
            best = Some(contact);
        }
    }
    best
}

fn resolve_ship_vs_grid(enemy: &mut Enemy, grid: &mut DestructibleGrid) -> bool {
    if grid.is_destroyed() {
        return false;
    }
    let Some(contact) = ship_grid_contact(grid, enemy.pos(), enemy.radius()) else {
        return false;
    };
    let mut ship = ship_body(enemy);
    // The touched cell acts as a zero-radius body at the contact point
    let mut cell = Body::new(contact.point, grid.vel, 0.0, grid_mass(grid));
    if !separate_along(&mut ship, &mut cell, contact.normal, contact.penetration) {
        return false;
    }
    write_back_ship(enemy, &ship);
    if grid.kind == GridKind::Asteroid {
        grid.pos += cell.pos - contact.point;
        grid.vel = clamp_speed(cell.vel, ASTEROID_MAX_SPEED);
    }
    true
}

fn resolve_ship_pairs(enemies: &mut [&mut Enemy]) -> usize {
    let mut contacts = 0;
    for j in 1..enemies.len() {
        let (left, right) = enemies.split_at_mut(j);
        let b = &mut *right[0];
        for a in left.iter_mut() {
            if !a.is_alive() || !b.is_alive() {
                continue;
            }
            let mut body_a = ship_body(a);
            let mut body_b = ship_body(b);
            if resolve_circle_collision(&mut body_a, &mut body_b) {
                write_back_ship(a, &body_a);
                write_back_ship(b, &body_b);
                contacts += 1;
            }
        }
    }
    contacts
}

/// Charging rammers that touch the player or the station deal contact damage
fn resolve_rams(
    arena: &mut Arena<'_>,
    particles: &mut dyn ParticleSink,
    events: &mut dyn EventSink,
) -> usize {
    let mut rams = 0;
    for enemy in arena.enemies.iter_mut() {
        if enemy.class != EnemyClass::Rammer
            || !enemy.is_alive()
            || enemy.state() != BehaviorState::Attack
        {
            continue;
        }
        let pos = enemy.pos();
        let radius = enemy.radius();

        let player = &mut *arena.player;
        let reach = radius + player.radius();
        if player.is_alive() && (player.position() - pos).length_squared() <= reach * reach {
            let taken = player.damage(RAM_DAMAGE);
            events.emit(GameEvent::PlayerDamaged { amount: taken });
            particles.burst(ParticleBurst {
                pos: (pos + player.position()) * 0.5,
                vel: enemy.ship.vel,
                kind: BurstKind::Sparks,
                count: 12,
            });
            enemy.on_ram_contact();
            rams += 1;
            continue;
        }

        let station = &mut *arena.station;
        if station.is_alive() && station.intersects(pos, radius) {
            let result = station.damage(RAM_DAMAGE);
            events.emit(GameEvent::StationDamaged {
                amount: result.applied,
                hp: station.hp,
            });
            if result.destroyed {
                log::info!("Station destroyed by ramming");
                events.emit(GameEvent::StationDestroyed);
            }
            enemy.on_ram_contact();
            rams += 1;
        }
    }
    rams
}

/// Resolve every body-vs-body overlap in the active set
pub fn resolve_bodies(
    arena: &mut Arena<'_>,
    particles: &mut dyn ParticleSink,
    events: &mut dyn EventSink,
) -> PhysicsReport {
    let mut report = PhysicsReport {
        grid_contacts: resolve_grid_pairs(&mut arena.grids),
        ..PhysicsReport::default()
    };

    for enemy in arena.enemies.iter_mut() {
        if !enemy.is_alive() {
            continue;
        }
        for grid in arena.grids.iter_mut() {
            if resolve_ship_vs_grid(enemy, grid) {
                report.grid_contacts += 1;
            }
        }
        if resolve_ship_vs_grid(enemy, arena.placed) {
            report.grid_contacts += 1;
        }
    }

    report.ship_contacts = resolve_ship_pairs(&mut arena.enemies);
    report.rams = resolve_rams(arena, particles, events);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::events::NullSink;
    use crate::sim::grid::Cell;
    use crate::sim::material::Material;
    use crate::sim::player::PlayerState;
    use crate::sim::station::Station;

    fn square_rock(id: u64, min: Vec2) -> DestructibleGrid {
        let mut grid = DestructibleGrid::new(id, GridKind::Asteroid, min, CELL_SIZE);
        for col in 0..2 {
            for row in 0..2 {
                grid.push_cell(Cell::new(col, row, Material::Rock, 30.0));
            }
        }
        grid
    }

    struct Fixture {
        grids: Vec<DestructibleGrid>,
        placed: DestructibleGrid,
        enemies: Vec<Enemy>,
        station: Station,
        player: PlayerState,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                grids: Vec::new(),
                placed: DestructibleGrid::new(0, GridKind::Placed, Vec2::ZERO, PLACE_GRID),
                enemies: Vec::new(),
                station: Station::new(false),
                player: PlayerState::at(Vec2::new(10_000.0, 10_000.0)),
            }
        }

        fn run(&mut self) -> PhysicsReport {
            let mut arena = Arena {
                grids: self.grids.iter_mut().collect(),
                placed: &mut self.placed,
                enemies: self.enemies.iter_mut().collect(),
                station: &mut self.station,
                player: &mut self.player,
            };
            resolve_bodies(&mut arena, &mut NullSink, &mut NullSink)
        }
    }

    #[test]
    fn test_overlapping_asteroids_separate() {
        let mut fx = Fixture::new();
        fx.grids.push(square_rock(1, Vec2::new(1_000.0, 0.0)));
        fx.grids.push(square_rock(2, Vec2::new(1_030.0, 0.0)));
        fx.grids[0].vel = Vec2::new(10.0, 0.0);
        fx.grids[1].vel = Vec2::new(-10.0, 0.0);
        let report = fx.run();
        assert_eq!(report.grid_contacts, 1);
        assert!(fx.grids[0].pos.x < 1_000.0);
        assert!(fx.grids[1].pos.x > 1_030.0);
        assert!(fx.grids[1].vel.x - fx.grids[0].vel.x >= 0.0);
    }

    #[test]
    fn test_ship_pushed_out_of_cell() {
        let mut fx = Fixture::new();
        fx.grids.push(square_rock(1, Vec2::new(2_000.0, 0.0)));
        let mut enemy = Enemy::new(5, EnemyClass::Fighter, Vec2::ZERO, 0.0, 1.0, 1).unwrap();
        // Left edge of the rock sits at x = 2000
        enemy.ship.pos = Vec2::new(2_000.0 - enemy.radius() + 5.0, CELL_SIZE);
        enemy.ship.vel = Vec2::new(50.0, 0.0);
        fx.enemies.push(enemy);
        let report = fx.run();
        assert_eq!(report.grid_contacts, 1);
        // Both bodies gave way; the ship now just touches the rock's face
        let enemy = &fx.enemies[0];
        let rock = &fx.grids[0];
        assert!(enemy.pos().x < 2_000.0 - enemy.radius() + 5.0);
        assert!(rock.pos.x - enemy.pos().x >= enemy.radius() - 1e-3);
        assert!(rock.vel.x - enemy.ship.vel.x >= 0.0);
    }

    #[test]
    fn test_embedded_ship_leaves_through_nearest_face() {
        let mut fx = Fixture::new();
        let mut wall = DestructibleGrid::new(1, GridKind::Placed, Vec2::new(4_000.0, 0.0), PLACE_GRID);
        wall.insert_cell(0, 0, Material::Iron, PLACED_BLOCK_HP);
        fx.grids.push(wall);
        let mut enemy = Enemy::new(8, EnemyClass::Drone, Vec2::ZERO, 0.0, 1.0, 8).unwrap();
        // Centre inside the block, nearer its right face
        enemy.ship.pos = Vec2::new(4_000.0 + PLACE_GRID * 0.75, PLACE_GRID * 0.5);
        enemy.ship.vel = Vec2::new(-40.0, 0.0);
        fx.enemies.push(enemy);

        assert_eq!(fx.run().grid_contacts, 1);
        let enemy = &fx.enemies[0];
        let block = fx.grids[0].cell_rect(0).unwrap();
        assert!(enemy.pos().x >= block.max.x + enemy.radius() - 1e-3);
        assert!(!circle_vs_rect(enemy.pos(), enemy.radius() - 1e-2, &block));
        assert!(enemy.ship.vel.x >= 0.0);
        assert_eq!(fx.grids[0].pos, Vec2::new(4_000.0, 0.0));
    }

    #[test]
    fn test_near_miss_on_bounding_circle_is_not_contact() {
        let mut fx = Fixture::new();
        // L-shaped rock: the bounding circle covers the empty corner
        let mut grid = DestructibleGrid::new(1, GridKind::Asteroid, Vec2::new(3_000.0, 0.0), CELL_SIZE);
        for (c, r) in [(0, 0), (1, 0), (2, 0), (0, 1), (0, 2)] {
            grid.push_cell(Cell::new(c, r, Material::Rock, 30.0));
        }
        fx.grids.push(grid);
        let mut enemy = Enemy::new(6, EnemyClass::Drone, Vec2::ZERO, 0.0, 1.0, 1).unwrap();
        enemy.ship.pos = Vec2::new(3_000.0 + CELL_SIZE * 2.5, CELL_SIZE * 2.5);
        fx.enemies.push(enemy);
        assert_eq!(fx.run().grid_contacts, 0);
    }

    #[test]
    fn test_ships_separate() {
        let mut fx = Fixture::new();
        fx.enemies
            .push(Enemy::new(1, EnemyClass::Fighter, Vec2::new(500.0, 0.0), 0.0, 1.0, 1).unwrap());
        fx.enemies
            .push(Enemy::new(2, EnemyClass::Fighter, Vec2::new(520.0, 0.0), 0.0, 1.0, 2).unwrap());
        let report = fx.run();
        assert_eq!(report.ship_contacts, 1);
        let gap = fx.enemies[1].pos().x - fx.enemies[0].pos().x;
        assert!(gap >= fx.enemies[0].radius() + fx.enemies[1].radius() - 1e-3);
    }

    #[test]
    fn test_charging_rammer_hurts_player() {
        let mut fx = Fixture::new();
        fx.player.pos = Vec2::new(5_000.0, 0.0);
        fx.player.shield = 0.0;
        let mut rammer = Enemy::new(7, EnemyClass::Rammer, Vec2::new(4_900.0, 0.0), 0.0, 1.0, 7).unwrap();
        rammer.update_state(0.05, Some(fx.player.pos));
        rammer.update_state(0.05, Some(fx.player.pos));
        assert_eq!(rammer.state(), BehaviorState::Attack);
        rammer.ship.pos = Vec2::new(4_960.0, 0.0);
        fx.enemies.push(rammer);

        assert_eq!(fx.run().rams, 1);
        assert_eq!(fx.player.hp, 100.0 - RAM_DAMAGE);
        assert_eq!(fx.enemies[0].state(), BehaviorState::Recoil);
        // Recoiling rammers do no further damage
        assert_eq!(fx.run().rams, 0);
    }
}
