//! The simulation instance and its per-tick update
//!
//! Order within a tick is fixed:
//! 1. Cap `dt`, refresh the active region, drop dead entities
//! 2. Behaviours (enemies, swarm, station), drift, projectile advance
//! 3. Body-vs-body physics
//! 4. Combat resolution, then projectiles out of TTL expire
//! 5. Pickup collection and cleanup

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::chunk::{Chunk, ChunkCoord};
use super::collision::{Obstacle, Rect};
use super::combat::{self, Effects};
use super::debris::Debris;
use super::draw::{MinimapBlip, MinimapCategory, OccluderQuad, SpriteInstance, SpriteKind};
use super::enemy::{Enemy, EnemyClass};
use super::events::{EventSink, GameEvent, ParticleSink};
use super::grid::{DestructibleGrid, GridKind};
use super::material::Material;
use super::physics;
use super::pickup::Pickup;
use super::player::PlayerHandle;
use super::projectile::{Faction, Projectile};
use super::region::{ActiveRegion, ChunkStore};
use super::station::Station;
use crate::config::SimConfig;
use crate::consts::*;
use crate::polar_to_cartesian;

/// Id of the player's placed-block grid
pub const PLACED_GRID_ID: u64 = u64::MAX;
/// Ids handed out at runtime start here, clear of chunk-derived ids
const DYNAMIC_ID_BASE: u64 = 1 << 60;

/// Mutable view of everything live during one tick
///
/// Built from the checked-out chunks plus world-owned entities so the
/// physics and combat passes can see across chunk borders.
pub struct Arena<'a> {
    /// Asteroids and structures of the active chunks
    pub grids: Vec<&'a mut DestructibleGrid>,
    pub placed: &'a mut DestructibleGrid,
    /// Chunk enemies followed by swarm drones
    pub enemies: Vec<&'a mut Enemy>,
    pub station: &'a mut Station,
    pub player: &'a mut dyn PlayerHandle,
}

impl<'a> Arena<'a> {
    pub fn gather(
        chunks: &'a mut [Chunk],
        placed: &'a mut DestructibleGrid,
        swarm: &'a mut [Enemy],
        station: &'a mut Station,
        player: &'a mut dyn PlayerHandle,
    ) -> Self {
        let mut grids = Vec::new();
        let mut enemies = Vec::new();
        for chunk in chunks {
            grids.extend(chunk.asteroids.iter_mut().chain(chunk.structures.iter_mut()));
            enemies.extend(chunk.enemies.iter_mut());
        }
        enemies.extend(swarm.iter_mut());
        Self {
            grids,
            placed,
            enemies,
            station,
            player,
        }
    }

    /// Obstacles for enemy steering
    ///
    /// Generated grids are compact, so each becomes one bounding circle.
    /// Placed blocks can be scattered anywhere and become one circle each.
    pub fn obstacles(&self) -> Vec<Obstacle> {
        let mut obstacles: Vec<Obstacle> = self
            .grids
            .iter()
            .filter(|g| !g.is_destroyed())
            .map(|g| {
                let (center, radius) = g.bounding_circle();
                Obstacle { center, radius }
            })
            .collect();
        obstacles.extend(placed_obstacles(&*self.placed));
        obstacles
    }
}

/// One circumscribed circle per live placed cell
fn placed_obstacles(placed: &DestructibleGrid) -> impl Iterator<Item = Obstacle> + '_ {
    let radius = placed.cell_size * 0.5 * std::f32::consts::SQRT_2;
    placed
        .live_cells()
        .filter_map(move |(idx, _)| placed.cell_center(idx))
        .map(move |center| Obstacle { center, radius })
}

/// What happened during one `update`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    pub active_chunks: usize,
    pub enemies: usize,
    pub projectiles: usize,
    pub hits: usize,
    pub kills: usize,
    pub contacts: usize,
}

/// Nearest thing an enemy could hunt
fn pick_target(from: Vec2, player: Option<Vec2>, station: Option<Vec2>) -> Option<Vec2> {
    match (player, station) {
        (Some(p), Some(s)) => {
            if (p - from).length_squared() <= (s - from).length_squared() {
                Some(p)
            } else {
                Some(s)
            }
        }
        (p, s) => p.or(s),
    }
}

/// One simulation run
pub struct World {
    config: SimConfig,
    store: ChunkStore,
    region: ActiveRegion,
    placed: DestructibleGrid,
    station: Station,
    /// Drones released by dead motherships while they stay in the active
    /// region; strays are handed to the chunk under them
    swarm: Vec<Enemy>,
    pickups: Vec<Pickup>,
    debris: Vec<Debris>,
    /// Ambient randomness for loot and swarms; chunk generation never sees it
    rng: Pcg32,
    /// Events raised outside `update`, delivered on the next tick
    pending: Vec<GameEvent>,
    next_id: u64,
    ticks: u64,
}

impl World {
    pub fn new(config: SimConfig) -> Self {
        log::info!(
            "Starting world with seed {:#x}, active radius {}",
            config.world_seed,
            config.active_radius
        );
        Self {
            store: ChunkStore::new(config.world_seed),
            region: ActiveRegion::new(config.active_radius),
            placed: DestructibleGrid::new(PLACED_GRID_ID, GridKind::Placed, Vec2::ZERO, PLACE_GRID),
            station: Station::new(config.station_beam),
            swarm: Vec::new(),
            pickups: Vec::new(),
            debris: Vec::new(),
            rng: Pcg32::seed_from_u64(config.world_seed),
            pending: Vec::new(),
            next_id: DYNAMIC_ID_BASE,
            ticks: 0,
            config,
        }
    }

    /// Advance the simulation by `dt` seconds (capped at `max_step`)
    ///
    /// `projectiles` is shared with the host: the host appends player
    /// shots, the world appends enemy and station shots and removes spent
    /// ones.
    pub fn update(
        &mut self,
        dt: f32,
        reference_point: Vec2,
        player: &mut dyn PlayerHandle,
        projectiles: &mut Vec<Projectile>,
        particles: &mut dyn ParticleSink,
        events: &mut dyn EventSink,
    ) -> TickStats {
        let Self {
            config,
            store,
            region,
            placed,
            station,
            swarm,
            pickups,
            debris,
            rng,
            pending,
            next_id,
            ticks,
        } = self;

        let dt = if dt.is_finite() {
            dt.clamp(0.0, config.max_step)
        } else {
            0.0
        };
        *ticks += 1;
        for event in pending.drain(..) {
            events.emit(event);
        }

        let coords = region.active_chunks(reference_point, store).to_vec();
        stow_stray_drones(swarm, &coords, store);
        let mut chunks = store.checkout(&coords);
        for chunk in chunks.iter_mut() {
            chunk.remove_dead();
        }
        swarm.retain(|e| e.is_alive());
        projectiles.retain(|p| p.alive);

        let player_pos = player.is_alive().then(|| player.position());
        let station_pos = station.is_alive().then_some(station.pos);
        let mut stats = TickStats {
            active_chunks: chunks.len(),
            ..TickStats::default()
        };

        let outcome = {
            let mut arena = Arena::gather(&mut chunks, placed, swarm, station, player);

            // Behaviours
            let obstacles = arena.obstacles();
            let mut shots = Vec::new();
            let armor_sq = STATION_ARMOR_DISTANCE * STATION_ARMOR_DISTANCE;
            for enemy in arena.enemies.iter_mut() {
                let target = pick_target(enemy.pos(), player_pos, station_pos);
                enemy.update(dt, target, &obstacles, &mut shots);
                enemy.beyond_station_armor =
                    (enemy.pos() - arena.station.pos).length_squared() > armor_sq;
            }
            arena.station.update(
                dt,
                arena.enemies.iter().filter(|e| e.is_alive()).map(|e| e.pos()),
                &mut shots,
            );

            for grid in arena.grids.iter_mut() {
                grid.advance(dt);
            }
            for piece in debris.iter_mut() {
                piece.update(dt);
            }
            let magnet = arena.player.position();
            for pickup in pickups.iter_mut() {
                pickup.update(dt, magnet);
            }

            projectiles.extend(shots);
            for projectile in projectiles.iter_mut() {
                let homing = match projectile.faction {
                    Faction::Enemy => player_pos,
                    Faction::Player => None,
                };
                projectile.advance(dt, homing);
            }

            let contacts = physics::resolve_bodies(&mut arena, particles, events);
            stats.contacts = contacts.grid_contacts + contacts.ship_contacts + contacts.rams;

            let outcome = {
                let mut fx = Effects {
                    pickups,
                    debris,
                    rng,
                    particles,
                    events,
                    health_drop_chance: config.health_drop_chance,
                };
                combat::resolve_projectiles(projectiles, &mut arena, &mut fx)
            };
            for projectile in projectiles.iter_mut() {
                projectile.expire();
            }

            // Pickup collection
            if arena.player.is_alive() {
                let at = arena.player.position();
                let reach = arena.player.radius();
                let player = &mut *arena.player;
                pickups.retain(|pickup| {
                    if pickup.touches(at, reach) {
                        pickup.apply_to(player);
                        events.emit(GameEvent::PickupCollected { kind: pickup.kind });
                        false
                    } else {
                        true
                    }
                });
            }
            outcome
        };

        for &origin in &outcome.swarm_origins {
            launch_swarm(origin, swarm, rng, next_id, events);
        }

        // Cleanup
        for chunk in chunks.iter_mut() {
            chunk.remove_dead();
        }
        swarm.retain(|e| e.is_alive());
        pickups.retain(|p| !p.is_expired());
        debris.retain(|d| !d.is_expired());
        projectiles.retain(|p| p.alive);

        stats.enemies =
            chunks.iter().map(|c| c.enemies.len()).sum::<usize>() + swarm.len();
        stats.projectiles = projectiles.len();
        stats.hits = outcome.hits;
        stats.kills = outcome.kills;
        store.restore(chunks);
        stow_stray_drones(swarm, &coords, store);

        log::trace!(
            "Tick {}: {} chunks, {} enemies, {} projectiles, {} hits",
            ticks,
            stats.active_chunks,
            stats.enemies,
            stats.projectiles,
            stats.hits
        );
        stats
    }

    /// Place a player block on the snap grid; false if the slot is taken
    pub fn place_block(&mut self, world_pos: Vec2, material: Material) -> bool {
        let (col, row) = self.placed.key_at(world_pos);
        if !self.placed.insert_cell(col, row, material, PLACED_BLOCK_HP) {
            return false;
        }
        log::debug!("Placed {:?} block at ({}, {})", material, col, row);
        self.pending
            .push(GameEvent::BlockPlaced { col, row, material });
        true
    }

    /// Throw away every chunk and transient entity and restore the station
    ///
    /// Calling it twice in a row is the same as calling it once. Projectiles
    /// and the player belong to the host and are not touched.
    pub fn reset_for_new_run(&mut self) {
        log::info!("Resetting world for a new run ({} chunks dropped)", self.store.len());
        self.store.clear();
        self.region.invalidate();
        self.placed = DestructibleGrid::new(PLACED_GRID_ID, GridKind::Placed, Vec2::ZERO, PLACE_GRID);
        self.station.reset();
        self.swarm.clear();
        self.pickups.clear();
        self.debris.clear();
        self.pending.clear();
        self.rng = Pcg32::seed_from_u64(self.config.world_seed);
        self.next_id = DYNAMIC_ID_BASE;
        self.ticks = 0;
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn station(&self) -> &Station {
        &self.station
    }

    pub fn placed_blocks(&self) -> &DestructibleGrid {
        &self.placed
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    pub fn debris(&self) -> &[Debris] {
        &self.debris
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Coordinates simulated by the last update
    pub fn active_coords(&self) -> &[ChunkCoord] {
        self.region.coords()
    }

    fn active_chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.region.coords().iter().filter_map(move |&c| self.store.get(c))
    }

    /// Live enemies in the active region plus the drone swarm
    pub fn enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.active_chunks()
            .flat_map(|c| c.enemies.iter())
            .chain(self.swarm.iter())
            .filter(|e| e.is_alive())
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies().count()
    }

    /// Live asteroids and structures in the active region, then placed blocks
    pub fn grids(&self) -> impl Iterator<Item = &DestructibleGrid> {
        self.active_chunks()
            .flat_map(|c| c.asteroids.iter().chain(c.structures.iter()))
            .chain(std::iter::once(&self.placed))
            .filter(|g| !g.is_destroyed())
    }

    /// Sprites overlapping `view`
    pub fn visible_sprites(&self, view: &Rect) -> Vec<SpriteInstance> {
        let mut sprites = Vec::new();
        let mut push = |kind, pos: Vec2, rotation, size: f32, health| {
            if view.expanded(size).contains(pos) {
                sprites.push(SpriteInstance {
                    kind,
                    pos,
                    rotation,
                    size,
                    health,
                });
            }
        };

        for grid in self.grids() {
            for (idx, cell) in grid.live_cells() {
                let Some(center) = grid.cell_center(idx) else {
                    continue;
                };
                let kind = match grid.kind {
                    GridKind::Asteroid => SpriteKind::AsteroidCell(cell.material),
                    GridKind::Structure(_) => SpriteKind::StructureCell(cell.material),
                    GridKind::Placed => SpriteKind::PlacedBlock(cell.material),
                };
                push(kind, center, 0.0, grid.cell_size, cell.hp / cell.max_hp);
            }
        }
        for enemy in self.enemies() {
            for (idx, module) in enemy.ship.live_modules() {
                if let Some(pos) = enemy.ship.module_world_pos(idx) {
                    push(
                        SpriteKind::Module(module.kind),
                        pos,
                        enemy.ship.heading,
                        MODULE_SIZE,
                        module.hp / module.max_hp,
                    );
                }
            }
        }
        if self.station.is_alive() {
            push(
                SpriteKind::Station,
                self.station.pos,
                0.0,
                self.station.radius * 2.0,
                self.station.hp_ratio(),
            );
        }
        for pickup in &self.pickups {
            push(SpriteKind::Pickup, pickup.pos, 0.0, PICKUP_RADIUS * 2.0, 1.0);
        }
        for piece in &self.debris {
            push(
                SpriteKind::Debris,
                piece.pos,
                piece.angle,
                piece.size,
                (piece.ttl / DEBRIS_TTL).clamp(0.0, 1.0),
            );
        }
        sprites
    }

    /// Category-tagged positions within `radius` of `center`
    pub fn minimap(&self, center: Vec2, radius: f32) -> Vec<MinimapBlip> {
        let radius_sq = radius * radius;
        let mut blips = Vec::new();
        let mut push = |category, pos: Vec2| {
            if (pos - center).length_squared() <= radius_sq {
                blips.push(MinimapBlip { category, pos });
            }
        };
        for grid in self.grids() {
            match grid.kind {
                GridKind::Asteroid => push(MinimapCategory::Asteroid, grid.bounding_circle().0),
                GridKind::Structure(_) => {
                    push(MinimapCategory::Structure, grid.bounding_circle().0)
                }
                GridKind::Placed => {
                    for (idx, _) in grid.live_cells() {
                        if let Some(center) = grid.cell_center(idx) {
                            push(MinimapCategory::PlacedBlock, center);
                        }
                    }
                }
            }
        }
        for enemy in self.enemies() {
            push(MinimapCategory::Enemy, enemy.pos());
        }
        if self.station.is_alive() {
            push(MinimapCategory::Station, self.station.pos);
        }
        for pickup in &self.pickups {
            push(MinimapCategory::Pickup, pickup.pos);
        }
        blips
    }

    /// One quad per live cell overlapping `view`
    pub fn shadow_occluders(&self, view: &Rect) -> Vec<OccluderQuad> {
        self.grids()
            .flat_map(|grid| grid.live_cells().filter_map(move |(idx, _)| grid.cell_rect(idx)))
            .filter(|rect| rect.overlaps(view))
            .map(|rect| OccluderQuad::from_rect(&rect))
            .collect()
    }
}

/// Hand drones outside the active window to the chunk they are over
///
/// From then on they sleep and wake with that chunk like any generated
/// enemy.
fn stow_stray_drones(swarm: &mut Vec<Enemy>, active: &[ChunkCoord], store: &mut ChunkStore) {
    let (stray, kept): (Vec<Enemy>, Vec<Enemy>) = std::mem::take(swarm)
        .into_iter()
        .partition(|d| !active.contains(&ChunkCoord::from_world(d.pos())));
    *swarm = kept;
    for drone in stray {
        let coord = ChunkCoord::from_world(drone.pos());
        log::debug!("Drone {} left the active region; stowed in chunk {:?}", drone.id, coord);
        store.get_or_generate(coord).enemies.push(drone);
    }
}

/// Release a mothership's drones in a ring around where it died
fn launch_swarm(
    origin: Vec2,
    swarm: &mut Vec<Enemy>,
    rng: &mut Pcg32,
    next_id: &mut u64,
    events: &mut dyn EventSink,
) {
    let mut launched = 0;
    for k in 0..DRONE_SWARM_SIZE {
        let angle = std::f32::consts::TAU * k as f32 / DRONE_SWARM_SIZE as f32;
        let id = *next_id;
        *next_id += 1;
        let at = origin + polar_to_cartesian(60.0, angle);
        match Enemy::new(id, EnemyClass::Drone, at, angle, 1.0, rng.random()) {
            Ok(mut drone) => {
                drone.ship.vel = polar_to_cartesian(120.0, angle);
                drone.alert();
                swarm.push(drone);
                launched += 1;
            }
            Err(err) => log::warn!("Could not launch drone: {}", err),
        }
    }
    log::info!("Mothership released {} drones at {:?}", launched, origin);
    events.emit(GameEvent::DroneSwarmLaunched {
        pos: origin,
        count: launched,
    });
}
