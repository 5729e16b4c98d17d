//! Starwake headless host
//!
//! Drives the simulation without a window: a scripted pilot flies outward
//! from the station, shoots at the nearest enemy and logs what happened.
//! Used for smoke runs and profiling.
//!
//! Usage: `starwake [config.json] [ticks]`

use glam::Vec2;

use starwake::SimConfig;
use starwake::consts::*;
use starwake::sim::{
    Faction, GameEvent, Material, ParticleBuffer, PlayerHandle, PlayerState, Projectile, World,
};

const DEFAULT_TICKS: u64 = 20 * 60 * 3;
const PILOT_SPEED: f32 = 220.0;
const PILOT_FIRE_INTERVAL: u64 = 6;
const PILOT_SHIELD_RECHARGE: f32 = 5.0;

/// Running totals for the end-of-run summary
#[derive(Debug, Default)]
struct RunSummary {
    hits: usize,
    kills: usize,
    cells_destroyed: usize,
    pickups: usize,
    swarms: usize,
    deaths: usize,
    particles_dropped: usize,
}

impl RunSummary {
    fn record(&mut self, event: &GameEvent) {
        match event {
            GameEvent::CellDestroyed { .. } => self.cells_destroyed += 1,
            GameEvent::PickupCollected { .. } => self.pickups += 1,
            GameEvent::DroneSwarmLaunched { .. } => self.swarms += 1,
            GameEvent::StationDestroyed => log::warn!("Station destroyed"),
            _ => {}
        }
    }
}

/// Outward spiral around the origin, picking up speed over the first `ramp_secs`
fn pilot_velocity(pos: Vec2, t: f32) -> Vec2 {
    let ramp_secs = 40.0;
    let radial = pos.normalize_or(Vec2::from_angle(t));
    let tangent = radial.perp();
    (radial * 0.35 + tangent).normalize_or(Vec2::X) * PILOT_SPEED * (1.0 + t / ramp_secs).min(2.0)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starwake (headless) starting...");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimConfig::load_or_default(path),
        None => SimConfig::default(),
    };
    let ticks = args
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_TICKS);

    let dt = config.max_step;
    let mut particles = ParticleBuffer::for_quality(config.quality);
    let mut world = World::new(config);
    let mut player = PlayerState::at(Vec2::new(0.0, STATION_RADIUS * 2.0));
    let mut projectiles: Vec<Projectile> = Vec::new();
    let mut events: Vec<GameEvent> = Vec::new();
    let mut summary = RunSummary::default();

    // A small wall beside the station
    for k in 0..4 {
        let at = Vec2::new(STATION_RADIUS + 60.0, (k as f32 - 2.0) * PLACE_GRID);
        world.place_block(at, Material::Iron);
    }

    for tick in 0..ticks {
        let t = tick as f32 * dt;
        player.vel = pilot_velocity(player.pos, t);
        player.pos += player.vel * dt;
        player.recharge_shield(PILOT_SHIELD_RECHARGE, dt);

        if tick % PILOT_FIRE_INTERVAL == 0 {
            let nearest = world
                .enemies()
                .map(|e| e.pos())
                .min_by(|a, b| {
                    a.distance_squared(player.pos)
                        .total_cmp(&b.distance_squared(player.pos))
                });
            if let Some(target) = nearest {
                let dir = target - player.pos;
                projectiles.push(Projectile::bolt(
                    player.pos + dir.normalize_or(Vec2::X) * (player.radius + 4.0),
                    dir,
                    Faction::Player,
                    12.0,
                ));
            }
        }

        let stats = world.update(
            dt,
            player.pos,
            &mut player,
            &mut projectiles,
            &mut particles,
            &mut events,
        );
        summary.hits += stats.hits;
        summary.kills += stats.kills;
        for event in events.drain(..) {
            summary.record(&event);
        }
        summary.particles_dropped += particles.dropped();
        let bursts = particles.drain().count();
        log::trace!("Tick {}: {} particle bursts", tick, bursts);

        if !player.is_alive() {
            summary.deaths += 1;
            log::info!("Pilot destroyed at tick {} ({:?}); starting a new run", tick, player.pos);
            world.reset_for_new_run();
            projectiles.clear();
            player = PlayerState::at(Vec2::new(0.0, STATION_RADIUS * 2.0));
        }

        if tick % 600 == 0 {
            log::info!(
                "t={:.0}s pos=({:.0}, {:.0}) chunks={} enemies={} projectiles={}",
                t,
                player.pos.x,
                player.pos.y,
                stats.active_chunks,
                stats.enemies,
                stats.projectiles
            );
        }
    }

    log::info!(
        "Run finished after {} ticks: {} hits, {} kills, {} cells, {} pickups, {} swarms, {} deaths",
        ticks,
        summary.hits,
        summary.kills,
        summary.cells_destroyed,
        summary.pickups,
        summary.swarms,
        summary.deaths
    );
    log::info!(
        "Player level {} with {:?}; {} chunks cached, {} particle bursts dropped",
        player.level,
        player.resources,
        world.store().len(),
        summary.particles_dropped
    );
}
