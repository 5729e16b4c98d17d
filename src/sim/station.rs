//! Home station at the world origin

use glam::Vec2;

use super::projectile::Projectile;
use crate::consts::*;

/// Result of damaging the station
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationDamage {
    pub applied: f32,
    /// This hit took the station from alive to destroyed
    pub destroyed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub pos: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    beam_enabled: bool,
    beam_timer: f32,
}

impl Station {
    pub fn new(beam_enabled: bool) -> Self {
        Self {
            pos: Vec2::ZERO,
            radius: STATION_RADIUS,
            hp: STATION_MAX_HP,
            max_hp: STATION_MAX_HP,
            beam_enabled,
            beam_timer: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn hp_ratio(&self) -> f32 {
        self.hp / self.max_hp
    }

    /// Back to full health with a cold beam
    pub fn reset(&mut self) {
        self.hp = self.max_hp;
        self.beam_timer = 0.0;
    }

    pub fn damage(&mut self, amount: f32) -> StationDamage {
        if !self.is_alive() || amount <= 0.0 {
            return StationDamage {
                applied: 0.0,
                destroyed: false,
            };
        }
        let applied = amount.min(self.hp);
        self.hp = (self.hp - amount).max(0.0);
        StationDamage {
            applied,
            destroyed: self.hp <= 0.0,
        }
    }

    /// Does a moving point of radius `radius` pass through the hull?
    pub fn intersects(&self, point: Vec2, radius: f32) -> bool {
        let reach = self.radius + radius;
        (point - self.pos).length_squared() <= reach * reach
    }

    /// Tick the beam turret; fires at the nearest enemy in range
    ///
    /// Returns true if a beam was fired.
    pub fn update(
        &mut self,
        dt: f32,
        enemies: impl Iterator<Item = Vec2>,
        shots: &mut Vec<Projectile>,
    ) -> bool {
        self.beam_timer = (self.beam_timer - dt).max(0.0);
        if !self.beam_enabled || !self.is_alive() || self.beam_timer > 0.0 {
            return false;
        }
        let range_sq = STATION_BEAM_RANGE * STATION_BEAM_RANGE;
        let nearest = enemies
            .map(|pos| (pos, (pos - self.pos).length_squared()))
            .filter(|&(_, d)| d <= range_sq)
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let Some((target, _)) = nearest else {
            return false;
        };
        let dir = (target - self.pos).normalize_or(Vec2::X);
        shots.push(Projectile::station_beam(self.pos + dir * self.radius, dir));
        self.beam_timer = STATION_BEAM_COOLDOWN;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::projectile::ProjectileKind;

    #[test]
    fn test_beam_targets_nearest_in_range() {
        let mut station = Station::new(true);
        let mut shots = Vec::new();
        let enemies = [Vec2::new(900.0, 0.0), Vec2::new(0.0, -400.0), Vec2::new(5_000.0, 0.0)];
        assert!(station.update(0.05, enemies.into_iter(), &mut shots));
        assert_eq!(shots.len(), 1);
        assert_eq!(shots[0].kind, ProjectileKind::StationBeam);
        assert!(shots[0].vel.y < 0.0 && shots[0].vel.x.abs() < 1e-3);

        // Cooling down
        assert!(!station.update(0.05, enemies.into_iter(), &mut shots));
        assert_eq!(shots.len(), 1);
    }

    #[test]
    fn test_no_target_out_of_range() {
        let mut station = Station::new(true);
        let mut shots = Vec::new();
        assert!(!station.update(0.05, [Vec2::new(STATION_BEAM_RANGE + 1.0, 0.0)].into_iter(), &mut shots));
        assert!(shots.is_empty());
    }

    #[test]
    fn test_destruction_reported_once() {
        let mut station = Station::new(false);
        assert!(!station.damage(STATION_MAX_HP - 1.0).destroyed);
        let hit = station.damage(50.0);
        assert!(hit.destroyed);
        assert_eq!(hit.applied, 1.0);
        assert_eq!(station.hp, 0.0);
        assert!(!station.damage(50.0).destroyed);
        station.reset();
        assert!(station.is_alive());
    }
}
