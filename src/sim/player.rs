//! The narrow interface the simulation uses to touch the player

use std::collections::BTreeMap;

use glam::Vec2;

use super::material::Material;

/// What the simulation may read from and do to the player
///
/// The host owns the player (input, movement, UI); the simulation only
/// reads its kinematics and applies damage, healing, loot and XP.
pub trait PlayerHandle {
    fn position(&self) -> Vec2;
    fn velocity(&self) -> Vec2;
    fn radius(&self) -> f32;
    fn is_alive(&self) -> bool;
    /// Apply incoming damage; returns the hull damage actually taken
    fn damage(&mut self, amount: f32) -> f32;
    /// Restore hull; returns the amount actually restored
    fn heal(&mut self, amount: f32) -> f32;
    fn add_resource(&mut self, material: Material, amount: u32);
    fn gain_xp(&mut self, amount: u32);
}

/// Reference player implementation used by the headless host and tests
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    /// Absorbs damage before the hull
    pub shield: f32,
    pub max_shield: f32,
    pub resources: BTreeMap<Material, u32>,
    pub xp: u32,
    pub level: u32,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius: 14.0,
            hp: 100.0,
            max_hp: 100.0,
            shield: 50.0,
            max_shield: 50.0,
            resources: BTreeMap::new(),
            xp: 0,
            level: 1,
        }
    }
}

impl PlayerState {
    pub fn at(pos: Vec2) -> Self {
        Self {
            pos,
            ..Self::default()
        }
    }

    /// XP needed to go from `level` to `level + 1`
    pub fn xp_for_next(level: u32) -> u32 {
        100 * level.max(1)
    }

    pub fn resource(&self, material: Material) -> u32 {
        self.resources.get(&material).copied().unwrap_or(0)
    }

    /// Remove resources if the player has enough; false (and no change) otherwise
    pub fn spend(&mut self, material: Material, amount: u32) -> bool {
        match self.resources.get_mut(&material) {
            Some(have) if *have >= amount => {
                *have -= amount;
                true
            }
            _ => amount == 0,
        }
    }

    /// Recharge the shield at `rate` per second
    pub fn recharge_shield(&mut self, rate: f32, dt: f32) {
        self.shield = (self.shield + rate * dt).min(self.max_shield);
    }
}

impl PlayerHandle for PlayerState {
    fn position(&self) -> Vec2 {
        self.pos
    }

    fn velocity(&self) -> Vec2 {
        self.vel
    }

    fn radius(&self) -> f32 {
        self.radius
    }

    fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    fn damage(&mut self, amount: f32) -> f32 {
        if amount <= 0.0 {
            return 0.0;
        }
        let absorbed = amount.min(self.shield);
        self.shield -= absorbed;
        let hull = (amount - absorbed).min(self.hp);
        self.hp = (self.hp - hull).max(0.0);
        hull
    }

    fn heal(&mut self, amount: f32) -> f32 {
        let gain = amount.max(0.0).min(self.max_hp - self.hp);
        self.hp += gain;
        gain
    }

    fn add_resource(&mut self, material: Material, amount: u32) {
        *self.resources.entry(material).or_insert(0) += amount;
    }

    fn gain_xp(&mut self, amount: u32) {
        self.xp += amount;
        while self.xp >= Self::xp_for_next(self.level) {
            self.xp -= Self::xp_for_next(self.level);
            self.level += 1;
            log::debug!("Player reached level {}", self.level);
        }
    }
}
