//! Modular ships: a rigid local grid of HP-bearing modules around one core
//!
//! Modules live in a flat arena indexed by slot. Connectivity is computed
//! over `(col, row)` keys, so a module moved out into debris never aliases
//! anything still attached.

use std::collections::{HashMap, VecDeque};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{SimError, SimResult};
use crate::rotate_local;

/// Weapon mounted on a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponKind {
    Cannon,
    Missile,
    Beam,
}

/// What a module is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleKind {
    /// Destroying this kills the ship
    Core,
    Hull,
    Thruster,
    Weapon(WeaponKind),
}

impl ModuleKind {
    pub fn base_hp(&self) -> f32 {
        match self {
            ModuleKind::Core => 80.0,
            ModuleKind::Hull => 50.0,
            ModuleKind::Thruster => 30.0,
            ModuleKind::Weapon(_) => 35.0,
        }
    }
}

/// Attachment state of a module slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleState {
    Live,
    Destroyed,
    /// Split off into debris; no longer part of the ship
    Detached,
}

/// One cell of a modular ship
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub col: i32,
    pub row: i32,
    pub kind: ModuleKind,
    pub hp: f32,
    pub max_hp: f32,
    pub state: ModuleState,
}

impl Module {
    #[inline]
    pub fn is_live(&self) -> bool {
        self.state == ModuleState::Live
    }

    #[inline]
    pub fn is_core(&self) -> bool {
        self.kind == ModuleKind::Core
    }
}

/// Static ship layout: `(col, row, kind)`, core at `(0, 0)`, +col is forward
pub type Blueprint = &'static [(i32, i32, ModuleKind)];

/// A module that has left its ship
#[derive(Debug, Clone, PartialEq)]
pub struct DetachedModule {
    pub module: Module,
    pub world_pos: Vec2,
}

/// Outcome of damaging one module
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShipDamage {
    pub applied: f32,
    pub module_destroyed: bool,
    pub core_destroyed: bool,
    /// Modules split off by this hit (all of them when the core died)
    pub detached: Vec<DetachedModule>,
}

/// A ship made of modules sharing one world transform
#[derive(Debug, Clone, PartialEq)]
pub struct ModularShip {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Radians; local +x points along this heading
    pub heading: f32,
    pub alive: bool,
    modules: Vec<Module>,
    index: HashMap<(i32, i32), usize>,
    core: usize,
    max_hp: f32,
    thrusters: usize,
}

impl ModularShip {
    /// Build a ship from a blueprint, scaling every module's HP by `hp_scale`
    pub fn new(pos: Vec2, heading: f32, blueprint: Blueprint, hp_scale: f32) -> SimResult<Self> {
        let mut modules = Vec::with_capacity(blueprint.len());
        let mut index = HashMap::with_capacity(blueprint.len());
        let mut core = None;

        for &(col, row, kind) in blueprint {
            if index.insert((col, row), modules.len()).is_some() {
                return Err(SimError::InvalidBlueprint {
                    reason: format!("duplicate module at ({}, {})", col, row),
                });
            }
            if kind == ModuleKind::Core {
                if core.is_some() {
                    return Err(SimError::InvalidBlueprint {
                        reason: "more than one core module".to_string(),
                    });
                }
                if (col, row) != (0, 0) {
                    return Err(SimError::InvalidBlueprint {
                        reason: format!("core at ({}, {}) instead of the origin", col, row),
                    });
                }
                core = Some(modules.len());
            }
            let hp = kind.base_hp() * hp_scale.max(0.1);
            modules.push(Module {
                col,
                row,
                kind,
                hp,
                max_hp: hp,
                state: ModuleState::Live,
            });
        }

        let core = core.ok_or_else(|| SimError::InvalidBlueprint {
            reason: "no core module".to_string(),
        })?;
        let max_hp = modules.iter().map(|m| m.max_hp).sum();
        let thrusters = modules
            .iter()
            .filter(|m| m.kind == ModuleKind::Thruster)
            .count();

        Ok(Self {
            pos,
            vel: Vec2::ZERO,
            heading,
            alive: true,
            modules,
            index,
            core,
            max_hp,
            thrusters,
        })
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, idx: usize) -> Option<&Module> {
        self.modules.get(idx)
    }

    pub fn core_index(&self) -> usize {
        self.core
    }

    pub fn live_modules(&self) -> impl Iterator<Item = (usize, &Module)> {
        self.modules.iter().enumerate().filter(|(_, m)| m.is_live())
    }

    pub fn live_count(&self) -> usize {
        self.live_modules().count()
    }

    #[inline]
    pub fn forward(&self) -> Vec2 {
        Vec2::from_angle(self.heading)
    }

    pub fn local_to_world(&self, local: Vec2) -> Vec2 {
        self.pos + rotate_local(local, self.heading)
    }

    pub fn world_to_local(&self, world: Vec2) -> Vec2 {
        rotate_local(world - self.pos, -self.heading)
    }

    fn local_offset(module: &Module) -> Vec2 {
        Vec2::new(module.col as f32, module.row as f32) * MODULE_SIZE
    }

    pub fn module_world_pos(&self, idx: usize) -> Option<Vec2> {
        self.modules
            .get(idx)
            .map(|m| self.local_to_world(Self::local_offset(m)))
    }

    /// Live module closest to a world point, measured in rotated local space
    ///
    /// There is no distance cutoff: any point resolves to some live module.
    pub fn nearest_module(&self, world_point: Vec2) -> Option<usize> {
        let local = self.world_to_local(world_point);
        let mut best: Option<(f32, usize)> = None;
        for (idx, module) in self.live_modules() {
            let d = (Self::local_offset(module) - local).length_squared();
            if best.is_none_or(|(best_d, _)| d < best_d) {
                best = Some((d, idx));
            }
        }
        best.map(|(_, idx)| idx)
    }

    /// Radius around `pos` enclosing every live module
    pub fn bounding_radius(&self) -> f32 {
        let half_diag = (MODULE_SIZE * 0.5) * std::f32::consts::SQRT_2;
        let max_sq = self
            .live_modules()
            .map(|(_, m)| Self::local_offset(m).length_squared())
            .fold(0.0_f32, f32::max);
        max_sq.sqrt() + half_diag
    }

    /// Sum of current HP over live modules
    pub fn aggregate_hp(&self) -> f32 {
        self.live_modules().map(|(_, m)| m.hp).sum()
    }

    /// Sum of max HP over every module the ship was built with
    pub fn aggregate_max_hp(&self) -> f32 {
        self.max_hp
    }

    pub fn hp_ratio(&self) -> f32 {
        if self.max_hp <= 0.0 {
            0.0
        } else {
            self.aggregate_hp() / self.max_hp
        }
    }

    pub fn mass(&self) -> f32 {
        self.live_count().max(1) as f32 * MODULE_MASS
    }

    /// Fraction of full thrust available given surviving thrusters
    pub fn thrust_factor(&self) -> f32 {
        if self.thrusters == 0 {
            return 1.0;
        }
        let live = self
            .live_modules()
            .filter(|(_, m)| m.kind == ModuleKind::Thruster)
            .count();
        0.4 + 0.6 * live as f32 / self.thrusters as f32
    }

    /// Surviving weapons with their world positions
    pub fn live_weapons(&self) -> Vec<(WeaponKind, Vec2)> {
        self.live_modules()
            .filter_map(|(_, m)| match m.kind {
                ModuleKind::Weapon(kind) => Some((kind, self.local_to_world(Self::local_offset(m)))),
                _ => None,
            })
            .collect()
    }

    /// Restore up to `amount` HP across live modules without lifting the
    /// aggregate above `cap_total`. Returns the HP actually restored.
    pub fn heal_toward(&mut self, amount: f32, cap_total: f32) -> f32 {
        let mut budget = amount.min(cap_total - self.aggregate_hp()).max(0.0);
        let mut healed = 0.0;
        for module in self.modules.iter_mut().filter(|m| m.is_live()) {
            if budget <= 0.0 {
                break;
            }
            let gain = (module.max_hp - module.hp).min(budget).max(0.0);
            module.hp += gain;
            budget -= gain;
            healed += gain;
        }
        healed
    }

    /// Damage one module and detach anything that loses its path to the core
    pub fn damage_module(&mut self, idx: usize, amount: f32) -> ShipDamage {
        let mut outcome = ShipDamage::default();
        if !self.alive || amount <= 0.0 {
            return outcome;
        }
        let Some(module) = self.modules.get_mut(idx) else {
            return outcome;
        };
        if !module.is_live() {
            return outcome;
        }

        outcome.applied = amount.min(module.hp);
        module.hp = (module.hp - amount).max(0.0);
        if module.hp > 0.0 {
            return outcome;
        }
        module.state = ModuleState::Destroyed;
        outcome.module_destroyed = true;

        if idx == self.core {
            outcome.core_destroyed = true;
            self.alive = false;
            let remaining: Vec<usize> = self.live_modules().map(|(i, _)| i).collect();
            outcome.detached = remaining.into_iter().filter_map(|i| self.detach(i)).collect();
        } else {
            let orphans = self.disconnected_modules();
            outcome.detached = orphans.into_iter().filter_map(|i| self.detach(i)).collect();
        }
        outcome
    }

    /// Live modules with no 4-connected path of live modules to the core
    pub fn disconnected_modules(&self) -> Vec<usize> {
        let mut reached = vec![false; self.modules.len()];
        let mut queue = VecDeque::new();
        if self.modules[self.core].is_live() {
            reached[self.core] = true;
            queue.push_back(self.core);
        }
        while let Some(i) = queue.pop_front() {
            let (col, row) = (self.modules[i].col, self.modules[i].row);
            for key in [(col + 1, row), (col - 1, row), (col, row + 1), (col, row - 1)] {
                if let Some(&n) = self.index.get(&key) {
                    if !reached[n] && self.modules[n].is_live() {
                        reached[n] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        self.live_modules()
            .map(|(i, _)| i)
            .filter(|&i| !reached[i])
            .collect()
    }

    fn detach(&mut self, idx: usize) -> Option<DetachedModule> {
        let world_pos = self.module_world_pos(idx)?;
        let module = self.modules.get_mut(idx)?;
        if !module.is_live() {
            return None;
        }
        module.state = ModuleState::Detached;
        Some(DetachedModule {
            module: module.clone(),
            world_pos,
        })
    }

    /// Integrate motion
    pub fn advance(&mut self, dt: f32) {
        self.pos += self.vel * dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: Blueprint = &[
        (0, 0, ModuleKind::Core),
        (1, 0, ModuleKind::Hull),
        (2, 0, ModuleKind::Hull),
        (3, 0, ModuleKind::Weapon(WeaponKind::Cannon)),
        (-1, 0, ModuleKind::Thruster),
    ];

    const RING: Blueprint = &[
        (0, 0, ModuleKind::Core),
        (1, 0, ModuleKind::Hull),
        (1, 1, ModuleKind::Hull),
        (0, 1, ModuleKind::Hull),
    ];

    fn slot(ship: &ModularShip, col: i32, row: i32) -> usize {
        ship.modules()
            .iter()
            .position(|m| m.col == col && m.row == row)
            .unwrap()
    }

    #[test]
    fn test_blueprint_validation() {
        const NO_CORE: Blueprint = &[(0, 0, ModuleKind::Hull)];
        const TWO_CORES: Blueprint = &[(0, 0, ModuleKind::Core), (1, 0, ModuleKind::Core)];
        const DUPLICATE: Blueprint = &[(0, 0, ModuleKind::Core), (0, 0, ModuleKind::Hull)];
        const OFFSET_CORE: Blueprint = &[(1, 0, ModuleKind::Core)];
        for bp in [NO_CORE, TWO_CORES, DUPLICATE, OFFSET_CORE] {
            assert!(matches!(
                ModularShip::new(Vec2::ZERO, 0.0, bp, 1.0),
                Err(SimError::InvalidBlueprint { .. })
            ));
        }
        assert!(ModularShip::new(Vec2::ZERO, 0.0, LINE, 1.0).is_ok());
    }

    #[test]
    fn test_core_kill_detaches_everything() {
        let mut ship = ModularShip::new(Vec2::new(100.0, 0.0), 0.5, LINE, 1.0).unwrap();
        let core = ship.core_index();
        let result = ship.damage_module(core, 1_000.0);
        assert!(result.core_destroyed);
        assert!(!ship.alive);
        assert_eq!(result.detached.len(), LINE.len() - 1);
        assert_eq!(ship.live_count(), 0);
        assert_eq!(ship.modules()[core].hp, 0.0);
    }

    #[test]
    fn test_disconnected_modules_detach() {
        let mut ship = ModularShip::new(Vec2::ZERO, 0.0, LINE, 1.0).unwrap();
        let neck = slot(&ship, 1, 0);
        let result = ship.damage_module(neck, 500.0);
        assert!(result.module_destroyed);
        assert!(!result.core_destroyed);
        let cols: Vec<i32> = result.detached.iter().map(|d| d.module.col).collect();
        assert_eq!(cols, vec![2, 3]);
        assert!(ship.alive);
        assert!(ship.disconnected_modules().is_empty());
        // Thruster behind the core is still attached
        assert!(ship.modules()[slot(&ship, -1, 0)].is_live());
        assert!(ship.live_weapons().is_empty());
    }

    #[test]
    fn test_ring_survives_single_break() {
        let mut ship = ModularShip::new(Vec2::ZERO, 0.0, RING, 1.0).unwrap();
        let result = ship.damage_module(slot(&ship, 1, 0), 500.0);
        assert!(result.detached.is_empty());
        assert_eq!(ship.live_count(), 3);
    }

    #[test]
    fn test_nearest_module_uses_local_space() {
        // Rotated a quarter turn: local +x now points along world +y
        let ship =
            ModularShip::new(Vec2::ZERO, std::f32::consts::FRAC_PI_2, LINE, 1.0).unwrap();
        let hit = ship.nearest_module(Vec2::new(0.0, 3.0 * MODULE_SIZE + 1.0)).unwrap();
        assert_eq!(ship.modules()[hit].col, 3);

        // Far away still resolves to something
        assert!(ship.nearest_module(Vec2::new(5_000.0, -5_000.0)).is_some());
    }

    #[test]
    fn test_heal_toward_respects_cap() {
        let mut ship = ModularShip::new(Vec2::ZERO, 0.0, RING, 1.0).unwrap();
        for idx in 0..ship.modules().len() {
            let hp = ship.modules()[idx].hp;
            ship.damage_module(idx, hp * 0.9);
        }
        let cap = ship.aggregate_max_hp() * 0.6;
        ship.heal_toward(10_000.0, cap);
        assert!(ship.aggregate_hp() <= cap + 1e-3);
        ship.heal_toward(10_000.0, cap);
        assert!(ship.aggregate_hp() <= cap + 1e-3);
    }

    #[test]
    fn test_thrust_factor_drops_with_thrusters() {
        let mut ship = ModularShip::new(Vec2::ZERO, 0.0, LINE, 1.0).unwrap();
        assert!((ship.thrust_factor() - 1.0).abs() < 1e-5);
        ship.damage_module(slot(&ship, -1, 0), 1_000.0);
        assert!((ship.thrust_factor() - 0.4).abs() < 1e-5);
    }
}
