//! Block materials and distance-gated rarity
//!
//! Materials closer to the origin are common; farther ones are rare, but any
//! material past its distance threshold always has a non-zero chance.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Material of a destructible cell (and the resource it yields)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Material {
    Rock,
    Ice,
    Iron,
    Copper,
    Gold,
    Crystal,
    Voidstone,
}

/// Ores that can appear inside asteroids, in ascending distance order
pub const ORES: [Material; 5] = [
    Material::Iron,
    Material::Copper,
    Material::Gold,
    Material::Crystal,
    Material::Voidstone,
];

impl Material {
    /// Minimum world distance from the origin before this material spawns
    pub fn min_distance(&self) -> f32 {
        match self {
            Material::Rock | Material::Ice | Material::Iron => 0.0,
            Material::Copper => 3_000.0,
            Material::Gold => 6_000.0,
            Material::Crystal => 10_000.0,
            Material::Voidstone => 16_000.0,
        }
    }

    /// Relative rarity; selection weight is the inverse
    pub fn rarity(&self) -> f32 {
        match self {
            Material::Rock => 1.0,
            Material::Ice => 2.0,
            Material::Iron => 3.0,
            Material::Copper => 5.0,
            Material::Gold => 12.0,
            Material::Crystal => 25.0,
            Material::Voidstone => 60.0,
        }
    }

    /// Hit points of a freshly generated cell of this material
    pub fn cell_hp(&self) -> f32 {
        match self {
            Material::Ice => 20.0,
            Material::Rock => 30.0,
            Material::Iron => 45.0,
            Material::Copper => 50.0,
            Material::Gold => 60.0,
            Material::Crystal => 80.0,
            Material::Voidstone => 120.0,
        }
    }

    /// Whether destroying a cell of this material drops a resource pickup
    pub fn drops_loot(&self) -> bool {
        !matches!(self, Material::Rock | Material::Ice)
    }

    pub fn is_eligible_at(&self, distance: f32) -> bool {
        distance >= self.min_distance()
    }

    /// Pick an ore for a cell at `distance` from the origin
    ///
    /// Weighted by inverse rarity over every ore whose threshold has been
    /// passed. Iron has no threshold, so there is always a candidate.
    pub fn pick_ore<R: Rng + ?Sized>(rng: &mut R, distance: f32) -> Material {
        let total: f32 = ORES
            .iter()
            .filter(|m| m.is_eligible_at(distance))
            .map(|m| 1.0 / m.rarity())
            .sum();
        let mut roll = rng.random::<f32>() * total;
        let mut picked = Material::Iron;
        for ore in ORES.iter().filter(|m| m.is_eligible_at(distance)) {
            picked = *ore;
            roll -= 1.0 / ore.rarity();
            if roll <= 0.0 {
                break;
            }
        }
        picked
    }

    /// Pick the filler material for an asteroid body
    pub fn pick_filler<R: Rng + ?Sized>(rng: &mut R) -> Material {
        if rng.random::<f32>() < 1.0 / (1.0 + Material::Ice.rarity() / Material::Rock.rarity()) {
            Material::Ice
        } else {
            Material::Rock
        }
    }
}
