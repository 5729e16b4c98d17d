//! Runtime simulation configuration
//!
//! Loaded from JSON by the host. Every field has a default taken from
//! [`crate::consts`], so a file only needs the keys it wants to override.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{SimError, SimResult};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum particle bursts buffered per tick for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 32,
            QualityPreset::Medium => 128,
            QualityPreset::High => 512,
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Process-wide seed mixed into every chunk's generation stream
    pub world_seed: u64,
    /// Square radius (in chunks) of the active region
    pub active_radius: i32,
    /// Longest step a single update integrates
    pub max_step: f32,
    /// Particle quality preset
    pub quality: QualityPreset,
    /// Chance that a player kill also drops a health pickup
    pub health_drop_chance: f32,
    /// Whether the home station's beam turret fires
    pub station_beam: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_seed: DEFAULT_WORLD_SEED,
            active_radius: ACTIVE_RADIUS,
            max_step: MAX_STEP,
            quality: QualityPreset::Medium,
            health_drop_chance: 0.08,
            station_beam: true,
        }
    }
}

impl SimConfig {
    /// Create a config with a specific world seed
    pub fn with_seed(world_seed: u64) -> Self {
        Self {
            world_seed,
            ..Self::default()
        }
    }

    /// Parse a config from JSON text
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| SimError::ConfigParse {
            message: e.to_string(),
        })?;
        Ok(config.sanitized())
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SimError::ConfigIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded sim config from {}", path.display());
        Ok(config)
    }

    /// Load a config file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{}; using default sim config", e);
                Self::default()
            }
        }
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> SimResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SimError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Pull out-of-range values back into something the simulation can run with
    fn sanitized(mut self) -> Self {
        self.active_radius = self.active_radius.clamp(0, 8);
        if !(self.max_step > 0.0) {
            self.max_step = MAX_STEP;
        }
        self.max_step = self.max_step.min(MAX_STEP);
        self.health_drop_chance = self.health_drop_chance.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SimConfig::from_json_str(r#"{ "world_seed": 42 }"#).unwrap();
        assert_eq!(config.world_seed, 42);
        assert_eq!(config.active_radius, ACTIVE_RADIUS);
        assert_eq!(config.quality, QualityPreset::Medium);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let err = SimConfig::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse { .. }));
    }

    #[test]
    fn test_max_step_never_exceeds_cap() {
        let config = SimConfig::from_json_str(r#"{ "max_step": 0.5 }"#).unwrap();
        assert!(config.max_step <= MAX_STEP);
        let config = SimConfig::from_json_str(r#"{ "max_step": -1.0 }"#).unwrap();
        assert_eq!(config.max_step, MAX_STEP);
    }

    #[test]
    fn test_round_trip_json() {
        let config = SimConfig::with_seed(7);
        let text = config.to_json().unwrap();
        assert_eq!(SimConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = SimConfig::load_or_default("/definitely/not/here.json");
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!(QualityPreset::parse("HIGH"), Some(QualityPreset::High));
        assert_eq!(QualityPreset::parse("med"), Some(QualityPreset::Medium));
        assert_eq!(QualityPreset::parse("ultra"), None);
        assert!(QualityPreset::Low.max_particles() < QualityPreset::High.max_particles());
    }
}
