use serde::{Deserialize, Serialize};
use tellus_blocks::BlockType;
use thiserror::Error;

use crate::noise::NoiseParams;

/// Deepest subsurface fill accepted under a surface block.
pub const MAX_FILL_DEPTH: u32 = 256;
/// Tallest tree trunk accepted.
pub const MAX_TRUNK_HEIGHT: u32 = 64;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfig {
    #[serde(default = "default_height_scale")]
    pub height_scale: f64,
    #[serde(default = "default_surface")]
    pub surface: BlockType,
    #[serde(default = "default_subsurface")]
    pub subsurface: BlockType,
    /// Extra blocks stacked under each surface block.
    #[serde(default)]
    pub fill_depth: u32,
    #[serde(default)]
    pub seed: i32,
    #[serde(default)]
    pub noise: NoiseSection,
    #[serde(default)]
    pub trees: Trees,
}

fn default_height_scale() -> f64 {
    5.0
}
fn default_surface() -> BlockType {
    BlockType::Grass
}
fn default_subsurface() -> BlockType {
    BlockType::Stone
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            height_scale: default_height_scale(),
            surface: default_surface(),
            subsurface: default_subsurface(),
            fill_depth: 0,
            seed: 0,
            noise: NoiseSection::default(),
            trees: Trees::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseSection {
    #[serde(default = "d_oct")]
    pub octaves: u32,
    #[serde(default = "d_pers")]
    pub persistence: f64,
    #[serde(default = "d_lac")]
    pub lacunarity: f64,
    #[serde(default = "d_freq")]
    pub frequency: f64,
}
fn d_oct() -> u32 {
    4
}
fn d_pers() -> f64 {
    0.5
}
fn d_lac() -> f64 {
    2.0
}
fn d_freq() -> f64 {
    0.1
}
impl Default for NoiseSection {
    fn default() -> Self {
        Self {
            octaves: d_oct(),
            persistence: d_pers(),
            lacunarity: d_lac(),
            frequency: d_freq(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trees {
    /// Chance per eligible column; 0 disables decoration.
    #[serde(default)]
    pub density: f64,
    #[serde(default = "default_trunk_height")]
    pub trunk_height: u32,
}
fn default_trunk_height() -> u32 {
    5
}
impl Default for Trees {
    fn default() -> Self {
        Self {
            density: 0.0,
            trunk_height: default_trunk_height(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TerrainConfigError {
    #[error("height_scale must be finite, got {0}")]
    HeightScale(f64),
    #[error("noise.{field} must be finite and positive, got {value}")]
    Noise { field: &'static str, value: f64 },
    #[error("trees.density must lie in 0..=1, got {0}")]
    TreeDensity(f64),
    #[error("fill_depth must be at most {MAX_FILL_DEPTH}, got {0}")]
    FillDepth(u32),
    #[error("trees.trunk_height must be at most {MAX_TRUNK_HEIGHT}, got {0}")]
    TrunkHeight(u32),
}

impl TerrainConfig {
    pub fn noise_params(&self) -> NoiseParams {
        NoiseParams {
            octaves: self.noise.octaves,
            persistence: self.noise.persistence,
            lacunarity: self.noise.lacunarity,
            frequency: self.noise.frequency,
            seed: self.seed,
        }
    }

    pub fn validate(&self) -> Result<(), TerrainConfigError> {
        if !self.height_scale.is_finite() {
            return Err(TerrainConfigError::HeightScale(self.height_scale));
        }
        for (field, value) in [
            ("persistence", self.noise.persistence),
            ("lacunarity", self.noise.lacunarity),
            ("frequency", self.noise.frequency),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TerrainConfigError::Noise { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.trees.density) {
            return Err(TerrainConfigError::TreeDensity(self.trees.density));
        }
        if self.fill_depth > MAX_FILL_DEPTH {
            return Err(TerrainConfigError::FillDepth(self.fill_depth));
        }
        if self.trees.trunk_height > MAX_TRUNK_HEIGHT {
            return Err(TerrainConfigError::TrunkHeight(self.trees.trunk_height));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_uses_defaults() {
        let cfg: TerrainConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, TerrainConfig::default());
        assert_eq!(cfg.noise_params(), NoiseParams::default());
    }

    #[test]
    fn partial_table_overrides() {
        let cfg: TerrainConfig = toml::from_str(
            r#"
            height_scale = 20.0
            surface = "gravel"
            [trees]
            density = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(cfg.height_scale, 20.0);
        assert_eq!(cfg.surface, BlockType::Gravel);
        assert_eq!(cfg.trees.trunk_height, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = TerrainConfig::default();
        cfg.trees.density = 1.5;
        assert_eq!(cfg.validate(), Err(TerrainConfigError::TreeDensity(1.5)));
        let mut cfg = TerrainConfig::default();
        cfg.noise.frequency = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(TerrainConfigError::Noise { field: "frequency", .. })
        ));
        let mut cfg = TerrainConfig::default();
        cfg.height_scale = f64::NAN;
        assert!(matches!(cfg.validate(), Err(TerrainConfigError::HeightScale(_))));
        let mut cfg = TerrainConfig::default();
        cfg.fill_depth = MAX_FILL_DEPTH + 1;
        assert_eq!(cfg.validate(), Err(TerrainConfigError::FillDepth(MAX_FILL_DEPTH + 1)));
        let mut cfg = TerrainConfig::default();
        cfg.trees.trunk_height = MAX_TRUNK_HEIGHT + 1;
        assert_eq!(
            cfg.validate(),
            Err(TerrainConfigError::TrunkHeight(MAX_TRUNK_HEIGHT + 1))
        );
    }
}
