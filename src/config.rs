//! `tellus.toml`: world, terrain, streaming, save and removal settings.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tellus_world::{MAX_CHUNK_SIZE, TerrainConfig};
use thiserror::Error;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldSection,
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub streaming: StreamingSection,
    #[serde(default)]
    pub save: SaveSection,
    #[serde(default)]
    pub removal: RemovalSection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldSection {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    /// Chebyshev load radius in chunks.
    #[serde(default = "default_radius")]
    pub radius: i32,
}

fn default_chunk_size() -> u32 {
    16
}
fn default_radius() -> i32 {
    1
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            radius: default_radius(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamingSection {
    #[serde(default)]
    pub background: bool,
    /// 0 = one worker per available core.
    #[serde(default)]
    pub workers: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveSection {
    #[serde(default = "default_save_path")]
    pub path: PathBuf,
    /// Ticks between autosaves of a dirty world; 0 disables autosave.
    #[serde(default = "default_autosave_ticks")]
    pub autosave_ticks: u64,
}

fn default_save_path() -> PathBuf {
    PathBuf::from("saves/world.json")
}
fn default_autosave_ticks() -> u64 {
    600
}

impl Default for SaveSection {
    fn default() -> Self {
        Self {
            path: default_save_path(),
            autosave_ticks: default_autosave_ticks(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemovalSection {
    #[serde(default = "default_removal_secs")]
    pub duration_secs: f32,
}

fn default_removal_secs() -> f32 {
    0.25
}

impl Default for RemovalSection {
    fn default() -> Self {
        Self {
            duration_secs: default_removal_secs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Config, toml::de::Error> {
        toml::from_str(s)
    }

    /// Read and validate `path`. A missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::warn!("config {} not found; using defaults", path.display());
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let cfg = Config::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        log::info!("loaded config from {}", path.display());
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CHUNK_SIZE).contains(&self.world.chunk_size) {
            return Err(ConfigError::Invalid(format!(
                "world.chunk_size must lie in 1..={MAX_CHUNK_SIZE}, got {}",
                self.world.chunk_size
            )));
        }
        if self.world.radius < 0 {
            return Err(ConfigError::Invalid(format!(
                "world.radius must not be negative, got {}",
                self.world.radius
            )));
        }
        if !self.removal.duration_secs.is_finite() || self.removal.duration_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "removal.duration_secs must be finite and non-negative, got {}",
                self.removal.duration_secs
            )));
        }
        self.terrain
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("terrain: {e}")))
    }
}
