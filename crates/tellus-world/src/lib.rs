//! Procedural terrain: coherent noise, heightmap sampling, chunk keys and
//! base-terrain synthesis.
#![forbid(unsafe_code)]

pub mod chunk_key;
pub mod height;
pub mod noise;
pub mod terrain;
pub mod worldgen;

pub use chunk_key::{ChunkKey, MAX_CHUNK_SIZE, lattice_range};
pub use height::{HeightSampler, MAX_HEIGHT};
pub use noise::{NoiseField, NoiseParams};
pub use terrain::{GeneratedTerrain, GenerationStats, Terrain, TerrainSource};
pub use worldgen::{
    MAX_FILL_DEPTH, MAX_TRUNK_HEIGHT, NoiseSection, TerrainConfig, TerrainConfigError, Trees,
};
