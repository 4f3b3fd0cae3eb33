//! tellus: chunk streaming and terrain synthesis for a voxel world.
//!
//! The [`World`] aggregate ties the pieces together: procedural terrain
//! from `tellus-world`, the persistent edit overlay from `tellus-edit`,
//! resident chunks managed by [`ChunkManager`] and save files from
//! `tellus-io`. Everything visible goes out through a [`BlockSink`].
#![forbid(unsafe_code)]

pub mod config;
pub mod pick;
pub mod removal;
pub mod sink;
pub mod streaming;
pub mod world;

pub use config::{Config, ConfigError};
pub use pick::PickTarget;
pub use removal::{RemovalState, Removals};
pub use sink::{BlockSink, NullSink, RecordingSink};
pub use streaming::{ChunkManager, EditRejection, StreamingMode, StreamingReport};
pub use world::{TickReport, World, WorldError};

pub use tellus_blocks::BlockType;
pub use tellus_chunk::{BlockHandle, ChunkState};
pub use tellus_edit::{EditOp, EditRecord, EditStore};
pub use tellus_geom::{BlockPos, Face, Vec3};
pub use tellus_io::{ObserverState, PersistError};
pub use tellus_world::{ChunkKey, Terrain, TerrainConfig};
