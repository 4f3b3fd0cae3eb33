//! The world aggregate: terrain, resident chunks, the edit overlay, the
//! observer and pending removals, advanced one tick at a time.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tellus_blocks::BlockType;
use tellus_chunk::BlockHandle;
use tellus_edit::EditStore;
use tellus_geom::{BlockPos, Face};
use tellus_io::{ObserverState, PersistError};
use tellus_runtime::RuntimeError;
use tellus_world::Terrain;
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::pick::PickTarget;
use crate::removal::Removals;
use crate::sink::BlockSink;
use crate::streaming::{ChunkManager, EditRejection, StreamingMode, StreamingReport};

#[derive(Debug, Error)]
pub enum WorldError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub streaming: StreamingReport,
    /// Blocks whose timed removal completed this tick.
    pub removed: Vec<(BlockPos, BlockType)>,
    pub cancelled_removals: usize,
    pub autosaved: bool,
}

pub struct World {
    config: Config,
    terrain: Arc<Terrain>,
    chunks: ChunkManager,
    edits: EditStore,
    observer: ObserverState,
    removals: Removals,
    save_path: PathBuf,
    ticks: u64,
    ticks_since_save: u64,
}

impl World {
    pub fn new(config: Config) -> Result<Self, WorldError> {
        config.validate()?;
        let chunk_size = config.world.chunk_size;
        let terrain = Arc::new(Terrain::new(chunk_size, config.terrain.clone()));
        let mode = if config.streaming.background {
            StreamingMode::Background {
                workers: config.streaming.workers,
            }
        } else {
            StreamingMode::Inline
        };
        let chunks = ChunkManager::new(terrain.clone(), config.world.radius, mode)?;
        log::info!(
            "world: chunk_size={} radius={} mode={:?} save={}",
            chunk_size,
            config.world.radius,
            mode,
            config.save.path.display()
        );
        Ok(Self {
            edits: EditStore::new(chunk_size),
            observer: ObserverState::default(),
            removals: Removals::new(config.removal.duration_secs),
            save_path: config.save.path.clone(),
            terrain,
            chunks,
            config,
            ticks: 0,
            ticks_since_save: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn terrain(&self) -> &Arc<Terrain> {
        &self.terrain
    }

    #[inline]
    pub fn chunks(&self) -> &ChunkManager {
        &self.chunks
    }

    #[inline]
    pub fn edits(&self) -> &EditStore {
        &self.edits
    }

    #[inline]
    pub fn observer(&self) -> &ObserverState {
        &self.observer
    }

    /// The host moves the observer through this.
    #[inline]
    pub fn observer_mut(&mut self) -> &mut ObserverState {
        &mut self.observer
    }

    #[inline]
    pub fn removals(&self) -> &Removals {
        &self.removals
    }

    #[inline]
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// One step: stream around the observer, advance removals, then
    /// autosave if the overlay changed and the interval has passed.
    pub fn tick(&mut self, dt: f32, sink: &mut dyn BlockSink) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            streaming: self
                .chunks
                .update_streaming(&self.observer, &self.edits, sink),
            ..TickReport::default()
        };

        let chunks = &self.chunks;
        report.cancelled_removals = self
            .removals
            .retain_existing(|p| chunks.block_at(p).is_some());
        for pos in self.removals.tick(dt) {
            self.removals.finish(pos);
            match self.chunks.remove_block(pos, &mut self.edits, sink) {
                Ok(block_type) => {
                    log::info!(target: "removal", "removed {block_type} at {pos}");
                    report.removed.push((pos, block_type));
                }
                Err(e) => log::debug!(target: "removal", "removal at {pos} dropped: {e}"),
            }
        }
        for (pos, progress) in self.removals.in_progress() {
            if let Some(v) = self.chunks.voxel_at(pos) {
                sink.removal_progress(v.handle, progress);
            }
        }

        let every = self.config.save.autosave_ticks;
        if every > 0 {
            self.ticks_since_save += 1;
            if self.ticks_since_save >= every {
                self.ticks_since_save = 0;
                if self.edits.is_dirty() {
                    match self.save() {
                        Ok(()) => report.autosaved = true,
                        Err(e) => log::warn!(target: "io", "autosave failed: {e}"),
                    }
                }
            }
        }
        report
    }

    /// Wait for background generation to settle. No-op when inline.
    pub fn finish_streaming(&mut self, sink: &mut dyn BlockSink) -> StreamingReport {
        self.chunks.finish_pending(sink)
    }

    pub fn place_block(
        &mut self,
        pos: BlockPos,
        block_type: BlockType,
        sink: &mut dyn BlockSink,
    ) -> Result<BlockHandle, EditRejection> {
        let r = self.chunks.place_block(pos, block_type, &mut self.edits, sink);
        match &r {
            Ok(_) => log::info!(target: "edit", "placed {block_type} at {pos}"),
            Err(e) => log::debug!(target: "edit", "placement rejected: {e}"),
        }
        r
    }

    pub fn remove_block(
        &mut self,
        pos: BlockPos,
        sink: &mut dyn BlockSink,
    ) -> Result<BlockType, EditRejection> {
        let r = self.chunks.remove_block(pos, &mut self.edits, sink);
        match &r {
            Ok(b) => {
                self.removals.cancel(pos);
                log::info!(target: "edit", "removed {b} at {pos}");
            }
            Err(e) => log::debug!(target: "edit", "removal rejected: {e}"),
        }
        r
    }

    /// Place the selected inventory block against `face` of a picked voxel.
    pub fn place_against(
        &mut self,
        target: PickTarget,
        face: Face,
        sink: &mut dyn BlockSink,
    ) -> Result<BlockHandle, EditRejection> {
        let hit = target.voxel().ok_or(EditRejection::NotAVoxel)?;
        if self.chunks.block_at(hit).is_none() {
            return Err(EditRejection::RemovalOfNonexistentBlock(hit));
        }
        let block_type = self.observer.selected_block();
        self.place_block(hit.neighbor(face), block_type, sink)
    }

    /// Start a timed removal of a picked voxel.
    pub fn begin_removal(&mut self, target: PickTarget) -> Result<(), EditRejection> {
        let pos = target.voxel().ok_or(EditRejection::NotAVoxel)?;
        if self.chunks.block_at(pos).is_none() {
            return Err(EditRejection::RemovalOfNonexistentBlock(pos));
        }
        self.removals.start(pos);
        Ok(())
    }

    /// Tag a sink handle: a live block handle is a voxel, anything else is
    /// not ours.
    pub fn pick(&self, handle: BlockHandle) -> PickTarget {
        match self.chunks.resolve_handle(handle) {
            Some(pos) => PickTarget::Voxel(pos),
            None => PickTarget::Nothing,
        }
    }

    pub fn save(&mut self) -> Result<(), PersistError> {
        tellus_io::save(&self.save_path, &self.observer, &self.edits)?;
        self.edits.mark_saved();
        self.ticks_since_save = 0;
        Ok(())
    }

    /// Replace the overlay and observer with the saved ones. Returns whether
    /// a save existed; without one the world is left as it is. On a broken
    /// save the world falls back to an empty overlay and the default
    /// observer, and the error is returned.
    pub fn load_save(&mut self, sink: &mut dyn BlockSink) -> Result<bool, PersistError> {
        let loaded = tellus_io::load(&self.save_path, self.config.world.chunk_size);
        let (edits, observer, result) = match loaded {
            Ok(None) => return Ok(false),
            Ok(Some(l)) => (l.edits, l.observer, Ok(true)),
            Err(e) => {
                log::error!(target: "io", "{e}; starting with an empty world");
                (
                    EditStore::new(self.config.world.chunk_size),
                    ObserverState::default(),
                    Err(e),
                )
            }
        };
        self.chunks.unload_all(sink);
        self.removals.clear();
        self.edits = edits;
        self.observer = observer;
        result
    }
}
