//! Chunk streaming around the observer and the edit entry points that keep
//! resident blocks, the sink and the edit overlay in step.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use tellus_blocks::BlockType;
use tellus_chunk::{BlockHandle, BuiltChunk, Chunk, ChunkState, ChunkVoxel, build_chunk};
use tellus_edit::EditStore;
use tellus_geom::BlockPos;
use tellus_io::ObserverState;
use tellus_runtime::{GenJob, GenOut, Runtime, RuntimeError};
use tellus_world::{ChunkKey, Terrain};
use thiserror::Error;

use crate::sink::BlockSink;

const PENDING_POLL: Duration = Duration::from_millis(250);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamingMode {
    /// Generate inside `update_streaming`.
    Inline,
    /// Generate on a worker pool; 0 workers = one per core.
    Background { workers: usize },
}

/// Rejected edits. None of these change any state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum EditRejection {
    #[error("a block already exists at {0}")]
    DuplicateBlockPlacement(BlockPos),
    #[error("no block exists at {0}")]
    RemovalOfNonexistentBlock(BlockPos),
    #[error("chunk {0} is not resident")]
    ChunkNotResident(ChunkKey),
    #[error("pick target is not a world block")]
    NotAVoxel,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamingReport {
    /// Chunks that became resident.
    pub loaded: usize,
    pub unloaded: usize,
    /// Background jobs submitted.
    pub requested: usize,
    /// Background results dropped because their chunk left the radius or
    /// was requested again.
    pub discarded: usize,
    /// Chunks still generating after the call.
    pub pending: usize,
}

impl StreamingReport {
    fn absorb(&mut self, other: StreamingReport) {
        self.loaded += other.loaded;
        self.unloaded += other.unloaded;
        self.requested += other.requested;
        self.discarded += other.discarded;
        self.pending = other.pending;
    }
}

pub struct ChunkManager {
    terrain: Arc<Terrain>,
    chunk_size: i32,
    radius: i32,
    mode: StreamingMode,
    chunks: HashMap<ChunkKey, Chunk>,
    // key -> job id of the one result we will accept
    pending: HashMap<ChunkKey, u64>,
    handles: HashMap<BlockHandle, BlockPos>,
    runtime: Option<Runtime>,
    next_job_id: u64,
    center: Option<ChunkKey>,
}

impl ChunkManager {
    pub fn new(terrain: Arc<Terrain>, radius: i32, mode: StreamingMode) -> Result<Self, RuntimeError> {
        let runtime = match mode {
            StreamingMode::Inline => None,
            StreamingMode::Background { workers } => Some(Runtime::new(terrain.clone(), workers)?),
        };
        Ok(Self {
            chunk_size: terrain.chunk_size(),
            terrain,
            radius: radius.max(0),
            mode,
            chunks: HashMap::new(),
            pending: HashMap::new(),
            handles: HashMap::new(),
            runtime,
            next_job_id: 0,
            center: None,
        })
    }

    #[inline]
    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    #[inline]
    pub fn radius(&self) -> i32 {
        self.radius
    }

    #[inline]
    pub fn mode(&self) -> StreamingMode {
        self.mode
    }

    #[inline]
    pub fn terrain(&self) -> &Arc<Terrain> {
        &self.terrain
    }

    /// Chunk under the observer at the last streaming update.
    #[inline]
    pub fn center(&self) -> Option<ChunkKey> {
        self.center
    }

    pub fn state(&self, key: ChunkKey) -> ChunkState {
        if self.chunks.contains_key(&key) {
            ChunkState::Resident
        } else if self.pending.contains_key(&key) {
            ChunkState::Loading
        } else {
            ChunkState::Unloaded
        }
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    /// Resident keys in ascending order.
    pub fn resident_keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self.chunks.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    #[inline]
    pub fn resident_count(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn block_count(&self) -> usize {
        self.chunks.values().map(Chunk::len).sum()
    }

    pub fn voxel_at(&self, pos: BlockPos) -> Option<&ChunkVoxel> {
        self.chunks
            .get(&ChunkKey::containing(pos, self.chunk_size))
            .and_then(|c| c.get(pos))
    }

    #[inline]
    pub fn block_at(&self, pos: BlockPos) -> Option<BlockType> {
        self.voxel_at(pos).map(|v| v.block_type)
    }

    #[inline]
    pub fn resolve_handle(&self, handle: BlockHandle) -> Option<BlockPos> {
        self.handles.get(&handle).copied()
    }

    /// Bring the resident set in line with the square of chunks around the
    /// observer. In inline mode the set matches exactly on return.
    pub fn update_streaming(
        &mut self,
        observer: &ObserverState,
        edits: &EditStore,
        sink: &mut dyn BlockSink,
    ) -> StreamingReport {
        let center = observer.chunk_key(self.chunk_size);
        if self.center != Some(center) {
            log::debug!(target: "stream", "view center -> ({}, {})", center.cx, center.cz);
            self.center = Some(center);
        }
        let size = self.chunk_size;
        let desired: BTreeSet<ChunkKey> = center
            .square_around(self.radius)
            .filter(|k| k.fits_lattice(size))
            .collect();
        let mut report = StreamingReport::default();

        let leaving: Vec<ChunkKey> = self
            .chunks
            .keys()
            .filter(|k| !desired.contains(k))
            .copied()
            .collect();
        for key in leaving {
            if self.unload_chunk(key, sink) {
                report.unloaded += 1;
            }
        }
        let before = self.pending.len();
        self.pending.retain(|k, _| desired.contains(k));
        if self.pending.len() != before {
            log::debug!(
                target: "stream",
                "cancelled {} pending chunks outside the radius",
                before - self.pending.len()
            );
        }

        if let Some(rt) = self.runtime.as_ref() {
            let results = rt.drain_worker_results();
            for out in results {
                if self.accept(out, sink) {
                    report.loaded += 1;
                } else {
                    report.discarded += 1;
                }
            }
        }

        // Nearest rings first so the observer's own chunk is ready soonest.
        let mut missing: Vec<ChunkKey> = desired
            .iter()
            .filter(|k| !self.chunks.contains_key(*k) && !self.pending.contains_key(*k))
            .copied()
            .collect();
        missing.sort_by_key(|k| (k.chebyshev(center), *k));
        for key in missing {
            match self.runtime.as_ref() {
                None => {
                    let built = build_chunk(&self.terrain, key, &edits.edits_within(key));
                    self.install(built, sink);
                    report.loaded += 1;
                }
                Some(rt) => {
                    self.next_job_id += 1;
                    let job_id = self.next_job_id;
                    self.pending.insert(key, job_id);
                    rt.submit(GenJob {
                        key,
                        job_id,
                        edits: edits.edits_within(key),
                    });
                    report.requested += 1;
                }
            }
        }

        report.pending = self.pending.len();
        if report.loaded > 0 || report.unloaded > 0 || report.discarded > 0 {
            log::info!(
                target: "stream",
                "center=({}, {}) loaded={} unloaded={} discarded={} pending={} resident={}",
                center.cx,
                center.cz,
                report.loaded,
                report.unloaded,
                report.discarded,
                report.pending,
                self.chunks.len()
            );
        }
        report
    }

    /// Block until every requested chunk has been accepted or discarded and
    /// the worker pool has gone quiet. A no-op in inline mode.
    pub fn finish_pending(&mut self, sink: &mut dyn BlockSink) -> StreamingReport {
        let mut report = StreamingReport::default();
        let t0 = Instant::now();
        loop {
            let Some(rt) = self.runtime.as_ref() else {
                break;
            };
            if rt.is_idle() {
                let results = rt.drain_worker_results();
                let mut step = StreamingReport::default();
                for out in results {
                    if self.accept(out, sink) {
                        step.loaded += 1;
                    } else {
                        step.discarded += 1;
                    }
                }
                report.absorb(step);
                if !self.pending.is_empty() {
                    // Jobs that never produced a result are requested again on the
                    // next streaming update.
                    log::warn!(
                        target: "stream",
                        "{} chunk jobs produced no result; will retry",
                        self.pending.len()
                    );
                    self.pending.clear();
                }
                break;
            }
            match rt.wait_result(PENDING_POLL) {
                Some(out) => {
                    if self.accept(out, sink) {
                        report.loaded += 1;
                    } else {
                        report.discarded += 1;
                    }
                }
                None => {
                    let (queued, inflight) = rt.queue_debug_counts();
                    log::debug!(
                        target: "runtime",
                        "waiting on workers: queued={queued} inflight={inflight}"
                    );
                }
            }
        }
        report.pending = self.pending.len();
        if report.loaded > 0 || report.discarded > 0 {
            log::debug!(
                target: "stream",
                "finished pending: loaded={} discarded={} in {} ms",
                report.loaded,
                report.discarded,
                t0.elapsed().as_millis()
            );
        }
        report
    }

    fn accept(&mut self, out: GenOut, sink: &mut dyn BlockSink) -> bool {
        let GenOut {
            key,
            job_id,
            built,
            t_total_ms,
            t_queue_ms,
        } = out;
        if self.pending.get(&key) != Some(&job_id) {
            log::debug!(
                target: "stream",
                "discarding stale result cx={} cz={} job_id={}",
                key.cx,
                key.cz,
                job_id
            );
            return false;
        }
        self.pending.remove(&key);
        log::debug!(
            target: "runtime",
            "gen_ms={} queue_ms={} blocks={} edits={} cx={} cz={} job_id={}",
            t_total_ms,
            t_queue_ms,
            built.blocks.len(),
            built.edits_applied,
            key.cx,
            key.cz,
            job_id
        );
        self.install(built, sink);
        true
    }

    fn install(&mut self, built: BuiltChunk, sink: &mut dyn BlockSink) {
        let mut chunk = Chunk::new(built.key);
        for (pos, block_type) in built.sorted() {
            let handle = sink.spawn_block(pos, block_type);
            chunk.insert(pos, ChunkVoxel { block_type, handle });
            self.handles.insert(handle, pos);
        }
        chunk.generated = true;
        log::trace!(
            target: "stream",
            "chunk ({}, {}) resident with {} blocks",
            built.key.cx,
            built.key.cz,
            chunk.len()
        );
        self.chunks.insert(built.key, chunk);
    }

    /// Despawn and drop every block of a resident chunk. Edits are untouched,
    /// so the chunk regenerates identically when it comes back.
    pub fn unload_chunk(&mut self, key: ChunkKey, sink: &mut dyn BlockSink) -> bool {
        let Some(mut chunk) = self.chunks.remove(&key) else {
            return false;
        };
        log::trace!(target: "stream", "chunk ({}, {}) unloading {} blocks", key.cx, key.cz, chunk.len());
        for (_, voxel) in chunk.drain() {
            sink.despawn_block(voxel.handle);
            self.handles.remove(&voxel.handle);
        }
        true
    }

    /// Drop everything, including chunks still generating.
    pub fn unload_all(&mut self, sink: &mut dyn BlockSink) {
        let keys: Vec<ChunkKey> = self.chunks.keys().copied().collect();
        let n = keys.len();
        for key in keys {
            self.unload_chunk(key, sink);
        }
        self.pending.clear();
        self.center = None;
        log::info!(target: "stream", "unloaded all {n} resident chunks");
    }

    /// Place a block in a resident chunk and record it as an edit.
    pub fn place_block(
        &mut self,
        pos: BlockPos,
        block_type: BlockType,
        edits: &mut EditStore,
        sink: &mut dyn BlockSink,
    ) -> Result<BlockHandle, EditRejection> {
        let key = ChunkKey::containing(pos, self.chunk_size);
        let chunk = self
            .chunks
            .get_mut(&key)
            .ok_or(EditRejection::ChunkNotResident(key))?;
        if chunk.is_occupied(pos) {
            return Err(EditRejection::DuplicateBlockPlacement(pos));
        }
        let handle = sink.spawn_block(pos, block_type);
        chunk.insert(pos, ChunkVoxel { block_type, handle });
        self.handles.insert(handle, pos);
        edits.record_placed(pos, block_type);
        Ok(handle)
    }

    /// Remove a resident block and record the removal.
    pub fn remove_block(
        &mut self,
        pos: BlockPos,
        edits: &mut EditStore,
        sink: &mut dyn BlockSink,
    ) -> Result<BlockType, EditRejection> {
        let key = ChunkKey::containing(pos, self.chunk_size);
        let voxel = self
            .chunks
            .get_mut(&key)
            .and_then(|c| c.remove(pos))
            .ok_or(EditRejection::RemovalOfNonexistentBlock(pos))?;
        sink.despawn_block(voxel.handle);
        self.handles.remove(&voxel.handle);
        edits.record_removed(pos, voxel.block_type, self.terrain.as_ref());
        Ok(voxel.block_type)
    }
}
