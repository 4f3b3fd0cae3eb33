//! The boundary to whatever draws blocks.

use hashbrown::HashMap;
use tellus_blocks::BlockType;
use tellus_chunk::BlockHandle;
use tellus_geom::BlockPos;

/// Receives every block that becomes visible or disappears. The core never
/// assumes anything about visuals beyond these calls.
pub trait BlockSink {
    fn spawn_block(&mut self, pos: BlockPos, block_type: BlockType) -> BlockHandle;
    fn despawn_block(&mut self, handle: BlockHandle);
    /// Progress in `0..=1` of a timed removal of `handle`.
    fn removal_progress(&mut self, _handle: BlockHandle, _progress: f32) {}
}

/// Hands out handles and counts calls; draws nothing.
#[derive(Debug, Default)]
pub struct NullSink {
    next: u64,
    pub spawned: u64,
    pub despawned: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn live(&self) -> u64 {
        self.spawned - self.despawned
    }
}

impl BlockSink for NullSink {
    fn spawn_block(&mut self, _pos: BlockPos, _block_type: BlockType) -> BlockHandle {
        self.next += 1;
        self.spawned += 1;
        BlockHandle(self.next)
    }

    fn despawn_block(&mut self, _handle: BlockHandle) {
        self.despawned += 1;
    }
}

/// Keeps every live block, for headless runs and assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    next: u64,
    live: HashMap<BlockHandle, (BlockPos, BlockType)>,
    progress: HashMap<BlockHandle, f32>,
    pub spawned: u64,
    pub despawned: u64,
    /// Despawns of handles that were never spawned or already gone.
    pub unknown_despawns: u64,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn get(&self, handle: BlockHandle) -> Option<(BlockPos, BlockType)> {
        self.live.get(&handle).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockHandle, BlockPos, BlockType)> + '_ {
        self.live.iter().map(|(h, (p, b))| (*h, *p, *b))
    }

    /// Live blocks at `pos`; more than one means a duplicate.
    pub fn count_at(&self, pos: BlockPos) -> usize {
        self.live.values().filter(|(p, _)| *p == pos).count()
    }

    pub fn progress(&self, handle: BlockHandle) -> Option<f32> {
        self.progress.get(&handle).copied()
    }
}

impl BlockSink for RecordingSink {
    fn spawn_block(&mut self, pos: BlockPos, block_type: BlockType) -> BlockHandle {
        self.next += 1;
        self.spawned += 1;
        let h = BlockHandle(self.next);
        self.live.insert(h, (pos, block_type));
        h
    }

    fn despawn_block(&mut self, handle: BlockHandle) {
        self.progress.remove(&handle);
        if self.live.remove(&handle).is_some() {
            self.despawned += 1;
        } else {
            self.unknown_despawns += 1;
            log::warn!("despawn of unknown block handle {:?}", handle);
        }
    }

    fn removal_progress(&mut self, handle: BlockHandle, progress: f32) {
        if self.live.contains_key(&handle) {
            self.progress.insert(handle, progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_tracks_live_blocks() {
        let mut sink = RecordingSink::new();
        let a = sink.spawn_block(BlockPos::new(0, 1, 0), BlockType::Stone);
        let b = sink.spawn_block(BlockPos::new(0, 2, 0), BlockType::Glass);
        assert_ne!(a, b);
        sink.removal_progress(a, 0.5);
        assert_eq!(sink.progress(a), Some(0.5));
        sink.despawn_block(a);
        sink.despawn_block(a);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.unknown_despawns, 1);
        assert_eq!(sink.progress(a), None);
        assert_eq!(sink.get(b), Some((BlockPos::new(0, 2, 0), BlockType::Glass)));
    }

    #[test]
    fn null_sink_counts() {
        let mut sink = NullSink::new();
        let h = sink.spawn_block(BlockPos::default(), BlockType::Log);
        sink.despawn_block(h);
        assert_eq!((sink.spawned, sink.despawned, sink.live()), (1, 1, 0));
    }
}
