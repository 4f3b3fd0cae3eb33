//! Persistent player edits layered over procedural terrain.
#![forbid(unsafe_code)]

pub mod file;

use std::collections::HashMap;

use tellus_blocks::BlockType;
use tellus_geom::BlockPos;
use tellus_world::{ChunkKey, MAX_CHUNK_SIZE, TerrainSource};

pub use file::{BlockRecord, EditFile, EditFileError, EditList};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditOp {
    Placed,
    Removed,
}

/// One deviation from the generated default. For `Removed`, `block_type`
/// is the block that was taken out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EditRecord {
    pub position: BlockPos,
    pub block_type: BlockType,
    pub op: EditOp,
}

impl EditRecord {
    #[inline]
    pub const fn placed(position: BlockPos, block_type: BlockType) -> Self {
        Self {
            position,
            block_type,
            op: EditOp::Placed,
        }
    }

    #[inline]
    pub const fn removed(position: BlockPos, block_type: BlockType) -> Self {
        Self {
            position,
            block_type,
            op: EditOp::Removed,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditStoreStats {
    pub chunk_entries: usize,
    pub placed: usize,
    pub removed: usize,
}

/// Chunk-indexed edit overlay: one record per position, last write wins.
#[derive(Clone, Debug)]
pub struct EditStore {
    chunk_size: i32,
    // key=(cx,cz) -> world position -> record
    inner: HashMap<ChunkKey, HashMap<BlockPos, EditRecord>>,
    revision: u64,
    saved_revision: u64,
}

impl EditStore {
    /// `chunk_size` is clamped to `1..=MAX_CHUNK_SIZE`, matching the terrain.
    pub fn new(chunk_size: u32) -> Self {
        Self {
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE) as i32,
            inner: HashMap::new(),
            revision: 0,
            saved_revision: 0,
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    #[inline]
    fn chunk_key(&self, pos: BlockPos) -> ChunkKey {
        ChunkKey::containing(pos, self.chunk_size)
    }

    #[inline]
    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1).max(1);
    }

    pub fn get(&self, pos: BlockPos) -> Option<&EditRecord> {
        self.inner
            .get(&self.chunk_key(pos))
            .and_then(|m| m.get(&pos))
    }

    pub fn len(&self) -> usize {
        self.inner.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditRecord> {
        self.inner.values().flat_map(|m| m.values())
    }

    pub fn stats(&self) -> EditStoreStats {
        let mut stats = EditStoreStats {
            chunk_entries: self.inner.len(),
            ..EditStoreStats::default()
        };
        for r in self.iter() {
            match r.op {
                EditOp::Placed => stats.placed += 1,
                EditOp::Removed => stats.removed += 1,
            }
        }
        stats
    }

    fn insert(&mut self, record: EditRecord) {
        let k = self.chunk_key(record.position);
        self.inner.entry(k).or_default().insert(record.position, record);
        self.bump();
    }

    fn take(&mut self, pos: BlockPos) -> Option<EditRecord> {
        let k = self.chunk_key(pos);
        let m = self.inner.get_mut(&k)?;
        let prev = m.remove(&pos);
        if m.is_empty() {
            self.inner.remove(&k);
        }
        if prev.is_some() {
            self.bump();
        }
        prev
    }

    /// Record a placement, replacing whatever edit existed at `pos`.
    pub fn record_placed(&mut self, pos: BlockPos, block_type: BlockType) {
        log::debug!(target: "edit", "placed {} at ({},{},{})", block_type, pos.x, pos.y, pos.z);
        self.insert(EditRecord::placed(pos, block_type));
    }

    /// Record a removal. Positions that terrain generation would leave
    /// empty only need their placement forgotten; positions that belong to
    /// the default terrain keep a `Removed` record so regeneration does not
    /// bring them back. Returns whether a `Removed` record was stored.
    pub fn record_removed(
        &mut self,
        pos: BlockPos,
        removed: BlockType,
        terrain: &impl TerrainSource,
    ) -> bool {
        if terrain.default_block(pos).is_none() {
            let prev = self.take(pos);
            log::debug!(
                target: "edit",
                "removed {} at ({},{},{}); cleared {:?}",
                removed, pos.x, pos.y, pos.z, prev.map(|r| r.op)
            );
            false
        } else {
            log::debug!(target: "edit", "removed default {} at ({},{},{})", removed, pos.x, pos.y, pos.z);
            self.insert(EditRecord::removed(pos, removed));
            true
        }
    }

    /// Edits whose position falls in the chunk's footprint.
    pub fn edits_within(&self, key: ChunkKey) -> Vec<EditRecord> {
        self.inner
            .get(&key)
            .map(|m| m.values().copied().collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        if !self.inner.is_empty() {
            self.inner.clear();
            self.bump();
        }
    }

    /// Monotonic change counter, bumped on every mutation.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    #[inline]
    pub fn mark_saved(&mut self) {
        self.saved_revision = self.revision;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat terrain at y = 0 everywhere.
    struct Flat;
    impl TerrainSource for Flat {
        fn default_block(&self, pos: BlockPos) -> Option<BlockType> {
            (pos.y == 0).then_some(BlockType::Grass)
        }
    }

    #[test]
    fn placed_then_removed_above_ground_leaves_nothing() {
        let mut store = EditStore::new(16);
        let p = BlockPos::new(3, 1, 3);
        store.record_placed(p, BlockType::Stone);
        assert_eq!(store.len(), 1);
        assert!(!store.record_removed(p, BlockType::Stone, &Flat));
        assert!(store.is_empty());
        assert!(store.get(p).is_none());
    }

    #[test]
    fn removing_default_terrain_persists() {
        let mut store = EditStore::new(16);
        let p = BlockPos::new(-3, 0, 20);
        assert!(store.record_removed(p, BlockType::Grass, &Flat));
        assert_eq!(store.get(p), Some(&EditRecord::removed(p, BlockType::Grass)));
        store.record_placed(p, BlockType::Glass);
        assert_eq!(store.get(p), Some(&EditRecord::placed(p, BlockType::Glass)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn edits_within_only_sees_its_chunk() {
        let mut store = EditStore::new(4);
        store.record_placed(BlockPos::new(0, 5, 0), BlockType::Wood);
        store.record_placed(BlockPos::new(3, 5, 3), BlockType::Wood);
        store.record_placed(BlockPos::new(4, 5, 0), BlockType::Log);
        store.record_placed(BlockPos::new(-1, 5, 0), BlockType::Log);
        let mut inside = store.edits_within(ChunkKey::new(0, 0));
        inside.sort_by_key(|r| r.position);
        assert_eq!(inside.len(), 2);
        assert_eq!(inside[0].position, BlockPos::new(0, 5, 0));
        assert_eq!(store.edits_within(ChunkKey::new(-1, 0)).len(), 1);
        assert!(store.edits_within(ChunkKey::new(9, 9)).is_empty());
        let stats = store.stats();
        assert_eq!(stats.chunk_entries, 3);
        assert_eq!(stats.placed, 4);
    }

    #[test]
    fn revision_tracks_dirty_state() {
        let mut store = EditStore::new(8);
        assert!(!store.is_dirty());
        store.record_placed(BlockPos::new(1, 1, 1), BlockType::Glass);
        assert!(store.is_dirty());
        let rev = store.revision();
        store.mark_saved();
        assert!(!store.is_dirty());
        // removing a non-recorded, non-default block changes nothing
        store.record_removed(BlockPos::new(2, 2, 2), BlockType::Glass, &Flat);
        assert_eq!(store.revision(), rev);
        store.clear();
        assert!(store.is_dirty());
    }
}
