//! Resident chunk storage and the generate-then-overlay build step.
#![forbid(unsafe_code)]

use hashbrown::HashMap;
use tellus_blocks::BlockType;
use tellus_edit::{EditOp, EditRecord};
use tellus_geom::BlockPos;
use tellus_world::{ChunkKey, GenerationStats, Terrain};

/// Opaque id handed out by the rendering sink for one spawned block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockHandle(pub u64);

/// Residency of one chunk key. Unloading happens within a single call, so
/// a resident chunk goes straight back to `Unloaded`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    Unloaded,
    Loading,
    Resident,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkVoxel {
    pub block_type: BlockType,
    pub handle: BlockHandle,
}

/// A resident chunk. Only holds blocks whose x/z fall in its footprint.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub key: ChunkKey,
    pub blocks: HashMap<BlockPos, ChunkVoxel>,
    pub generated: bool,
}

impl Chunk {
    pub fn new(key: ChunkKey) -> Self {
        Self {
            key,
            blocks: HashMap::new(),
            generated: false,
        }
    }

    #[inline]
    pub fn get(&self, pos: BlockPos) -> Option<&ChunkVoxel> {
        self.blocks.get(&pos)
    }

    #[inline]
    pub fn is_occupied(&self, pos: BlockPos) -> bool {
        self.blocks.contains_key(&pos)
    }

    /// Returns the voxel previously stored at `pos`, if any.
    #[inline]
    pub fn insert(&mut self, pos: BlockPos, voxel: ChunkVoxel) -> Option<ChunkVoxel> {
        self.blocks.insert(pos, voxel)
    }

    #[inline]
    pub fn remove(&mut self, pos: BlockPos) -> Option<ChunkVoxel> {
        self.blocks.remove(&pos)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Empty the chunk, yielding every voxel so the caller can despawn it.
    pub fn drain(&mut self) -> impl Iterator<Item = (BlockPos, ChunkVoxel)> + '_ {
        self.generated = false;
        self.blocks.drain()
    }
}

/// Final block set of a chunk before anything is spawned.
#[derive(Clone, Debug)]
pub struct BuiltChunk {
    pub key: ChunkKey,
    pub blocks: HashMap<BlockPos, BlockType>,
    pub stats: GenerationStats,
    pub edits_applied: usize,
}

impl BuiltChunk {
    /// Positions in a stable order, so spawn order does not depend on the
    /// hasher.
    pub fn sorted(&self) -> Vec<(BlockPos, BlockType)> {
        let mut v: Vec<_> = self.blocks.iter().map(|(p, b)| (*p, *b)).collect();
        v.sort_unstable_by_key(|(p, _)| *p);
        v
    }
}

/// Generate the default terrain of `key`, then apply the edits that fall in
/// its footprint: placements insert or override, removals clear.
pub fn build_chunk(terrain: &Terrain, key: ChunkKey, edits: &[EditRecord]) -> BuiltChunk {
    let generated = terrain.generate(key);
    let mut blocks = generated.blocks;
    let size = terrain.chunk_size();
    let mut applied = 0usize;
    for e in edits {
        if !key.contains(e.position, size) {
            continue;
        }
        match e.op {
            EditOp::Placed => {
                blocks.insert(e.position, e.block_type);
            }
            EditOp::Removed => {
                blocks.remove(&e.position);
            }
        }
        applied += 1;
    }
    BuiltChunk {
        key,
        blocks,
        stats: generated.stats,
        edits_applied: applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tellus_world::TerrainConfig;

    fn terrain(size: u32) -> Terrain {
        Terrain::new(size, TerrainConfig::default())
    }

    #[test]
    fn placed_edit_overrides_generated_surface() {
        let t = terrain(6);
        let h = t.height_at(3, 3);
        let p = BlockPos::new(3, h, 3);
        let built = build_chunk(&t, ChunkKey::new(0, 0), &[EditRecord::placed(p, BlockType::Stone)]);
        assert_eq!(built.blocks.get(&p), Some(&BlockType::Stone));
        assert_eq!(built.blocks.len(), 36);
        assert_eq!(built.edits_applied, 1);
    }

    #[test]
    fn removed_edit_clears_and_foreign_edits_are_ignored() {
        let t = terrain(6);
        let h = t.height_at(1, 2);
        let here = BlockPos::new(1, h, 2);
        let elsewhere = BlockPos::new(7, 40, 2);
        let built = build_chunk(
            &t,
            ChunkKey::new(0, 0),
            &[
                EditRecord::removed(here, BlockType::Grass),
                EditRecord::placed(elsewhere, BlockType::Glass),
            ],
        );
        assert!(!built.blocks.contains_key(&here));
        assert!(!built.blocks.contains_key(&elsewhere));
        assert_eq!(built.blocks.len(), 35);
        assert_eq!(built.edits_applied, 1);
    }

    #[test]
    fn drain_resets_chunk() {
        let mut c = Chunk::new(ChunkKey::new(1, 1));
        c.generated = true;
        c.insert(
            BlockPos::new(6, 0, 6),
            ChunkVoxel {
                block_type: BlockType::Log,
                handle: BlockHandle(9),
            },
        );
        let drained: Vec<_> = c.drain().collect();
        assert_eq!(drained.len(), 1);
        assert!(c.is_empty());
        assert!(!c.generated);
    }
}
