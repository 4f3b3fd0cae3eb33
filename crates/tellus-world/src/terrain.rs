//! Base terrain synthesis: what a chunk looks like before any player edits.

use hashbrown::HashMap;
use tellus_blocks::BlockType;
use tellus_geom::BlockPos;

use crate::chunk_key::{ChunkKey, MAX_CHUNK_SIZE};
use crate::height::HeightSampler;
use crate::noise::NoiseField;
use crate::worldgen::{MAX_FILL_DEPTH, MAX_TRUNK_HEIGHT, TerrainConfig};

/// Upper bound on the block map preallocated per chunk.
const MAX_PREALLOC: usize = 1 << 16;

/// Salt mixed into tree rolls so they do not correlate with the heightmap.
const TREE_SALT_X: i32 = 0x2f6b;
const TREE_SALT_Z: i32 = -0x1c3d;

/// Anything that can answer "what would generation put here".
pub trait TerrainSource {
    fn default_block(&self, pos: BlockPos) -> Option<BlockType>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub columns: u32,
    pub blocks: u32,
    pub trees: u32,
    pub min_height: i32,
    pub max_height: i32,
}

#[derive(Clone, Debug)]
pub struct GeneratedTerrain {
    pub key: ChunkKey,
    pub blocks: HashMap<BlockPos, BlockType>,
    pub stats: GenerationStats,
}

/// Pure terrain generator; shareable across worker threads.
#[derive(Clone, Debug)]
pub struct Terrain {
    chunk_size: i32,
    config: TerrainConfig,
    sampler: HeightSampler,
}

impl Terrain {
    /// `chunk_size` is clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn new(chunk_size: u32, config: TerrainConfig) -> Self {
        let noise = NoiseField::new(config.noise_params());
        let sampler = HeightSampler::new(noise, config.height_scale);
        Self {
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE) as i32,
            config,
            sampler,
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    #[inline]
    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    #[inline]
    pub fn sampler(&self) -> &HeightSampler {
        &self.sampler
    }

    #[inline]
    pub fn height_at(&self, wx: i32, wz: i32) -> i32 {
        self.sampler.height_at(wx, wz)
    }

    /// Surface and fill blocks of a column with surface height `h`.
    #[inline]
    fn column_block(&self, h: i32, y: i32) -> Option<BlockType> {
        if y == h {
            Some(self.config.surface)
        } else if y < h && y >= h - self.fill_depth() {
            Some(self.config.subsurface)
        } else {
            None
        }
    }

    /// Trees only root where the whole canopy fits inside the chunk.
    fn is_tree_anchor(&self, wx: i32, wz: i32) -> bool {
        let density = self.config.trees.density;
        if density <= 0.0 || self.chunk_size < 3 {
            return false;
        }
        let lx = wx.rem_euclid(self.chunk_size);
        let lz = wz.rem_euclid(self.chunk_size);
        let inner = 1..=self.chunk_size - 2;
        if !inner.contains(&lx) || !inner.contains(&lz) {
            return false;
        }
        let roll = self
            .sampler
            .noise()
            .hash01(wx.wrapping_mul(31).wrapping_add(TREE_SALT_X), wz.wrapping_add(TREE_SALT_Z));
        roll < density
    }

    #[inline]
    fn fill_depth(&self) -> i32 {
        self.config.fill_depth.min(MAX_FILL_DEPTH) as i32
    }

    #[inline]
    fn trunk_height(&self) -> i32 {
        self.config.trees.trunk_height.min(MAX_TRUNK_HEIGHT) as i32
    }

    /// Build the default block set of one chunk. A key whose footprint
    /// leaves the `i32` lattice generates nothing.
    pub fn generate(&self, key: ChunkKey) -> GeneratedTerrain {
        let size = self.chunk_size;
        let mut stats = GenerationStats {
            min_height: i32::MAX,
            max_height: i32::MIN,
            ..GenerationStats::default()
        };
        if !key.fits_lattice(size) {
            return GeneratedTerrain {
                key,
                blocks: HashMap::new(),
                stats,
            };
        }
        let (x0, z0) = key.origin(size);
        let depth = self.fill_depth();
        let capacity = (size as usize)
            .saturating_mul(size as usize)
            .saturating_mul(depth as usize + 1)
            .min(MAX_PREALLOC);
        let mut blocks: HashMap<BlockPos, BlockType> = HashMap::with_capacity(capacity);
        let mut anchors: Vec<(i32, i32, i32)> = Vec::new();

        for lz in 0..size {
            for lx in 0..size {
                let wx = x0 + lx;
                let wz = z0 + lz;
                let h = self.height_at(wx, wz);
                stats.columns += 1;
                stats.min_height = stats.min_height.min(h);
                stats.max_height = stats.max_height.max(h);
                for y in (h - depth)..=h {
                    if let Some(b) = self.column_block(h, y) {
                        blocks.insert(BlockPos::new(wx, y, wz), b);
                    }
                }
                if self.is_tree_anchor(wx, wz) {
                    anchors.push((wx, h, wz));
                }
            }
        }

        // Columns beat trunks, trunks beat leaves.
        let trunk = self.trunk_height();
        for &(wx, h, wz) in &anchors {
            for dy in 1..=trunk {
                blocks
                    .entry(BlockPos::new(wx, h + dy, wz))
                    .or_insert(BlockType::Log);
            }
        }
        for &(wx, h, wz) in &anchors {
            for y in (h + trunk)..=(h + trunk + 2) {
                for dz in -1..=1 {
                    for dx in -1..=1 {
                        blocks
                            .entry(BlockPos::new(wx + dx, y, wz + dz))
                            .or_insert(BlockType::Leaves);
                    }
                }
            }
        }
        stats.trees = anchors.len() as u32;
        stats.blocks = blocks.len() as u32;

        GeneratedTerrain { key, blocks, stats }
    }
}

impl TerrainSource for Terrain {
    fn default_block(&self, pos: BlockPos) -> Option<BlockType> {
        let h = self.height_at(pos.x, pos.z);
        if let Some(b) = self.column_block(h, pos.y) {
            return Some(b);
        }
        let trunk = self.trunk_height();
        if self.is_tree_anchor(pos.x, pos.z) && pos.y > h && pos.y <= h + trunk {
            return Some(BlockType::Log);
        }
        for dz in -1..=1 {
            for dx in -1..=1 {
                let (Some(ax), Some(az)) = (pos.x.checked_sub(dx), pos.z.checked_sub(dz)) else {
                    continue;
                };
                if !self.is_tree_anchor(ax, az) {
                    continue;
                }
                let ah = self.height_at(ax, az);
                if pos.y >= ah + trunk && pos.y <= ah + trunk + 2 {
                    return Some(BlockType::Leaves);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worldgen::Trees;

    fn forest() -> Terrain {
        Terrain::new(
            8,
            TerrainConfig {
                fill_depth: 2,
                trees: Trees {
                    density: 0.2,
                    trunk_height: 4,
                },
                ..TerrainConfig::default()
            },
        )
    }

    #[test]
    fn one_surface_block_per_column_by_default() {
        let t = Terrain::new(6, TerrainConfig::default());
        let g = t.generate(ChunkKey::new(0, 0));
        assert_eq!(g.blocks.len(), 36);
        for (pos, b) in &g.blocks {
            assert_eq!(*b, BlockType::Grass);
            assert_eq!(pos.y, t.height_at(pos.x, pos.z));
            assert!(g.key.contains(*pos, 6));
        }
    }

    #[test]
    fn fill_depth_stacks_subsurface() {
        let t = Terrain::new(
            4,
            TerrainConfig {
                fill_depth: 3,
                ..TerrainConfig::default()
            },
        );
        let g = t.generate(ChunkKey::new(-2, 1));
        assert_eq!(g.blocks.len(), 16 * 4);
        let (x0, z0) = ChunkKey::new(-2, 1).origin(4);
        let h = t.height_at(x0, z0);
        assert_eq!(g.blocks.get(&BlockPos::new(x0, h - 3, z0)), Some(&BlockType::Stone));
        assert_eq!(g.blocks.get(&BlockPos::new(x0, h - 4, z0)), None);
    }

    #[test]
    fn default_block_agrees_with_generation() {
        let t = forest();
        for key in ChunkKey::new(0, 0).square_around(1) {
            let g = t.generate(key);
            for (pos, b) in &g.blocks {
                assert_eq!(t.default_block(*pos), Some(*b), "at {pos:?}");
                assert!(key.contains(*pos, 8), "tree leaked out of {key:?}");
            }
            let (x0, z0) = key.origin(8);
            for lz in 0..8 {
                for lx in 0..8 {
                    let h = t.height_at(x0 + lx, z0 + lz);
                    for y in (h - 4)..(h + 10) {
                        let p = BlockPos::new(x0 + lx, y, z0 + lz);
                        assert_eq!(t.default_block(p), g.blocks.get(&p).copied(), "at {p:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn oversized_chunk_size_is_clamped() {
        let t = Terrain::new(50_000, TerrainConfig::default());
        assert_eq!(t.chunk_size(), MAX_CHUNK_SIZE as i32);
        assert_eq!(Terrain::new(u32::MAX, TerrainConfig::default()).chunk_size(), MAX_CHUNK_SIZE as i32);
    }

    #[test]
    fn edge_of_lattice_generates_without_overflow() {
        let t = Terrain::new(
            8,
            TerrainConfig {
                fill_depth: u32::MAX,
                height_scale: 1.0e12,
                trees: Trees {
                    density: 1.0,
                    trunk_height: u32::MAX,
                },
                ..TerrainConfig::default()
            },
        );
        let range = crate::chunk_key::lattice_range(8);
        let edge = ChunkKey::new(*range.end(), *range.start());
        let g = t.generate(edge);
        assert_eq!(g.stats.columns, 64);
        assert!(g.blocks.keys().all(|p| edge.contains(*p, 8)));
        assert!(t.generate(edge.offset(1, 0)).blocks.is_empty());
        let corner = BlockPos::new(i32::MAX, t.height_at(i32::MAX, i32::MIN), i32::MIN);
        assert_eq!(g.blocks.get(&corner), Some(&BlockType::Grass));
        assert_eq!(t.default_block(corner), Some(BlockType::Grass));
    }

    #[test]
    fn forests_do_grow() {
        let t = forest();
        let trees: u32 = ChunkKey::new(0, 0)
            .square_around(2)
            .map(|k| t.generate(k).stats.trees)
            .sum();
        assert!(trees > 0);
    }
}
