use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use tellus_geom::{BlockPos, Vec3};

/// Largest chunk edge length the streaming core accepts.
pub const MAX_CHUNK_SIZE: u32 = 1024;

/// Chunk coordinates whose whole footprint lies on the `i32` block lattice.
pub fn lattice_range(chunk_size: i32) -> RangeInclusive<i32> {
    let size = chunk_size.max(1);
    (i32::MIN / size)..=((i32::MAX - (size - 1)) / size)
}

/// Identifies a `chunk_size x chunk_size` column of the world.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkKey {
    pub cx: i32,
    pub cz: i32,
}

impl ChunkKey {
    #[inline]
    pub const fn new(cx: i32, cz: i32) -> Self {
        Self { cx, cz }
    }

    /// Chunk under an observer position (floor division). Positions past
    /// the edge of the lattice clamp to the outermost whole chunk.
    #[inline]
    pub fn from_world(pos: Vec3, chunk_size: i32) -> Self {
        let size = f64::from(chunk_size.max(1));
        let range = lattice_range(chunk_size);
        let axis = |v: f32| {
            ((f64::from(v) / size).floor() as i32).clamp(*range.start(), *range.end())
        };
        Self {
            cx: axis(pos.x),
            cz: axis(pos.z),
        }
    }

    /// Chunk that owns a block, by its x/z footprint.
    #[inline]
    pub fn containing(pos: BlockPos, chunk_size: i32) -> Self {
        Self {
            cx: pos.x.div_euclid(chunk_size),
            cz: pos.z.div_euclid(chunk_size),
        }
    }

    /// World x/z of the chunk's minimum corner.
    #[inline]
    pub fn origin(self, chunk_size: i32) -> (i32, i32) {
        (
            self.cx.saturating_mul(chunk_size),
            self.cz.saturating_mul(chunk_size),
        )
    }

    /// Whether every block of this chunk has an `i32` coordinate.
    #[inline]
    pub fn fits_lattice(self, chunk_size: i32) -> bool {
        let range = lattice_range(chunk_size);
        range.contains(&self.cx) && range.contains(&self.cz)
    }

    #[inline]
    pub fn contains(self, pos: BlockPos, chunk_size: i32) -> bool {
        Self::containing(pos, chunk_size) == self
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            cx: self.cx.saturating_add(dx),
            cz: self.cz.saturating_add(dz),
        }
    }

    #[inline]
    pub fn checked_offset(self, dx: i32, dz: i32) -> Option<Self> {
        Some(Self {
            cx: self.cx.checked_add(dx)?,
            cz: self.cz.checked_add(dz)?,
        })
    }

    /// Chebyshev distance in chunk units, saturating at `i32::MAX`.
    #[inline]
    pub fn chebyshev(self, other: ChunkKey) -> i32 {
        let d = self.cx.abs_diff(other.cx).max(self.cz.abs_diff(other.cz));
        i32::try_from(d).unwrap_or(i32::MAX)
    }

    /// Every key within `radius` (Chebyshev) of `self`, row by row. Keys
    /// that would leave the `i32` range are skipped.
    pub fn square_around(self, radius: i32) -> impl Iterator<Item = ChunkKey> {
        let r = radius.max(0);
        (-r..=r).flat_map(move |dz| (-r..=r).filter_map(move |dx| self.checked_offset(dx, dz)))
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.cx, self.cz)
    }
}

impl From<(i32, i32)> for ChunkKey {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<ChunkKey> for (i32, i32) {
    fn from(value: ChunkKey) -> Self {
        (value.cx, value.cz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_coordinates_floor() {
        assert_eq!(ChunkKey::from_world(Vec3::new(-0.5, 0.0, 5.9), 6), ChunkKey::new(-1, 0));
        assert_eq!(ChunkKey::from_world(Vec3::new(-6.0, 3.0, -6.01), 6), ChunkKey::new(-1, -2));
        assert_eq!(ChunkKey::containing(BlockPos::new(-1, 9, 6), 6), ChunkKey::new(-1, 1));
    }

    #[test]
    fn square_around_counts() {
        let c = ChunkKey::new(2, -3);
        assert_eq!(c.square_around(0).collect::<Vec<_>>(), vec![c]);
        let ring: Vec<_> = c.square_around(2).collect();
        assert_eq!(ring.len(), 25);
        assert!(ring.iter().all(|k| k.chebyshev(c) <= 2));
    }

    #[test]
    fn far_observers_clamp_to_the_lattice() {
        let size = 16;
        let range = lattice_range(size);
        let far = ChunkKey::from_world(Vec3::new(3.0e9, 0.0, -3.0e9), size);
        assert_eq!(far, ChunkKey::new(*range.end(), *range.start()));
        assert!(far.fits_lattice(size));
        let (x0, z0) = far.origin(size);
        assert!(x0.checked_add(size - 1).is_some());
        assert_eq!(z0, range.start() * size);
        assert!(!far.offset(1, 0).fits_lattice(size));
    }

    #[test]
    fn extreme_keys_do_not_overflow() {
        let edge = ChunkKey::new(i32::MAX, i32::MIN);
        assert_eq!(edge.offset(1, -1), edge);
        assert_eq!(edge.checked_offset(1, 0), None);
        assert_eq!(edge.origin(16), (i32::MAX, i32::MIN));
        assert_eq!(edge.chebyshev(ChunkKey::new(i32::MIN, 0)), i32::MAX);
        // only the in-range half of the square survives
        assert_eq!(edge.square_around(1).count(), 4);
    }
}
