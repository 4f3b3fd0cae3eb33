use tellus_geom::BlockPos;

/// What a host-side pick ray hit, tagged once at the sink boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickTarget {
    Voxel(BlockPos),
    /// Anything the host draws that is not a world block (mobs, UI).
    Entity(u64),
    Nothing,
}

impl PickTarget {
    #[inline]
    pub fn voxel(self) -> Option<BlockPos> {
        match self {
            PickTarget::Voxel(p) => Some(p),
            _ => None,
        }
    }
}
