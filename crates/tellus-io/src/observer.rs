use tellus_blocks::BlockType;
use tellus_geom::Vec3;
use tellus_world::ChunkKey;

pub const MAX_VITAL: f32 = 100.0;

/// What the core knows about the observer. The host moves it; the core
/// streams around `position` and persists the rest.
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverState {
    pub position: Vec3,
    pub rotation: Vec3,
    pub inventory_index: usize,
    pub health: f32,
    pub hunger: f32,
}

impl Default for ObserverState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            inventory_index: 0,
            health: MAX_VITAL,
            hunger: MAX_VITAL,
        }
    }
}

impl ObserverState {
    #[inline]
    pub fn chunk_key(&self, chunk_size: i32) -> ChunkKey {
        ChunkKey::from_world(self.position, chunk_size)
    }

    /// Move the hotbar selection by `step` slots, wrapping both ways.
    pub fn cycle_inventory(&mut self, step: i32) {
        let n = BlockType::INVENTORY.len() as i64;
        let idx = (self.inventory_index as i64 + i64::from(step)).rem_euclid(n);
        self.inventory_index = idx as usize;
    }

    pub fn selected_block(&self) -> BlockType {
        BlockType::INVENTORY[self.inventory_index % BlockType::INVENTORY.len()]
    }
}
