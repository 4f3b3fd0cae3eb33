//! Block type catalogue.
#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of voxel materials. The serialized form is the snake_case
/// name, which is also what save files store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Grass,
    Gravel,
    Stone,
    StoneBricks,
    Log,
    Wood,
    Glass,
    Leaves,
}

impl BlockType {
    pub const ALL: [BlockType; 8] = [
        BlockType::Grass,
        BlockType::Gravel,
        BlockType::Stone,
        BlockType::StoneBricks,
        BlockType::Log,
        BlockType::Wood,
        BlockType::Glass,
        BlockType::Leaves,
    ];

    /// Hotbar order. Leaves only come from terrain decoration.
    pub const INVENTORY: [BlockType; 7] = [
        BlockType::Grass,
        BlockType::Gravel,
        BlockType::Stone,
        BlockType::StoneBricks,
        BlockType::Log,
        BlockType::Wood,
        BlockType::Glass,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            BlockType::Grass => "grass",
            BlockType::Gravel => "gravel",
            BlockType::Stone => "stone",
            BlockType::StoneBricks => "stone_bricks",
            BlockType::Log => "log",
            BlockType::Wood => "wood",
            BlockType::Glass => "glass",
            BlockType::Leaves => "leaves",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            BlockType::Grass => "Grass",
            BlockType::Gravel => "Gravel",
            BlockType::Stone => "Stone",
            BlockType::StoneBricks => "Stone Bricks",
            BlockType::Log => "Log",
            BlockType::Wood => "Wood",
            BlockType::Glass => "Glass",
            BlockType::Leaves => "Leaves",
        }
    }

    /// Texture the renderer is expected to bind for this type.
    pub fn texture_path(self) -> String {
        format!("textures/{}.png", self.name())
    }

    pub fn from_name(name: &str) -> Option<BlockType> {
        BlockType::ALL.into_iter().find(|b| b.name() == name)
    }

    #[inline]
    pub fn is_placeable(self) -> bool {
        BlockType::INVENTORY.contains(&self)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownBlockType(pub String);

impl fmt::Display for UnknownBlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown block type '{}'", self.0)
    }
}

impl std::error::Error for UnknownBlockType {}

impl FromStr for BlockType {
    type Err = UnknownBlockType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BlockType::from_name(s).ok_or_else(|| UnknownBlockType(s.to_string()))
    }
}
