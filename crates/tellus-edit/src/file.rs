//! Serialisable form of the edit overlay. The op of a record is implied by
//! the list it sits in.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tellus_blocks::BlockType;
use tellus_geom::BlockPos;

use crate::{EditOp, EditRecord, EditStore};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub position: [f64; 3],
    pub block_type: BlockType,
}

impl From<&EditRecord> for BlockRecord {
    fn from(r: &EditRecord) -> Self {
        Self {
            position: r.position.to_lattice(),
            block_type: r.block_type,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EditFile {
    #[serde(default)]
    pub placed: Vec<BlockRecord>,
    #[serde(default)]
    pub removed: Vec<BlockRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditList {
    Placed,
    Removed,
}

impl fmt::Display for EditList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EditList::Placed => "placed",
            EditList::Removed => "removed",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EditFileError {
    #[error("malformed record {list}[{index}]: {reason}")]
    MalformedRecord {
        list: EditList,
        index: usize,
        reason: String,
    },
}

impl EditStore {
    /// Snapshot the overlay, each list sorted by position.
    pub fn to_file(&self) -> EditFile {
        let mut placed: Vec<&EditRecord> = Vec::new();
        let mut removed: Vec<&EditRecord> = Vec::new();
        for r in self.iter() {
            match r.op {
                EditOp::Placed => placed.push(r),
                EditOp::Removed => removed.push(r),
            }
        }
        placed.sort_by_key(|r| r.position);
        removed.sort_by_key(|r| r.position);
        EditFile {
            placed: placed.into_iter().map(BlockRecord::from).collect(),
            removed: removed.into_iter().map(BlockRecord::from).collect(),
        }
    }

    /// Rebuild an overlay from its file form. Nothing is applied unless
    /// every record is valid.
    pub fn from_file(file: &EditFile, chunk_size: u32) -> Result<EditStore, EditFileError> {
        let mut store = EditStore::new(chunk_size);
        let mut seen: HashSet<BlockPos> = HashSet::new();
        let lists = [
            (EditList::Placed, &file.placed),
            (EditList::Removed, &file.removed),
        ];
        for (list, records) in lists {
            for (index, rec) in records.iter().enumerate() {
                let [x, y, z] = rec.position;
                let pos = BlockPos::from_lattice(x, y, z).ok_or_else(|| {
                    EditFileError::MalformedRecord {
                        list,
                        index,
                        reason: format!("position {:?} is not a lattice point", rec.position),
                    }
                })?;
                if !seen.insert(pos) {
                    return Err(EditFileError::MalformedRecord {
                        list,
                        index,
                        reason: format!("position ({},{},{}) listed twice", pos.x, pos.y, pos.z),
                    });
                }
                let record = match list {
                    EditList::Placed => EditRecord::placed(pos, rec.block_type),
                    EditList::Removed => EditRecord::removed(pos, rec.block_type),
                };
                store.insert(record);
            }
        }
        // Freshly loaded history matches what is on disk.
        store.mark_saved();
        Ok(store)
    }
}
