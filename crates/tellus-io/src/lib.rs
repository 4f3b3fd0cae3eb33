//! World save files: observer state plus the edit overlay as JSON.
#![forbid(unsafe_code)]

mod observer;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tellus_edit::{EditFile, EditFileError, EditStore};
use tellus_geom::Vec3;

pub use observer::{MAX_VITAL, ObserverState};

pub const SAVE_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    pub version: u32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    #[serde(default)]
    pub inventory_index: usize,
    #[serde(default = "default_vital")]
    pub hunger: f32,
    #[serde(default = "default_vital")]
    pub health: f32,
    #[serde(flatten)]
    pub edits: EditFile,
}

fn default_vital() -> f32 {
    MAX_VITAL
}

impl SaveFile {
    pub fn capture(observer: &ObserverState, edits: &EditStore) -> Self {
        Self {
            version: SAVE_VERSION,
            position: observer.position.to_array(),
            rotation: observer.rotation.to_array(),
            inventory_index: observer.inventory_index,
            hunger: observer.hunger,
            health: observer.health,
            edits: edits.to_file(),
        }
    }

    pub fn observer(&self) -> ObserverState {
        ObserverState {
            position: Vec3::from(self.position),
            rotation: Vec3::from(self.rotation),
            inventory_index: self.inventory_index,
            health: self.health,
            hunger: self.hunger,
        }
    }
}

/// A successfully read save.
#[derive(Clone, Debug)]
pub struct LoadedWorld {
    pub observer: ObserverState,
    pub edits: EditStore,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("save file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("save file {path} is not valid JSON: {source}")]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("save file {path} has unsupported version {found}")]
    UnsupportedVersion { path: PathBuf, found: u64 },
    #[error("save file {path}: {source}")]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: EditFileError,
    },
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "world.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_tmp(tmp: &Path, save: &SaveFile) -> io::Result<()> {
    let file = File::create(tmp)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, save)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn write_atomic(path: &Path, save: &SaveFile) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = tmp_path_for(path);
    let result = write_tmp(&tmp, save).and_then(|()| fs::rename(&tmp, path));
    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!(target: "io", "could not remove {}: {e}", tmp.display());
            }
        }
    }
    result
}

/// Write the observer and edit overlay to `path`, replacing any previous
/// save only once the new one is fully on disk.
pub fn save(path: &Path, observer: &ObserverState, edits: &EditStore) -> Result<(), PersistError> {
    let save = SaveFile::capture(observer, edits);
    write_atomic(path, &save).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        target: "io",
        "saved {} placed / {} removed edits to {}",
        save.edits.placed.len(),
        save.edits.removed.len(),
        path.display()
    );
    Ok(())
}

/// Read a save. A missing file means there is no saved world yet.
pub fn load(path: &Path, chunk_size: u32) -> Result<Option<LoadedWorld>, PersistError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::info!(target: "io", "no save at {}", path.display());
            return Ok(None);
        }
        Err(source) => {
            return Err(PersistError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let malformed = |source: serde_json::Error| PersistError::MalformedJson {
        path: path.to_path_buf(),
        source,
    };
    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(malformed)?;
    let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
    if version != u64::from(SAVE_VERSION) {
        return Err(PersistError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: version,
        });
    }
    let save: SaveFile = serde_json::from_value(value).map_err(malformed)?;
    let edits =
        EditStore::from_file(&save.edits, chunk_size).map_err(|source| PersistError::MalformedRecord {
            path: path.to_path_buf(),
            source,
        })?;
    log::info!(
        target: "io",
        "loaded {} edits from {}",
        edits.len(),
        path.display()
    );
    Ok(Some(LoadedWorld {
        observer: save.observer(),
        edits,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_sits_next_to_target() {
        assert_eq!(
            tmp_path_for(Path::new("saves/world.json")),
            PathBuf::from("saves/world.json.tmp")
        );
    }

    #[test]
    fn json_layout_is_flat() {
        let save = SaveFile::capture(&ObserverState::default(), &EditStore::new(16));
        let v = serde_json::to_value(&save).unwrap();
        assert_eq!(v["version"], 1);
        assert_eq!(v["inventory_index"], 0);
        assert!(v["placed"].as_array().unwrap().is_empty());
        assert!(v["removed"].as_array().unwrap().is_empty());
        assert_eq!(v["position"].as_array().unwrap().len(), 3);
    }
}
