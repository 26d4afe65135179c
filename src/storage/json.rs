//! JSON file checkpoint store
//!
//! Records are written as a pretty-printed JSON array so checkpoints stay
//! readable and diffable by hand.

use crate::storage::traits::{CheckpointStore, StorageResult};
use crate::storage::{dedup_by_id, Record};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Checkpoint store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for JsonFileStore {
    fn load(&self) -> Vec<Record> {
        if !self.path.exists() {
            tracing::debug!("No checkpoint at {}", self.path.display());
            return Vec::new();
        }

        match read_records(&self.path) {
            Ok(mut records) => {
                let dropped = dedup_by_id(&mut records);
                if dropped > 0 {
                    tracing::warn!(
                        "Checkpoint {} contained {} duplicate ids, keeping first occurrences",
                        self.path.display(),
                        dropped
                    );
                }
                records
            }
            Err(e) => {
                tracing::warn!(
                    "Ignoring unusable checkpoint {}: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    fn save(&mut self, records: &[Record]) -> StorageResult<()> {
        write_records(&self.path, records)
    }
}

/// Reads a record array from `path`
pub fn read_records(path: &Path) -> StorageResult<Vec<Record>> {
    let bytes = std::fs::read(path)?;
    let records = serde_json::from_slice::<Vec<Record>>(&bytes)?;
    Ok(records)
}

/// Writes `records` to `path` as a complete snapshot
///
/// The array is written to a sibling temporary file and flushed to disk before
/// it is renamed over the target, so readers only ever see the previous or the
/// new snapshot.
pub fn write_records(path: &Path, records: &[Record]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path_for(path);
    let bytes = serde_json::to_vec_pretty(records)?;
    let mut file = File::create(&tmp_path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "records".into());
    name.push(".tmp");
    path.with_file_name(name)
}
