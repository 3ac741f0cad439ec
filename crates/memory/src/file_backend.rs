//! File-based store: persistent JSON-lines storage.
//!
//! Each line is one JSON-encoded [`MemoryRecord`]. The file is loaded when the
//! store is opened and rewritten on every mutation. The new contents go to a
//! `.tmp` sibling first and are renamed over the store, so the file on disk is
//! always either the old or the new version.

use async_trait::async_trait;
use contreact_core::error::MemoryError;
use contreact_core::memory::{MemoryStore, WriteOutcome};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use crate::record::{self, MemoryRecord};

/// A file-backed store using JSONL (one JSON object per line).
pub struct FileStore {
    path: PathBuf,
    records: RwLock<Vec<MemoryRecord>>,
}

impl FileStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty (it is created on first write). Lines that
    /// fail to parse are skipped with a warning.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, MemoryError> {
        let path = path.into();
        let records = Self::load_from_disk(&path)?;
        debug!(path = %path.display(), count = records.len(), "File memory store loaded");
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Result<Vec<MemoryRecord>, MemoryError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(MemoryError::Storage(format!(
                    "Failed to read memory file {}: {e}",
                    path.display()
                )));
            }
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<MemoryRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory record");
                    None
                }
            })
            .collect())
    }

    /// Write every record to disk as JSONL.
    fn flush(&self, records: &[MemoryRecord]) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }

        let mut content = String::new();
        for record in records {
            let line = serde_json::to_string(record).map_err(|e| {
                MemoryError::Storage(format!("Failed to serialize memory record: {e}"))
            })?;
            content.push_str(&line);
            content.push('\n');
        }

        let staging = self.staging_path();
        std::fs::write(&staging, content).map_err(|e| {
            MemoryError::Storage(format!("Failed to write memory file: {e}"))
        })?;
        std::fs::rename(&staging, &self.path).map_err(|e| {
            MemoryError::Storage(format!("Failed to replace memory file: {e}"))
        })
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl MemoryStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn write(&self, run_id: &str, key: &str, value: &str) -> Result<WriteOutcome, MemoryError> {
        let mut records = self.records.write().await;
        let outcome = record::upsert(&mut records, run_id, key, value);
        self.flush(&records)?;
        Ok(outcome)
    }

    async fn read(&self, run_id: &str, key: &str) -> Result<Option<String>, MemoryError> {
        Ok(record::get(&self.records.read().await, run_id, key))
    }

    async fn list(&self, run_id: &str) -> Result<Vec<String>, MemoryError> {
        Ok(record::keys(&self.records.read().await, run_id))
    }

    async fn delete(&self, run_id: &str, key: &str) -> Result<bool, MemoryError> {
        let mut records = self.records.write().await;
        let deleted = record::remove(&mut records, run_id, key);
        if deleted {
            self.flush(&records)?;
        }
        Ok(deleted)
    }
}
