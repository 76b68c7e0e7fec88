//! Snapshot persistence for the fact store.
//!
//! The whole fact/context state is serialized to a single JSON file. When
//! that file grows past a configured threshold it is renamed with a
//! timestamp suffix before a fresh file is written, and only the most
//! recent N rotated files are retained.

use crate::facts::{FactStore, MemoryFact};
use chrono::Utc;
use mentat_core::error::MemoryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// The on-disk snapshot format.
#[derive(Debug, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub facts: Vec<MemoryFact>,
    pub context: BTreeMap<String, Value>,
    pub saved_at: String,
}

/// Writes and rotates snapshots at a fixed path.
pub struct SnapshotStore {
    path: PathBuf,
    max_bytes: u64,
    max_rotated: usize,
}

impl SnapshotStore {
    pub fn new(path: PathBuf, max_bytes: u64, max_rotated: usize) -> Self {
        Self {
            path,
            max_bytes,
            max_rotated,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot the fact store to disk, rotating first if the current file
    /// exceeds the size threshold.
    pub async fn save(&self, store: &FactStore) -> Result<(), MemoryError> {
        self.rotate_if_needed()?;

        let snapshot = MemorySnapshot {
            facts: store.all_facts().await,
            context: store.all_context().await,
            saved_at: Utc::now().to_rfc3339(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MemoryError::Storage(format!("Failed to create snapshot directory: {e}"))
            })?;
        }

        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| MemoryError::Storage(format!("Failed to serialize snapshot: {e}")))?;
        std::fs::write(&self.path, json)
            .map_err(|e| MemoryError::Storage(format!("Failed to write snapshot: {e}")))?;

        debug!(path = %self.path.display(), facts = snapshot.facts.len(), "Saved memory snapshot");
        Ok(())
    }

    /// Load a snapshot into the fact store. A missing file is not an error;
    /// the store is simply left empty.
    pub async fn load(&self, store: &FactStore) -> Result<(), MemoryError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Ok(()),
        };

        let snapshot: MemorySnapshot = serde_json::from_str(&content)
            .map_err(|e| MemoryError::Storage(format!("Corrupt snapshot: {e}")))?;
        let count = snapshot.facts.len();
        store.restore(snapshot.facts, snapshot.context).await;
        info!(path = %self.path.display(), facts = count, "Loaded memory snapshot");
        Ok(())
    }

    /// Rename the current file with a timestamp suffix if it exceeds the
    /// size threshold, then prune old rotated files.
    fn rotate_if_needed(&self) -> Result<(), MemoryError> {
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size <= self.max_bytes {
            return Ok(());
        }

        let rotated = self.rotated_name(&Utc::now().format("%Y%m%d_%H%M%S").to_string());
        std::fs::rename(&self.path, &rotated)
            .map_err(|e| MemoryError::Storage(format!("Failed to rotate snapshot: {e}")))?;
        info!(rotated = %rotated.display(), size, "Rotated memory snapshot");

        self.cleanup_rotated();
        Ok(())
    }

    fn rotated_name(&self, timestamp: &str) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("memory");
        let ext = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("json");
        self.path.with_file_name(format!("{stem}_{timestamp}.{ext}"))
    }

    /// Keep only the newest `max_rotated` rotated files. Errors here are
    /// logged, not propagated — a failed cleanup must not fail the save.
    fn cleanup_rotated(&self) {
        let Some(parent) = self.path.parent() else {
            return;
        };
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("memory");

        let entries = match std::fs::read_dir(parent) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Failed to list rotated snapshots");
                return;
            }
        };

        let mut rotated: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p != &self.path
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(&format!("{stem}_")))
            })
            .collect();

        // Timestamp suffixes sort lexicographically in age order.
        rotated.sort();
        rotated.reverse();

        for old in rotated.into_iter().skip(self.max_rotated) {
            match std::fs::remove_file(&old) {
                Ok(()) => debug!(path = %old.display(), "Deleted old rotated snapshot"),
                Err(e) => warn!(path = %old.display(), error = %e, "Failed to delete rotated snapshot"),
            }
        }
    }
}
