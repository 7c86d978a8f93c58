//! Serializable capture of the in-memory stores.
//!
//! The CLI loads a snapshot at startup, rebuilds the memory backends from it,
//! and writes it back after a mutating command.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageError;
use crate::memory::{MemoryPromptStore, MemoryScoreStore, MemorySlotStore};
use crate::storage_traits::*;

/// Layout version written into every snapshot file.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub schema_version: String,
    pub versions: Vec<PromptVersion>,
    pub evaluations: Vec<EvaluationRecord>,
    pub slots: ActiveSlots,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            versions: Vec::new(),
            evaluations: Vec::new(),
            slots: ActiveSlots::default(),
        }
    }
}

impl StateSnapshot {
    /// Capture the current contents of any conforming stores.
    pub async fn capture(
        prompts: &dyn PromptStore,
        scores: &dyn ScoreStore,
        slots: &dyn SlotStore,
    ) -> StorageResult<Self> {
        Ok(Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            versions: prompts.list().await?,
            evaluations: scores.list().await?,
            slots: slots.slots().await?,
        })
    }

    /// Rebuild memory backends holding this snapshot's contents.
    pub fn into_stores(self) -> (MemoryPromptStore, MemoryScoreStore, MemorySlotStore) {
        (
            MemoryPromptStore::from_versions(self.versions),
            MemoryScoreStore::from_records(self.evaluations),
            MemorySlotStore::from_slots(self.slots),
        )
    }

    /// Read a snapshot file. A missing file yields an empty snapshot.
    pub fn load(path: &Path) -> StorageResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no snapshot file, starting empty");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let snapshot: StateSnapshot = serde_json::from_str(&raw)?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(StorageError::Snapshot(format!(
                "schema version {} (expected {})",
                snapshot.schema_version, SNAPSHOT_SCHEMA_VERSION
            )));
        }
        Ok(snapshot)
    }

    /// Write the snapshot as pretty JSON through a temporary sibling file,
    /// creating parent directories.
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        // Readers never observe a half-written file.
        let tmp = sibling(path, "tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), versions = self.versions.len(), "snapshot saved");
        Ok(())
    }
}

/// `<path>.<suffix>` next to `path`.
pub(crate) fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
