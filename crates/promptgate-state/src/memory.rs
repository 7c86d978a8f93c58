//! In-memory storage backends
//!
//! Provides `MemoryPromptStore`, `MemoryScoreStore`, and `MemorySlotStore`
//! that satisfy the trait contracts without any external dependencies. The
//! CLI persists them between invocations through `StateSnapshot`.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::*;

fn lock<'a, T>(mutex: &'a Mutex<T>, store: &'static str) -> StorageResult<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| StorageError::LockPoisoned { store })
}

// ---------------------------------------------------------------------------
// MemoryPromptStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PromptTable {
    /// Insertion order.
    versions: Vec<PromptVersion>,
    index: HashMap<VersionId, usize>,
    last_seq: u64,
}

impl PromptTable {
    /// First free `v{n}` identity starting at `seq`.
    fn derive_id(&self, seq: u64) -> VersionId {
        let mut n = seq;
        loop {
            let candidate = VersionId::new(format!("v{}", n));
            if !self.index.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// In-memory prompt store backed by an insertion-ordered `Vec` plus an
/// identity index.
#[derive(Debug, Default)]
pub struct MemoryPromptStore {
    table: Mutex<PromptTable>,
}

impl MemoryPromptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously captured versions.
    pub fn from_versions(mut versions: Vec<PromptVersion>) -> Self {
        versions.sort_by_key(|v| v.seq);
        let last_seq = versions.iter().map(|v| v.seq).max().unwrap_or(0);
        let index = versions
            .iter()
            .enumerate()
            .map(|(i, v)| (v.version.clone(), i))
            .collect();
        Self {
            table: Mutex::new(PromptTable {
                versions,
                index,
                last_seq,
            }),
        }
    }
}

#[async_trait]
impl PromptStore for MemoryPromptStore {
    async fn insert(
        &self,
        version: Option<VersionId>,
        name: String,
        content: String,
    ) -> StorageResult<PromptVersion> {
        let mut table = lock(&self.table, "prompt store")?;
        let seq = table.last_seq + 1;
        let version = match version {
            Some(v) if table.index.contains_key(&v) => {
                return Err(StorageError::VersionExists {
                    version: v.to_string(),
                });
            }
            Some(v) => v,
            None => table.derive_id(seq),
        };

        let now = Utc::now();
        let record = PromptVersion {
            version: version.clone(),
            name,
            content,
            created_at: now,
            updated_at: now,
            seq,
        };
        let position = table.versions.len();
        table.versions.push(record.clone());
        table.index.insert(version, position);
        table.last_seq = seq;
        debug!(version = %record.version, seq, "prompt version inserted");
        Ok(record)
    }

    async fn update(
        &self,
        version: &VersionId,
        name: String,
        content: String,
    ) -> StorageResult<PromptVersion> {
        let mut table = lock(&self.table, "prompt store")?;
        let position =
            *table
                .index
                .get(version)
                .ok_or_else(|| StorageError::VersionNotFound {
                    version: version.to_string(),
                })?;
        let record = &mut table.versions[position];
        record.name = name;
        record.content = content;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn get(&self, version: &VersionId) -> StorageResult<Option<PromptVersion>> {
        let table = lock(&self.table, "prompt store")?;
        Ok(table
            .index
            .get(version)
            .map(|&position| table.versions[position].clone()))
    }

    async fn list(&self) -> StorageResult<Vec<PromptVersion>> {
        let table = lock(&self.table, "prompt store")?;
        Ok(table.versions.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryScoreStore
// ---------------------------------------------------------------------------

/// In-memory evaluation store backed by a `BTreeMap<VersionId, EvaluationRecord>`.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    records: Mutex<BTreeMap<VersionId, EvaluationRecord>>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<EvaluationRecord>) -> Self {
        Self {
            records: Mutex::new(
                records
                    .into_iter()
                    .map(|r| (r.version.clone(), r))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn put(&self, record: EvaluationRecord) -> StorageResult<()> {
        let mut records = lock(&self.records, "score store")?;
        records.insert(record.version.clone(), record);
        Ok(())
    }

    async fn get(&self, version: &VersionId) -> StorageResult<Option<EvaluationRecord>> {
        let records = lock(&self.records, "score store")?;
        Ok(records.get(version).cloned())
    }

    async fn list(&self) -> StorageResult<Vec<EvaluationRecord>> {
        let records = lock(&self.records, "score store")?;
        Ok(records.values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// MemorySlotStore
// ---------------------------------------------------------------------------

/// In-memory slot store; both pointers live behind one mutex so the
/// production compare-and-set is atomic.
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: Mutex<ActiveSlots>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slots(slots: ActiveSlots) -> Self {
        Self {
            slots: Mutex::new(slots),
        }
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn slots(&self) -> StorageResult<ActiveSlots> {
        Ok(lock(&self.slots, "slot store")?.clone())
    }

    async fn set_staging(&self, version: VersionId) -> StorageResult<()> {
        let mut slots = lock(&self.slots, "slot store")?;
        slots.staging = Some(version);
        Ok(())
    }

    async fn compare_and_set_production(
        &self,
        expected: Option<&VersionId>,
        new: VersionId,
    ) -> StorageResult<ActiveSlots> {
        let mut slots = lock(&self.slots, "slot store")?;
        if slots.production.as_ref() != expected {
            return Err(StorageError::ProductionChanged {
                expected: expected.map(ToString::to_string),
                actual: slots.production.as_ref().map(ToString::to_string),
            });
        }
        slots.production = Some(new);
        Ok(slots.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn derived_ids_skip_explicit_labels() {
        let store = MemoryPromptStore::new();
        store
            .insert(Some(VersionId::from("v2")), "a".into(), "x".into())
            .await
            .unwrap();
        // seq 2 would derive "v2", which is taken
        let derived = store.insert(None, "b".into(), "y".into()).await.unwrap();
        assert_eq!(derived.version.as_str(), "v3");
        assert_eq!(derived.seq, 2);
    }

    #[tokio::test]
    async fn from_versions_continues_sequence() {
        let store = MemoryPromptStore::new();
        let first = store.insert(None, "a".into(), "x".into()).await.unwrap();
        let second = store.insert(None, "b".into(), "y".into()).await.unwrap();

        let restored = MemoryPromptStore::from_versions(vec![second, first]);
        let listed = restored.list().await.unwrap();
        assert_eq!(listed[0].version.as_str(), "v1");
        assert_eq!(listed[1].version.as_str(), "v2");

        let third = restored.insert(None, "c".into(), "z".into()).await.unwrap();
        assert_eq!(third.version.as_str(), "v3");
        assert_eq!(third.seq, 3);
    }
}
