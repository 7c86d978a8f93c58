//! Trait contract tests for PromptStore, ScoreStore, and SlotStore.
//!
//! These tests verify the behavioral contracts of the storage traits
//! using the in-memory backends. Any conforming implementation must pass these.

use chrono::Utc;
use promptgate_state::memory::{MemoryPromptStore, MemoryScoreStore, MemorySlotStore};
use promptgate_state::storage_traits::*;
use promptgate_state::StorageError;
use uuid::Uuid;

fn record(version: &str, average: f64) -> EvaluationRecord {
    EvaluationRecord {
        version: VersionId::from(version),
        run_id: Uuid::new_v4(),
        content_digest: ContentDigest::from_bytes(version.as_bytes()),
        evaluated_at: Utc::now(),
        duration_ms: 5,
        summary: EvaluationSummary {
            average_score: Some(average),
            total_fixtures: 1,
            results: vec![FixtureResult {
                fixture_id: "f1".to_string(),
                input: "hello".to_string(),
                category: "greeting".to_string(),
                score: average,
                keywords_found: 1,
                keywords_total: 2,
            }],
            distribution: BandCounts::default(),
        },
    }
}

// ===========================================================================
// PromptStore contract tests
// ===========================================================================

#[tokio::test]
async fn prompt_insert_derives_sequential_ids() {
    let store = MemoryPromptStore::new();
    let a = store.insert(None, "A".into(), "x".into()).await.unwrap();
    let b = store.insert(None, "B".into(), "y".into()).await.unwrap();

    assert_eq!(a.version.as_str(), "v1");
    assert_eq!(b.version.as_str(), "v2");
    assert!(a.seq < b.seq);
}

#[tokio::test]
async fn prompt_insert_rejects_duplicate_identity() {
    let store = MemoryPromptStore::new();
    store
        .insert(Some("1.0.0".into()), "A".into(), "x".into())
        .await
        .unwrap();
    let err = store
        .insert(Some("1.0.0".into()), "B".into(), "y".into())
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::VersionExists { .. }));
    let stored = store.get(&"1.0.0".into()).await.unwrap().unwrap();
    assert_eq!(stored.name, "A");
}

#[tokio::test]
async fn prompt_update_preserves_identity_and_creation() {
    let store = MemoryPromptStore::new();
    let created = store.insert(None, "A".into(), "x".into()).await.unwrap();
    let updated = store
        .update(&created.version, "A2".into(), "x2".into())
        .await
        .unwrap();

    assert_eq!(updated.version, created.version);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.seq, created.seq);
    assert_eq!(updated.name, "A2");
    assert_eq!(updated.content, "x2");
    assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn prompt_update_unknown_version_fails() {
    let store = MemoryPromptStore::new();
    let err = store
        .update(&"ghost".into(), "A".into(), "x".into())
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::VersionNotFound { .. }));
}

#[tokio::test]
async fn prompt_list_is_creation_ordered_and_stable() {
    let store = MemoryPromptStore::new();
    for name in ["first", "second", "third"] {
        store
            .insert(None, name.to_string(), "body".into())
            .await
            .unwrap();
    }
    store
        .update(&"v1".into(), "first-edited".into(), "body".into())
        .await
        .unwrap();

    let once: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.version.to_string())
        .collect();
    let twice: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.version.to_string())
        .collect();

    assert_eq!(once, vec!["v1", "v2", "v3"]);
    assert_eq!(once, twice);
}

#[tokio::test]
async fn prompt_list_follows_sequence_when_clock_steps_back() {
    let now = Utc::now();
    let version = |id: &str, seq: u64, created_at| PromptVersion {
        version: VersionId::from(id),
        name: id.to_string(),
        content: "body".to_string(),
        created_at,
        updated_at: created_at,
        seq,
    };
    // v2 was created after v1 but stamped an hour earlier.
    let store = MemoryPromptStore::from_versions(vec![
        version("v2", 2, now - chrono::Duration::hours(1)),
        version("v1", 1, now),
    ]);
    let v3 = store.insert(None, "third".into(), "body".into()).await.unwrap();
    assert_eq!(v3.version.as_str(), "v3");

    let order: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.version.to_string())
        .collect();
    assert_eq!(order, vec!["v1", "v2", "v3"]);
}

#[tokio::test]
async fn prompt_get_missing_is_none() {
    let store = MemoryPromptStore::new();
    assert!(store.get(&"nope".into()).await.unwrap().is_none());
}

// ===========================================================================
// ScoreStore contract tests
// ===========================================================================

#[tokio::test]
async fn score_put_replaces_prior_record() {
    let store = MemoryScoreStore::new();
    store.put(record("v1", 70.0)).await.unwrap();
    store.put(record("v1", 42.0)).await.unwrap();

    let latest = store.get(&"v1".into()).await.unwrap().unwrap();
    assert_eq!(latest.average_score(), Some(42.0));
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn score_get_missing_is_none() {
    let store = MemoryScoreStore::new();
    assert!(store.get(&"v9".into()).await.unwrap().is_none());
}

// ===========================================================================
// SlotStore contract tests
// ===========================================================================

#[tokio::test]
async fn slots_start_empty() {
    let store = MemorySlotStore::new();
    assert_eq!(store.slots().await.unwrap(), ActiveSlots::default());
}

#[tokio::test]
async fn set_staging_does_not_touch_production() {
    let store = MemorySlotStore::new();
    store.set_staging("v1".into()).await.unwrap();

    let slots = store.slots().await.unwrap();
    assert_eq!(slots.staging, Some("v1".into()));
    assert_eq!(slots.production, None);
}

#[tokio::test]
async fn cas_production_succeeds_on_expected_value() {
    let store = MemorySlotStore::new();
    let slots = store
        .compare_and_set_production(None, "v1".into())
        .await
        .unwrap();
    assert_eq!(slots.production, Some("v1".into()));

    let v1 = VersionId::from("v1");
    let slots = store
        .compare_and_set_production(Some(&v1), "v2".into())
        .await
        .unwrap();
    assert_eq!(slots.production, Some("v2".into()));
}

#[tokio::test]
async fn cas_production_rejects_stale_expectation() {
    let store = MemorySlotStore::new();
    store
        .compare_and_set_production(None, "v1".into())
        .await
        .unwrap();

    // A second writer that still believes production is unset loses.
    let err = store
        .compare_and_set_production(None, "v2".into())
        .await
        .unwrap_err();

    match err {
        StorageError::ProductionChanged { expected, actual } => {
            assert_eq!(expected, None);
            assert_eq!(actual.as_deref(), Some("v1"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        store.slots().await.unwrap().production,
        Some("v1".into())
    );
}
