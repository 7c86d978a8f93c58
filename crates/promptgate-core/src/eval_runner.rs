//! Evaluation runs.
//!
//! [`EvaluationRunner::run`] scores a version's current content through the
//! external [`Scorer`], aggregates the fixture results and stores the record
//! keyed by version, replacing any earlier one. A failed run stores nothing.
//!
//! Runs for different versions proceed in parallel. Runs for the same
//! version serialize on a per-version async lock, so the stored record is
//! always the output of one complete run.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use promptgate_state::{ContentDigest, ScoreStore, VersionId};
use tracing::Instrument;
use uuid::Uuid;

use crate::aggregate::aggregate;
use crate::domain::error::{Result, ScoringError};
use crate::domain::eval::{EvaluationRecord, FixtureResult};
use crate::metrics::METRICS;
use crate::obs;
use crate::publish_gate::ScoreLookup;
use crate::scorer::Scorer;
use crate::version_store::VersionStore;

pub struct EvaluationRunner {
    versions: VersionStore,
    scores: Arc<dyn ScoreStore>,
    scorer: Arc<dyn Scorer>,
    timeout: Duration,
    version_locks: Mutex<HashMap<VersionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl EvaluationRunner {
    pub fn new(
        versions: VersionStore,
        scores: Arc<dyn ScoreStore>,
        scorer: Arc<dyn Scorer>,
        timeout: Duration,
    ) -> Self {
        Self {
            versions,
            scores,
            scorer,
            timeout,
            version_locks: Mutex::new(HashMap::new()),
        }
    }

    fn version_lock(&self, version: &VersionId) -> Arc<tokio::sync::Mutex<()>> {
        self.version_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(version.clone())
            .or_default()
            .clone()
    }

    /// Evaluate `version` and store the result.
    ///
    /// Fails with `VersionNotFound` for an unknown version and with
    /// `Scoring` when the scorer is unreachable, exceeds the configured
    /// timeout, or returns malformed results. On failure the previously
    /// stored record (if any) is left untouched.
    pub async fn run(&self, version: &VersionId) -> Result<EvaluationRecord> {
        // Fail fast on unknown versions before queueing behind a lock.
        self.versions.get(version).await?;

        let lock = self.version_lock(version);
        let _guard = lock.lock().await;

        // Content may have changed while waiting for the lock.
        let prompt = self.versions.get(version).await?;
        let run_id = Uuid::new_v4();
        let span = obs::eval_span(version.as_str(), &run_id.to_string());

        self.score_and_store(version, &prompt.content, prompt.content_digest(), run_id)
            .instrument(span)
            .await
    }

    async fn score_and_store(
        &self,
        version: &VersionId,
        content: &str,
        content_digest: ContentDigest,
        run_id: Uuid,
    ) -> Result<EvaluationRecord> {
        obs::emit_eval_started(version.as_str(), &run_id.to_string());
        let started = Instant::now();

        let scored = match tokio::time::timeout(self.timeout, self.scorer.score(content)).await {
            Ok(result) => result,
            Err(_) => Err(ScoringError::TimedOut {
                after_ms: self.timeout.as_millis() as u64,
            }),
        };
        let results = match scored.and_then(|results| {
            validate_results(&results)?;
            Ok(results)
        }) {
            Ok(results) => results,
            Err(err) => {
                obs::emit_eval_failed(version.as_str(), &run_id.to_string(), &err);
                METRICS.inc_evaluations_failed();
                return Err(err.into());
            }
        };

        let summary = aggregate(&results);
        let duration_ms = started.elapsed().as_millis() as u64;
        let record = EvaluationRecord {
            version: version.clone(),
            run_id,
            content_digest,
            evaluated_at: Utc::now(),
            duration_ms,
            summary,
        };
        self.scores.put(record.clone()).await?;

        obs::emit_eval_finished(
            version.as_str(),
            &run_id.to_string(),
            record.average_score().unwrap_or_default(),
            record.summary.total_fixtures,
            duration_ms,
        );
        METRICS.inc_evaluations_run();
        Ok(record)
    }

    /// Evaluate several versions concurrently. Results come back in input
    /// order; one failure does not affect the others.
    pub async fn run_many(
        &self,
        versions: &[VersionId],
    ) -> Vec<(VersionId, Result<EvaluationRecord>)> {
        let runs = versions.iter().map(|version| async move {
            let outcome = self.run(version).await;
            (version.clone(), outcome)
        });
        join_all(runs).await
    }

    /// Latest stored record for `version`; `None` if never evaluated.
    pub async fn score_of(&self, version: &VersionId) -> Result<Option<EvaluationRecord>> {
        Ok(self.scores.get(version).await?)
    }

    /// Version → average score for every evaluated version.
    pub async fn scores(&self) -> Result<BTreeMap<VersionId, f64>> {
        Ok(self
            .scores
            .list()
            .await?
            .into_iter()
            .filter_map(|record| {
                let average = record.average_score()?;
                Some((record.version, average))
            })
            .collect())
    }
}

#[async_trait]
impl ScoreLookup for EvaluationRunner {
    async fn average_score(&self, version: &VersionId) -> Result<Option<f64>> {
        Ok(self
            .score_of(version)
            .await?
            .and_then(|record| record.average_score()))
    }
}

/// Reject scorer output the engine cannot aggregate.
fn validate_results(results: &[FixtureResult]) -> std::result::Result<(), ScoringError> {
    if results.is_empty() {
        return Err(ScoringError::Malformed(
            "scorer returned no fixture results".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for result in results {
        if !result.score.is_finite() || !(0.0..=100.0).contains(&result.score) {
            return Err(ScoringError::Malformed(format!(
                "fixture {} score {} outside 0-100",
                result.fixture_id, result.score
            )));
        }
        if result.keywords_found > result.keywords_total {
            return Err(ScoringError::Malformed(format!(
                "fixture {} found {} of {} keywords",
                result.fixture_id, result.keywords_found, result.keywords_total
            )));
        }
        if !seen.insert(result.fixture_id.as_str()) {
            return Err(ScoringError::Malformed(format!(
                "duplicate fixture id {}",
                result.fixture_id
            )));
        }
    }
    Ok(())
}
