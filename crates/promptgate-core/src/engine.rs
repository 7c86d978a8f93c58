//! The `PromptGate` engine: one handle over versions, evaluations and slots.
//!
//! Construct it once with the storage backends and a scorer, then share it
//! behind an `Arc`. Each operation delegates to the component that owns the
//! corresponding state.

use std::collections::BTreeMap;
use std::sync::Arc;

use promptgate_state::{
    ActiveSlots, MemoryPromptStore, MemoryScoreStore, MemorySlotStore, PromptStore, PromptVersion,
    ScoreStore, SlotStore, VersionId,
};

use crate::config::EngineConfig;
use crate::domain::environment::{Environment, PublishOutcome};
use crate::domain::error::Result;
use crate::domain::eval::EvaluationRecord;
use crate::eval_runner::EvaluationRunner;
use crate::scorer::Scorer;
use crate::slot_registry::ActiveSlotRegistry;
use crate::version_store::VersionStore;

pub struct PromptGate {
    versions: VersionStore,
    runner: EvaluationRunner,
    registry: ActiveSlotRegistry,
}

impl PromptGate {
    pub fn new(
        prompts: Arc<dyn PromptStore>,
        scores: Arc<dyn ScoreStore>,
        slots: Arc<dyn SlotStore>,
        scorer: Arc<dyn Scorer>,
        config: &EngineConfig,
    ) -> Self {
        let versions = VersionStore::new(prompts);
        let runner = EvaluationRunner::new(
            versions.clone(),
            scores,
            scorer,
            config.scorer_timeout,
        );
        let registry = ActiveSlotRegistry::new(versions.clone(), slots);
        Self {
            versions,
            runner,
            registry,
        }
    }

    /// Engine over fresh in-memory stores.
    pub fn in_memory(scorer: Arc<dyn Scorer>, config: &EngineConfig) -> Self {
        Self::new(
            Arc::new(MemoryPromptStore::new()),
            Arc::new(MemoryScoreStore::new()),
            Arc::new(MemorySlotStore::new()),
            scorer,
            config,
        )
    }

    pub async fn create_version(
        &self,
        name: &str,
        content: &str,
        version: Option<&str>,
    ) -> Result<PromptVersion> {
        self.versions.create(name, content, version).await
    }

    pub async fn update_version(
        &self,
        version: &VersionId,
        name: &str,
        content: &str,
    ) -> Result<PromptVersion> {
        self.versions.update(version, name, content).await
    }

    pub async fn list_versions(&self) -> Result<Vec<PromptVersion>> {
        self.versions.list().await
    }

    pub async fn get_version(&self, version: &VersionId) -> Result<PromptVersion> {
        self.versions.get(version).await
    }

    pub async fn active_slots(&self) -> Result<ActiveSlots> {
        self.registry.slots().await
    }

    /// Set a slot by environment name (`staging`, `production`/`prod`).
    pub async fn set_active_slot(&self, environment: &str, version: &VersionId) -> Result<()> {
        let environment: Environment = environment.parse()?;
        self.registry.set_active_slot(environment, version).await
    }

    pub async fn set_staging(&self, version: &VersionId) -> Result<()> {
        self.registry.set_staging(version).await
    }

    pub async fn run_evaluation(&self, version: &VersionId) -> Result<EvaluationRecord> {
        self.runner.run(version).await
    }

    /// Evaluate several versions concurrently, results in input order.
    pub async fn run_many(
        &self,
        versions: &[VersionId],
    ) -> Vec<(VersionId, Result<EvaluationRecord>)> {
        self.runner.run_many(versions).await
    }

    /// Evaluate every known version.
    pub async fn run_all(&self) -> Result<Vec<(VersionId, Result<EvaluationRecord>)>> {
        let versions: Vec<VersionId> = self
            .versions
            .list()
            .await?
            .into_iter()
            .map(|v| v.version)
            .collect();
        Ok(self.runner.run_many(&versions).await)
    }

    pub async fn score_of(&self, version: &VersionId) -> Result<Option<EvaluationRecord>> {
        self.runner.score_of(version).await
    }

    pub async fn scores(&self) -> Result<BTreeMap<VersionId, f64>> {
        self.runner.scores().await
    }

    /// Promote staging into production through the publish gate.
    pub async fn publish(&self, expected_staging: Option<&VersionId>) -> Result<PublishOutcome> {
        self.registry.publish(&self.runner, expected_staging).await
    }
}
