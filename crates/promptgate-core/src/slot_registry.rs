//! Environment slot registry.
//!
//! Owns the `staging` / `production` pointers. Staging can be pointed at any
//! existing version; production moves only through [`ActiveSlotRegistry::publish`],
//! which consults the publish gate and commits with a compare-and-set.

use std::sync::Arc;

use chrono::Utc;
use promptgate_state::{ActiveSlots, SlotStore, VersionId};
use tokio::sync::Mutex;

use crate::domain::environment::{Environment, PublishOutcome};
use crate::domain::error::{PromptGateError, Result, ValidationError};
use crate::metrics::METRICS;
use crate::obs;
use crate::publish_gate::{evaluate_publish_gate, GateInput, GateVerdict, ScoreLookup};
use crate::version_store::VersionStore;

/// Thin API layer over a slot store backend.
///
/// `set_staging` and `publish` hold one writer lock for their whole
/// read-decide-write sequence, so two publishes from the same registry never
/// interleave. Registries sharing a store are kept apart by the store's
/// production compare-and-set.
pub struct ActiveSlotRegistry {
    versions: VersionStore,
    slots: Arc<dyn SlotStore>,
    write_lock: Mutex<()>,
}

impl ActiveSlotRegistry {
    pub fn new(versions: VersionStore, slots: Arc<dyn SlotStore>) -> Self {
        Self {
            versions,
            slots,
            write_lock: Mutex::new(()),
        }
    }

    /// Current pointers.
    pub async fn slots(&self) -> Result<ActiveSlots> {
        Ok(self.slots.slots().await?)
    }

    /// Point staging at an existing version. Evaluation state is not checked.
    pub async fn set_staging(&self, version: &VersionId) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if !self.versions.exists(version).await? {
            return Err(PromptGateError::VersionNotFound(version.clone()));
        }
        let previous = self.slots.slots().await?.staging;
        self.slots.set_staging(version.clone()).await?;

        obs::emit_staging_set(
            version.as_str(),
            previous.as_ref().map(VersionId::as_str),
        );
        Ok(())
    }

    /// Set a slot by environment. Only staging is directly settable.
    pub async fn set_active_slot(&self, environment: Environment, version: &VersionId) -> Result<()> {
        match environment {
            Environment::Staging => self.set_staging(version).await,
            Environment::Production => Err(ValidationError::ProductionNotSettable.into()),
        }
    }

    /// Promote staging into production if the publish gate admits it.
    ///
    /// With `expected_staging` set, the publish only proceeds while staging
    /// still points at that version. Every failure leaves production as it
    /// was.
    pub async fn publish(
        &self,
        scores: &dyn ScoreLookup,
        expected_staging: Option<&VersionId>,
    ) -> Result<PublishOutcome> {
        let _guard = self.write_lock.lock().await;

        let observed = self.slots.slots().await?;
        if let Some(expected) = expected_staging {
            if observed.staging.as_ref() != Some(expected) {
                let err = PromptGateError::ConcurrentModification {
                    slot: Environment::Staging,
                    expected: Some(expected.clone()),
                    actual: observed.staging.clone(),
                };
                obs::emit_publish_rejected("ConcurrentModification", &err);
                METRICS.inc_publishes_rejected();
                return Err(err);
            }
        }

        let input = GateInput::observe(
            observed.staging.as_ref(),
            observed.production.as_ref(),
            scores,
        )
        .await?;

        let (candidate, score) = match evaluate_publish_gate(&input) {
            GateVerdict::Admit { candidate, score } => (candidate, score),
            GateVerdict::Reject(rejection) => {
                obs::emit_publish_rejected(rejection.reason_code(), &rejection);
                METRICS.inc_publishes_rejected();
                return Err(rejection.into());
            }
        };

        if let Err(err) = self
            .slots
            .compare_and_set_production(observed.production.as_ref(), candidate.clone())
            .await
        {
            let err = PromptGateError::from(err);
            obs::emit_publish_rejected("ConcurrentModification", &err);
            METRICS.inc_publishes_rejected();
            return Err(err);
        }

        obs::emit_publish_committed(
            candidate.as_str(),
            observed.production.as_ref().map(VersionId::as_str),
            score,
        );
        METRICS.inc_publishes_committed();

        Ok(PublishOutcome {
            production: candidate,
            score,
            previous: observed.production,
            published_at: Utc::now(),
        })
    }
}
