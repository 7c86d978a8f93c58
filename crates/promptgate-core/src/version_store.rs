use std::sync::Arc;

use promptgate_state::{PromptStore, PromptVersion, VersionId};

use crate::domain::error::{PromptGateError, Result};
use crate::domain::version::{parse_version_label, VersionDraft};
use crate::obs;

/// Thin API layer over a prompt store backend: input validation and
/// domain errors on top of the raw storage contract.
#[derive(Clone)]
pub struct VersionStore {
    store: Arc<dyn PromptStore>,
}

impl VersionStore {
    pub fn new(store: Arc<dyn PromptStore>) -> Self {
        Self { store }
    }

    /// Create a version. An explicit `version` label that already exists is
    /// rejected with `ValidationError::DuplicateVersion`; it never updates
    /// the existing version.
    pub async fn create(
        &self,
        name: &str,
        content: &str,
        version: Option<&str>,
    ) -> Result<PromptVersion> {
        let draft = VersionDraft::new(name, content)?;
        let version = version.map(parse_version_label).transpose()?;

        let created = self
            .store
            .insert(version, draft.name, draft.content)
            .await?;
        obs::emit_version_created(created.version.as_str(), created.content.len());
        Ok(created)
    }

    /// Replace name and content of an existing version.
    pub async fn update(
        &self,
        version: &VersionId,
        name: &str,
        content: &str,
    ) -> Result<PromptVersion> {
        let draft = VersionDraft::new(name, content)?;
        let updated = self
            .store
            .update(version, draft.name, draft.content)
            .await?;
        obs::emit_version_updated(updated.version.as_str(), updated.content.len());
        Ok(updated)
    }

    pub async fn get(&self, version: &VersionId) -> Result<PromptVersion> {
        self.store
            .get(version)
            .await?
            .ok_or_else(|| PromptGateError::VersionNotFound(version.clone()))
    }

    pub async fn exists(&self, version: &VersionId) -> Result<bool> {
        Ok(self.store.get(version).await?.is_some())
    }

    /// All versions, oldest first.
    pub async fn list(&self) -> Result<Vec<PromptVersion>> {
        Ok(self.store.list().await?)
    }
}
