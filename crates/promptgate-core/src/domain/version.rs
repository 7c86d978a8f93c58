//! Prompt version inputs.

use promptgate_state::VersionId;

use super::error::{Result, ValidationError};

/// Name and content checked for emptiness and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDraft {
    pub name: String,
    pub content: String,
}

impl VersionDraft {
    /// Validate a name/content pair. Both must be non-empty after trimming.
    pub fn new(name: &str, content: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField { field: "name" }.into());
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyField { field: "content" }.into());
        }
        Ok(Self {
            name: name.to_string(),
            content: content.to_string(),
        })
    }
}

/// Normalize an operator-supplied version label.
pub fn parse_version_label(label: &str) -> Result<VersionId> {
    let label = label.trim();
    if label.is_empty() {
        return Err(ValidationError::EmptyField { field: "version" }.into());
    }
    Ok(VersionId::from(label))
}
