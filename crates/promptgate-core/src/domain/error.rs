//! Domain-level error taxonomy for promptgate.

use promptgate_state::{StorageError, VersionId};

use super::environment::Environment;

/// Caller-correctable input errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("version {version} already exists")]
    DuplicateVersion { version: VersionId },

    #[error("the production slot can only be changed by publish")]
    ProductionNotSettable,
}

/// Failures of the external scorer. Retryable by the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("scorer unreachable: {0}")]
    Unreachable(String),

    #[error("scorer timed out after {after_ms} ms")]
    TimedOut { after_ms: u64 },

    #[error("scorer returned malformed results: {0}")]
    Malformed(String),
}

/// Why the publish gate refused a promotion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GateRejection {
    #[error("no staging version selected")]
    NoStagingSelected,

    #[error("version {version} has not been evaluated")]
    NotEvaluated { version: VersionId },

    #[error(
        "staging {staging} scores {staging_score:.1}, not above production {production} at {production_score:.1}"
    )]
    NoImprovement {
        staging: VersionId,
        staging_score: f64,
        production: VersionId,
        production_score: f64,
    },
}

impl GateRejection {
    /// Stable machine-readable reason code.
    pub fn reason_code(&self) -> &'static str {
        match self {
            GateRejection::NoStagingSelected => "NoStagingSelected",
            GateRejection::NotEvaluated { .. } => "NotEvaluated",
            GateRejection::NoImprovement { .. } => "NoImprovement",
        }
    }
}

/// Closed set of error categories callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Scoring,
    GateRejected,
    ConcurrentModification,
    Storage,
}

/// promptgate domain errors.
#[derive(Debug, thiserror::Error)]
pub enum PromptGateError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("version not found: {0}")]
    VersionNotFound(VersionId),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("scoring error: {0}")]
    Scoring(#[from] ScoringError),

    #[error("publish rejected: {0}")]
    GateRejected(#[from] GateRejection),

    #[error("concurrent modification of {slot} slot: expected {expected:?}, found {actual:?}")]
    ConcurrentModification {
        slot: Environment,
        expected: Option<VersionId>,
        actual: Option<VersionId>,
    },

    #[error("storage error: {0}")]
    StorageError(String),
}

impl PromptGateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PromptGateError::Validation(_) => ErrorKind::Validation,
            PromptGateError::VersionNotFound(_) | PromptGateError::UnknownEnvironment(_) => {
                ErrorKind::NotFound
            }
            PromptGateError::Scoring(_) => ErrorKind::Scoring,
            PromptGateError::GateRejected(_) => ErrorKind::GateRejected,
            PromptGateError::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            PromptGateError::StorageError(_) => ErrorKind::Storage,
        }
    }

    /// The gate rejection, if this error is one.
    pub fn rejection(&self) -> Option<&GateRejection> {
        match self {
            PromptGateError::GateRejected(r) => Some(r),
            _ => None,
        }
    }
}

impl From<StorageError> for PromptGateError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::VersionExists { version } => {
                PromptGateError::Validation(ValidationError::DuplicateVersion {
                    version: VersionId::from(version),
                })
            }
            StorageError::VersionNotFound { version } => {
                PromptGateError::VersionNotFound(VersionId::from(version))
            }
            StorageError::ProductionChanged { expected, actual } => {
                PromptGateError::ConcurrentModification {
                    slot: Environment::Production,
                    expected: expected.map(VersionId::from),
                    actual: actual.map(VersionId::from),
                }
            }
            other => PromptGateError::StorageError(other.to_string()),
        }
    }
}

/// Result type for promptgate domain operations.
pub type Result<T> = std::result::Result<T, PromptGateError>;
