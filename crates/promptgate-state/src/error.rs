//! Error types for promptgate-state

use thiserror::Error;

/// Errors produced by the storage traits and their backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// A version with this identity is already stored
    #[error("version already exists: {version}")]
    VersionExists { version: String },

    /// No version with this identity is stored
    #[error("version not found: {version}")]
    VersionNotFound { version: String },

    /// Compare-and-set on the production slot observed a different value
    #[error("production slot changed: expected {expected:?}, found {actual:?}")]
    ProductionChanged {
        expected: Option<String>,
        actual: Option<String>,
    },

    /// A backend mutex was poisoned by a panicking writer
    #[error("{store} lock poisoned")]
    LockPoisoned { store: &'static str },

    /// Another process holds the state lock
    #[error("state is locked by another process ({path}); remove the file if no promptgate command is running")]
    Locked { path: String },

    /// Snapshot file has an unsupported layout
    #[error("unsupported snapshot: {0}")]
    Snapshot(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
