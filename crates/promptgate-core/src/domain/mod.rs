//! Domain models for promptgate.
//!
//! - `Environment`: the `staging` / `production` slots
//! - `VersionDraft`: validated version input
//! - evaluation types re-exported from the state layer
//! - the error taxonomy shared by every operation

pub mod environment;
pub mod error;
pub mod eval;
pub mod version;

pub use environment::{Environment, PublishOutcome};
pub use error::{ErrorKind, GateRejection, PromptGateError, Result, ScoringError, ValidationError};
pub use eval::{
    band_percentage, score_delta, BandCounts, EvaluationRecord, EvaluationSummary, FixtureResult,
    ScoreBand, PASS_SCORE,
};
pub use version::{parse_version_label, VersionDraft};
