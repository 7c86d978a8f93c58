//! promptgate Core Library
//!
//! Versioned prompts, evaluation runs against a fixture suite, and gated
//! promotion from `staging` to `production`.

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod engine;
pub mod eval_runner;
pub mod metrics;
pub mod obs;
pub mod publish_gate;
pub mod reporting;
pub mod scorer;
pub mod slot_registry;
pub mod telemetry;
pub mod version_store;

pub use aggregate::aggregate;
pub use config::EngineConfig;
pub use engine::PromptGate;
pub use eval_runner::EvaluationRunner;
pub use publish_gate::{evaluate_publish_gate, GateInput, GateVerdict, ScoreLookup, ScoredSlot};
pub use scorer::{fixtures_from_scores, HttpScorer, Scorer, ScriptedScorer};
pub use slot_registry::ActiveSlotRegistry;
pub use version_store::VersionStore;

pub use domain::{
    band_percentage, parse_version_label, score_delta, BandCounts, Environment, ErrorKind,
    EvaluationRecord, EvaluationSummary, FixtureResult, GateRejection, PromptGateError,
    PublishOutcome, Result, ScoreBand, ScoringError, ValidationError, VersionDraft, PASS_SCORE,
};

pub use promptgate_state::{
    ActiveSlots, ContentDigest, MemoryPromptStore, MemoryScoreStore, MemorySlotStore, PromptStore,
    PromptVersion, ScoreStore, SlotStore, StateSnapshot, VersionId,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
