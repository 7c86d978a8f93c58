//! Storage trait definitions for promptgate
//!
//! These traits define the storage abstractions behind the engine:
//! - `PromptStore`: prompt versions (identity, name, content, creation order)
//! - `ScoreStore`: the latest evaluation record per version
//! - `SlotStore`: the `staging` / `production` pointers
//!
//! All traits are async and backend-agnostic. In-memory backends live in the
//! `memory` module.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Opaque identity of a prompt version (e.g. "v3" or "1.2.0-rc1").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

impl VersionId {
    pub fn new(id: impl Into<String>) -> Self {
        VersionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VersionId {
    fn from(s: &str) -> Self {
        VersionId(s.to_string())
    }
}

impl From<String> for VersionId {
    fn from(s: String) -> Self {
        VersionId(s)
    }
}

impl std::fmt::Display for VersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA-256 hex digest of prompt content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PromptStore: prompt versions
// ---------------------------------------------------------------------------

/// A stored prompt version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptVersion {
    /// Unique, immutable identity.
    pub version: VersionId,
    /// Display label.
    pub name: String,
    /// The prompt text.
    pub content: String,
    /// When the version was created. Preserved across updates.
    pub created_at: DateTime<Utc>,
    /// When name/content were last replaced.
    pub updated_at: DateTime<Utc>,
    /// Store-assigned creation sequence number; defines list order.
    pub seq: u64,
}

impl PromptVersion {
    /// Digest of the current content.
    pub fn content_digest(&self) -> ContentDigest {
        ContentDigest::from_bytes(self.content.as_bytes())
    }
}

/// Prompt version store.
///
/// Guarantees:
/// - identities are unique; `insert` never overwrites an existing version.
/// - `update` keeps `version`, `created_at` and `seq`.
/// - `list` is in creation order (`seq` ascending), independent of wall-clock
///   timestamps.
#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Insert a new version. When `version` is `None` the store derives a
    /// fresh identity that does not collide with any stored one.
    async fn insert(
        &self,
        version: Option<VersionId>,
        name: String,
        content: String,
    ) -> StorageResult<PromptVersion>;

    /// Replace name and content of an existing version.
    async fn update(
        &self,
        version: &VersionId,
        name: String,
        content: String,
    ) -> StorageResult<PromptVersion>;

    /// Fetch a version by identity.
    async fn get(&self, version: &VersionId) -> StorageResult<Option<PromptVersion>>;

    /// All versions in creation order.
    async fn list(&self) -> StorageResult<Vec<PromptVersion>>;
}

// ---------------------------------------------------------------------------
// ScoreStore: evaluation results
// ---------------------------------------------------------------------------

/// Outcome of scoring one fixture against one version's content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureResult {
    pub fixture_id: String,
    pub input: String,
    /// Expected-behavior classification label.
    pub category: String,
    /// Score in 0–100.
    pub score: f64,
    pub keywords_found: u32,
    pub keywords_total: u32,
}

/// Fixed quality bands partitioning the 0–100 score range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    /// 80–100
    Excellent,
    /// 60–79
    Good,
    /// 40–59
    Fair,
    /// 0–39
    Poor,
}

impl ScoreBand {
    /// All bands, best first.
    pub const ALL: [ScoreBand; 4] = [
        ScoreBand::Excellent,
        ScoreBand::Good,
        ScoreBand::Fair,
        ScoreBand::Poor,
    ];

    /// Classify a score. Fractional scores belong to the band whose lower
    /// bound they reach, so 79.5 is `Good`.
    pub fn classify(score: f64) -> Self {
        if score >= 80.0 {
            ScoreBand::Excellent
        } else if score >= 60.0 {
            ScoreBand::Good
        } else if score >= 40.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Fair => "Fair",
            ScoreBand::Poor => "Poor",
        }
    }

    /// Inclusive integer range shown in reports.
    pub fn range_label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "80-100",
            ScoreBand::Good => "60-79",
            ScoreBand::Fair => "40-59",
            ScoreBand::Poor => "0-39",
        }
    }
}

/// Per-band fixture counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounts {
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

impl BandCounts {
    pub fn get(&self, band: ScoreBand) -> usize {
        match band {
            ScoreBand::Excellent => self.excellent,
            ScoreBand::Good => self.good,
            ScoreBand::Fair => self.fair,
            ScoreBand::Poor => self.poor,
        }
    }

    pub fn increment(&mut self, band: ScoreBand) {
        match band {
            ScoreBand::Excellent => self.excellent += 1,
            ScoreBand::Good => self.good += 1,
            ScoreBand::Fair => self.fair += 1,
            ScoreBand::Poor => self.poor += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.fair + self.poor
    }
}

/// Aggregate over the fixture results of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// Mean of all scores; `None` when there are no results.
    pub average_score: Option<f64>,
    pub total_fixtures: usize,
    /// Results in scorer order.
    pub results: Vec<FixtureResult>,
    pub distribution: BandCounts,
}

/// The stored outcome of the latest evaluation run for a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub version: VersionId,
    pub run_id: Uuid,
    /// Digest of the content that was scored.
    pub content_digest: ContentDigest,
    pub evaluated_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub summary: EvaluationSummary,
}

impl EvaluationRecord {
    /// Average score of the stored summary.
    pub fn average_score(&self) -> Option<f64> {
        self.summary.average_score
    }

    /// Whether this record scored the version's current content.
    pub fn is_current_for(&self, version: &PromptVersion) -> bool {
        self.version == version.version && self.content_digest == version.content_digest()
    }
}

/// Evaluation record store.
///
/// Semantics:
/// - `put` replaces any prior record for the same version (latest write
///   wins, no history).
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Store a record, replacing any prior one for `record.version`.
    async fn put(&self, record: EvaluationRecord) -> StorageResult<()>;

    /// Latest record for a version, if any.
    async fn get(&self, version: &VersionId) -> StorageResult<Option<EvaluationRecord>>;

    /// All stored records, ordered by version identity.
    async fn list(&self) -> StorageResult<Vec<EvaluationRecord>>;
}

// ---------------------------------------------------------------------------
// SlotStore: staging / production pointers
// ---------------------------------------------------------------------------

/// Snapshot of the two environment pointers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSlots {
    pub staging: Option<VersionId>,
    pub production: Option<VersionId>,
}

/// Environment slot store.
///
/// Semantics:
/// - `set_staging` overwrites the staging pointer unconditionally.
/// - `compare_and_set_production` only writes when the stored production
///   pointer equals `expected`; otherwise it fails with
///   `StorageError::ProductionChanged` and leaves both pointers untouched.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Current pointers.
    async fn slots(&self) -> StorageResult<ActiveSlots>;

    /// Point staging at `version`.
    async fn set_staging(&self, version: VersionId) -> StorageResult<()>;

    /// Atomically move production from `expected` to `new`, returning the
    /// resulting pointers.
    async fn compare_and_set_production(
        &self,
        expected: Option<&VersionId>,
        new: VersionId,
    ) -> StorageResult<ActiveSlots>;
}
