//! Publish gate decision.
//!
//! Evaluates a [`GateInput`] (the current slot pointers and their average
//! scores) to produce a [`GateVerdict`]: admit staging into production, or
//! reject with a [`GateRejection`]. The decision is pure; the
//! [`ActiveSlotRegistry`](crate::slot_registry::ActiveSlotRegistry) gathers
//! the input and commits the result.

use async_trait::async_trait;
use promptgate_state::VersionId;

use crate::domain::error::{GateRejection, Result};

// ---------------------------------------------------------------------------
// Score lookup (seam between the registry and evaluation storage)
// ---------------------------------------------------------------------------

/// Source of average scores for the gate.
#[async_trait]
pub trait ScoreLookup: Send + Sync {
    /// Average score of the stored evaluation for `version`; `None` when the
    /// version was never evaluated or its summary has no average.
    async fn average_score(&self, version: &VersionId) -> Result<Option<f64>>;
}

// ---------------------------------------------------------------------------
// Gate input
// ---------------------------------------------------------------------------

/// A slot pointer together with the score observed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSlot {
    pub version: VersionId,
    pub score: Option<f64>,
}

/// Everything the gate looks at, read once before deciding.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GateInput {
    pub staging: Option<ScoredSlot>,
    pub production: Option<ScoredSlot>,
}

impl GateInput {
    /// Gather scores for the given pointers from `lookup`.
    pub async fn observe(
        staging: Option<&VersionId>,
        production: Option<&VersionId>,
        lookup: &dyn ScoreLookup,
    ) -> Result<Self> {
        let staging = match staging {
            Some(version) => Some(ScoredSlot {
                version: version.clone(),
                score: lookup.average_score(version).await?,
            }),
            None => None,
        };
        let production = match production {
            Some(version) => Some(ScoredSlot {
                version: version.clone(),
                score: lookup.average_score(version).await?,
            }),
            None => None,
        };
        Ok(Self {
            staging,
            production,
        })
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    /// Staging may replace production.
    Admit { candidate: VersionId, score: f64 },
    Reject(GateRejection),
}

impl GateVerdict {
    pub fn is_admitted(&self) -> bool {
        matches!(self, GateVerdict::Admit { .. })
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Decide whether staging may be published.
///
/// Rules are checked in order and the first failure wins:
/// 1. staging must be set
/// 2. staging must have an average score
/// 3. a set production must have an average score
/// 4. a set production must score strictly below staging
pub fn evaluate_publish_gate(input: &GateInput) -> GateVerdict {
    let Some(staging) = &input.staging else {
        return GateVerdict::Reject(GateRejection::NoStagingSelected);
    };
    let Some(staging_score) = staging.score else {
        return GateVerdict::Reject(GateRejection::NotEvaluated {
            version: staging.version.clone(),
        });
    };

    if let Some(production) = &input.production {
        let Some(production_score) = production.score else {
            return GateVerdict::Reject(GateRejection::NotEvaluated {
                version: production.version.clone(),
            });
        };
        if staging_score <= production_score {
            return GateVerdict::Reject(GateRejection::NoImprovement {
                staging: staging.version.clone(),
                staging_score,
                production: production.version.clone(),
                production_score,
            });
        }
    }

    GateVerdict::Admit {
        candidate: staging.version.clone(),
        score: staging_score,
    }
}
