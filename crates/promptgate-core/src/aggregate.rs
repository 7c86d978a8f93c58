//! Score aggregation.
//!
//! Turns the per-fixture results of one evaluation run into an
//! [`EvaluationSummary`]: unweighted mean plus band distribution.

use crate::domain::eval::{BandCounts, EvaluationSummary, FixtureResult, ScoreBand};

/// Aggregate fixture results into a summary.
///
/// Pure: the same input always yields an identical summary. An empty slice
/// has no average (`average_score == None`); callers that need an average
/// must not pass an empty set.
pub fn aggregate(results: &[FixtureResult]) -> EvaluationSummary {
    let mut distribution = BandCounts::default();
    let mut sum = 0.0;

    for result in results {
        distribution.increment(ScoreBand::classify(result.score));
        sum += result.score;
    }

    let average_score = if results.is_empty() {
        None
    } else {
        Some(sum / results.len() as f64)
    };

    EvaluationSummary {
        average_score,
        total_fixtures: results.len(),
        results: results.to_vec(),
        distribution,
    }
}
