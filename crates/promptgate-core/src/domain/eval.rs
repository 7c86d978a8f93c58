//! Evaluation result types and score helpers.

pub use promptgate_state::{
    BandCounts, EvaluationRecord, EvaluationSummary, FixtureResult, ScoreBand,
};

/// Fixtures at or above this score are shown as passing in reports.
pub const PASS_SCORE: f64 = 80.0;

/// Share of fixtures in `band`, in percent. Zero fixtures yields 0% for
/// every band.
pub fn band_percentage(distribution: &BandCounts, band: ScoreBand, total_fixtures: usize) -> f64 {
    if total_fixtures == 0 {
        return 0.0;
    }
    distribution.get(band) as f64 / total_fixtures as f64 * 100.0
}

/// Point difference between a staging and a production average, when both
/// are known.
pub fn score_delta(staging: Option<f64>, production: Option<f64>) -> Option<f64> {
    Some(staging? - production?)
}
