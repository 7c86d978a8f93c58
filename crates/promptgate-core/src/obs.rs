//! Structured observability hooks for version, evaluation and publish events.
//!
//! This module provides:
//! - Evaluation-scoped tracing spans via `eval_span`
//! - Emission functions for key lifecycle events
//!
//! Events are emitted at `info!` level (filter with `RUST_LOG`). Rejections
//! and failures are `warn!`.

use tracing::{info, warn};

/// Span covering one evaluation run, tagged with the version and run id.
///
/// Attach it to the run's future with `tracing::Instrument` so every event
/// emitted while scoring carries both fields.
pub fn eval_span(version: &str, run_id: &str) -> tracing::Span {
    tracing::info_span!("promptgate.eval", version = %version, run_id = %run_id)
}

pub fn emit_version_created(version: &str, content_bytes: usize) {
    info!(event = "version.created", version = %version, content_bytes = content_bytes);
}

pub fn emit_version_updated(version: &str, content_bytes: usize) {
    info!(event = "version.updated", version = %version, content_bytes = content_bytes);
}

pub fn emit_eval_started(version: &str, run_id: &str) {
    info!(event = "eval.started", version = %version, run_id = %run_id);
}

/// Emit event: evaluation stored with its average and fixture count.
pub fn emit_eval_finished(
    version: &str,
    run_id: &str,
    average_score: f64,
    total_fixtures: usize,
    duration_ms: u64,
) {
    info!(
        event = "eval.finished",
        version = %version,
        run_id = %run_id,
        average_score = average_score,
        total_fixtures = total_fixtures,
        duration_ms = duration_ms,
    );
}

/// Emit event: evaluation failed; the previously stored score is kept.
pub fn emit_eval_failed(version: &str, run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "eval.failed", version = %version, run_id = %run_id, error = %error);
}

pub fn emit_staging_set(version: &str, previous: Option<&str>) {
    info!(
        event = "slot.staging_set",
        version = %version,
        previous = previous.unwrap_or("-"),
    );
}

pub fn emit_publish_committed(production: &str, previous: Option<&str>, score: f64) {
    info!(
        event = "publish.committed",
        production = %production,
        previous = previous.unwrap_or("-"),
        score = score,
    );
}

pub fn emit_publish_rejected(reason_code: &str, detail: &dyn std::fmt::Display) {
    warn!(event = "publish.rejected", reason = %reason_code, detail = %detail);
}
