//! Global atomic counters for promptgate observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. before a CLI command exits).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters; no allocations, no locking.
pub struct Metrics {
    evaluations_run: AtomicU64,
    evaluations_failed: AtomicU64,
    publishes_committed: AtomicU64,
    publishes_rejected: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            evaluations_run: AtomicU64::new(0),
            evaluations_failed: AtomicU64::new(0),
            publishes_committed: AtomicU64::new(0),
            publishes_rejected: AtomicU64::new(0),
        }
    }

    pub fn inc_evaluations_run(&self) {
        self.evaluations_run.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations_run", "counter incremented");
    }

    pub fn inc_evaluations_failed(&self) {
        self.evaluations_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "evaluations_failed", "counter incremented");
    }

    pub fn inc_publishes_committed(&self) {
        self.publishes_committed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "publishes_committed", "counter incremented");
    }

    pub fn inc_publishes_rejected(&self) {
        self.publishes_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "publishes_rejected", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            evaluations_run = self.evaluations_run(),
            evaluations_failed = self.evaluations_failed(),
            publishes_committed = self.publishes_committed(),
            publishes_rejected = self.publishes_rejected(),
        );
    }

    pub fn evaluations_run(&self) -> u64 {
        self.evaluations_run.load(Ordering::Relaxed)
    }

    pub fn evaluations_failed(&self) -> u64 {
        self.evaluations_failed.load(Ordering::Relaxed)
    }

    pub fn publishes_committed(&self) -> u64 {
        self.publishes_committed.load(Ordering::Relaxed)
    }

    pub fn publishes_rejected(&self) -> u64 {
        self.publishes_rejected.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.evaluations_run.store(0, Ordering::Relaxed);
        self.evaluations_failed.store(0, Ordering::Relaxed);
        self.publishes_committed.store(0, Ordering::Relaxed);
        self.publishes_rejected.store(0, Ordering::Relaxed);
    }
}
