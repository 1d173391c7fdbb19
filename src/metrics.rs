// Run metrics module
//
// Counters collected across cleanup passes, logged on shutdown

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide cleanup metrics
///
/// Uses atomic operations so the runner can record through a shared reference.
#[derive(Debug)]
pub struct Metrics {
    /// Passes that ran to completion
    pub passes_completed: AtomicUsize,

    /// Passes aborted because the server could not be queried
    pub passes_failed: AtomicUsize,

    /// Collections deleted across all passes
    pub collections_deleted: AtomicUsize,

    /// Collection deletions the server rejected
    pub collection_delete_failures: AtomicUsize,

    /// Movies renamed across all passes
    pub movies_renamed: AtomicUsize,

    /// Movie renames the server rejected
    pub movie_rename_failures: AtomicUsize,

    /// Total pass time in milliseconds
    pub total_pass_time_ms: AtomicU64,

    /// Process start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            passes_completed: AtomicUsize::new(0),
            passes_failed: AtomicUsize::new(0),
            collections_deleted: AtomicUsize::new(0),
            collection_delete_failures: AtomicUsize::new(0),
            movies_renamed: AtomicUsize::new(0),
            movie_rename_failures: AtomicUsize::new(0),
            total_pass_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished pass and what it changed
    pub fn record_pass(
        &self,
        duration: Duration,
        deleted: usize,
        delete_failures: usize,
        renamed: usize,
        rename_failures: usize,
    ) {
        self.passes_completed.fetch_add(1, Ordering::Relaxed);
        self.collections_deleted.fetch_add(deleted, Ordering::Relaxed);
        self.collection_delete_failures
            .fetch_add(delete_failures, Ordering::Relaxed);
        self.movies_renamed.fetch_add(renamed, Ordering::Relaxed);
        self.movie_rename_failures
            .fetch_add(rename_failures, Ordering::Relaxed);
        self.record_pass_time(duration);
    }

    /// Record a pass that could not run
    pub fn record_pass_failed(&self, duration: Duration) {
        self.passes_failed.fetch_add(1, Ordering::Relaxed);
        self.record_pass_time(duration);
    }

    fn record_pass_time(&self, duration: Duration) {
        self.total_pass_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get average time per pass in milliseconds
    pub fn avg_pass_time_ms(&self) -> f64 {
        let total = self.total_pass_time_ms.load(Ordering::Relaxed);
        let count = self.passes_completed.load(Ordering::Relaxed)
            + self.passes_failed.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Cleanup Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Passes: {} completed, {} failed (avg: {:.2}ms per pass)",
            self.passes_completed.load(Ordering::Relaxed),
            self.passes_failed.load(Ordering::Relaxed),
            self.avg_pass_time_ms()
        );
        tracing::info!(
            "Collections: {} deleted, {} failed",
            self.collections_deleted.load(Ordering::Relaxed),
            self.collection_delete_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Movies: {} renamed, {} failed",
            self.movies_renamed.load(Ordering::Relaxed),
            self.movie_rename_failures.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
