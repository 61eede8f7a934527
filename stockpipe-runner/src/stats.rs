//! Per-job counters and the closing summary line.

use std::fmt;
use std::time::{Duration, Instant};

/// Outcome counts of one batch job.
///
/// `total = succeeded + failed + skipped + empty` once the job has finished.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub empty: usize,
    /// Rows (or windows, for sequences) written across all sinks' primary output.
    pub rows: usize,
    pub elapsed: Duration,
    /// `(symbol or file, error message)` for every failure.
    pub failures: Vec<(String, String)>,
}

impl RunStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn record_success(&mut self, rows: usize) {
        self.succeeded += 1;
        self.rows += rows;
    }

    pub fn record_failure(&mut self, name: &str, error: impl fmt::Display) {
        self.failed += 1;
        self.failures.push((name.to_string(), error.to_string()));
    }

    pub fn finish(&mut self, started: Instant) {
        self.elapsed = started.elapsed();
    }

    /// True when there was work and every item failed.
    pub fn all_failed(&self) -> bool {
        self.total > 0 && self.failed == self.total
    }

    pub fn log_summary(&self, job: &str) {
        tracing::info!(
            job,
            total = self.total,
            succeeded = self.succeeded,
            failed = self.failed,
            skipped = self.skipped,
            empty = self.empty,
            rows = self.rows,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "{job} finished"
        );
        for (name, error) in &self.failures {
            tracing::warn!(job, name = name.as_str(), error = error.as_str(), "failed");
        }
    }
}
