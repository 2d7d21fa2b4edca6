//! Run counters and the final summary.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::conversion::{ConversionOutcome, JobFailure};
use crate::scanner::WalkStats;

/// Counters updated concurrently by jobs and the pipeline driver.
#[derive(Debug, Default)]
pub struct RunStats {
    submitted: AtomicU64,
    converted: AtomicU64,
    failed: AtomicU64,
    originals_deleted: AtomicU64,
    delete_failed: AtomicU64,
    abandoned: AtomicU64,
}

impl RunStats {
    pub fn record_submitted(&self, n: usize) {
        self.submitted.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Files discovered after draining began and deliberately not submitted.
    pub fn record_abandoned(&self, n: usize) {
        self.abandoned.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_outcome(&self, outcome: &ConversionOutcome) {
        match outcome {
            ConversionOutcome::Success {
                original_deleted, ..
            } => {
                self.converted.fetch_add(1, Ordering::Relaxed);
                if *original_deleted {
                    self.originals_deleted.fetch_add(1, Ordering::Relaxed);
                }
            }
            ConversionOutcome::Failure(JobFailure::Deletion { .. }) => {
                self.converted.fetch_add(1, Ordering::Relaxed);
                self.delete_failed.fetch_add(1, Ordering::Relaxed);
            }
            ConversionOutcome::Failure(JobFailure::Conversion(_)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Combine the counters with the walker's figures.
    pub fn summarize(&self, walk: WalkStats, interrupted: bool, elapsed: Duration) -> RunSummary {
        RunSummary {
            discovered: walk.files_found,
            submitted: self.submitted.load(Ordering::Relaxed),
            converted: self.converted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            originals_deleted: self.originals_deleted.load(Ordering::Relaxed),
            delete_failed: self.delete_failed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            dirs_skipped: walk.dirs_skipped,
            interrupted,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

/// What a run did, reported once the pool is idle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub discovered: u64,
    pub submitted: u64,
    pub converted: u64,
    pub failed: u64,
    pub originals_deleted: u64,
    pub delete_failed: u64,
    pub abandoned: u64,
    pub dirs_skipped: u64,
    /// Draining was requested before the walk finished.
    pub interrupted: bool,
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Jobs that reached a terminal outcome.
    pub fn completed(&self) -> u64 {
        self.converted + self.failed
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.delete_failed > 0 || self.dirs_skipped > 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} converted, {} failed, {} originals deleted",
            self.converted, self.failed, self.originals_deleted
        )?;
        if self.delete_failed > 0 {
            write!(f, ", {} deletions failed", self.delete_failed)?;
        }
        if self.dirs_skipped > 0 {
            write!(f, ", {} unreadable directories", self.dirs_skipped)?;
        }
        if self.abandoned > 0 {
            write!(f, ", {} not started", self.abandoned)?;
        }
        write!(f, " in {:.1}s", self.elapsed_ms as f64 / 1000.0)
    }
}
