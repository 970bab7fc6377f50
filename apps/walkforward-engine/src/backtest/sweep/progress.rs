//! Progress tracking for sweep execution.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::types::SweepJobResult;
use crate::backtest::walkforward::EngineState;

/// Counters shared by sweep workers.
///
/// Updated with relaxed atomics; a snapshot may be a job behind under
/// contention but never double-counts.
#[derive(Debug)]
pub struct ProgressTracker {
    total_runs: u64,
    finished: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    windows: AtomicU64,
    started: Instant,
}

impl ProgressTracker {
    /// Tracker for `total_runs` runs.
    #[must_use]
    pub fn new(total_runs: u64) -> Self {
        Self {
            total_runs,
            finished: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            windows: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Account for one finished run.
    pub fn record(&self, result: &SweepJobResult) {
        self.finished.fetch_add(1, Ordering::Relaxed);
        if !result.success {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        if result.state == Some(EngineState::Cancelled) {
            self.cancelled.fetch_add(1, Ordering::Relaxed);
        }
        let windows = result.windows_completed + result.windows_failed;
        self.windows.fetch_add(windows as u64, Ordering::Relaxed);
    }

    /// Current snapshot.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            total: self.total_runs,
            completed: self.finished.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            windows_evaluated: self.windows.load(Ordering::Relaxed),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
        }
    }
}

/// Point-in-time view of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Runs in the sweep.
    pub total: u64,
    /// Runs finished, successful or not.
    pub completed: u64,
    /// Runs that produced no usable result.
    pub failed: u64,
    /// Runs stopped by the cancellation token.
    pub cancelled: u64,
    /// Windows evaluated across all finished runs.
    pub windows_evaluated: u64,
    /// Wall time since the sweep started.
    pub elapsed_secs: f64,
}

impl Progress {
    /// Completion in percent. An empty sweep is complete.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }

    /// Runs that finished successfully.
    #[must_use]
    pub const fn succeeded(&self) -> u64 {
        self.completed.saturating_sub(self.failed)
    }

    /// Finished runs per second.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn runs_per_sec(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.completed as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Seconds until the remaining runs finish at the current rate, if known.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn eta_secs(&self) -> Option<f64> {
        let rate = self.runs_per_sec();
        if rate <= 0.0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.completed);
        Some(remaining as f64 / rate)
    }
}
