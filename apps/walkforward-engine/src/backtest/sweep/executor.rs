//! Parallel sweep executor using Rayon.

use std::time::Instant;

use rayon::prelude::*;
use tracing::{Level, debug, info, span};

use super::config::SweepConfig;
use super::error::SweepError;
use super::grid::SweepGrid;
use super::progress::ProgressTracker;
use super::types::{SweepJob, SweepJobResult, SweepResult, by_sharpe_desc};
use crate::backtest::strategy::AllocationStrategy;
use crate::backtest::walkforward::{CancellationToken, WalkForwardEngine};
use crate::data::PriceTable;

/// Runs independent walk-forward configurations over one price table.
///
/// Jobs run in parallel; each run stays sequential over its own windows.
#[derive(Debug, Clone, Default)]
pub struct ParameterSweep {
    config: SweepConfig,
    cancel: CancellationToken,
}

impl ParameterSweep {
    /// Create a new sweep executor.
    #[must_use]
    pub fn new(config: SweepConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Share a cancellation token with every run in the sweep.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Get effective thread count.
    #[must_use]
    pub fn effective_thread_count(&self) -> usize {
        if self.config.max_threads > 0 {
            self.config.max_threads
        } else {
            rayon::current_num_threads()
        }
    }

    /// Run every job against `table` with `strategy`.
    ///
    /// Results are ranked by Sharpe ratio, best first; jobs with an
    /// undefined Sharpe (or no metrics at all) come last in job order.
    ///
    /// # Errors
    ///
    /// Returns error if no jobs are provided, job ids repeat, or the thread
    /// pool cannot be built.
    pub fn run(
        &self,
        table: &PriceTable,
        strategy: &dyn AllocationStrategy,
        jobs: &[SweepJob],
    ) -> Result<SweepResult, SweepError> {
        if jobs.is_empty() {
            return Err(SweepError::NoJobs);
        }
        if let Some(duplicate) = first_duplicate_id(jobs) {
            return Err(SweepError::InvalidParameters {
                message: format!("duplicate job id '{duplicate}'"),
            });
        }

        let tracker = ProgressTracker::new(jobs.len() as u64);
        let start_time = Instant::now();

        info!(
            jobs = jobs.len(),
            threads = self.effective_thread_count(),
            "Starting parameter sweep"
        );

        let mut results = if jobs.len() < self.config.min_parallel_jobs {
            self.run_sequential(table, strategy, jobs, &tracker)
        } else if self.config.max_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.max_threads)
                .build()
                .map_err(|e| SweepError::ThreadPoolError {
                    message: e.to_string(),
                })?;
            pool.install(|| self.run_parallel(table, strategy, jobs, &tracker))
        } else {
            self.run_parallel(table, strategy, jobs, &tracker)
        };

        results.sort_by(by_sharpe_desc);

        let elapsed = start_time.elapsed();
        let final_progress = tracker.progress();
        let jobs_failed = results.iter().filter(|r| !r.success).count() as u64;

        info!(
            succeeded = final_progress.total - jobs_failed,
            total = final_progress.total,
            elapsed_secs = elapsed.as_secs_f64(),
            cancelled = final_progress.cancelled,
            windows = final_progress.windows_evaluated,
            runs_per_sec = final_progress.runs_per_sec(),
            "Parameter sweep complete"
        );

        Ok(SweepResult {
            results,
            total_time_ms: elapsed.as_millis() as u64,
            jobs_executed: jobs.len() as u64,
            jobs_succeeded: jobs.len() as u64 - jobs_failed,
            jobs_failed,
        })
    }

    /// Expand `grid` into jobs and run them.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_grid(
        &self,
        table: &PriceTable,
        strategy: &dyn AllocationStrategy,
        grid: &SweepGrid,
    ) -> Result<SweepResult, SweepError> {
        info!(combinations = grid.total_combinations(), "Expanding sweep grid");
        self.run(table, strategy, &grid.jobs())
    }

    fn run_parallel(
        &self,
        table: &PriceTable,
        strategy: &dyn AllocationStrategy,
        jobs: &[SweepJob],
        tracker: &ProgressTracker,
    ) -> Vec<SweepJobResult> {
        jobs.par_iter()
            .map(|job| {
                let result = self.execute_job(table, strategy, job);
                self.record(tracker, &result);
                result
            })
            .collect()
    }

    fn run_sequential(
        &self,
        table: &PriceTable,
        strategy: &dyn AllocationStrategy,
        jobs: &[SweepJob],
        tracker: &ProgressTracker,
    ) -> Vec<SweepJobResult> {
        jobs.iter()
            .map(|job| {
                let result = self.execute_job(table, strategy, job);
                self.record(tracker, &result);
                result
            })
            .collect()
    }

    fn record(&self, tracker: &ProgressTracker, result: &SweepJobResult) {
        tracker.record(result);

        if self.config.track_progress {
            let progress = tracker.progress();
            debug!(
                job_id = %result.job_id,
                percentage = progress.percentage(),
                completed = progress.completed,
                total = progress.total,
                eta_secs = ?progress.eta_secs(),
                "Sweep progress"
            );
        }
    }

    fn execute_job(
        &self,
        table: &PriceTable,
        strategy: &dyn AllocationStrategy,
        job: &SweepJob,
    ) -> SweepJobResult {
        let span = span!(Level::DEBUG, "sweep_job", job_id = %job.job_id);
        let _guard = span.enter();
        let start = Instant::now();

        let outcome = WalkForwardEngine::new(job.config.clone())
            .and_then(|engine| engine.run_with_cancel(table, strategy, &self.cancel));
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(run) => SweepJobResult::from_run(job, &run, elapsed_ms),
            Err(err) => {
                debug!(job_id = %job.job_id, error = %err, "Sweep job failed");
                SweepJobResult::from_error(job, err.code(), err.to_string(), elapsed_ms)
            }
        }
    }
}

fn first_duplicate_id(jobs: &[SweepJob]) -> Option<&str> {
    let mut seen = std::collections::HashSet::with_capacity(jobs.len());
    jobs.iter()
        .map(|job| job.job_id.as_str())
        .find(|id| !seen.insert(*id))
}
