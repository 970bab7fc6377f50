//! Job and result types for parameter sweeps.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::backtest::metrics::MetricsReport;
use crate::backtest::walkforward::{EngineState, WalkForwardResult};
use crate::config::WalkForwardConfig;
use crate::error::ErrorCode;

/// One walk-forward configuration to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepJob {
    /// Unique job identifier.
    pub job_id: String,
    /// Run configuration.
    pub config: WalkForwardConfig,
}

impl SweepJob {
    /// Create a job.
    #[must_use]
    pub fn new(job_id: impl Into<String>, config: WalkForwardConfig) -> Self {
        Self {
            job_id: job_id.into(),
            config,
        }
    }
}

/// Outcome of one sweep job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepJobResult {
    /// Job identifier.
    pub job_id: String,
    /// Configuration that was run.
    pub config: WalkForwardConfig,
    /// Metrics of the stitched curve, when the run produced one.
    pub metrics: Option<MetricsReport>,
    /// Terminal engine state, when the run started.
    pub state: Option<EngineState>,
    /// Last curve value.
    pub final_value: Option<f64>,
    /// Windows simulated successfully.
    pub windows_completed: usize,
    /// Windows that failed.
    pub windows_failed: usize,
    /// Error code if the run failed fatally or aborted.
    pub error_code: Option<ErrorCode>,
    /// Error message if the run failed fatally or aborted.
    pub error: Option<String>,
    /// Wall time of the run in milliseconds.
    pub execution_time_ms: u64,
    /// Whether the run processed every window.
    pub success: bool,
}

impl SweepJobResult {
    pub(crate) fn from_run(job: &SweepJob, run: &WalkForwardResult, execution_time_ms: u64) -> Self {
        Self {
            job_id: job.job_id.clone(),
            config: job.config.clone(),
            metrics: Some(run.metrics),
            state: Some(run.state),
            final_value: run.final_value(),
            windows_completed: run.completed_windows(),
            windows_failed: run.failed_windows(),
            error_code: run.failure.as_ref().map(|f| f.code),
            error: run.failure.as_ref().map(|f| f.message.clone()),
            execution_time_ms,
            success: run.is_complete(),
        }
    }

    pub(crate) fn from_error(
        job: &SweepJob,
        code: ErrorCode,
        message: String,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            job_id: job.job_id.clone(),
            config: job.config.clone(),
            metrics: None,
            state: None,
            final_value: None,
            windows_completed: 0,
            windows_failed: 0,
            error_code: Some(code),
            error: Some(message),
            execution_time_ms,
            success: false,
        }
    }

    /// Sharpe ratio of the run, if defined.
    #[must_use]
    pub fn sharpe_ratio(&self) -> Option<f64> {
        self.metrics
            .map(|m| m.sharpe_ratio)
            .filter(|s| !s.is_nan())
    }
}

/// Order by Sharpe ratio, best first, with undefined Sharpe last.
pub(crate) fn by_sharpe_desc(a: &SweepJobResult, b: &SweepJobResult) -> Ordering {
    match (a.sharpe_ratio(), b.sharpe_ratio()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Result of a whole sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    /// Job results ranked by Sharpe ratio, best first, undefined last.
    pub results: Vec<SweepJobResult>,

    /// Total execution time in milliseconds.
    pub total_time_ms: u64,

    /// Number of jobs executed.
    pub jobs_executed: u64,

    /// Number of jobs that processed every window.
    pub jobs_succeeded: u64,

    /// Number of failed, aborted or cancelled jobs.
    pub jobs_failed: u64,
}

impl SweepResult {
    /// Get the success rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.jobs_executed == 0 {
            0.0
        } else {
            self.jobs_succeeded as f64 / self.jobs_executed as f64
        }
    }

    /// Best successful job by Sharpe ratio.
    #[must_use]
    pub fn best(&self) -> Option<&SweepJobResult> {
        self.results
            .iter()
            .find(|r| r.success && r.sharpe_ratio().is_some())
    }

    /// Get successful results only.
    #[must_use]
    pub fn successful_results(&self) -> Vec<&SweepJobResult> {
        self.results.iter().filter(|r| r.success).collect()
    }

    /// Get failed results only.
    #[must_use]
    pub fn failed_results(&self) -> Vec<&SweepJobResult> {
        self.results.iter().filter(|r| !r.success).collect()
    }

    /// Look up a job result by id.
    #[must_use]
    pub fn get(&self, job_id: &str) -> Option<&SweepJobResult> {
        self.results.iter().find(|r| r.job_id == job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(job_id: &str, sharpe: Option<f64>) -> SweepJobResult {
        let mut metrics = MetricsReport::undefined(252, 0.0);
        if let Some(s) = sharpe {
            metrics.sharpe_ratio = s;
        }
        SweepJobResult {
            job_id: job_id.to_string(),
            config: WalkForwardConfig::default(),
            metrics: Some(metrics),
            state: Some(EngineState::Done),
            final_value: Some(10_000.0),
            windows_completed: 3,
            windows_failed: 0,
            error_code: None,
            error: None,
            execution_time_ms: 1,
            success: true,
        }
    }

    #[test]
    fn test_rank_by_sharpe_nan_last() {
        let mut results = vec![
            result("nan", None),
            result("low", Some(0.2)),
            result("high", Some(1.4)),
            result("negative", Some(-0.5)),
        ];
        results.sort_by(by_sharpe_desc);
        let order: Vec<&str> = results.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(order, vec!["high", "low", "negative", "nan"]);
    }

    #[test]
    fn test_sweep_result_summary() {
        let mut failed = result("failed", Some(3.0));
        failed.success = false;
        let sweep = SweepResult {
            results: vec![failed, result("ok", Some(1.0))],
            total_time_ms: 10,
            jobs_executed: 2,
            jobs_succeeded: 1,
            jobs_failed: 1,
        };

        assert!((sweep.success_rate() - 0.5).abs() < f64::EPSILON);
        let Some(best) = sweep.best() else {
            panic!("a successful job with a defined Sharpe should be best");
        };
        assert_eq!(best.job_id, "ok");
        assert_eq!(sweep.failed_results().len(), 1);
        assert_eq!(sweep.successful_results().len(), 1);
        assert!(sweep.get("failed").is_some());
    }

    #[test]
    fn test_sweep_job_result_serialization() {
        let json = serde_json::to_string(&result("job_1", None)).unwrap();
        assert!(json.contains("job_1"));
        assert!(json.contains("\"sharpe_ratio\":null"));
    }
}
