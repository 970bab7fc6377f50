//! Core types for walk-forward runs.

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backtest::data_gaps::GapStatistics;
use crate::backtest::equity::{EquityCurve, EquitySegment};
use crate::backtest::logging::RunEvent;
use crate::backtest::metrics::MetricsReport;
use crate::backtest::simulator::RebalanceEvent;
use crate::backtest::strategy::WeightVector;
use crate::error::{EngineError, ErrorCode};

/// Engine state machine.
///
/// ```text
/// INIT -> GENERATE_WINDOWS -> { FIT -> ALLOCATE -> SIMULATE }* -> STITCH -> DONE
/// ```
///
/// `FAILED` is entered when a window error aborts the run, `CANCELLED` when
/// a cancellation request is observed between windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Nothing has run yet.
    #[default]
    Init,
    /// Partitioning the price table.
    GenerateWindows,
    /// Running the strategy on the train history.
    Fit,
    /// Turning strategy output into a rebalance schedule.
    Allocate,
    /// Simulating the test window.
    Simulate,
    /// Concatenating segments and scoring the curve.
    Stitch,
    /// Every window processed.
    Done,
    /// Aborted by a window error.
    Failed,
    /// Stopped by a cancellation request.
    Cancelled,
}

impl EngineState {
    /// Whether the run has finished in this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Move to `next`, logging the transition.
    pub(crate) fn advance(&mut self, next: Self, window: Option<usize>) {
        debug!(from = %self, to = %next, window = ?window, "Engine state transition");
        *self = next;
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::GenerateWindows => "generate_windows",
            Self::Fit => "fit",
            Self::Allocate => "allocate",
            Self::Simulate => "simulate",
            Self::Stitch => "stitch",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{name}")
    }
}

/// Outcome of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    /// Weights validated and the test window simulated.
    Completed,
    /// The window raised an error; capital was held flat across it.
    Failed,
}

/// Serializable summary of a window error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowFailure {
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl From<&EngineError> for WindowFailure {
    fn from(err: &EngineError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Audit record for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowDiagnostics {
    /// Window index.
    pub index: usize,
    /// Train rows `[start, end)`.
    pub train: Range<usize>,
    /// Test rows `[start, end)`.
    pub test: Range<usize>,
    /// First train timestamp.
    pub train_start: DateTime<Utc>,
    /// Last train timestamp.
    pub train_end: DateTime<Utc>,
    /// First test timestamp.
    pub test_start: DateTime<Utc>,
    /// Last test timestamp.
    pub test_end: DateTime<Utc>,
    /// Completed or failed.
    pub status: WindowStatus,
    /// Weights taken at the start of the window.
    pub weights: Option<WeightVector>,
    /// Every rebalance applied inside the window.
    pub rebalances: Vec<RebalanceEvent>,
    /// Capital entering the window.
    pub start_value: f64,
    /// Capital leaving the window.
    pub end_value: f64,
    /// `end_value / start_value - 1`.
    pub realized_return: f64,
    /// Non-fatal observations (zero-filled assets, frozen holdings).
    pub warnings: Vec<String>,
    /// Error raised by the window, if it failed.
    pub error: Option<WindowFailure>,
    /// Missing-price statistics.
    pub gaps: GapStatistics,
}

impl WindowDiagnostics {
    /// Whether the window completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == WindowStatus::Completed
    }

    /// Total transaction cost charged in the window.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.rebalances.iter().map(|r| r.cost).sum()
    }

    /// Total turnover traded in the window.
    #[must_use]
    pub fn total_turnover(&self) -> f64 {
        self.rebalances.iter().map(|r| r.turnover).sum()
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, Serialize)]
pub struct WalkForwardResult {
    /// Stitched out-of-sample equity curve.
    pub equity_curve: EquityCurve,
    /// Per-window segments in window order.
    pub segments: Vec<EquitySegment>,
    /// Per-window diagnostics in window order.
    pub diagnostics: Vec<WindowDiagnostics>,
    /// Statistics of `equity_curve`.
    pub metrics: MetricsReport,
    /// Terminal state: `done`, `failed` or `cancelled`.
    pub state: EngineState,
    /// Error that aborted the run.
    #[serde(skip)]
    pub error: Option<EngineError>,
    /// Serializable form of `error`.
    pub failure: Option<WindowFailure>,
    /// Annualization factor used for `metrics`.
    pub periods_per_year: u32,
    /// Structured event trail.
    pub events: Vec<RunEvent>,
}

impl WalkForwardResult {
    /// Whether every window was processed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == EngineState::Done
    }

    /// Number of windows that completed.
    #[must_use]
    pub fn completed_windows(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_completed()).count()
    }

    /// Number of windows that failed.
    #[must_use]
    pub fn failed_windows(&self) -> usize {
        self.diagnostics.len() - self.completed_windows()
    }

    /// Last value of the equity curve.
    #[must_use]
    pub fn final_value(&self) -> Option<f64> {
        self.equity_curve.last_value()
    }

    /// Every weight change across the run, in time order.
    #[must_use]
    pub fn weights_history(&self) -> Vec<(DateTime<Utc>, &WeightVector)> {
        self.diagnostics
            .iter()
            .flat_map(|d| d.rebalances.iter())
            .map(|r| (r.timestamp, &r.weights))
            .collect()
    }
}
