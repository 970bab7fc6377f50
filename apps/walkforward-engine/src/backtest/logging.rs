//! Walk-forward run logging and observability.
//!
//! Provides structured logging for every stage of a run:
//! - Run start with the window layout and strategy
//! - Per-window completion with capital in and out
//! - Per-window failures and the action taken
//! - Run end with the terminal state
//!
//! # Log Levels
//!
//! - **INFO**: Normal operations (run start/end, completed windows)
//! - **WARN**: Failed windows, cancellation
//! - **DEBUG**: State transitions and rebalance details (emitted by the engine)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ErrorCode;

// ============================================
// Event Types
// ============================================

/// Run event for structured logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Run started.
    RunStart(RunStartEvent),
    /// Window simulated.
    WindowCompleted(WindowCompletedEvent),
    /// Window failed.
    WindowFailed(WindowFailedEvent),
    /// Run ended.
    RunEnd(RunEndEvent),
}

/// Run start event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStartEvent {
    /// Strategy name.
    pub strategy: String,
    /// Window mode.
    pub mode: String,
    /// Train window length.
    pub train_size: usize,
    /// Test window length.
    pub test_size: usize,
    /// Step between windows.
    pub step: usize,
    /// Number of windows.
    pub windows: usize,
    /// Rows in the price table.
    pub rows: usize,
    /// Assets in the price table.
    pub assets: usize,
    /// Starting capital.
    pub initial_capital: f64,
}

/// Window completed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowCompletedEvent {
    /// Window index.
    pub window: usize,
    /// First test timestamp.
    pub test_start: DateTime<Utc>,
    /// Last test timestamp.
    pub test_end: DateTime<Utc>,
    /// Capital entering the window.
    pub start_value: f64,
    /// Capital leaving the window.
    pub end_value: f64,
    /// `end_value / start_value - 1`.
    pub realized_return: f64,
    /// Rebalances applied.
    pub rebalances: usize,
    /// Warnings recorded.
    pub warnings: usize,
}

/// Window failed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowFailedEvent {
    /// Window index.
    pub window: usize,
    /// Error code.
    pub code: ErrorCode,
    /// Error message.
    pub message: String,
    /// Action taken (`skip` or `abort`).
    pub action: String,
    /// Capital carried past the window.
    pub capital: f64,
}

/// Run end event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEndEvent {
    /// Terminal engine state.
    pub state: String,
    /// Windows simulated successfully.
    pub windows_completed: usize,
    /// Windows that failed.
    pub windows_failed: usize,
    /// Last curve value.
    pub final_value: f64,
}

// ============================================
// Logging Functions
// ============================================

/// Log run start.
pub fn log_run_start(event: &RunStartEvent) {
    info!(
        strategy = %event.strategy,
        mode = %event.mode,
        train_size = event.train_size,
        test_size = event.test_size,
        step = event.step,
        windows = event.windows,
        rows = event.rows,
        assets = event.assets,
        initial_capital = event.initial_capital,
        "Walk-forward run started"
    );
}

/// Log window completion.
pub fn log_window_completed(event: &WindowCompletedEvent) {
    info!(
        window = event.window,
        test_start = %event.test_start,
        test_end = %event.test_end,
        start_value = event.start_value,
        end_value = event.end_value,
        realized_return = event.realized_return,
        rebalances = event.rebalances,
        warnings = event.warnings,
        "Window completed"
    );
}

/// Log window failure.
pub fn log_window_failed(event: &WindowFailedEvent) {
    warn!(
        window = event.window,
        code = %event.code,
        error = %event.message,
        action = %event.action,
        capital = event.capital,
        "Window failed"
    );
}

/// Log run end.
pub fn log_run_end(event: &RunEndEvent) {
    info!(
        state = %event.state,
        windows_completed = event.windows_completed,
        windows_failed = event.windows_failed,
        final_value = event.final_value,
        "Walk-forward run finished"
    );
}

// ============================================
// Run Logger
// ============================================

/// Collects run events, optionally forwarding them to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct RunLogger {
    events: Vec<RunEvent>,
    log_to_tracing: bool,
}

impl RunLogger {
    /// Create a new run logger.
    #[must_use]
    pub const fn new(log_to_tracing: bool) -> Self {
        Self {
            events: Vec::new(),
            log_to_tracing,
        }
    }

    /// Log an event.
    pub fn log(&mut self, event: RunEvent) {
        if self.log_to_tracing {
            Self::emit_to_tracing(&event);
        }
        self.events.push(event);
    }

    fn emit_to_tracing(event: &RunEvent) {
        match event {
            RunEvent::RunStart(e) => log_run_start(e),
            RunEvent::WindowCompleted(e) => log_window_completed(e),
            RunEvent::WindowFailed(e) => log_window_failed(e),
            RunEvent::RunEnd(e) => log_run_end(e),
        }
    }

    /// Get all logged events.
    #[must_use]
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Get event count.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Get events matching a filter.
    pub fn events_of_type<F>(&self, filter: F) -> Vec<&RunEvent>
    where
        F: Fn(&RunEvent) -> bool,
    {
        self.events.iter().filter(|e| filter(e)).collect()
    }

    /// Take the collected events.
    #[must_use]
    pub fn into_events(self) -> Vec<RunEvent> {
        self.events
    }

    /// Export events as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.events)
    }
}
