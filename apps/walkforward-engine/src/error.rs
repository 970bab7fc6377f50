//! Error taxonomy for the walk-forward engine.
//!
//! Errors fall into two groups:
//!
//! | Code | Scope | Handling |
//! |------|-------|----------|
//! | `INSUFFICIENT_DATA` | run | Fatal, raised before any window is simulated |
//! | `INVALID_PRICE_TABLE` | run | Fatal, input precondition violated |
//! | `CONFIGURATION` | run | Fatal, invalid option combination |
//! | `STRATEGY_EXECUTION` | window | Governed by `on_window_error` |
//! | `INVALID_WEIGHTS` | window | Governed by `on_window_error` |
//! | `INCOMPLETE_ALLOCATION` | window | Governed by `on_window_error` |
//! | `DATA_GAP` | window | Governed by `on_window_error` |
//! | `LOOK_AHEAD` | window | Governed by `on_window_error` |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backtest::DataGapError;
use crate::backtest::strategy::WeightError;
use crate::config::ConfigError;

/// Stable error codes surfaced in diagnostics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Price table shorter than one train + test window.
    InsufficientData,
    /// Price table violates the cleaned-input precondition.
    InvalidPriceTable,
    /// Invalid configuration option or combination.
    Configuration,
    /// The allocation function returned an error or panicked.
    StrategyExecution,
    /// Returned weights failed validation.
    InvalidWeights,
    /// Returned weights do not cover the test-window universe.
    IncompleteAllocation,
    /// Too much of the universe is missing prices for a period.
    DataGap,
    /// A strategy was handed history past its decision point.
    LookAhead,
}

impl ErrorCode {
    /// Get the reason string for this code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InsufficientData => "INSUFFICIENT_DATA",
            Self::InvalidPriceTable => "INVALID_PRICE_TABLE",
            Self::Configuration => "CONFIGURATION",
            Self::StrategyExecution => "STRATEGY_EXECUTION",
            Self::InvalidWeights => "INVALID_WEIGHTS",
            Self::IncompleteAllocation => "INCOMPLETE_ALLOCATION",
            Self::DataGap => "DATA_GAP",
            Self::LookAhead => "LOOK_AHEAD",
        }
    }

    /// Whether errors with this code abort the whole run regardless of policy.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InsufficientData | Self::InvalidPriceTable | Self::Configuration
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// Errors produced by the walk-forward engine and its stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The price table cannot hold a single complete window.
    #[error(
        "INSUFFICIENT_DATA: price table has {rows} rows but train_size {train_size} + test_size {test_size} = {required} are required"
    )]
    InsufficientData {
        /// Rows available.
        rows: usize,
        /// Rows required for one complete window.
        required: usize,
        /// Configured train size.
        train_size: usize,
        /// Configured test size.
        test_size: usize,
    },

    /// Malformed price table.
    #[error("INVALID_PRICE_TABLE: {0}")]
    InvalidPriceTable(String),

    /// Invalid configuration.
    #[error("CONFIGURATION: {0}")]
    Configuration(String),

    /// The allocation function failed.
    #[error("STRATEGY_EXECUTION: strategy '{strategy}' failed in window {window}: {message}")]
    StrategyExecution {
        /// Window index.
        window: usize,
        /// Strategy name.
        strategy: String,
        /// Error or panic message raised by the strategy.
        message: String,
    },

    /// Returned weights are malformed.
    #[error("INVALID_WEIGHTS: window {window}: {cause}")]
    InvalidWeights {
        /// Window index.
        window: usize,
        /// Validation failure.
        #[source]
        cause: WeightError,
    },

    /// Returned weights leave part of the universe unallocated.
    #[error("INCOMPLETE_ALLOCATION: window {window}: no weight for {}", .missing.join(", "))]
    IncompleteAllocation {
        /// Window index.
        window: usize,
        /// Assets without a weight.
        missing: Vec<String>,
    },

    /// Missing prices exceeded the configured tolerance.
    #[error("DATA_GAP: window {window}: {gap}")]
    DataGap {
        /// Window index.
        window: usize,
        /// Gap details.
        #[source]
        gap: DataGapError,
    },

    /// History handed to a strategy extends past its decision point.
    #[error(
        "LOOK_AHEAD: window {window}: history ends at row {history_end} but the decision is made at row {decision_row}"
    )]
    LookAhead {
        /// Window index.
        window: usize,
        /// Exclusive end row of the history slice.
        history_end: usize,
        /// Row at which weights take effect.
        decision_row: usize,
    },
}

impl EngineError {
    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InsufficientData { .. } => ErrorCode::InsufficientData,
            Self::InvalidPriceTable(_) => ErrorCode::InvalidPriceTable,
            Self::Configuration(_) => ErrorCode::Configuration,
            Self::StrategyExecution { .. } => ErrorCode::StrategyExecution,
            Self::InvalidWeights { .. } => ErrorCode::InvalidWeights,
            Self::IncompleteAllocation { .. } => ErrorCode::IncompleteAllocation,
            Self::DataGap { .. } => ErrorCode::DataGap,
            Self::LookAhead { .. } => ErrorCode::LookAhead,
        }
    }

    /// Whether this error aborts the run regardless of `on_window_error`.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.code().is_fatal()
    }

    /// Window the error belongs to, if it is a per-window error.
    #[must_use]
    pub const fn window(&self) -> Option<usize> {
        match self {
            Self::StrategyExecution { window, .. }
            | Self::InvalidWeights { window, .. }
            | Self::IncompleteAllocation { window, .. }
            | Self::DataGap { window, .. }
            | Self::LookAhead { window, .. } => Some(*window),
            Self::InsufficientData { .. } | Self::InvalidPriceTable(_) | Self::Configuration(_) => {
                None
            }
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::backtest::DataGapError;
use crate::backtest::strategy::WeightError;

    #[test_case(ErrorCode::InsufficientData, true ; "insufficient data is fatal")]
    #[test_case(ErrorCode::InvalidPriceTable, true ; "invalid table is fatal")]
    #[test_case(ErrorCode::Configuration, true ; "configuration is fatal")]
    #[test_case(ErrorCode::StrategyExecution, false ; "strategy failure is per window")]
    #[test_case(ErrorCode::InvalidWeights, false ; "invalid weights is per window")]
    #[test_case(ErrorCode::IncompleteAllocation, false ; "incomplete allocation is per window")]
    #[test_case(ErrorCode::DataGap, false ; "data gap is per window")]
    #[test_case(ErrorCode::LookAhead, false ; "look ahead is per window")]
    fn test_error_code_fatality(code: ErrorCode, fatal: bool) {
        assert_eq!(code.is_fatal(), fatal);
    }

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::IncompleteAllocation).unwrap();
        assert_eq!(json, "\"INCOMPLETE_ALLOCATION\"");
    }

    #[test]
    fn test_insufficient_data_display() {
        let err = EngineError::InsufficientData {
            rows: 50,
            required: 80,
            train_size: 60,
            test_size: 20,
        };
        let display = err.to_string();
        assert!(display.starts_with("INSUFFICIENT_DATA"));
        assert!(display.contains("50 rows"));
        assert!(err.is_fatal());
        assert_eq!(err.window(), None);
    }

    #[test]
    fn test_window_errors_carry_index() {
        let err = EngineError::IncompleteAllocation {
            window: 3,
            missing: vec!["B".to_string(), "C".to_string()],
        };
        assert_eq!(err.code(), ErrorCode::IncompleteAllocation);
        assert_eq!(err.window(), Some(3));
        assert!(err.to_string().contains("B, C"));

        let gap = EngineError::DataGap {
            window: 1,
            gap: DataGapError::new("2024-01-05T00:00:00+00:00", vec!["A".to_string()], 1, 2, 0.05),
        };
        assert!(!gap.is_fatal());
        assert!(gap.to_string().contains("DATA_GAP"));
    }
}
