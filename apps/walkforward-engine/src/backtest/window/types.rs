//! Core types for window generation.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Window mode for walk-forward analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Rolling window: fixed-size train window slides forward.
    #[default]
    Rolling,
    /// Expanding window: train start is fixed at the first row, window grows over time.
    Expanding,
}

impl std::fmt::Display for WindowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rolling => write!(f, "rolling"),
            Self::Expanding => write!(f, "expanding"),
        }
    }
}

/// Partitioning parameters, all measured in rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Rolling or expanding train window.
    pub mode: WindowMode,
    /// Train window length (rolling) or minimum length (expanding).
    pub train_size: usize,
    /// Test window length.
    pub test_size: usize,
    /// Advance between consecutive windows.
    pub step: usize,
}

impl WindowSpec {
    /// Create a spec whose step equals the test size.
    #[must_use]
    pub const fn new(mode: WindowMode, train_size: usize, test_size: usize) -> Self {
        Self {
            mode,
            train_size,
            test_size,
            step: test_size,
        }
    }

    /// Override the step.
    #[must_use]
    pub const fn with_step(mut self, step: usize) -> Self {
        self.step = step;
        self
    }

    /// Rows needed for one complete window, saturating at `usize::MAX`.
    #[must_use]
    pub const fn min_rows(&self) -> usize {
        self.train_size.saturating_add(self.test_size)
    }
}

/// A single train/test partition. Ranges are `[start, end)` row indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Window index (0-based).
    pub index: usize,
    /// Train rows.
    pub train: Range<usize>,
    /// Test rows. Always starts where `train` ends.
    pub test: Range<usize>,
}

impl Window {
    /// Number of train rows.
    #[must_use]
    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    /// Number of test rows.
    #[must_use]
    pub fn test_len(&self) -> usize {
        self.test.len()
    }
}
