//! Missing-price detection during simulation.
//!
//! A cleaned price table should have no gaps, but the engine still checks
//! every simulated row against the test window's universe:
//!
//! - a missing price freezes that holding for the period (zero return)
//! - if the missing share of the universe exceeds the tolerance, the
//!   window fails with [`DataGapError`]

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::PriceRow;

/// Error returned when too much of the universe is missing prices.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
#[error(
    "{missing_count} of {universe_size} assets missing at {timestamp} (tolerance {tolerance}): {}",
    .missing_assets.join(", ")
)]
pub struct DataGapError {
    /// Timestamp of the affected row.
    pub timestamp: String,
    /// Assets without a price.
    pub missing_assets: Vec<String>,
    /// Number of assets without a price.
    pub missing_count: usize,
    /// Size of the universe the row was checked against.
    pub universe_size: usize,
    /// Configured tolerance.
    pub tolerance: f64,
}

impl DataGapError {
    /// Create a new data gap error.
    pub fn new(
        timestamp: impl Into<String>,
        missing_assets: Vec<String>,
        missing_count: usize,
        universe_size: usize,
        tolerance: f64,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            missing_assets,
            missing_count,
            universe_size,
            tolerance,
        }
    }

    /// Missing share of the universe.
    #[must_use]
    pub fn missing_fraction(&self) -> f64 {
        missing_fraction(self.missing_count, self.universe_size)
    }
}

/// Outcome of checking one row against the universe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCoverage {
    /// Column indices of universe assets without a price.
    pub missing: Vec<usize>,
    /// Universe size the row was checked against.
    pub universe_size: usize,
}

impl RowCoverage {
    /// Whether every universe asset has a price.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Missing share of the universe.
    #[must_use]
    pub fn missing_fraction(&self) -> f64 {
        missing_fraction(self.missing.len(), self.universe_size)
    }
}

/// Check a row's coverage of `universe` (column indices into `assets`).
///
/// # Errors
///
/// Returns `DataGapError` when the missing fraction exceeds `tolerance`.
pub fn check_row_coverage(
    row: &PriceRow,
    assets: &[String],
    universe: &[usize],
    tolerance: f64,
) -> Result<RowCoverage, DataGapError> {
    let missing: Vec<usize> = universe
        .iter()
        .copied()
        .filter(|&col| row.prices.get(col).copied().flatten().is_none())
        .collect();

    let coverage = RowCoverage {
        missing,
        universe_size: universe.len(),
    };

    if coverage.is_complete() {
        return Ok(coverage);
    }

    let fraction = coverage.missing_fraction();
    let names: Vec<String> = coverage
        .missing
        .iter()
        .filter_map(|&col| assets.get(col).cloned())
        .collect();

    if fraction > tolerance {
        let timestamp = row.timestamp.to_rfc3339();
        warn!(
            timestamp = %timestamp,
            missing = ?names,
            fraction = fraction,
            tolerance = tolerance,
            "Missing prices exceed tolerance"
        );
        return Err(DataGapError::new(
            timestamp,
            names,
            coverage.missing.len(),
            coverage.universe_size,
            tolerance,
        ));
    }

    debug!(
        timestamp = %row.timestamp,
        missing = ?names,
        "Freezing holdings with missing prices"
    );

    Ok(coverage)
}

/// Gap statistics for one simulated segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapStatistics {
    /// Rows checked.
    pub rows_checked: u64,
    /// Rows with at least one missing universe price.
    pub rows_with_gaps: u64,
    /// Asset-periods held frozen.
    pub frozen_holdings: u64,
}

impl GapStatistics {
    /// Record one checked row.
    pub fn record(&mut self, coverage: &RowCoverage) {
        self.rows_checked += 1;
        if !coverage.is_complete() {
            self.rows_with_gaps += 1;
            self.frozen_holdings += coverage.missing.len() as u64;
        }
    }

    /// Share of checked rows that had a gap.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn gap_rate(&self) -> f64 {
        if self.rows_checked == 0 {
            0.0
        } else {
            self.rows_with_gaps as f64 / self.rows_checked as f64
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn missing_fraction(missing: usize, universe: usize) -> f64 {
    if universe == 0 {
        0.0
    } else {
        missing as f64 / universe as f64
    }
}
