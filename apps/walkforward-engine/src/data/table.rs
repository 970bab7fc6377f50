//! Time-indexed price table.

use std::collections::HashSet;
use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::slice::PriceSlice;
use crate::error::EngineError;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Trading periods per year assumed for daily data.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// One row of the price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    /// Row timestamp.
    pub timestamp: DateTime<Utc>,
    /// Prices aligned with the table's asset list. `None` marks a missing price.
    pub prices: Vec<Option<f64>>,
}

impl PriceRow {
    /// Create a row where every asset has a price.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, prices: Vec<f64>) -> Self {
        Self {
            timestamp,
            prices: prices.into_iter().map(Some).collect(),
        }
    }

    /// Create a row that may contain missing prices.
    #[must_use]
    pub const fn with_gaps(timestamp: DateTime<Utc>, prices: Vec<Option<f64>>) -> Self {
        Self { timestamp, prices }
    }
}

/// Wire shape accepted when deserializing a [`PriceTable`].
#[derive(Debug, Deserialize)]
struct RawPriceTable {
    assets: Vec<String>,
    rows: Vec<PriceRow>,
}

impl TryFrom<RawPriceTable> for PriceTable {
    type Error = EngineError;

    fn try_from(raw: RawPriceTable) -> Result<Self, Self::Error> {
        Self::new(raw.assets, raw.rows)
    }
}

/// Ordered, validated table of per-asset prices.
///
/// Invariants established at construction:
/// - at least one asset, asset identifiers unique
/// - every row has one cell per asset
/// - timestamps strictly increasing
/// - every present price is finite and positive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceTable")]
pub struct PriceTable {
    assets: Vec<String>,
    rows: Vec<PriceRow>,
}

impl PriceTable {
    /// Build a table, rejecting input that violates the cleaned-data precondition.
    pub fn new(assets: Vec<String>, rows: Vec<PriceRow>) -> Result<Self, EngineError> {
        if assets.is_empty() {
            return Err(EngineError::InvalidPriceTable(
                "asset universe is empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(assets.len());
        for asset in &assets {
            if !seen.insert(asset.as_str()) {
                return Err(EngineError::InvalidPriceTable(format!(
                    "duplicate asset '{asset}'"
                )));
            }
        }

        for (idx, row) in rows.iter().enumerate() {
            if row.prices.len() != assets.len() {
                return Err(EngineError::InvalidPriceTable(format!(
                    "row {idx} has {} prices, expected {}",
                    row.prices.len(),
                    assets.len()
                )));
            }

            if idx > 0 && row.timestamp <= rows[idx - 1].timestamp {
                return Err(EngineError::InvalidPriceTable(format!(
                    "timestamps not strictly increasing at row {idx} ({})",
                    row.timestamp.to_rfc3339()
                )));
            }

            for (asset, price) in assets.iter().zip(&row.prices) {
                if let Some(p) = price
                    && (!p.is_finite() || *p <= 0.0)
                {
                    return Err(EngineError::InvalidPriceTable(format!(
                        "invalid price {p} for '{asset}' at row {idx}"
                    )));
                }
            }
        }

        Ok(Self { assets, rows })
    }

    /// Asset identifiers, in column order.
    #[must_use]
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Column index of an asset.
    #[must_use]
    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[PriceRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Timestamp of a row.
    #[must_use]
    pub fn timestamp(&self, row: usize) -> Option<DateTime<Utc>> {
        self.rows.get(row).map(|r| r.timestamp)
    }

    /// Borrow a bounded view over `range`, clamped to the table length.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> PriceSlice<'_> {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        PriceSlice::new(self, start, end)
    }

    /// Borrow the whole table as a view.
    #[must_use]
    pub fn full(&self) -> PriceSlice<'_> {
        self.slice(0..self.rows.len())
    }

    /// Infer the number of periods per year from the median row spacing.
    ///
    /// Returns `None` when there are fewer than two rows or the spacing does
    /// not match a known frequency.
    #[must_use]
    pub fn infer_periods_per_year(&self) -> Option<u32> {
        if self.rows.len() < 2 {
            return None;
        }

        let mut spacings: Vec<i64> = self
            .rows
            .windows(2)
            .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_seconds())
            .collect();
        spacings.sort_unstable();
        let median_secs = spacings[spacings.len() / 2] as f64;
        let days = median_secs / SECONDS_PER_DAY;

        match days {
            d if d <= 0.0 => None,
            d if d < 1.0 => {
                let per_day = (SECONDS_PER_DAY / median_secs).round() as u32;
                Some(TRADING_DAYS_PER_YEAR * per_day.max(1))
            }
            d if d < 4.0 => Some(TRADING_DAYS_PER_YEAR),
            d if d <= 10.0 => Some(52),
            d if (25.0..=35.0).contains(&d) => Some(12),
            d if (80.0..=100.0).contains(&d) => Some(4),
            d if (350.0..=380.0).contains(&d) => Some(1),
            _ => None,
        }
    }
}
