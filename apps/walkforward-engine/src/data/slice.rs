//! Bounded read-only views over a [`PriceTable`].
//!
//! A `PriceSlice` is the only thing an allocation strategy ever sees. Its
//! public surface exposes rows inside `[start, end)` and nothing else, which
//! is what keeps future prices out of reach of a strategy fitted on a train
//! window.

use std::ops::Range;

use chrono::{DateTime, Utc};

use super::table::{PriceRow, PriceTable};

/// Read-only view over rows `[start, end)` of a price table.
#[derive(Debug, Clone, Copy)]
pub struct PriceSlice<'a> {
    table: &'a PriceTable,
    start: usize,
    end: usize,
}

impl<'a> PriceSlice<'a> {
    pub(crate) const fn new(table: &'a PriceTable, start: usize, end: usize) -> Self {
        Self { table, start, end }
    }

    /// First row (inclusive) in table coordinates.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Last row (exclusive) in table coordinates.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Row range in table coordinates.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Number of rows in the view.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the view has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Asset identifiers, in column order.
    #[must_use]
    pub fn assets(&self) -> &'a [String] {
        self.table.assets()
    }

    /// Column index of an asset.
    #[must_use]
    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.table.asset_index(asset)
    }

    /// Rows inside the view.
    #[must_use]
    pub fn rows(&self) -> &'a [PriceRow] {
        &self.table.rows()[self.start..self.end]
    }

    /// Row at a view-relative offset.
    #[must_use]
    pub fn row(&self, offset: usize) -> Option<&'a PriceRow> {
        self.rows().get(offset)
    }

    /// Timestamps inside the view.
    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + use<'a> {
        self.rows().iter().map(|r| r.timestamp)
    }

    /// Timestamp of the first row.
    #[must_use]
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows().first().map(|r| r.timestamp)
    }

    /// Timestamp of the last row.
    #[must_use]
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.rows().last().map(|r| r.timestamp)
    }

    /// Price of `asset` at a view-relative offset.
    #[must_use]
    pub fn price(&self, offset: usize, asset: usize) -> Option<f64> {
        self.row(offset)
            .and_then(|r| r.prices.get(asset).copied().flatten())
    }

    /// Price column for one asset.
    #[must_use]
    pub fn column(&self, asset: usize) -> Vec<Option<f64>> {
        self.rows()
            .iter()
            .map(|r| r.prices.get(asset).copied().flatten())
            .collect()
    }

    /// Last observed price of `asset` inside the view.
    #[must_use]
    pub fn last_price(&self, asset: usize) -> Option<f64> {
        self.rows()
            .iter()
            .rev()
            .find_map(|r| r.prices.get(asset).copied().flatten())
    }

    /// Simple returns `p[t] / p[t-1] - 1` between consecutive observed prices.
    #[must_use]
    pub fn simple_returns(&self, asset: usize) -> Vec<f64> {
        self.observed_pairs(asset)
            .map(|(prev, curr)| curr / prev - 1.0)
            .collect()
    }

    /// Log returns `ln(p[t] / p[t-1])` between consecutive observed prices.
    #[must_use]
    pub fn log_returns(&self, asset: usize) -> Vec<f64> {
        self.observed_pairs(asset)
            .map(|(prev, curr)| (curr / prev).ln())
            .collect()
    }

    /// Assets with at least one observed price inside the view.
    #[must_use]
    pub fn universe(&self) -> Vec<String> {
        self.assets()
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                self.rows()
                    .iter()
                    .any(|r| r.prices.get(*idx).copied().flatten().is_some())
            })
            .map(|(_, asset)| asset.clone())
            .collect()
    }

    /// Timestamp of the row immediately before the view, where a test
    /// window's capital is committed.
    pub(crate) fn anchor_timestamp(&self) -> Option<DateTime<Utc>> {
        self.start
            .checked_sub(1)
            .and_then(|row| self.table.timestamp(row))
    }

    /// Last price of `asset` observed strictly before the view.
    pub(crate) fn observed_before(&self, asset: usize) -> Option<f64> {
        self.table.rows()[..self.start]
            .iter()
            .rev()
            .find_map(|r| r.prices.get(asset).copied().flatten())
    }

    fn observed_pairs(&self, asset: usize) -> impl Iterator<Item = (f64, f64)> + use<'a> {
        let mut previous: Option<f64> = None;
        self.rows().iter().filter_map(move |row| {
            let current = row.prices.get(asset).copied().flatten()?;
            let pair = previous.map(|prev| (prev, current));
            previous = Some(current);
            pair
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn table() -> PriceTable {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = vec![
            PriceRow::new(start, vec![100.0, 50.0]),
            PriceRow::with_gaps(start + Duration::days(1), vec![Some(110.0), None]),
            PriceRow::new(start + Duration::days(2), vec![99.0, 55.0]),
            PriceRow::new(start + Duration::days(3), vec![99.0, 60.5]),
        ];
        PriceTable::new(vec!["A".to_string(), "B".to_string()], rows).unwrap()
    }

    #[test]
    fn test_view_bounds() {
        let table = table();
        let view = table.slice(1..3);
        assert_eq!(view.len(), 2);
        assert_eq!(view.rows().len(), 2);
        assert_eq!(view.price(0, 0), Some(110.0));
        assert_eq!(view.price(2, 0), None);
        assert_eq!(view.last_price(1), Some(55.0));
        assert_eq!(view.timestamps().count(), 2);
    }

    #[test]
    fn test_simple_returns_span_gaps() {
        let table = table();
        let returns = table.full().simple_returns(1);
        // 50 -> (gap) -> 55 -> 60.5
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_log_returns() {
        let table = table();
        let returns = table.full().log_returns(0);
        assert_eq!(returns.len(), 3);
        assert!((returns[0] - (1.1f64).ln()).abs() < 1e-12);
        assert_eq!(returns[2], 0.0);
    }

    #[test]
    fn test_universe_excludes_absent_assets() {
        let table = table();
        assert_eq!(table.slice(1..2).universe(), vec!["A".to_string()]);
        assert_eq!(table.full().universe().len(), 2);
    }

    #[test]
    fn test_anchor_and_observed_before() {
        let table = table();
        let view = table.slice(2..4);
        assert_eq!(view.anchor_timestamp(), table.timestamp(1));
        assert_eq!(view.observed_before(0), Some(110.0));
        assert_eq!(view.observed_before(1), Some(50.0));

        let head = table.slice(0..2);
        assert_eq!(head.anchor_timestamp(), None);
        assert_eq!(head.observed_before(0), None);
    }
}
