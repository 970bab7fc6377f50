//! Equity segments and the stitched out-of-sample curve.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Portfolio value at one timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Point timestamp.
    pub timestamp: DateTime<Utc>,
    /// Portfolio value.
    pub value: f64,
}

impl EquityPoint {
    /// Create a point.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Equity path of one test window.
///
/// The first point is the anchor: the row before the test window, carrying
/// the starting value. The remaining points follow the test rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquitySegment {
    points: Vec<EquityPoint>,
}

impl EquitySegment {
    /// Wrap a sequence of points.
    #[must_use]
    pub const fn new(points: Vec<EquityPoint>) -> Self {
        Self { points }
    }

    /// Segment holding `value` constant over `timestamps`.
    #[must_use]
    pub fn flat(timestamps: impl IntoIterator<Item = DateTime<Utc>>, value: f64) -> Self {
        Self {
            points: timestamps
                .into_iter()
                .map(|timestamp| EquityPoint::new(timestamp, value))
                .collect(),
        }
    }

    /// Points in time order.
    #[must_use]
    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the segment has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Value of the first point.
    #[must_use]
    pub fn start_value(&self) -> Option<f64> {
        self.points.first().map(|p| p.value)
    }

    /// Value of the last point.
    #[must_use]
    pub fn end_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    /// `end / start - 1`, or NaN for an empty segment.
    #[must_use]
    pub fn realized_return(&self) -> f64 {
        match (self.start_value(), self.end_value()) {
            (Some(start), Some(end)) if start != 0.0 => end / start - 1.0,
            _ => f64::NAN,
        }
    }
}

/// One point of the drawdown series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    /// Point timestamp.
    pub timestamp: DateTime<Utc>,
    /// Portfolio value.
    pub wealth: f64,
    /// Running maximum of the value.
    pub peak: f64,
    /// `wealth / peak - 1`, always <= 0.
    pub drawdown: f64,
}

/// Continuous out-of-sample equity curve.
///
/// Timestamps are strictly increasing. Appending a segment whose anchor
/// repeats the current last timestamp drops the duplicate point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    /// Empty curve.
    #[must_use]
    pub const fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Stitch segments in order.
    #[must_use]
    pub fn stitch<'a>(segments: impl IntoIterator<Item = &'a EquitySegment>) -> Self {
        let mut curve = Self::new();
        for segment in segments {
            curve.append(segment);
        }
        curve
    }

    /// Append a segment, skipping points not later than the current end.
    pub fn append(&mut self, segment: &EquitySegment) {
        for point in segment.points() {
            if let Some(last) = self.points.last()
                && point.timestamp <= last.timestamp
            {
                debug!(
                    timestamp = %point.timestamp,
                    "Dropping equity point already on the curve"
                );
                continue;
            }
            self.points.push(*point);
        }
    }

    /// Points in time order.
    #[must_use]
    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    /// Portfolio values in time order.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Timestamps in order.
    #[must_use]
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the curve has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First value.
    #[must_use]
    pub fn first_value(&self) -> Option<f64> {
        self.points.first().map(|p| p.value)
    }

    /// Last value.
    #[must_use]
    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    /// Periodic returns `equity[t] / equity[t-1] - 1`.
    #[must_use]
    pub fn period_returns(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|pair| pair[1].value / pair[0].value - 1.0)
            .collect()
    }

    /// Cumulative return `equity[t] / equity[0] - 1` at each point.
    #[must_use]
    pub fn cumulative_returns(&self) -> Vec<(DateTime<Utc>, f64)> {
        let Some(first) = self.first_value() else {
            return Vec::new();
        };
        self.points
            .iter()
            .map(|p| (p.timestamp, p.value / first - 1.0))
            .collect()
    }

    /// Drawdown from the running peak at each point.
    #[must_use]
    pub fn drawdown_series(&self) -> Vec<DrawdownPoint> {
        let mut peak = f64::NEG_INFINITY;
        self.points
            .iter()
            .map(|p| {
                peak = peak.max(p.value);
                let drawdown = if peak > 0.0 {
                    (p.value / peak - 1.0).min(0.0)
                } else {
                    0.0
                };
                DrawdownPoint {
                    timestamp: p.timestamp,
                    wealth: p.value,
                    peak,
                    drawdown,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn ts(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    fn segment(start_day: i64, values: &[f64]) -> EquitySegment {
        EquitySegment::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| EquityPoint::new(ts(start_day + i as i64), *v))
                .collect(),
        )
    }

    #[test]
    fn test_segment_return() {
        let seg = segment(0, &[100.0, 105.0, 110.0]);
        assert_eq!(seg.start_value(), Some(100.0));
        assert_eq!(seg.end_value(), Some(110.0));
        assert!((seg.realized_return() - 0.1).abs() < 1e-12);
        assert!(EquitySegment::default().realized_return().is_nan());
    }

    #[test]
    fn test_stitch_drops_duplicate_anchor() {
        let first = segment(0, &[100.0, 102.0, 104.0]);
        let second = segment(2, &[104.0, 103.0, 108.0]);
        let curve = EquityCurve::stitch([&first, &second]);

        assert_eq!(curve.len(), 5);
        assert_eq!(curve.values(), vec![100.0, 102.0, 104.0, 103.0, 108.0]);
        for pair in curve.points().windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn test_stitch_keeps_later_anchor() {
        // A gap between windows: the second anchor is a new, later timestamp.
        let first = segment(0, &[100.0, 101.0]);
        let second = segment(3, &[101.0, 99.0]);
        let curve = EquityCurve::stitch([&first, &second]);
        assert_eq!(curve.len(), 4);
        assert_eq!(curve.timestamps()[2], ts(3));
    }

    #[test]
    fn test_flat_segment() {
        let seg = EquitySegment::flat((0..3).map(ts), 250.0);
        assert_eq!(seg.len(), 3);
        assert!(seg.points().iter().all(|p| (p.value - 250.0).abs() < f64::EPSILON));
        assert!(seg.realized_return().abs() < f64::EPSILON);
    }

    #[test]
    fn test_period_and_cumulative_returns() {
        let curve = EquityCurve::stitch([&segment(0, &[100.0, 110.0, 99.0])]);
        let returns = curve.period_returns();
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] + 0.1).abs() < 1e-12);

        let cumulative = curve.cumulative_returns();
        assert!(cumulative[0].1.abs() < f64::EPSILON);
        assert!((cumulative[2].1 + 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_series() {
        let curve = EquityCurve::stitch([&segment(0, &[100.0, 120.0, 90.0, 130.0])]);
        let series = curve.drawdown_series();
        assert!(series[0].drawdown.abs() < f64::EPSILON);
        assert!((series[2].peak - 120.0).abs() < f64::EPSILON);
        assert!((series[2].drawdown + 0.25).abs() < 1e-12);
        assert!(series[3].drawdown.abs() < f64::EPSILON);
        assert!(series.iter().all(|p| p.drawdown <= 0.0));
    }

    #[test]
    fn test_serializes_as_point_list() {
        let curve = EquityCurve::stitch([&segment(0, &[100.0])]);
        let json = serde_json::to_value(&curve).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["value"], 100.0);
    }
}
