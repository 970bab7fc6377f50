//! Statistical math utilities for performance metric calculations.

use super::constants::ZERO_TOLERANCE;

/// Calculate mean of a slice.
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
#[allow(clippy::cast_precision_loss)]
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let avg = mean(values)?;
    let variance_sum: f64 = values.iter().map(|v| (v - avg) * (v - avg)).sum();
    let variance = variance_sum / (values.len() - 1) as f64;

    Some(variance.sqrt())
}

/// Sample standard deviation of `min(r - target, 0)`.
pub fn downside_deviation(values: &[f64], target: f64) -> Option<f64> {
    let shortfalls: Vec<f64> = values.iter().map(|r| (r - target).min(0.0)).collect();
    std_dev(&shortfalls)
}

/// Whether a dispersion measure counts as zero.
pub fn is_zero(value: f64) -> bool {
    value.abs() < ZERO_TOLERANCE
}

/// Population central moments `(m2, m3, m4)`.
#[allow(clippy::cast_precision_loss)]
fn central_moments(values: &[f64]) -> Option<(f64, f64, f64)> {
    let avg = mean(values)?;
    let n = values.len() as f64;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - avg;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    Some((m2 / n, m3 / n, m4 / n))
}

/// Adjusted Fisher-Pearson sample skewness (G1).
///
/// NaN for fewer than three values or zero variance.
#[allow(clippy::cast_precision_loss)]
pub fn skewness(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return f64::NAN;
    }
    let Some((m2, m3, _)) = central_moments(values) else {
        return f64::NAN;
    };
    if is_zero(m2.sqrt()) {
        return f64::NAN;
    }

    let n = values.len() as f64;
    let g1 = m3 / m2.powf(1.5);
    (n * (n - 1.0)).sqrt() / (n - 2.0) * g1
}

/// Bias-corrected sample excess kurtosis (G2).
///
/// NaN for fewer than four values or zero variance.
#[allow(clippy::cast_precision_loss)]
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return f64::NAN;
    }
    let Some((m2, _, m4)) = central_moments(values) else {
        return f64::NAN;
    };
    if is_zero(m2.sqrt()) {
        return f64::NAN;
    }

    let n = values.len() as f64;
    let g2 = m4 / (m2 * m2) - 3.0;
    ((n + 1.0) * g2 + 6.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0))
}

/// Most negative `value / running_max - 1`. Zero for an empty or
/// non-decreasing series.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &v in values {
        peak = peak.max(v);
        if peak > 0.0 {
            worst = worst.min(v / peak - 1.0);
        }
    }
    worst
}

/// Longest run of consecutive points below the running peak.
pub fn max_drawdown_duration(values: &[f64]) -> usize {
    let mut peak = f64::NEG_INFINITY;
    let mut current = 0usize;
    let mut longest = 0usize;
    for &v in values {
        if v >= peak {
            peak = v;
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}
