//! Metrics calculator for stitched equity curves.

use tracing::debug;

use super::math::{
    downside_deviation, excess_kurtosis, is_zero, max_drawdown, max_drawdown_duration, mean,
    skewness, std_dev,
};
use super::types::MetricsReport;
use crate::backtest::equity::EquityCurve;

/// Computes a [`MetricsReport`] from an equity curve.
///
/// Periodic returns are `r_t = equity[t] / equity[t-1] - 1`. Sharpe and
/// Sortino subtract the per-period risk-free rate `rf / periods_per_year`
/// and are annualized by `sqrt(periods_per_year)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsCalculator {
    risk_free_rate: f64,
}

impl MetricsCalculator {
    /// Create a calculator with an annual risk-free rate.
    #[must_use]
    pub const fn new(risk_free_rate: f64) -> Self {
        Self { risk_free_rate }
    }

    /// Annual risk-free rate.
    #[must_use]
    pub const fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    /// Compute the report for a curve.
    #[must_use]
    pub fn compute(&self, curve: &EquityCurve, periods_per_year: u32) -> MetricsReport {
        self.compute_values(&curve.values(), periods_per_year)
    }

    /// Compute the report for a raw series of portfolio values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compute_values(&self, equity: &[f64], periods_per_year: u32) -> MetricsReport {
        let (Some(&first), Some(&last)) = (equity.first(), equity.last()) else {
            return MetricsReport::undefined(periods_per_year, self.risk_free_rate);
        };

        let returns: Vec<f64> = equity
            .windows(2)
            .map(|pair| pair[1] / pair[0] - 1.0)
            .collect();
        let n = returns.len();
        let ppy = f64::from(periods_per_year);
        let annualizer = ppy.sqrt();
        let period_rf = self.risk_free_rate / ppy;

        let total_return = last / first - 1.0;
        let annualized_return = if n == 0 {
            f64::NAN
        } else {
            (1.0 + total_return).powf(ppy / n as f64) - 1.0
        };

        let volatility = std_dev(&returns);
        let annualized_volatility = volatility.map_or(f64::NAN, |s| s * annualizer);

        let excess_mean = mean(&returns).map(|m| m - period_rf);

        let sharpe_ratio = match (excess_mean, volatility) {
            (Some(excess), Some(std)) if !is_zero(std) => excess / std * annualizer,
            _ => f64::NAN,
        };

        let sortino_ratio = match (excess_mean, downside_deviation(&returns, period_rf)) {
            (Some(excess), Some(downside)) => {
                if !is_zero(downside) {
                    excess / downside * annualizer
                } else if is_zero(excess) {
                    f64::NAN
                } else {
                    f64::INFINITY.copysign(excess)
                }
            }
            _ => f64::NAN,
        };

        let max_drawdown = max_drawdown(equity);
        let calmar_ratio = if max_drawdown == 0.0 {
            f64::NAN
        } else {
            annualized_return / max_drawdown.abs()
        };

        let best_period = returns.iter().copied().reduce(f64::max).unwrap_or(f64::NAN);
        let worst_period = returns.iter().copied().reduce(f64::min).unwrap_or(f64::NAN);

        let report = MetricsReport {
            total_return,
            annualized_return,
            annualized_volatility,
            max_drawdown,
            max_drawdown_duration: max_drawdown_duration(equity),
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            skewness: skewness(&returns),
            kurtosis: excess_kurtosis(&returns),
            best_period,
            worst_period,
            periods: n,
            periods_per_year,
            risk_free_rate: self.risk_free_rate,
            initial_equity: first,
            final_equity: last,
        };

        debug!(
            periods = n,
            total_return = report.total_return,
            sharpe = report.sharpe_ratio,
            max_drawdown = report.max_drawdown,
            "Computed performance metrics"
        );

        report
    }
}
