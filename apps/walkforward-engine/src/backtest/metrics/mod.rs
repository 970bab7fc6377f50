//! Performance metrics for walk-forward equity curves.
//!
//! Implements the standard portfolio statistics:
//! - Total and annualized return
//! - Annualized volatility
//! - Maximum drawdown and its duration
//! - Sharpe, Sortino and Calmar ratios
//! - Skewness and excess kurtosis of period returns

mod calculator;
mod constants;
mod format;
pub(crate) mod math;
mod types;

pub use calculator::MetricsCalculator;
pub use format::{format_decimal, format_pct, format_ratio};
pub use types::MetricsReport;
