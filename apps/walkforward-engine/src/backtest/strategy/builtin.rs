//! Built-in allocation strategies.

use tracing::debug;

use super::adapter::{AllocationStrategy, StrategyError};
use super::weights::WeightVector;
use crate::backtest::metrics::math::{is_zero, std_dev};
use crate::data::PriceSlice;

/// Equal weight across every asset observed in the history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EqualWeight;

impl AllocationStrategy for EqualWeight {
    fn allocate(&self, history: &PriceSlice<'_>) -> Result<WeightVector, StrategyError> {
        let universe = history.universe();
        if universe.is_empty() {
            return Err("no asset has a price in the history window".into());
        }
        Ok(WeightVector::equal(&universe))
    }

    fn name(&self) -> &str {
        "equal_weight"
    }
}

/// Weights proportional to the inverse volatility of period returns.
///
/// Falls back to equal weight when any asset has zero or undefined
/// volatility over the lookback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InverseVolatility {
    lookback: Option<usize>,
}

impl InverseVolatility {
    /// Use the whole history.
    #[must_use]
    pub const fn new() -> Self {
        Self { lookback: None }
    }

    /// Use only the most recent `rows` rows of history.
    #[must_use]
    pub const fn with_lookback(rows: usize) -> Self {
        Self {
            lookback: Some(rows),
        }
    }
}

impl AllocationStrategy for InverseVolatility {
    fn allocate(&self, history: &PriceSlice<'_>) -> Result<WeightVector, StrategyError> {
        let universe = history.universe();
        if universe.is_empty() {
            return Err("no asset has a price in the history window".into());
        }

        let returns_per_asset: Vec<Vec<f64>> = universe
            .iter()
            .filter_map(|asset| history.asset_index(asset))
            .map(|idx| {
                let returns = history.simple_returns(idx);
                match self.lookback {
                    Some(rows) if returns.len() > rows => returns[returns.len() - rows..].to_vec(),
                    _ => returns,
                }
            })
            .collect();

        let inverse: Option<Vec<f64>> = returns_per_asset
            .iter()
            .map(|returns| match std_dev(returns) {
                Some(vol) if vol.is_finite() && !is_zero(vol) => Some(1.0 / vol),
                _ => None,
            })
            .collect();

        let Some(inverse) = inverse else {
            debug!("Zero or undefined volatility in history, using equal weight");
            return Ok(WeightVector::equal(&universe));
        };

        let total: f64 = inverse.iter().sum();
        Ok(universe
            .into_iter()
            .zip(inverse)
            .map(|(asset, inv)| (asset, inv / total))
            .collect())
    }

    fn name(&self) -> &str {
        "inverse_volatility"
    }
}
