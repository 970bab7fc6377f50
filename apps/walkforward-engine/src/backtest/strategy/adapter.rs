//! Uniform calling contract around allocation strategies.
//!
//! Strategies are untrusted. The adapter:
//! - refuses to hand a strategy history that ends after the decision row
//! - turns returned errors and panics into `STRATEGY_EXECUTION`
//! - validates the returned weights against the test-window universe

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, warn};

use super::weights::WeightVector;
use crate::config::WalkForwardConfig;
use crate::data::PriceSlice;
use crate::error::EngineError;

/// Error type strategies may return.
pub type StrategyError = Box<dyn std::error::Error + Send + Sync>;

/// A portfolio allocation function.
///
/// `allocate` receives a read-only view of the train history and returns
/// target weights. It must not rely on anything outside that view.
pub trait AllocationStrategy: Send + Sync {
    /// Compute target weights from the train history.
    fn allocate(&self, history: &PriceSlice<'_>) -> Result<WeightVector, StrategyError>;

    /// Name used in logs and diagnostics.
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> AllocationStrategy for F
where
    F: Fn(&PriceSlice<'_>) -> Result<WeightVector, StrategyError> + Send + Sync,
{
    fn allocate(&self, history: &PriceSlice<'_>) -> Result<WeightVector, StrategyError> {
        self(history)
    }
}

/// One strategy invocation.
#[derive(Debug, Clone, Copy)]
pub struct AllocationRequest<'a> {
    /// Window index.
    pub window: usize,
    /// History visible to the strategy.
    pub history: PriceSlice<'a>,
    /// Table row at which the weights take effect.
    pub decision_row: usize,
    /// Assets the weights must be drawn from.
    pub universe: &'a [String],
}

/// Validated strategy output.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Target weights.
    pub weights: WeightVector,
    /// Universe assets the strategy left out, filled with zero exposure.
    pub filled: Vec<String>,
}

/// Calls strategies and validates what they return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyAdapter {
    allow_short: bool,
    require_full_coverage: bool,
    weight_tolerance: f64,
}

impl Default for StrategyAdapter {
    fn default() -> Self {
        Self::from_config(&WalkForwardConfig::default())
    }
}

impl StrategyAdapter {
    /// Create an adapter.
    #[must_use]
    pub const fn new(allow_short: bool, require_full_coverage: bool, weight_tolerance: f64) -> Self {
        Self {
            allow_short,
            require_full_coverage,
            weight_tolerance,
        }
    }

    /// Create an adapter from run configuration.
    #[must_use]
    pub const fn from_config(config: &WalkForwardConfig) -> Self {
        Self::new(
            config.allow_short,
            config.require_full_coverage,
            config.weight_tolerance,
        )
    }

    /// Invoke `strategy` on the request's history and validate the result.
    ///
    /// # Errors
    ///
    /// - `LookAhead` if the history extends past the decision row
    /// - `StrategyExecution` if the strategy errors or panics
    /// - `InvalidWeights` if the weights fail validation
    /// - `IncompleteAllocation` if full coverage is required and assets are missing
    pub fn compute_weights(
        &self,
        strategy: &dyn AllocationStrategy,
        request: &AllocationRequest<'_>,
    ) -> Result<Allocation, EngineError> {
        let window = request.window;

        if request.history.end() > request.decision_row {
            return Err(EngineError::LookAhead {
                window,
                history_end: request.history.end(),
                decision_row: request.decision_row,
            });
        }

        let history = request.history;
        let outcome = catch_unwind(AssertUnwindSafe(|| strategy.allocate(&history)));

        let mut weights = match outcome {
            Ok(Ok(weights)) => weights,
            Ok(Err(e)) => {
                return Err(EngineError::StrategyExecution {
                    window,
                    strategy: strategy.name().to_string(),
                    message: e.to_string(),
                });
            }
            Err(payload) => {
                return Err(EngineError::StrategyExecution {
                    window,
                    strategy: strategy.name().to_string(),
                    message: format!("panicked: {}", panic_message(payload.as_ref())),
                });
            }
        };

        weights
            .validate(request.universe, self.allow_short, self.weight_tolerance)
            .map_err(|cause| EngineError::InvalidWeights { window, cause })?;

        let missing = weights.missing_from(request.universe);
        if !missing.is_empty() {
            if self.require_full_coverage {
                return Err(EngineError::IncompleteAllocation { window, missing });
            }
            warn!(
                window = window,
                missing = ?missing,
                "Strategy left assets unallocated, assigning zero weight"
            );
            weights.fill_missing(request.universe);
        }

        debug!(
            window = window,
            strategy = strategy.name(),
            history_rows = history.len(),
            decision_row = request.decision_row,
            "Strategy weights validated"
        );

        Ok(Allocation {
            weights,
            filled: missing,
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::backtest::strategy::WeightError;
    use crate::data::{PriceRow, PriceTable};
    use crate::error::ErrorCode;

    fn table() -> PriceTable {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = (0..10)
            .map(|i| PriceRow::new(start + Duration::days(i), vec![100.0 + i as f64, 50.0]))
            .collect();
        PriceTable::new(vec!["A".to_string(), "B".to_string()], rows).unwrap()
    }

    fn universe() -> Vec<String> {
        vec!["A".to_string(), "B".to_string()]
    }

    fn request<'a>(table: &'a PriceTable, universe: &'a [String]) -> AllocationRequest<'a> {
        AllocationRequest {
            window: 0,
            history: table.slice(0..5),
            decision_row: 5,
            universe,
        }
    }

    #[test]
    fn test_closure_strategy() {
        let table = table();
        let universe = universe();
        let strategy = |_: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            Ok([("A", 0.25), ("B", 0.75)].into_iter().collect())
        };
        let allocation = StrategyAdapter::default()
            .compute_weights(&strategy, &request(&table, &universe))
            .unwrap();
        assert!((allocation.weights.weight("B") - 0.75).abs() < f64::EPSILON);
        assert!(allocation.filled.is_empty());
    }

    #[test]
    fn test_strategy_sees_only_history() {
        let table = table();
        let universe = universe();
        let strategy = |history: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            assert_eq!(history.len(), 5);
            assert_eq!(history.end(), 5);
            Ok(WeightVector::equal(history.assets()))
        };
        assert!(
            StrategyAdapter::default()
                .compute_weights(&strategy, &request(&table, &universe))
                .is_ok()
        );
    }

    #[test]
    fn test_look_ahead_rejected() {
        let table = table();
        let universe = universe();
        let strategy = |h: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            Ok(WeightVector::equal(h.assets()))
        };
        let req = AllocationRequest {
            history: table.slice(0..6),
            ..request(&table, &universe)
        };
        let err = StrategyAdapter::default()
            .compute_weights(&strategy, &req)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::LookAhead);
    }

    #[test]
    fn test_strategy_error_wrapped() {
        let table = table();
        let universe = universe();
        let strategy = |_: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            Err("optimizer did not converge".into())
        };
        let Err(EngineError::StrategyExecution { message, .. }) =
            StrategyAdapter::default().compute_weights(&strategy, &request(&table, &universe))
        else {
            panic!("strategy error should be wrapped");
        };
        assert!(message.contains("did not converge"));
    }

    #[test]
    fn test_strategy_panic_wrapped() {
        let table = table();
        let universe = universe();
        let strategy = |_: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            panic!("boom");
        };
        let Err(EngineError::StrategyExecution { message, .. }) =
            StrategyAdapter::default().compute_weights(&strategy, &request(&table, &universe))
        else {
            panic!("strategy panic should be wrapped");
        };
        assert!(message.contains("boom"));
    }

    #[test]
    fn test_invalid_weights() {
        let table = table();
        let universe = universe();
        let strategy = |_: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            Ok([("A", 0.45), ("B", 0.45)].into_iter().collect())
        };
        let err = StrategyAdapter::default()
            .compute_weights(&strategy, &request(&table, &universe))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidWeights);
        assert_eq!(err.window(), Some(0));

        let EngineError::InvalidWeights { cause, .. } = &err else {
            panic!("expected invalid weights, got {err:?}");
        };
        assert!(matches!(cause, WeightError::SumMismatch { sum, .. } if (sum - 0.9).abs() < 1e-12));
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), cause.to_string());
    }

    #[test]
    fn test_incomplete_allocation() {
        let table = table();
        let universe = universe();
        let strategy = |_: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            Ok([("A", 1.0)].into_iter().collect())
        };

        let Err(EngineError::IncompleteAllocation { missing, .. }) =
            StrategyAdapter::default().compute_weights(&strategy, &request(&table, &universe))
        else {
            panic!("missing asset should fail under full coverage");
        };
        assert_eq!(missing, vec!["B".to_string()]);

        let lenient = StrategyAdapter::new(false, false, 1e-6);
        let allocation = lenient
            .compute_weights(&strategy, &request(&table, &universe))
            .unwrap();
        assert_eq!(allocation.weights.get("B"), Some(0.0));
        assert_eq!(allocation.filled, vec!["B".to_string()]);
    }
}
