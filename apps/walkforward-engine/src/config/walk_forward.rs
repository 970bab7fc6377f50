//! Walk-forward run configuration.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ConfigError;
use crate::backtest::window::{WindowMode, WindowSpec};

/// What the engine does when a single window fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnWindowError {
    /// Stop the run and return the partial curve together with the error.
    Abort,
    /// Mark the window failed, hold its capital flat, and continue.
    #[default]
    Skip,
}

impl std::fmt::Display for OnWindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Options recognised by the walk-forward engine.
///
/// Sizes are measured in rows of the price table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    /// Rolling or expanding train window.
    #[serde(default)]
    pub mode: WindowMode,
    /// Train window length (minimum length for expanding mode).
    #[serde(default = "default_train_size")]
    pub train_size: usize,
    /// Test window length.
    #[serde(default = "default_test_size")]
    pub test_size: usize,
    /// Advance between windows. Defaults to `test_size`.
    #[serde(default)]
    pub step: Option<usize>,
    /// Re-invoke the strategy every this many test rows. `None` allocates once per window.
    #[serde(default)]
    pub rebalance_frequency: Option<usize>,
    /// Proportional cost charged on traded notional at each rebalance.
    #[serde(default)]
    pub transaction_cost: f64,
    /// Annualisation factor. Inferred from timestamp spacing when absent.
    #[serde(default)]
    pub periods_per_year: Option<u32>,
    /// Annual risk-free rate used by Sharpe and Sortino.
    #[serde(default)]
    pub risk_free_rate: f64,
    /// Largest fraction of the universe that may be missing a price in one period.
    #[serde(default = "default_missing_data_tolerance")]
    pub missing_data_tolerance: f64,
    /// Per-window error policy.
    #[serde(default)]
    pub on_window_error: OnWindowError,
    /// Capital at the start of the first test window.
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    /// Permit negative weights.
    #[serde(default)]
    pub allow_short: bool,
    /// Treat assets without a weight as a failure instead of zero exposure.
    #[serde(default = "default_true")]
    pub require_full_coverage: bool,
    /// Allowed deviation of the weight sum from 1.
    #[serde(default = "default_weight_tolerance")]
    pub weight_tolerance: f64,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            mode: WindowMode::Rolling,
            train_size: default_train_size(),
            test_size: default_test_size(),
            step: None,
            rebalance_frequency: None,
            transaction_cost: 0.0,
            periods_per_year: None,
            risk_free_rate: 0.0,
            missing_data_tolerance: default_missing_data_tolerance(),
            on_window_error: OnWindowError::Skip,
            initial_capital: default_initial_capital(),
            allow_short: false,
            require_full_coverage: true,
            weight_tolerance: default_weight_tolerance(),
        }
    }
}

impl WalkForwardConfig {
    /// Step between windows after applying the default.
    #[must_use]
    pub fn effective_step(&self) -> usize {
        self.step.unwrap_or(self.test_size)
    }

    /// Window partitioning parameters.
    #[must_use]
    pub fn window_spec(&self) -> WindowSpec {
        WindowSpec::new(self.mode, self.train_size, self.test_size).with_step(self.effective_step())
    }

    /// Reject invalid values and option combinations.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.train_size == 0 {
            return Err(invalid("train_size must be positive"));
        }

        if self.test_size == 0 {
            return Err(invalid("test_size must be positive"));
        }

        let step = self.effective_step();
        if step == 0 {
            return Err(invalid("step must be positive"));
        }

        // Test windows must tile the evaluation rows exactly once.
        if step != self.test_size {
            return Err(ConfigError::ValidationError(format!(
                "step ({step}) must equal test_size ({})",
                self.test_size
            )));
        }

        if self.train_size.checked_add(self.test_size).is_none() {
            return Err(invalid("train_size + test_size overflows the row index"));
        }

        match self.rebalance_frequency {
            Some(0) => return Err(invalid("rebalance_frequency must be positive")),
            Some(freq) if freq >= self.test_size => {
                warn!(
                    rebalance_frequency = freq,
                    test_size = self.test_size,
                    "rebalance_frequency is not smaller than test_size; windows will rebalance once"
                );
            }
            _ => {}
        }

        if !self.transaction_cost.is_finite()
            || self.transaction_cost < 0.0
            || self.transaction_cost >= 1.0
        {
            return Err(invalid("transaction_cost must be in [0.0, 1.0)"));
        }

        if !(0.0..=1.0).contains(&self.missing_data_tolerance) {
            return Err(invalid("missing_data_tolerance must be between 0.0 and 1.0"));
        }

        if !self.risk_free_rate.is_finite() {
            return Err(invalid("risk_free_rate must be finite"));
        }

        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(invalid("initial_capital must be positive"));
        }

        if self.periods_per_year == Some(0) {
            return Err(invalid("periods_per_year must be positive"));
        }

        if !self.weight_tolerance.is_finite() || self.weight_tolerance <= 0.0 {
            return Err(invalid("weight_tolerance must be positive"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

const fn default_train_size() -> usize {
    252
}

const fn default_test_size() -> usize {
    21
}

const fn default_missing_data_tolerance() -> f64 {
    0.05
}

const fn default_initial_capital() -> f64 {
    10_000.0
}

const fn default_weight_tolerance() -> f64 {
    1e-6
}

const fn default_true() -> bool {
    true
}
