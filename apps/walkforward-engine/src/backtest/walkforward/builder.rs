//! Builder pattern for walk-forward engine configuration.

use super::engine::WalkForwardEngine;
use crate::backtest::window::WindowMode;
use crate::config::{OnWindowError, WalkForwardConfig};
use crate::error::EngineError;

/// Builder for a [`WalkForwardEngine`].
#[derive(Debug, Clone, Default)]
pub struct WalkForwardBuilder {
    config: WalkForwardConfig,
}

impl WalkForwardBuilder {
    /// Create a builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    #[must_use]
    pub const fn from_config(config: WalkForwardConfig) -> Self {
        Self { config }
    }

    /// Set window mode.
    #[must_use]
    pub const fn mode(mut self, mode: WindowMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set train window length in rows.
    #[must_use]
    pub const fn train_size(mut self, rows: usize) -> Self {
        self.config.train_size = rows;
        self
    }

    /// Set test window length in rows.
    #[must_use]
    pub const fn test_size(mut self, rows: usize) -> Self {
        self.config.test_size = rows;
        self
    }

    /// Set the advance between windows; must equal the test size.
    #[must_use]
    pub const fn step(mut self, rows: usize) -> Self {
        self.config.step = Some(rows);
        self
    }

    /// Re-invoke the strategy every `rows` test rows.
    #[must_use]
    pub const fn rebalance_frequency(mut self, rows: usize) -> Self {
        self.config.rebalance_frequency = Some(rows);
        self
    }

    /// Set proportional transaction cost.
    #[must_use]
    pub const fn transaction_cost(mut self, cost: f64) -> Self {
        self.config.transaction_cost = cost;
        self
    }

    /// Fix the annualization factor instead of inferring it.
    #[must_use]
    pub const fn periods_per_year(mut self, periods: u32) -> Self {
        self.config.periods_per_year = Some(periods);
        self
    }

    /// Set annual risk-free rate.
    #[must_use]
    pub const fn risk_free_rate(mut self, rate: f64) -> Self {
        self.config.risk_free_rate = rate;
        self
    }

    /// Set the largest tolerated missing fraction of the universe.
    #[must_use]
    pub const fn missing_data_tolerance(mut self, tolerance: f64) -> Self {
        self.config.missing_data_tolerance = tolerance;
        self
    }

    /// Set per-window error policy.
    #[must_use]
    pub const fn on_window_error(mut self, policy: OnWindowError) -> Self {
        self.config.on_window_error = policy;
        self
    }

    /// Set starting capital.
    #[must_use]
    pub const fn initial_capital(mut self, capital: f64) -> Self {
        self.config.initial_capital = capital;
        self
    }

    /// Permit negative weights.
    #[must_use]
    pub const fn allow_short(mut self, allow: bool) -> Self {
        self.config.allow_short = allow;
        self
    }

    /// Require every universe asset to receive a weight.
    #[must_use]
    pub const fn require_full_coverage(mut self, require: bool) -> Self {
        self.config.require_full_coverage = require;
        self
    }

    /// Set allowed deviation of the weight sum from 1.
    #[must_use]
    pub const fn weight_tolerance(mut self, tolerance: f64) -> Self {
        self.config.weight_tolerance = tolerance;
        self
    }

    /// Build the walk-forward engine.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the assembled configuration
    /// is invalid.
    pub fn build(self) -> Result<WalkForwardEngine, EngineError> {
        WalkForwardEngine::new(self.config)
    }
}
