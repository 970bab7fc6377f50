//! Parameter grid over walk-forward configurations.

use serde::{Deserialize, Serialize};

use super::types::SweepJob;
use crate::backtest::window::WindowMode;
use crate::config::WalkForwardConfig;

/// Cartesian grid of walk-forward options around a base configuration.
///
/// An axis left empty keeps the base value. Expanding the test size also
/// resets the step so windows keep stepping by the test size.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid {
    base: WalkForwardConfig,
    modes: Vec<WindowMode>,
    train_sizes: Vec<usize>,
    test_sizes: Vec<usize>,
    rebalance_frequencies: Vec<Option<usize>>,
    transaction_costs: Vec<f64>,
}

impl SweepGrid {
    /// Create a grid around `base`.
    #[must_use]
    pub fn new(base: WalkForwardConfig) -> Self {
        Self {
            base,
            ..Self::default()
        }
    }

    /// Window modes to try.
    #[must_use]
    pub fn modes(mut self, values: Vec<WindowMode>) -> Self {
        self.modes = values;
        self
    }

    /// Train sizes to try.
    #[must_use]
    pub fn train_sizes(mut self, values: Vec<usize>) -> Self {
        self.train_sizes = values;
        self
    }

    /// Test sizes to try.
    #[must_use]
    pub fn test_sizes(mut self, values: Vec<usize>) -> Self {
        self.test_sizes = values;
        self
    }

    /// Rebalance frequencies to try (`None` allocates once per window).
    #[must_use]
    pub fn rebalance_frequencies(mut self, values: Vec<Option<usize>>) -> Self {
        self.rebalance_frequencies = values;
        self
    }

    /// Transaction costs to try.
    #[must_use]
    pub fn transaction_costs(mut self, values: Vec<f64>) -> Self {
        self.transaction_costs = values;
        self
    }

    /// Get the total number of combinations.
    #[must_use]
    pub fn total_combinations(&self) -> usize {
        axis_len(&self.modes)
            * axis_len(&self.train_sizes)
            * axis_len(&self.test_sizes)
            * axis_len(&self.rebalance_frequencies)
            * axis_len(&self.transaction_costs)
    }

    /// Generate one job per combination, ids `grid_0`, `grid_1`, ...
    #[must_use]
    pub fn jobs(&self) -> Vec<SweepJob> {
        let mut configs = vec![self.base.clone()];

        expand(&mut configs, &self.modes, |c, v| c.mode = *v);
        expand(&mut configs, &self.train_sizes, |c, v| c.train_size = *v);
        expand(&mut configs, &self.test_sizes, |c, v| {
            c.test_size = *v;
            c.step = None;
        });
        expand(&mut configs, &self.rebalance_frequencies, |c, v| {
            c.rebalance_frequency = *v;
        });
        expand(&mut configs, &self.transaction_costs, |c, v| {
            c.transaction_cost = *v;
        });

        configs
            .into_iter()
            .enumerate()
            .map(|(i, config)| SweepJob::new(format!("grid_{i}"), config))
            .collect()
    }
}

const fn axis_len<T>(values: &[T]) -> usize {
    if values.is_empty() { 1 } else { values.len() }
}

fn expand<T>(
    configs: &mut Vec<WalkForwardConfig>,
    values: &[T],
    apply: impl Fn(&mut WalkForwardConfig, &T),
) {
    if values.is_empty() {
        return;
    }
    let mut expanded = Vec::with_capacity(configs.len() * values.len());
    for config in configs.iter() {
        for value in values {
            let mut next = config.clone();
            apply(&mut next, value);
            expanded.push(next);
        }
    }
    *configs = expanded;
}
