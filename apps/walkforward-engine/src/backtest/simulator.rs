//! Portfolio simulator for a single test window.
//!
//! Capital is allocated at the anchor row (the row before the test window)
//! and then evolves period by period:
//!
//! ```text
//! value[t] = value[t-1] * (1 + Σ weight[a] * return[a][t])
//! return[a][t] = price[a][t] / last_price[a] - 1
//! ```
//!
//! `last_price` is the most recent observed price, so a missing price
//! freezes the holding for that period and the next observed price
//! measures the return across the gap. Rebalance events charge
//! `value * transaction_cost * turnover` before the period's return.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::data_gaps::{DataGapError, GapStatistics, check_row_coverage};
use super::equity::{EquityPoint, EquitySegment};
use super::strategy::WeightVector;
use crate::config::WalkForwardConfig;
use crate::data::PriceSlice;

/// Weights that take effect at a view-relative row of the test window.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledWeights {
    /// Row offset within the test view.
    pub offset: usize,
    /// Target weights from that row on.
    pub weights: WeightVector,
}

/// One rebalance applied by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceEvent {
    /// Timestamp of the row whose close the trade happens at.
    pub timestamp: DateTime<Utc>,
    /// Weights held after the rebalance.
    pub weights: WeightVector,
    /// `Σ|w_new - w_old|`; the first allocation of a window trades out of cash.
    pub turnover: f64,
    /// Transaction cost charged.
    pub cost: f64,
}

/// Result of simulating one test window.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    /// Equity path, anchor first.
    pub segment: EquitySegment,
    /// Rebalances in order.
    pub rebalances: Vec<RebalanceEvent>,
    /// Missing-price statistics.
    pub gaps: GapStatistics,
}

impl SimulationOutcome {
    /// Terminal portfolio value.
    #[must_use]
    pub fn end_value(&self) -> Option<f64> {
        self.segment.end_value()
    }

    /// Total transaction cost charged.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.rebalances.iter().map(|r| r.cost).sum()
    }
}

/// Advances portfolio value through a test window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioSimulator {
    transaction_cost: f64,
    missing_data_tolerance: f64,
}

impl Default for PortfolioSimulator {
    fn default() -> Self {
        Self::from_config(&WalkForwardConfig::default())
    }
}

impl PortfolioSimulator {
    /// Create a simulator.
    #[must_use]
    pub const fn new(transaction_cost: f64, missing_data_tolerance: f64) -> Self {
        Self {
            transaction_cost,
            missing_data_tolerance,
        }
    }

    /// Create a simulator from run configuration.
    #[must_use]
    pub const fn from_config(config: &WalkForwardConfig) -> Self {
        Self::new(config.transaction_cost, config.missing_data_tolerance)
    }

    /// Simulate a buy-at-anchor allocation held at constant weights.
    ///
    /// # Errors
    ///
    /// Returns `DataGapError` when a row misses more of the universe than
    /// the tolerance allows.
    pub fn simulate(
        &self,
        test: &PriceSlice<'_>,
        weights: &WeightVector,
        starting_value: f64,
    ) -> Result<SimulationOutcome, DataGapError> {
        let schedule = [ScheduledWeights {
            offset: 0,
            weights: weights.clone(),
        }];
        self.simulate_with_schedule(test, &schedule, starting_value)
    }

    /// Simulate with weights replaced at each scheduled offset.
    ///
    /// Offsets must be increasing. Before the first entry the portfolio
    /// holds cash.
    ///
    /// # Errors
    ///
    /// Returns `DataGapError` when a row misses more of the universe than
    /// the tolerance allows.
    pub fn simulate_with_schedule(
        &self,
        test: &PriceSlice<'_>,
        schedule: &[ScheduledWeights],
        starting_value: f64,
    ) -> Result<SimulationOutcome, DataGapError> {
        let assets = test.assets();
        let universe: Vec<usize> = test
            .universe()
            .iter()
            .filter_map(|asset| test.asset_index(asset))
            .collect();

        let mut last_price: Vec<Option<f64>> =
            (0..assets.len()).map(|col| test.observed_before(col)).collect();
        let mut held = vec![0.0; assets.len()];
        let mut held_weights = WeightVector::new();
        let mut value = starting_value;

        let mut points = Vec::with_capacity(test.len() + 1);
        if let Some(anchor) = test.anchor_timestamp() {
            points.push(EquityPoint::new(anchor, value));
        }

        let mut rebalances = Vec::with_capacity(schedule.len());
        let mut gaps = GapStatistics::default();
        let mut pending = schedule.iter().peekable();

        for (offset, row) in test.rows().iter().enumerate() {
            while let Some(entry) = pending.next_if(|entry| entry.offset <= offset) {
                let turnover = entry.weights.turnover_from(&held_weights);
                let cost = value * self.transaction_cost * turnover;
                value -= cost;

                let timestamp = offset
                    .checked_sub(1)
                    .and_then(|prev| test.row(prev))
                    .map(|r| r.timestamp)
                    .or_else(|| test.anchor_timestamp())
                    .unwrap_or(row.timestamp);

                for (col, asset) in assets.iter().enumerate() {
                    held[col] = entry.weights.weight(asset);
                }
                held_weights = entry.weights.clone();

                debug!(
                    timestamp = %timestamp,
                    turnover = turnover,
                    cost = cost,
                    value = value,
                    "Rebalanced portfolio"
                );

                rebalances.push(RebalanceEvent {
                    timestamp,
                    weights: entry.weights.clone(),
                    turnover,
                    cost,
                });
            }

            let coverage =
                check_row_coverage(row, assets, &universe, self.missing_data_tolerance)?;
            gaps.record(&coverage);

            let mut portfolio_return = 0.0;
            for (col, price) in row.prices.iter().enumerate() {
                let Some(price) = *price else {
                    continue;
                };
                if let Some(previous) = last_price[col] {
                    portfolio_return += held[col] * (price / previous - 1.0);
                }
                last_price[col] = Some(price);
            }

            value *= 1.0 + portfolio_return;
            points.push(EquityPoint::new(row.timestamp, value));
        }

        if gaps.frozen_holdings > 0 {
            warn!(
                rows_with_gaps = gaps.rows_with_gaps,
                frozen_holdings = gaps.frozen_holdings,
                "Held positions frozen over missing prices"
            );
        }

        Ok(SimulationOutcome {
            segment: EquitySegment::new(points),
            rebalances,
            gaps,
        })
    }
}
