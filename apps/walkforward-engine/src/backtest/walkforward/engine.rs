//! Walk-forward run orchestration.
//!
//! Windows are processed strictly in order. Each window's starting capital
//! is the previous window's terminal value, threaded through the loop as a
//! plain `f64`; nothing else carries over between windows.

use tracing::{info, warn};

use super::cancel::CancellationToken;
use super::types::{EngineState, WalkForwardResult, WindowDiagnostics, WindowFailure, WindowStatus};
use crate::backtest::data_gaps::GapStatistics;
use crate::backtest::equity::{EquityCurve, EquitySegment};
use crate::backtest::logging::{
    RunEndEvent, RunEvent, RunLogger, RunStartEvent, WindowCompletedEvent, WindowFailedEvent,
};
use crate::backtest::metrics::MetricsCalculator;
use crate::backtest::simulator::{PortfolioSimulator, ScheduledWeights, SimulationOutcome};
use crate::backtest::strategy::{AllocationRequest, AllocationStrategy, StrategyAdapter};
use crate::backtest::window::{Window, WindowGenerator};
use crate::config::{OnWindowError, WalkForwardConfig};
use crate::data::{PriceSlice, PriceTable};
use crate::error::EngineError;

/// Annualization factor assumed when none is configured and the data
/// frequency cannot be inferred.
pub const FALLBACK_PERIODS_PER_YEAR: u32 = 12;

/// Walk-forward evaluation engine.
#[derive(Debug, Clone)]
pub struct WalkForwardEngine {
    config: WalkForwardConfig,
    adapter: StrategyAdapter,
    simulator: PortfolioSimulator,
    calculator: MetricsCalculator,
}

/// A successfully simulated window, before it is recorded.
struct WindowRun {
    outcome: SimulationOutcome,
    warnings: Vec<String>,
}

impl WalkForwardEngine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Configuration` if the configuration is invalid.
    pub fn new(config: WalkForwardConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            adapter: StrategyAdapter::from_config(&config),
            simulator: PortfolioSimulator::from_config(&config),
            calculator: MetricsCalculator::new(config.risk_free_rate),
            config,
        })
    }

    /// Access the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    /// Run the strategy over every window of `table`.
    ///
    /// # Errors
    ///
    /// Returns fatal errors (`InsufficientData`, `Configuration`). Window
    /// errors are governed by `on_window_error` and reported in the result.
    pub fn run(
        &self,
        table: &PriceTable,
        strategy: &dyn AllocationStrategy,
    ) -> Result<WalkForwardResult, EngineError> {
        self.run_with_cancel(table, strategy, &CancellationToken::new())
    }

    /// Run with a cancellation token checked before each window.
    ///
    /// A cancelled run returns the windows processed so far with state
    /// `Cancelled`.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_with_cancel(
        &self,
        table: &PriceTable,
        strategy: &dyn AllocationStrategy,
        cancel: &CancellationToken,
    ) -> Result<WalkForwardResult, EngineError> {
        let mut state = EngineState::Init;
        let mut logger = RunLogger::new(true);

        state.advance(EngineState::GenerateWindows, None);
        let spec = self.config.window_spec();
        let generator = WindowGenerator::for_table(table, spec)?;
        let periods_per_year = self.resolve_periods_per_year(table);

        logger.log(RunEvent::RunStart(RunStartEvent {
            strategy: strategy.name().to_string(),
            mode: spec.mode.to_string(),
            train_size: spec.train_size,
            test_size: spec.test_size,
            step: spec.step,
            windows: generator.len(),
            rows: table.len(),
            assets: table.assets().len(),
            initial_capital: self.config.initial_capital,
        }));

        let mut capital = self.config.initial_capital;
        let mut segments = Vec::with_capacity(generator.len());
        let mut diagnostics = Vec::with_capacity(generator.len());
        let mut abort_error = None;

        for window in &generator {
            if cancel.is_cancelled() {
                warn!(
                    window = window.index,
                    completed = diagnostics.len(),
                    "Cancellation requested, stopping before window"
                );
                state.advance(EngineState::Cancelled, Some(window.index));
                break;
            }

            let test = table.slice(window.test.clone());

            match self.run_window(table, &test, strategy, &window, capital, &mut state) {
                Ok(run) => {
                    let (segment, diag) = completed_diagnostics(table, &window, capital, run);
                    capital = diag.end_value;

                    logger.log(RunEvent::WindowCompleted(WindowCompletedEvent {
                        window: window.index,
                        test_start: diag.test_start,
                        test_end: diag.test_end,
                        start_value: diag.start_value,
                        end_value: diag.end_value,
                        realized_return: diag.realized_return,
                        rebalances: diag.rebalances.len(),
                        warnings: diag.warnings.len(),
                    }));

                    segments.push(segment);
                    diagnostics.push(diag);
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    let action = self.config.on_window_error;
                    logger.log(RunEvent::WindowFailed(WindowFailedEvent {
                        window: window.index,
                        code: err.code(),
                        message: err.to_string(),
                        action: action.to_string(),
                        capital,
                    }));

                    diagnostics.push(failed_diagnostics(table, &window, capital, &err));

                    match action {
                        OnWindowError::Skip => {
                            let timestamps =
                                test.anchor_timestamp().into_iter().chain(test.timestamps());
                            segments.push(EquitySegment::flat(timestamps, capital));
                        }
                        OnWindowError::Abort => {
                            state.advance(EngineState::Failed, Some(window.index));
                            abort_error = Some(err);
                            break;
                        }
                    }
                }
            }
        }

        let terminal = if state.is_terminal() { state } else { EngineState::Done };
        state.advance(EngineState::Stitch, None);

        let equity_curve = EquityCurve::stitch(&segments);
        let metrics = self.calculator.compute(&equity_curve, periods_per_year);
        state.advance(terminal, None);

        let windows_completed = diagnostics.iter().filter(|d| d.is_completed()).count();
        logger.log(RunEvent::RunEnd(RunEndEvent {
            state: state.to_string(),
            windows_completed,
            windows_failed: diagnostics.len() - windows_completed,
            final_value: equity_curve.last_value().unwrap_or(capital),
        }));

        info!(
            state = %state,
            windows = diagnostics.len(),
            total_return = metrics.total_return,
            sharpe = metrics.sharpe_ratio,
            max_drawdown = metrics.max_drawdown,
            "Walk-forward metrics computed"
        );

        Ok(WalkForwardResult {
            equity_curve,
            segments,
            diagnostics,
            metrics,
            state,
            failure: abort_error.as_ref().map(WindowFailure::from),
            error: abort_error,
            periods_per_year,
            events: logger.into_events(),
        })
    }

    /// Fit, allocate and simulate one window.
    fn run_window(
        &self,
        table: &PriceTable,
        test: &PriceSlice<'_>,
        strategy: &dyn AllocationStrategy,
        window: &Window,
        capital: f64,
        state: &mut EngineState,
    ) -> Result<WindowRun, EngineError> {
        let universe = test.universe();
        let mut warnings = Vec::new();

        state.advance(EngineState::Fit, Some(window.index));
        let initial = self.adapter.compute_weights(
            strategy,
            &AllocationRequest {
                window: window.index,
                history: table.slice(window.train.clone()),
                decision_row: window.test.start,
                universe: &universe,
            },
        )?;
        if !initial.filled.is_empty() {
            warnings.push(format!("zero weight assigned to {}", initial.filled.join(", ")));
        }

        state.advance(EngineState::Allocate, Some(window.index));
        let mut schedule = vec![ScheduledWeights {
            offset: 0,
            weights: initial.weights,
        }];

        if let Some(frequency) = self.config.rebalance_frequency {
            for offset in (frequency..window.test_len()).step_by(frequency) {
                let decision_row = window.test.start + offset;
                let allocation = self.adapter.compute_weights(
                    strategy,
                    &AllocationRequest {
                        window: window.index,
                        history: table.slice(window.train.start..decision_row),
                        decision_row,
                        universe: &universe,
                    },
                )?;
                if !allocation.filled.is_empty() {
                    warnings.push(format!(
                        "zero weight assigned to {} at row {decision_row}",
                        allocation.filled.join(", ")
                    ));
                }
                schedule.push(ScheduledWeights {
                    offset,
                    weights: allocation.weights,
                });
            }
        }

        state.advance(EngineState::Simulate, Some(window.index));
        let outcome = self
            .simulator
            .simulate_with_schedule(test, &schedule, capital)
            .map_err(|gap| EngineError::DataGap {
                window: window.index,
                gap,
            })?;

        if outcome.gaps.frozen_holdings > 0 {
            warnings.push(format!(
                "{} holdings frozen over missing prices in {} rows",
                outcome.gaps.frozen_holdings, outcome.gaps.rows_with_gaps
            ));
        }

        Ok(WindowRun { outcome, warnings })
    }

    fn resolve_periods_per_year(&self, table: &PriceTable) -> u32 {
        if let Some(periods) = self.config.periods_per_year {
            return periods;
        }
        table.infer_periods_per_year().unwrap_or_else(|| {
            warn!(
                fallback = FALLBACK_PERIODS_PER_YEAR,
                "Could not infer data frequency from timestamps, assuming monthly"
            );
            FALLBACK_PERIODS_PER_YEAR
        })
    }
}

fn completed_diagnostics(
    table: &PriceTable,
    window: &Window,
    capital: f64,
    run: WindowRun,
) -> (EquitySegment, WindowDiagnostics) {
    let WindowRun { outcome, warnings } = run;
    let mut diag = base_diagnostics(table, window, capital, WindowStatus::Completed);
    diag.end_value = outcome.end_value().unwrap_or(capital);
    diag.realized_return = outcome.segment.realized_return();
    diag.weights = outcome.rebalances.first().map(|r| r.weights.clone());
    diag.rebalances = outcome.rebalances;
    diag.gaps = outcome.gaps;
    diag.warnings = warnings;
    (outcome.segment, diag)
}

fn failed_diagnostics(
    table: &PriceTable,
    window: &Window,
    capital: f64,
    err: &EngineError,
) -> WindowDiagnostics {
    let mut diag = base_diagnostics(table, window, capital, WindowStatus::Failed);
    diag.error = Some(WindowFailure::from(err));
    diag
}

fn base_diagnostics(
    table: &PriceTable,
    window: &Window,
    capital: f64,
    status: WindowStatus,
) -> WindowDiagnostics {
    let timestamp = |row: usize| table.timestamp(row).unwrap_or_default();
    WindowDiagnostics {
        index: window.index,
        train: window.train.clone(),
        test: window.test.clone(),
        train_start: timestamp(window.train.start),
        train_end: timestamp(window.train.end.saturating_sub(1)),
        test_start: timestamp(window.test.start),
        test_end: timestamp(window.test.end.saturating_sub(1)),
        status,
        weights: None,
        rebalances: Vec::new(),
        start_value: capital,
        end_value: capital,
        realized_return: 0.0,
        warnings: Vec::new(),
        error: None,
        gaps: GapStatistics::default(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::backtest::strategy::{EqualWeight, StrategyError, WeightVector};
    use crate::backtest::walkforward::WalkForwardBuilder;
    use crate::backtest::window::WindowMode;
    use crate::data::PriceRow;
    use crate::error::ErrorCode;

    fn daily_table(rows: usize, price: impl Fn(usize, usize) -> f64) -> PriceTable {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        let rows = (0..rows)
            .map(|i| PriceRow::new(start + Duration::days(i as i64), vec![price(i, 0), price(i, 1)]))
            .collect();
        PriceTable::new(vec!["A".to_string(), "B".to_string()], rows).unwrap()
    }

    /// Rising two-asset table with `B` missing at `gap_row`.
    fn gapped_table(rows: usize, gap_row: usize) -> PriceTable {
        let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
        let rows = (0..rows)
            .map(|i| {
                let b = (i != gap_row).then(|| 50.0 + 0.5 * i as f64);
                PriceRow::with_gaps(start + Duration::days(i as i64), vec![Some(100.0 + i as f64), b])
            })
            .collect();
        PriceTable::new(vec!["A".to_string(), "B".to_string()], rows).unwrap()
    }

    fn engine(on_error: OnWindowError) -> WalkForwardEngine {
        WalkForwardBuilder::new()
            .train_size(60)
            .test_size(20)
            .on_window_error(on_error)
            .build()
            .unwrap()
    }

    #[test]
    fn test_flat_prices_constant_curve() {
        let table = daily_table(252, |_, _| 100.0);
        let result = engine(OnWindowError::Skip).run(&table, &EqualWeight).unwrap();

        assert_eq!(result.state, EngineState::Done);
        assert_eq!(result.diagnostics.len(), 9);
        assert!(result.equity_curve.values().iter().all(|v| *v == 10_000.0));
        for diag in &result.diagnostics {
            let Some(weights) = &diag.weights else {
                panic!("completed window should record weights");
            };
            assert!((weights.weight("A") - 0.5).abs() < f64::EPSILON);
            assert!((weights.weight("B") - 0.5).abs() < f64::EPSILON);
        }
        assert_eq!(result.metrics.total_return, 0.0);
        assert!(result.metrics.sharpe_ratio.is_nan());
        assert_eq!(result.periods_per_year, 252);
    }

    #[test]
    fn test_curve_covers_test_rows_once() {
        let table = daily_table(252, |i, asset| 100.0 + (i * (asset + 1)) as f64);
        let result = engine(OnWindowError::Skip).run(&table, &EqualWeight).unwrap();

        // Anchor at row 59, then rows 60..240.
        assert_eq!(result.equity_curve.len(), 1 + 9 * 20);
        assert_eq!(result.equity_curve.first_value(), Some(10_000.0));
        for pair in result.segments.windows(2) {
            assert_eq!(pair[0].end_value(), pair[1].start_value());
        }
    }

    #[test]
    fn test_skip_holds_capital_flat() {
        let table = daily_table(252, |i, _| 100.0 + i as f64);
        let strategy = |history: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            if history.end() == 80 {
                return Ok([("A", 0.45), ("B", 0.45)].into_iter().collect());
            }
            Ok(WeightVector::equal(history.assets()))
        };
        let result = engine(OnWindowError::Skip).run(&table, &strategy).unwrap();

        assert_eq!(result.state, EngineState::Done);
        assert_eq!(result.failed_windows(), 1);

        let failed = &result.diagnostics[1];
        assert_eq!(failed.status, WindowStatus::Failed);
        let Some(error) = &failed.error else {
            panic!("failed window should carry its error");
        };
        assert_eq!(error.code, ErrorCode::InvalidWeights);
        assert_eq!(failed.start_value, result.diagnostics[0].end_value);
        assert_eq!(result.diagnostics[2].start_value, failed.start_value);
        assert!(result.segments[1].points().iter().all(|p| p.value == failed.start_value));
    }

    #[test]
    fn test_abort_returns_partial_curve() {
        let table = daily_table(252, |i, _| 100.0 + i as f64);
        let strategy = |history: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            if history.end() >= 100 {
                return Err("model diverged".into());
            }
            Ok(WeightVector::equal(history.assets()))
        };
        let result = engine(OnWindowError::Abort).run(&table, &strategy).unwrap();

        assert_eq!(result.state, EngineState::Failed);
        assert_eq!(result.diagnostics.len(), 3);
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.equity_curve.len(), 41);
        let Some(EngineError::StrategyExecution { window, .. }) = &result.error else {
            panic!("abort should surface the window error");
        };
        assert_eq!(*window, 2);
        assert!(result.failure.is_some());
    }

    #[test]
    fn test_insufficient_data_is_fatal() {
        let table = daily_table(70, |_, _| 100.0);
        let err = engine(OnWindowError::Skip).run(&table, &EqualWeight).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientData);
    }

    #[test]
    fn test_cancel_stops_after_current_window() {
        let table = daily_table(252, |_, _| 100.0);
        let token = CancellationToken::new();
        let handle = token.clone();
        let strategy = move |history: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            handle.cancel();
            Ok(WeightVector::equal(history.assets()))
        };
        let result = engine(OnWindowError::Skip)
            .run_with_cancel(&table, &strategy, &token)
            .unwrap();

        assert_eq!(result.state, EngineState::Cancelled);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.equity_curve.len(), 21);
    }

    #[test]
    fn test_rebalance_frequency_reinvokes_strategy() {
        let table = daily_table(100, |i, asset| if asset == 0 { 100.0 + i as f64 } else { 100.0 });
        let engine = WalkForwardBuilder::new()
            .train_size(60)
            .test_size(20)
            .rebalance_frequency(5)
            .transaction_cost(0.001)
            .build()
            .unwrap();
        let result = engine.run(&table, &EqualWeight).unwrap();

        let diag = &result.diagnostics[0];
        assert_eq!(diag.rebalances.len(), 4);
        assert!(diag.total_cost() > 0.0);
        // Constant-mix holdings: only the opening allocation trades.
        assert!((diag.total_turnover() - 1.0).abs() < 1e-12);
        assert_eq!(result.weights_history().len(), 8);
    }

    #[test]
    fn test_expanding_mode_history_starts_at_zero() {
        let table = daily_table(140, |_, _| 100.0);
        let strategy = |history: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            if history.start() != 0 {
                return Err("expanding history must start at row 0".into());
            }
            Ok(WeightVector::equal(history.assets()))
        };
        let engine = WalkForwardBuilder::new()
            .mode(WindowMode::Expanding)
            .train_size(60)
            .test_size(20)
            .on_window_error(OnWindowError::Abort)
            .build()
            .unwrap();
        let result = engine.run(&table, &strategy).unwrap();
        assert_eq!(result.state, EngineState::Done);
        assert_eq!(result.diagnostics.len(), 4);
    }

    #[test]
    fn test_periods_per_year_fallback() {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let rows = (0..40)
            .map(|i| PriceRow::new(start + Duration::days(i * 17), vec![100.0, 100.0]))
            .collect();
        let table = PriceTable::new(vec!["A".to_string(), "B".to_string()], rows).unwrap();
        let engine = WalkForwardBuilder::new()
            .train_size(20)
            .test_size(10)
            .build()
            .unwrap();
        let result = engine.run(&table, &EqualWeight).unwrap();
        assert_eq!(result.periods_per_year, FALLBACK_PERIODS_PER_YEAR);
    }

    #[test]
    fn test_gap_within_tolerance_freezes_holding() {
        let table = gapped_table(140, 65);
        let engine = WalkForwardBuilder::new()
            .train_size(60)
            .test_size(20)
            .missing_data_tolerance(0.5)
            .build()
            .unwrap();
        let result = engine.run(&table, &EqualWeight).unwrap();

        assert_eq!(result.state, EngineState::Done);
        assert_eq!(result.failed_windows(), 0);

        let diag = &result.diagnostics[0];
        assert_eq!(diag.status, WindowStatus::Completed);
        assert_eq!(diag.gaps.rows_checked, 20);
        assert_eq!(diag.gaps.rows_with_gaps, 1);
        assert_eq!(diag.gaps.frozen_holdings, 1);
        assert!(diag.warnings.iter().any(|w| w.contains("frozen")));
        assert!(result.diagnostics[1].warnings.is_empty());
    }

    #[test]
    fn test_gap_above_tolerance_skips_window() {
        // Default tolerance is 5%; one of two assets missing is 50%.
        let table = gapped_table(140, 85);
        let result = engine(OnWindowError::Skip).run(&table, &EqualWeight).unwrap();

        assert_eq!(result.state, EngineState::Done);
        assert_eq!(result.failed_windows(), 1);

        let failed = &result.diagnostics[1];
        assert_eq!(failed.status, WindowStatus::Failed);
        let Some(error) = &failed.error else {
            panic!("gap window should carry its error");
        };
        assert_eq!(error.code, ErrorCode::DataGap);
        assert!(error.message.contains('B'));

        let carried = result.diagnostics[0].end_value;
        assert!(carried > 10_000.0);
        assert_eq!(failed.start_value, carried);
        assert_eq!(failed.end_value, carried);
        assert_eq!(result.diagnostics[2].start_value, carried);
    }

    #[test]
    fn test_gap_above_tolerance_aborts() {
        let table = gapped_table(140, 85);
        let result = engine(OnWindowError::Abort).run(&table, &EqualWeight).unwrap();

        assert_eq!(result.state, EngineState::Failed);
        assert_eq!(result.diagnostics.len(), 2);
        let Some(EngineError::DataGap { window, gap }) = &result.error else {
            panic!("abort should surface the data gap");
        };
        assert_eq!(*window, 1);
        assert_eq!(gap.missing_assets, vec!["B".to_string()]);
    }

    #[test]
    fn test_omitted_asset_fails_with_full_coverage() {
        let table = daily_table(140, |i, asset| 100.0 + (i * (asset + 1)) as f64);
        let strategy = |history: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            if history.end() == 80 {
                return Ok([("A", 1.0)].into_iter().collect());
            }
            Ok(WeightVector::equal(history.assets()))
        };
        let result = engine(OnWindowError::Skip).run(&table, &strategy).unwrap();

        assert_eq!(result.failed_windows(), 1);
        let failed = &result.diagnostics[1];
        let Some(error) = &failed.error else {
            panic!("omitted asset should fail the window");
        };
        assert_eq!(error.code, ErrorCode::IncompleteAllocation);
        assert_eq!(failed.end_value, failed.start_value);
    }

    #[test]
    fn test_omitted_asset_zero_filled_without_full_coverage() {
        let table = daily_table(140, |i, asset| 100.0 + (i * (asset + 1)) as f64);
        let strategy = |history: &PriceSlice<'_>| -> Result<WeightVector, StrategyError> {
            if history.end() == 80 {
                return Ok([("A", 1.0)].into_iter().collect());
            }
            Ok(WeightVector::equal(history.assets()))
        };
        let engine = WalkForwardBuilder::new()
            .train_size(60)
            .test_size(20)
            .require_full_coverage(false)
            .build()
            .unwrap();
        let result = engine.run(&table, &strategy).unwrap();

        assert_eq!(result.failed_windows(), 0);
        let diag = &result.diagnostics[1];
        let Some(weights) = &diag.weights else {
            panic!("completed window should record weights");
        };
        assert_eq!(weights.weight("B"), 0.0);
        assert!(diag.warnings.iter().any(|w| w.contains("zero weight assigned to B")));
    }

    #[test]
    fn test_event_trail() {
        let table = daily_table(100, |_, _| 100.0);
        let result = engine(OnWindowError::Skip).run(&table, &EqualWeight).unwrap();
        assert!(matches!(result.events.first(), Some(RunEvent::RunStart(_))));
        assert!(matches!(result.events.last(), Some(RunEvent::RunEnd(_))));
        assert_eq!(result.events.len(), 2 + result.diagnostics.len());
    }
}
