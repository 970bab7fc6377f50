//! Walk-forward backtesting of portfolio allocation strategies.
//!
//! - **Windows**: rolling or expanding train/test partitions of a price table
//! - **Strategies**: any allocation function, called through a validating adapter
//! - **Simulation**: constant-mix portfolio evolution with optional rebalancing and costs
//! - **Stitching**: per-window segments chained into one out-of-sample curve
//! - **Metrics**: return, risk and ratio statistics with explicit `NaN` markers
//! - **Sweeps**: independent configurations run in parallel
//!
//! # Example
//!
//! ```no_run
//! use walkforward_engine::backtest::strategy::EqualWeight;
//! use walkforward_engine::backtest::walkforward::WalkForwardBuilder;
//! # fn demo(table: &walkforward_engine::data::PriceTable) -> Result<(), walkforward_engine::EngineError> {
//! let engine = WalkForwardBuilder::new()
//!     .train_size(60)
//!     .test_size(20)
//!     .build()?;
//!
//! let result = engine.run(table, &EqualWeight)?;
//! println!("{}", result.metrics);
//! # Ok(())
//! # }
//! ```

mod data_gaps;
mod equity;
pub mod logging;
pub mod metrics;
mod simulator;
pub mod strategy;
pub mod sweep;
pub mod walkforward;
pub mod window;

pub use data_gaps::{DataGapError, GapStatistics, RowCoverage, check_row_coverage};
pub use equity::{DrawdownPoint, EquityCurve, EquityPoint, EquitySegment};
pub use simulator::{PortfolioSimulator, RebalanceEvent, ScheduledWeights, SimulationOutcome};
