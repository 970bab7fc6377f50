//! Parallel parameter sweeps using Rayon.
//!
//! A single walk-forward run is inherently sequential: each window starts
//! from the previous window's capital. Independent configurations are not,
//! so a sweep runs them across rayon's work-stealing pool.
//!
//! # Example
//!
//! ```no_run
//! use walkforward_engine::backtest::strategy::EqualWeight;
//! use walkforward_engine::backtest::sweep::{ParameterSweep, SweepConfig, SweepGrid};
//! use walkforward_engine::config::WalkForwardConfig;
//! # fn demo(table: &walkforward_engine::data::PriceTable) -> Result<(), Box<dyn std::error::Error>> {
//! let grid = SweepGrid::new(WalkForwardConfig::default())
//!     .train_sizes(vec![60, 120, 252])
//!     .test_sizes(vec![20, 60]);
//!
//! let sweep = ParameterSweep::new(SweepConfig::default());
//! let result = sweep.run_grid(table, &EqualWeight, &grid)?;
//! if let Some(best) = result.best() {
//!     println!("best: {} sharpe {:?}", best.job_id, best.sharpe_ratio());
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod executor;
mod grid;
mod progress;
mod types;

pub use config::SweepConfig;
pub use error::SweepError;
pub use executor::ParameterSweep;
pub use grid::SweepGrid;
pub use progress::{Progress, ProgressTracker};
pub use types::{SweepJob, SweepJobResult, SweepResult};
