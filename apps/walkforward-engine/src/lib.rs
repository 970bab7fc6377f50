// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::cast_possible_wrap,
        clippy::suboptimal_flops
    )
)]

//! Walk-Forward Engine - Rust Core Library
//!
//! Deterministic walk-forward evaluation of portfolio allocation strategies.
//!
//! # Pipeline
//!
//! ```text
//! PriceTable -> WindowGenerator -> (train, test) windows
//!            -> StrategyAdapter(train history) -> validated weights
//!            -> PortfolioSimulator(test rows, weights, capital) -> equity segment
//!            -> stitched EquityCurve -> MetricsCalculator -> MetricsReport
//! ```
//!
//! ## Modules
//!
//! - `data`: validated price table and bounded history views
//! - `backtest::window`: rolling and expanding partitions
//! - `backtest::strategy`: strategy contract, weight validation, built-in strategies
//! - `backtest::walkforward`: the engine, its builder and cancellation
//! - `backtest::metrics`: performance statistics
//! - `backtest::sweep`: parallel parameter sweeps
//! - `config`: YAML configuration with environment interpolation
//! - `telemetry`: tracing subscriber setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Walk-forward windows, strategies, simulation, metrics and sweeps.
pub mod backtest;

/// Configuration loading and validation.
pub mod config;

/// Price table and history views.
pub mod data;

/// Error taxonomy.
pub mod error;

/// Tracing subscriber setup.
pub mod telemetry;

pub use backtest::metrics::{MetricsCalculator, MetricsReport};
pub use backtest::strategy::{AllocationStrategy, EqualWeight, InverseVolatility, WeightVector};
pub use backtest::walkforward::{
    CancellationToken, EngineState, WalkForwardBuilder, WalkForwardEngine, WalkForwardResult,
};
pub use backtest::{EquityCurve, EquitySegment};
pub use config::{Config, ConfigError, OnWindowError, WalkForwardConfig};
pub use data::{PriceRow, PriceSlice, PriceTable};
pub use error::{EngineError, ErrorCode};
