//! Walk-Forward Engine Binary
//!
//! Runs one walk-forward evaluation over a JSON price table and prints the
//! equity curve, per-window diagnostics and metrics as JSON on stdout.
//!
//! # Usage
//!
//! ```bash
//! walkforward-engine prices.json [walkforward.yaml]
//! ```
//!
//! The price table has the shape
//! `{"assets": ["A", "B"], "rows": [{"timestamp": "...", "prices": [100.0, null]}]}`.
//!
//! # Environment Variables
//!
//! - `WALKFORWARD_STRATEGY`: `equal_weight` (default) or `inverse_volatility`
//! - `RUST_LOG`: log filter (overrides the configured level)

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use walkforward_engine::backtest::walkforward::WindowDiagnostics;
use walkforward_engine::config::{Config, load_config};
use walkforward_engine::telemetry::init_tracing;
use walkforward_engine::{
    AllocationStrategy, EngineState, EquityCurve, EqualWeight, InverseVolatility, MetricsReport,
    PriceTable, WalkForwardEngine,
};

/// JSON document written to stdout.
#[derive(Serialize)]
struct RunReport<'a> {
    strategy: &'a str,
    state: EngineState,
    periods_per_year: u32,
    error: Option<String>,
    metrics: &'a MetricsReport,
    equity_curve: &'a EquityCurve,
    diagnostics: &'a [WindowDiagnostics],
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(prices_path) = args.next() else {
        bail!("usage: walkforward-engine <prices.json> [config.yaml]");
    };
    let config_path = args.next();

    let config = match config_path.as_deref() {
        Some(path) => load_config(Some(path))
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => Config::default(),
    };

    if let Err(e) = init_tracing(&config.observability.logging) {
        eprintln!("tracing already initialized: {e}");
    }

    tracing::info!(prices = %prices_path, "Starting walk-forward run");

    let table = load_prices(Path::new(&prices_path))?;
    let strategy = select_strategy()?;

    let engine = WalkForwardEngine::new(config.walk_forward)
        .context("invalid walk-forward configuration")?;
    let result = engine
        .run(&table, strategy.as_ref())
        .context("walk-forward run failed")?;

    let report = RunReport {
        strategy: strategy.name(),
        state: result.state,
        periods_per_year: result.periods_per_year,
        error: result.failure.as_ref().map(|f| f.message.clone()),
        metrics: &result.metrics,
        equity_curve: &result.equity_curve,
        diagnostics: &result.diagnostics,
    };

    let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
    println!("{json}");

    tracing::info!(state = %result.state, "Walk-forward run finished");
    Ok(())
}

fn load_prices(path: &Path) -> Result<PriceTable> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read price table {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse price table {}", path.display()))
}

fn select_strategy() -> Result<Box<dyn AllocationStrategy>> {
    let name = std::env::var("WALKFORWARD_STRATEGY").unwrap_or_else(|_| "equal_weight".to_string());
    match name.as_str() {
        "equal_weight" => Ok(Box::new(EqualWeight)),
        "inverse_volatility" => Ok(Box::new(InverseVolatility::new())),
        other => bail!("unknown strategy '{other}' (expected equal_weight or inverse_volatility)"),
    }
}
