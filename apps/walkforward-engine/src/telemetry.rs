//! Tracing subscriber setup.
//!
//! # Configuration
//!
//! - `RUST_LOG`: filter directives; overrides `observability.logging.level`
//! - `observability.logging.format`: `json` (default) or `pretty`
//! - `observability.logging.include_spans`: attach span context to JSON lines
//!
//! Logs go to stderr so stdout stays free for run output.
//!
//! # Usage
//!
//! ```rust,ignore
//! use walkforward_engine::config::LoggingConfig;
//! use walkforward_engine::telemetry::init_tracing;
//!
//! init_tracing(&LoggingConfig::default())?;
//! ```

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Error returned when a global subscriber is already installed.
pub type TelemetryError = Box<dyn std::error::Error + Send + Sync>;

/// Install the global `tracing` subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.is_json() {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(config.include_spans)
            .with_span_list(config.include_spans)
            .try_init()?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .pretty()
            .try_init()?;
    }

    tracing::debug!(
        level = %config.level,
        format = %config.format,
        "Tracing initialized"
    );
    Ok(())
}
