//! Configuration loading for the walk-forward engine.
//!
//! Configuration is read from YAML with environment variable interpolation
//! and validated before any engine is built.
//!
//! # Usage
//!
//! ```rust,ignore
//! use walkforward_engine::config::load_config;
//!
//! let config = load_config(Some("walkforward.yaml"))?;
//! println!("train size: {}", config.walk_forward.train_size);
//! ```
//!
//! ```yaml
//! walk_forward:
//!   mode: rolling
//!   train_size: ${WF_TRAIN_SIZE:-60}
//!   test_size: 20
//!   on_window_error: skip
//! observability:
//!   logging:
//!     level: debug
//!     format: pretty
//! ```

mod observability;
mod walk_forward;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub use observability::{LogFormat, LoggingConfig, ObservabilityConfig};
pub use walk_forward::{OnWindowError, WalkForwardConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Walk-forward run options.
    #[serde(default)]
    pub walk_forward: WalkForwardConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "walkforward.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("walkforward.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string.
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax. Unset variables
/// without a default become empty.
#[allow(clippy::expect_used)] // Regex is a compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config.walk_forward.validate()?;

    let level = &config.observability.logging.level;
    if let Err(e) = EnvFilter::try_new(level) {
        return Err(ConfigError::ValidationError(format!(
            "observability.logging.level '{level}' is not a valid filter: {e}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::window::WindowMode;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.walk_forward.mode, WindowMode::Rolling);
        assert_eq!(config.observability.logging.level, "info");
        assert!(config.observability.logging.is_json());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_minimal_config() {
        let yaml = r"
walk_forward:
  train_size: 60
  test_size: 20
";

        let config = match load_config_from_string(yaml) {
            Ok(c) => c,
            Err(e) => panic!("should load minimal config: {e}"),
        };
        assert_eq!(config.walk_forward.train_size, 60);
        assert_eq!(config.walk_forward.effective_step(), 20);
        assert!((config.walk_forward.initial_capital - 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = match load_config_from_string("{}") {
            Ok(c) => c,
            Err(e) => panic!("should load empty config: {e}"),
        };
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "train_size: ${WALKFORWARD_CONFIG_TEST_NONEXISTENT_VAR:-60}";
        assert_eq!(interpolate_env_vars(input), "train_size: 60");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "level: ${WALKFORWARD_CONFIG_TEST_UNLIKELY_TO_EXIST}";
        assert_eq!(interpolate_env_vars(input), "level: ");
    }

    #[test]
    fn test_interpolation_feeds_parser() {
        let yaml = "walk_forward:\n  test_size: ${WALKFORWARD_CONFIG_TEST_MISSING_SIZE:-15}\n";
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(config.walk_forward.test_size, 15);
    }

    #[test]
    fn test_validation_rejects_bad_walk_forward() {
        let yaml = "walk_forward:\n  transaction_cost: 2.0\n";
        assert!(matches!(
            load_config_from_string(yaml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_log_format_is_parse_error() {
        let yaml = "observability:\n  logging:\n    format: xml\n";
        assert!(matches!(
            load_config_from_string(yaml),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validation_rejects_log_level() {
        let yaml = "observability:\n  logging:\n    level: walkforward_engine=loud\n";
        let Err(ConfigError::ValidationError(message)) = load_config_from_string(yaml) else {
            panic!("malformed filter should be rejected");
        };
        assert!(message.contains("level"));
    }

    #[test]
    fn test_pretty_format_and_directive() {
        let yaml = "observability:\n  logging:\n    level: walkforward_engine=debug,warn\n    format: pretty\n";
        let config = load_config_from_string(yaml).unwrap();
        assert_eq!(config.observability.logging.format, LogFormat::Pretty);
        assert!(!config.observability.logging.is_json());
    }

    #[test]
    fn test_parse_error() {
        let yaml = "walk_forward:\n  train_size: lots\n";
        assert!(matches!(
            load_config_from_string(yaml),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Some("/nonexistent/walkforward.yaml"));
        let Err(ConfigError::ReadError { path, .. }) = result else {
            panic!("missing file should fail to read");
        };
        assert_eq!(path, "/nonexistent/walkforward.yaml");
    }
}
