//! Formatting utilities for performance metrics display.

use super::constants::HUNDRED;

/// Format a fraction as a percentage string. NaN renders as `"NaN"`.
#[must_use]
pub fn format_pct(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    format!("{:.2}%", value * HUNDRED)
}

/// Format a value with 2 decimal places.
#[must_use]
pub fn format_decimal(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    format!("{value:.2}")
}

/// Format a ratio. NaN renders as `"NaN"`, infinities as `"inf"`/`"-inf"`.
#[must_use]
pub fn format_ratio(value: f64) -> String {
    format_decimal(value)
}
