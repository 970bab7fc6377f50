//! Core types for performance metrics.

use serde::{Deserialize, Serialize};

use super::format::{format_decimal, format_pct, format_ratio};

/// Performance statistics derived from one equity curve.
///
/// Undefined statistics (zero variance, zero drawdown, too few samples) are
/// `NaN`, never errors. JSON renders `NaN` as `null` and signed infinity as
/// the strings `"inf"` and `"-inf"`, so every value reads back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// `equity[last] / equity[first] - 1`.
    #[serde(with = "marked_f64")]
    pub total_return: f64,
    /// `(1 + total_return)^(periods_per_year / n) - 1`.
    #[serde(with = "marked_f64")]
    pub annualized_return: f64,
    /// Sample standard deviation of period returns, annualized.
    #[serde(with = "marked_f64")]
    pub annualized_volatility: f64,
    /// Largest peak-to-trough decline, as a non-positive fraction.
    #[serde(with = "marked_f64")]
    pub max_drawdown: f64,
    /// Longest stretch of periods spent below a prior peak.
    pub max_drawdown_duration: usize,
    /// Annualized Sharpe ratio.
    #[serde(with = "marked_f64")]
    pub sharpe_ratio: f64,
    /// Annualized Sortino ratio.
    #[serde(with = "marked_f64")]
    pub sortino_ratio: f64,
    /// Annualized return over absolute max drawdown.
    #[serde(with = "marked_f64")]
    pub calmar_ratio: f64,
    /// Sample skewness of period returns.
    #[serde(with = "marked_f64")]
    pub skewness: f64,
    /// Sample excess kurtosis of period returns.
    #[serde(with = "marked_f64")]
    pub kurtosis: f64,
    /// Best single-period return.
    #[serde(with = "marked_f64")]
    pub best_period: f64,
    /// Worst single-period return.
    #[serde(with = "marked_f64")]
    pub worst_period: f64,
    /// Number of periodic returns.
    pub periods: usize,
    /// Annualization factor used.
    pub periods_per_year: u32,
    /// Annual risk-free rate used.
    pub risk_free_rate: f64,
    /// First curve value.
    #[serde(with = "marked_f64")]
    pub initial_equity: f64,
    /// Last curve value.
    #[serde(with = "marked_f64")]
    pub final_equity: f64,
}

impl MetricsReport {
    /// Report for a curve with no points.
    #[must_use]
    pub const fn undefined(periods_per_year: u32, risk_free_rate: f64) -> Self {
        Self {
            total_return: f64::NAN,
            annualized_return: f64::NAN,
            annualized_volatility: f64::NAN,
            max_drawdown: f64::NAN,
            max_drawdown_duration: 0,
            sharpe_ratio: f64::NAN,
            sortino_ratio: f64::NAN,
            calmar_ratio: f64::NAN,
            skewness: f64::NAN,
            kurtosis: f64::NAN,
            best_period: f64::NAN,
            worst_period: f64::NAN,
            periods: 0,
            periods_per_year,
            risk_free_rate,
            initial_equity: f64::NAN,
            final_equity: f64::NAN,
        }
    }

    /// Statistics as ordered `(name, value)` pairs, NaN markers included.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn named_values(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("total_return", self.total_return),
            ("annualized_return", self.annualized_return),
            ("annualized_volatility", self.annualized_volatility),
            ("max_drawdown", self.max_drawdown),
            ("max_drawdown_duration", self.max_drawdown_duration as f64),
            ("sharpe_ratio", self.sharpe_ratio),
            ("sortino_ratio", self.sortino_ratio),
            ("calmar_ratio", self.calmar_ratio),
            ("skewness", self.skewness),
            ("kurtosis", self.kurtosis),
            ("best_period", self.best_period),
            ("worst_period", self.worst_period),
            ("periods", self.periods as f64),
            ("initial_equity", self.initial_equity),
            ("final_equity", self.final_equity),
        ]
    }

    /// Look up a statistic by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.named_values()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// Bitwise equality, treating NaN markers in the same field as equal.
    #[must_use]
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.periods_per_year == other.periods_per_year
            && self.risk_free_rate.to_bits() == other.risk_free_rate.to_bits()
            && self
                .named_values()
                .iter()
                .zip(other.named_values().iter())
                .all(|((_, a), (_, b))| a.to_bits() == b.to_bits())
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Total return:          {}", format_pct(self.total_return))?;
        writeln!(f, "Annualized return:     {}", format_pct(self.annualized_return))?;
        writeln!(f, "Annualized volatility: {}", format_pct(self.annualized_volatility))?;
        writeln!(f, "Max drawdown:          {}", format_pct(self.max_drawdown))?;
        writeln!(f, "Max drawdown periods:  {}", self.max_drawdown_duration)?;
        writeln!(f, "Sharpe ratio:          {}", format_ratio(self.sharpe_ratio))?;
        writeln!(f, "Sortino ratio:         {}", format_ratio(self.sortino_ratio))?;
        writeln!(f, "Calmar ratio:          {}", format_ratio(self.calmar_ratio))?;
        writeln!(f, "Skewness:              {}", format_ratio(self.skewness))?;
        writeln!(f, "Kurtosis:              {}", format_ratio(self.kurtosis))?;
        writeln!(f, "Best period:           {}", format_pct(self.best_period))?;
        writeln!(f, "Worst period:          {}", format_pct(self.worst_period))?;
        writeln!(f, "Periods:               {}", self.periods)?;
        write!(f, "Final equity:          {}", format_decimal(self.final_equity))
    }
}

/// Serde adapter for statistics that may be `NaN` or infinite.
mod marked_f64 {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Marked {
        Number(f64),
        Text(String),
    }

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Option::<Marked>::deserialize(deserializer)? {
            None => Ok(f64::NAN),
            Some(Marked::Number(value)) => Ok(value),
            Some(Marked::Text(text)) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(D::Error::custom(format!("unknown metric marker '{other}'"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_report() {
        let report = MetricsReport::undefined(252, 0.0);
        assert!(report.total_return.is_nan());
        assert!(report.sharpe_ratio.is_nan());
        assert_eq!(report.periods, 0);
        assert!(report.bit_eq(&report));
    }

    #[test]
    fn test_named_values_keep_nan() {
        let report = MetricsReport::undefined(12, 0.0);
        let values = report.named_values();
        assert_eq!(values[0].0, "total_return");
        assert!(values.iter().any(|(name, v)| *name == "sharpe_ratio" && v.is_nan()));
        assert!(report.get("calmar_ratio").unwrap().is_nan());
        assert_eq!(report.get("unknown"), None);
    }

    #[test]
    fn test_json_nan_round_trip() {
        let report = MetricsReport::undefined(252, 0.02);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"sharpe_ratio\":null"));

        let parsed: MetricsReport = serde_json::from_str(&json).unwrap();
        assert!(parsed.sharpe_ratio.is_nan());
        assert_eq!(parsed.periods_per_year, 252);
    }

    #[test]
    fn test_json_keeps_signed_infinity() {
        let report = MetricsReport {
            sortino_ratio: f64::INFINITY,
            calmar_ratio: f64::NEG_INFINITY,
            ..MetricsReport::undefined(252, 0.0)
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"sortino_ratio\":\"inf\""));
        assert!(json.contains("\"calmar_ratio\":\"-inf\""));
        assert!(json.contains("\"sharpe_ratio\":null"));

        let parsed: MetricsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.sortino_ratio, f64::INFINITY);
        assert_eq!(parsed.calmar_ratio, f64::NEG_INFINITY);
        assert!(parsed.sharpe_ratio.is_nan());
        assert!(parsed.bit_eq(&report));
    }

    #[test]
    fn test_json_rejects_unknown_marker() {
        let report = MetricsReport::undefined(252, 0.0);
        let mut value = serde_json::to_value(report).unwrap();
        value["sortino_ratio"] = serde_json::Value::from("huge");
        assert!(serde_json::from_value::<MetricsReport>(value).is_err());
    }

    #[test]
    fn test_display_renders_nan() {
        let text = MetricsReport::undefined(252, 0.0).to_string();
        assert!(text.contains("Sharpe ratio:          NaN"));
    }
}
