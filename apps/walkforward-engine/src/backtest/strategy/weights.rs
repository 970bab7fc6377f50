//! Weight vectors returned by allocation strategies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a weight vector fails validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    /// The strategy returned no weights at all.
    #[error("weight vector is empty")]
    Empty,

    /// A weight is NaN or infinite.
    #[error("weight for '{asset}' is not finite ({value})")]
    NonFinite {
        /// Asset identifier.
        asset: String,
        /// Offending value.
        value: f64,
    },

    /// A negative weight while short positions are not allowed.
    #[error("negative weight {value} for '{asset}' but short positions are not allowed")]
    Negative {
        /// Asset identifier.
        asset: String,
        /// Offending value.
        value: f64,
    },

    /// A non-zero weight for an asset outside the test-window universe.
    #[error("weight for '{asset}' which is not in the test window universe")]
    UnknownAsset {
        /// Asset identifier.
        asset: String,
    },

    /// Weights do not sum to one.
    #[error("weights sum to {sum}, expected 1 within {tolerance}")]
    SumMismatch {
        /// Actual sum.
        sum: f64,
        /// Allowed deviation.
        tolerance: f64,
    },
}

/// Mapping from asset identifier to allocation.
///
/// Ordered by asset so iteration, serialization and floating-point sums are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(BTreeMap<String, f64>);

impl WeightVector {
    /// Empty vector.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Equal weights across `assets`.
    #[must_use]
    pub fn equal<S: AsRef<str>>(assets: &[S]) -> Self {
        if assets.is_empty() {
            return Self::new();
        }
        #[allow(clippy::cast_precision_loss)]
        let weight = 1.0 / assets.len() as f64;
        assets
            .iter()
            .map(|a| (a.as_ref().to_string(), weight))
            .collect()
    }

    /// Set the weight of an asset.
    pub fn insert(&mut self, asset: impl Into<String>, weight: f64) -> Option<f64> {
        self.0.insert(asset.into(), weight)
    }

    /// Weight of an asset, if present.
    #[must_use]
    pub fn get(&self, asset: &str) -> Option<f64> {
        self.0.get(asset).copied()
    }

    /// Weight of an asset, zero if absent.
    #[must_use]
    pub fn weight(&self, asset: &str) -> f64 {
        self.get(asset).unwrap_or(0.0)
    }

    /// Number of assets with a weight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no asset has a weight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(asset, weight)` in asset order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(asset, weight)| (asset.as_str(), *weight))
    }

    /// Sum of weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.0.values().sum()
    }

    /// Gross exposure `Σ|w|`.
    #[must_use]
    pub fn gross_exposure(&self) -> f64 {
        self.0.values().map(|w| w.abs()).sum()
    }

    /// Turnover `Σ|w_new - w_old|` over the union of both vectors' assets.
    #[must_use]
    pub fn turnover_from(&self, previous: &Self) -> f64 {
        let changed: f64 = self
            .0
            .iter()
            .map(|(asset, w)| (w - previous.weight(asset)).abs())
            .sum();
        let exited: f64 = previous
            .0
            .iter()
            .filter(|(asset, _)| !self.0.contains_key(*asset))
            .map(|(_, w)| w.abs())
            .sum();
        changed + exited
    }

    /// Universe assets that have no weight.
    #[must_use]
    pub fn missing_from(&self, universe: &[String]) -> Vec<String> {
        universe
            .iter()
            .filter(|asset| !self.0.contains_key(asset.as_str()))
            .cloned()
            .collect()
    }

    /// Give every universe asset without a weight an explicit zero.
    pub fn fill_missing(&mut self, universe: &[String]) {
        for asset in universe {
            self.0.entry(asset.clone()).or_insert(0.0);
        }
    }

    /// Check values and asset membership.
    ///
    /// Zero weights on assets outside `universe` are dropped; any other
    /// weight on such an asset is an error. Coverage of `universe` is not
    /// checked here.
    ///
    /// # Errors
    ///
    /// Returns the first [`WeightError`] found, in the order non-finite,
    /// negative, unknown asset, sum.
    pub fn validate(
        &mut self,
        universe: &[String],
        allow_short: bool,
        tolerance: f64,
    ) -> Result<(), WeightError> {
        if self.0.is_empty() {
            return Err(WeightError::Empty);
        }

        for (asset, &value) in &self.0 {
            if !value.is_finite() {
                return Err(WeightError::NonFinite {
                    asset: asset.clone(),
                    value,
                });
            }
        }

        if !allow_short
            && let Some((asset, &value)) = self.0.iter().find(|(_, w)| **w < 0.0)
        {
            return Err(WeightError::Negative {
                asset: asset.clone(),
                value,
            });
        }

        if let Some(asset) = self
            .0
            .iter()
            .find(|(asset, w)| **w != 0.0 && !universe.contains(*asset))
            .map(|(asset, _)| asset.clone())
        {
            return Err(WeightError::UnknownAsset { asset });
        }
        self.0.retain(|asset, _| universe.contains(asset));

        let sum = self.sum();
        if (sum - 1.0).abs() > tolerance {
            return Err(WeightError::SumMismatch { sum, tolerance });
        }

        Ok(())
    }
}

impl FromIterator<(String, f64)> for WeightVector {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, f64)> for WeightVector {
    fn from_iter<T: IntoIterator<Item = (&'a str, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(a, w)| (a.to_string(), w)).collect())
    }
}

impl From<BTreeMap<String, f64>> for WeightVector {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

impl<'a> IntoIterator for &'a WeightVector {
    type Item = (&'a String, &'a f64);
    type IntoIter = std::collections::btree_map::Iter<'a, String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
