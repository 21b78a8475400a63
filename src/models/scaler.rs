//! Fitted feature scalers

use serde::{Deserialize, Serialize};

/// Floor applied to scale factors to avoid division by zero.
const MIN_SCALE: f64 = 1e-12;

/// Transform fitted on the training data, stored as JSON.
///
/// `standard` mirrors a fitted standard scaler (`(x - mean) / scale`),
/// `min_max` a fitted min-max scaler (`(x - min) * scale`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureScaler {
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
        /// Column order the scaler was fit with
        #[serde(default)]
        feature_names: Option<Vec<String>>,
    },
    MinMax {
        min: Vec<f64>,
        scale: Vec<f64>,
        #[serde(default)]
        feature_names: Option<Vec<String>>,
    },
}

impl FeatureScaler {
    /// Number of columns the scaler transforms.
    pub fn width(&self) -> usize {
        match self {
            FeatureScaler::Standard { mean, .. } => mean.len(),
            FeatureScaler::MinMax { min, .. } => min.len(),
        }
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        match self {
            FeatureScaler::Standard { feature_names, .. }
            | FeatureScaler::MinMax { feature_names, .. } => feature_names.as_deref(),
        }
    }

    /// Check parameter shapes and values.
    pub fn validate(&self) -> Result<(), String> {
        let (offsets, scale) = match self {
            FeatureScaler::Standard { mean, scale, .. } => (mean, scale),
            FeatureScaler::MinMax { min, scale, .. } => (min, scale),
        };

        if offsets.is_empty() {
            return Err("scaler has no columns".to_string());
        }
        if offsets.len() != scale.len() {
            return Err(format!(
                "parameter length mismatch: {} offsets, {} scale factors",
                offsets.len(),
                scale.len()
            ));
        }
        if offsets.iter().chain(scale).any(|v| !v.is_finite()) {
            return Err("scaler parameters must be finite".to_string());
        }
        if let Some(names) = self.feature_names() {
            if names.len() != offsets.len() {
                return Err(format!(
                    "{} feature names for {} columns",
                    names.len(),
                    offsets.len()
                ));
            }
        }
        Ok(())
    }

    /// Transform one row. The caller guarantees `row.len() == self.width()`.
    pub fn transform(&self, row: &[f64]) -> Vec<f32> {
        debug_assert_eq!(row.len(), self.width());

        match self {
            FeatureScaler::Standard { mean, scale, .. } => row
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| ((x - m) / s.abs().max(MIN_SCALE)) as f32)
                .collect(),
            FeatureScaler::MinMax { min, scale, .. } => row
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (lo, s))| ((x - lo) * s) as f32)
                .collect(),
        }
    }
}
