//! Classifier contract used by the inference pipeline.
//!
//! Probability estimation is a separate capability. A classifier that can
//! estimate class probabilities hands out a [`ProbabilityEstimator`]; one
//! that cannot returns `None` and the pipeline substitutes fixed defaults.

use crate::error::InferenceError;

/// Binary classifier over a scaled feature vector.
pub trait Classifier: Send + Sync {
    /// Human readable name, used in logs
    fn name(&self) -> &str {
        "classifier"
    }

    /// Number of input columns, when the model declares it
    fn n_features(&self) -> Option<usize> {
        None
    }

    /// Predict the class id (0 or 1) for one scaled sample
    fn predict(&self, features: &[f32]) -> Result<i64, InferenceError>;

    /// Probability capability, if this model has one
    fn probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        None
    }
}

/// Per-class probability estimation.
pub trait ProbabilityEstimator: Send + Sync {
    /// Probabilities indexed by class id: `[p(class 0), p(class 1)]`
    fn predict_proba(&self, features: &[f32]) -> Result<[f64; 2], InferenceError>;
}
