//! Prediction results handed to the rendering layer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Class id the classifier uses for introverts.
pub const INTROVERT_CLASS: i64 = 0;
/// Class id the classifier uses for extroverts.
pub const EXTROVERT_CLASS: i64 = 1;

/// Probabilities used when the classifier cannot estimate them.
pub const FALLBACK_PROBABILITIES: ClassProbabilities = ClassProbabilities {
    introvert: 0.5,
    extrovert: 0.5,
};
/// Confidence reported alongside [`FALLBACK_PROBABILITIES`].
pub const FALLBACK_CONFIDENCE: f64 = 75.0;

/// Predicted personality type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Personality {
    Introvert,
    Extrovert,
}

impl Personality {
    /// Map a classifier class id to a personality.
    pub fn from_class(class: i64) -> Option<Self> {
        match class {
            INTROVERT_CLASS => Some(Personality::Introvert),
            EXTROVERT_CLASS => Some(Personality::Extrovert),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Personality::Introvert => "Introvert",
            Personality::Extrovert => "Extrovert",
        }
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class probabilities in fixed display order: introvert first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub introvert: f64,
    pub extrovert: f64,
}

impl ClassProbabilities {
    /// Tolerance for accepting a model's probability vector as normalized.
    pub const SUM_TOLERANCE: f64 = 1e-3;

    /// Build from a vector indexed by class id, validating and
    /// renormalizing it. Returns `None` for vectors that are not a
    /// probability distribution.
    pub fn from_class_vector(by_class: [f64; 2]) -> Option<Self> {
        if by_class.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return None;
        }
        let sum: f64 = by_class.iter().sum();
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return None;
        }
        Some(Self {
            introvert: by_class[INTROVERT_CLASS as usize] / sum,
            extrovert: by_class[EXTROVERT_CLASS as usize] / sum,
        })
    }

    /// Probability of the given personality.
    pub fn of(&self, personality: Personality) -> f64 {
        match personality {
            Personality::Introvert => self.introvert,
            Personality::Extrovert => self.extrovert,
        }
    }

    pub fn as_pair(&self) -> (f64, f64) {
        (self.introvert, self.extrovert)
    }

    pub fn max(&self) -> f64 {
        self.introvert.max(self.extrovert)
    }

    /// Confidence score: highest probability as a percentage, two decimals,
    /// ties rounded to even.
    pub fn confidence(&self) -> f64 {
        (self.max() * 100.0 * 100.0).round_ties_even() / 100.0
    }
}

/// Where the probabilities of a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilitySource {
    /// Estimated by the classifier
    Model,
    /// Classifier has no usable estimate; fixed defaults used
    Fallback,
}

/// Result of one inference call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted personality
    pub label: Personality,
    /// Confidence in percent (0.0 - 100.0)
    pub confidence_score: f64,
    /// Probability breakdown, introvert first
    pub class_probabilities: ClassProbabilities,
    /// Whether the probabilities are estimated or the fallback
    pub probability_source: ProbabilitySource,
}

impl PredictionResult {
    /// Result with classifier-estimated probabilities.
    pub fn estimated(label: Personality, probabilities: ClassProbabilities) -> Self {
        Self {
            label,
            confidence_score: probabilities.confidence(),
            class_probabilities: probabilities,
            probability_source: ProbabilitySource::Model,
        }
    }

    /// Result for a classifier without probability estimates.
    pub fn fallback(label: Personality) -> Self {
        Self {
            label,
            confidence_score: FALLBACK_CONFIDENCE,
            class_probabilities: FALLBACK_PROBABILITIES,
            probability_source: ProbabilitySource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping() {
        assert_eq!(Personality::from_class(1), Some(Personality::Extrovert));
        assert_eq!(Personality::from_class(0), Some(Personality::Introvert));
        assert_eq!(Personality::from_class(2), None);
    }

    #[test]
    fn test_confidence_rounding() {
        let probs = ClassProbabilities::from_class_vector([0.123456, 0.876544]).unwrap();
        assert_eq!(probs.confidence(), 87.65);
    }

    #[test]
    fn test_confidence_ties_round_to_even() {
        // 25/32 of the trees, exactly representable
        let probs = ClassProbabilities::from_class_vector([0.21875, 0.78125]).unwrap();
        assert_eq!(probs.confidence(), 78.12);

        let probs = ClassProbabilities::from_class_vector([0.59375, 0.40625]).unwrap();
        assert_eq!(probs.confidence(), 59.38);
    }

    #[test]
    fn test_rejects_invalid_vectors() {
        assert!(ClassProbabilities::from_class_vector([0.7, 0.7]).is_none());
        assert!(ClassProbabilities::from_class_vector([f64::NAN, 1.0]).is_none());
        assert!(ClassProbabilities::from_class_vector([-0.1, 1.1]).is_none());
    }

    #[test]
    fn test_renormalizes_small_drift() {
        let probs = ClassProbabilities::from_class_vector([0.3000004, 0.7]).unwrap();
        assert!((probs.introvert + probs.extrovert - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fallback_result() {
        let result = PredictionResult::fallback(Personality::Introvert);
        assert_eq!(result.confidence_score, 75.0);
        assert_eq!(result.class_probabilities.as_pair(), (0.5, 0.5));
        assert_eq!(result.probability_source, ProbabilitySource::Fallback);
    }

    #[test]
    fn test_result_serialization() {
        let probs = ClassProbabilities::from_class_vector([0.2, 0.8]).unwrap();
        let result = PredictionResult::estimated(Personality::Extrovert, probs);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["label"], "Extrovert");
        assert_eq!(json["probability_source"], "model");
        assert_eq!(json["confidence_score"], 80.0);
    }
}
