//! Inference pipeline: schema check, coercion, scaling, classification and
//! confidence derivation for one questionnaire record.

use crate::error::InferenceError;
use crate::features::FeatureKind;
use crate::models::bundle::ModelBundle;
use crate::types::prediction::{ClassProbabilities, Personality, PredictionResult};
use crate::types::record::InputRecord;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs predictions against an injected, read-only model bundle
#[derive(Debug, Clone)]
pub struct InferencePipeline {
    bundle: Arc<ModelBundle>,
}

impl InferencePipeline {
    pub fn new(bundle: Arc<ModelBundle>) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// Predict the personality for one record.
    pub fn predict(&self, record: &InputRecord) -> Result<PredictionResult, InferenceError> {
        let row = self.normalize(record)?;
        let scaled = self.bundle.scaler().transform(&row);

        let classifier = self.bundle.classifier();
        let class = classifier.predict(&scaled)?;
        let label = Personality::from_class(class).ok_or(InferenceError::UnexpectedLabel(class))?;

        let result = match classifier.probability_estimator() {
            Some(estimator) => match estimator.predict_proba(&scaled) {
                Ok(by_class) => match ClassProbabilities::from_class_vector(by_class) {
                    Some(probabilities) => PredictionResult::estimated(label, probabilities),
                    None => {
                        warn!(
                            model = classifier.name(),
                            probabilities = ?by_class,
                            "Classifier returned an invalid probability vector, using fallback"
                        );
                        PredictionResult::fallback(label)
                    }
                },
                Err(e) => {
                    warn!(
                        model = classifier.name(),
                        error = %e,
                        "Probability estimation failed, using fallback"
                    );
                    PredictionResult::fallback(label)
                }
            },
            None => {
                debug!(
                    model = classifier.name(),
                    "Classifier has no probability estimates, using fallback"
                );
                PredictionResult::fallback(label)
            }
        };

        debug!(
            label = %result.label,
            confidence = result.confidence_score,
            source = ?result.probability_source,
            "Prediction complete"
        );

        Ok(result)
    }

    /// Validate the record against the feature list and lay it out as a
    /// numeric row in feature order.
    pub fn normalize(&self, record: &InputRecord) -> Result<Vec<f64>, InferenceError> {
        let features = self.bundle.features();

        let missing: Vec<String> = features
            .names()
            .iter()
            .filter(|name| record.get(name).is_none())
            .cloned()
            .collect();
        let unexpected: BTreeSet<&str> = record
            .keys()
            .filter(|key| !features.contains(key))
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            let mut missing = missing;
            missing.sort();
            return Err(InferenceError::SchemaMismatch {
                missing,
                unexpected: unexpected.into_iter().map(str::to_string).collect(),
            });
        }

        features
            .iter()
            .map(|(name, kind)| {
                // presence checked above
                let answer = record.get(name).ok_or_else(|| InferenceError::SchemaMismatch {
                    missing: vec![name.to_string()],
                    unexpected: vec![],
                })?;
                let coerced = match kind {
                    FeatureKind::Binary => answer.to_binary(),
                    FeatureKind::Count => answer.to_count(),
                };
                coerced.map_err(|reason| InferenceError::InvalidValue {
                    feature: name.to_string(),
                    reason,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{
        DRAINED_AFTER_SOCIALIZING, FRIENDS_CIRCLE_SIZE, GOING_OUTSIDE, POST_FREQUENCY,
        SOCIAL_EVENT_ATTENDANCE, STAGE_FEAR, TIME_SPENT_ALONE,
    };
    use crate::models::bundle::test_support::{bundle_with, sum_threshold_bundle};
    use crate::models::classifier::test_doubles::{BrokenEstimator, ThreeClass};
    use crate::types::prediction::ProbabilitySource;
    use crate::types::record::{AnswerValue, BinaryChoice};

    fn sample_record() -> InputRecord {
        InputRecord::new()
            .with(STAGE_FEAR, BinaryChoice::No)
            .with(DRAINED_AFTER_SOCIALIZING, BinaryChoice::Yes)
            .with(TIME_SPENT_ALONE, 5)
            .with(SOCIAL_EVENT_ATTENDANCE, 3)
            .with(GOING_OUTSIDE, 2)
            .with(FRIENDS_CIRCLE_SIZE, 10)
            .with(POST_FREQUENCY, 4)
    }

    fn pipeline(probabilities: Option<[f64; 2]>) -> InferencePipeline {
        InferencePipeline::new(Arc::new(sum_threshold_bundle(probabilities)))
    }

    #[test]
    fn test_normalize_orders_and_coerces() {
        let row = pipeline(None).normalize(&sample_record()).unwrap();
        assert_eq!(row, vec![0.0, 1.0, 5.0, 3.0, 2.0, 10.0, 4.0]);
    }

    #[test]
    fn test_missing_key_is_schema_mismatch() {
        let pipeline = pipeline(None);
        for name in pipeline.bundle().features().names().to_vec() {
            let mut record = sample_record();
            record.remove(&name);

            let err = pipeline.predict(&record).unwrap_err();
            assert_eq!(
                err,
                InferenceError::SchemaMismatch {
                    missing: vec![name.clone()],
                    unexpected: vec![],
                }
            );
        }
    }

    #[test]
    fn test_extra_key_is_schema_mismatch() {
        let record = sample_record().with("Favourite_colour", 3);
        let err = pipeline(None).predict(&record).unwrap_err();
        assert_eq!(
            err,
            InferenceError::SchemaMismatch {
                missing: vec![],
                unexpected: vec!["Favourite_colour".to_string()],
            }
        );
    }

    #[test]
    fn test_binary_choices_coerce() {
        let pipeline = pipeline(None);
        let yes = sample_record().with(STAGE_FEAR, BinaryChoice::Yes);
        let no = sample_record().with(STAGE_FEAR, BinaryChoice::No);

        assert_eq!(pipeline.normalize(&yes).unwrap()[0], 1.0);
        assert_eq!(pipeline.normalize(&no).unwrap()[0], 0.0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let record = sample_record().with(STAGE_FEAR, "sometimes");
        assert!(matches!(
            pipeline(None).predict(&record),
            Err(InferenceError::InvalidValue { ref feature, .. }) if feature == STAGE_FEAR
        ));

        let record = sample_record().with(GOING_OUTSIDE, AnswerValue::Number(2.5));
        assert!(matches!(
            pipeline(None).predict(&record),
            Err(InferenceError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_out_of_range_counts_are_not_clamped() {
        let record = sample_record().with(FRIENDS_CIRCLE_SIZE, 1000);
        let row = pipeline(None).normalize(&record).unwrap();
        assert_eq!(row[5], 1000.0);
    }

    #[test]
    fn test_fallback_without_probability_capability() {
        let result = pipeline(None).predict(&sample_record()).unwrap();

        assert_eq!(result.confidence_score, 75.0);
        assert_eq!(result.class_probabilities.as_pair(), (0.5, 0.5));
        assert_eq!(result.probability_source, ProbabilitySource::Fallback);
    }

    #[test]
    fn test_fallback_when_estimator_fails() {
        let pipeline = InferencePipeline::new(Arc::new(bundle_with(Box::new(BrokenEstimator))));
        let result = pipeline.predict(&sample_record()).unwrap();

        assert_eq!(result.label, Personality::Extrovert);
        assert_eq!(result.confidence_score, 75.0);
        assert_eq!(result.probability_source, ProbabilitySource::Fallback);
    }

    #[test]
    fn test_fallback_on_invalid_probabilities() {
        let result = pipeline(Some([0.9, 0.9])).predict(&sample_record()).unwrap();
        assert_eq!(result.probability_source, ProbabilitySource::Fallback);
    }

    #[test]
    fn test_label_mapping_and_confidence() {
        // row sums to 25, above the threshold of 20
        let result = pipeline(Some([0.3, 0.7])).predict(&sample_record()).unwrap();
        assert_eq!(result.label, Personality::Extrovert);
        assert_eq!(result.confidence_score, 70.0);
        assert_eq!(result.class_probabilities.as_pair(), (0.3, 0.7));

        let quiet = sample_record().with(FRIENDS_CIRCLE_SIZE, 0);
        let result = pipeline(Some([0.6, 0.4])).predict(&quiet).unwrap();
        assert_eq!(result.label, Personality::Introvert);
        assert_eq!(result.confidence_score, 60.0);
    }

    #[test]
    fn test_unexpected_class_is_an_error() {
        let pipeline = InferencePipeline::new(Arc::new(bundle_with(Box::new(ThreeClass))));
        assert_eq!(
            pipeline.predict(&sample_record()),
            Err(InferenceError::UnexpectedLabel(2))
        );
    }

    #[test]
    fn test_prediction_is_idempotent() {
        let pipeline = pipeline(Some([0.25, 0.75]));
        let first = pipeline.predict(&sample_record()).unwrap();
        let second = pipeline.predict(&sample_record()).unwrap();
        assert_eq!(first, second);
    }
}
