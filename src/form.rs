//! Questionnaire form derived from the model bundle.
//!
//! Binary features become Yes/No choices; count features become bounded
//! integer sliders seeded from the range descriptor. Bounds apply to the
//! form only; the pipeline accepts any integer.

use crate::error::{Artifact, LoadError};
use crate::features::{
    FeatureKind, FeatureSpec, RangeInfo, DRAINED_AFTER_SOCIALIZING, FRIENDS_CIRCLE_SIZE,
    GOING_OUTSIDE, POST_FREQUENCY, SOCIAL_EVENT_ATTENDANCE, STAGE_FEAR, TIME_SPENT_ALONE,
};
use crate::models::bundle::ModelBundle;
use crate::types::record::{AnswerValue, BinaryChoice, InputRecord};
use serde::{Deserialize, Serialize};

/// Human label for a feature identifier.
pub fn feature_label(feature: &str) -> String {
    let known = match feature {
        STAGE_FEAR => Some("Afraid of speaking in public"),
        DRAINED_AFTER_SOCIALIZING => Some("Feel drained after socializing"),
        TIME_SPENT_ALONE => Some("Time spent alone (hours per day)"),
        SOCIAL_EVENT_ATTENDANCE => Some("Social events attended (per month)"),
        GOING_OUTSIDE => Some("Going outside (days per week)"),
        FRIENDS_CIRCLE_SIZE => Some("Number of close friends"),
        POST_FREQUENCY => Some("Social media posts (per week)"),
        _ => None,
    };

    match known {
        Some(label) => label.to_string(),
        None => title_case(&feature.replace('_', " ")),
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Input control for one question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldControl {
    Choice { default: BinaryChoice },
    Slider { min: i64, max: i64, default: i64 },
}

/// One question of the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub feature: String,
    pub label: String,
    pub control: FieldControl,
}

impl FormField {
    pub fn default_answer(&self) -> AnswerValue {
        match self.control {
            FieldControl::Choice { default } => default.into(),
            FieldControl::Slider { default, .. } => default.into(),
        }
    }

    /// Prompt text including the accepted answers and the default.
    pub fn prompt(&self) -> String {
        match self.control {
            FieldControl::Choice { default } => {
                format!("{} [Yes/No] (default {})", self.label, default)
            }
            FieldControl::Slider { min, max, default } => {
                format!("{} [{}-{}] (default {})", self.label, min, max, default)
            }
        }
    }

    /// Parse a typed answer. Empty input selects the default.
    pub fn parse_answer(&self, input: &str) -> Result<AnswerValue, String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(self.default_answer());
        }

        match self.control {
            FieldControl::Choice { .. } => input.parse::<BinaryChoice>().map(AnswerValue::from),
            FieldControl::Slider { min, max, .. } => {
                let value: i64 = input
                    .parse()
                    .map_err(|_| format!("{input:?} is not a whole number"))?;
                if value < min || value > max {
                    return Err(format!("{value} is outside {min}-{max}"));
                }
                Ok(value.into())
            }
        }
    }
}

/// One `label: value` line echoing a submitted answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryLine {
    pub feature: String,
    pub label: String,
    pub value: String,
}

/// The questionnaire, one field per feature in feature order
#[derive(Debug, Clone)]
pub struct QuestionnaireForm {
    fields: Vec<FormField>,
}

impl QuestionnaireForm {
    pub fn new(features: &FeatureSpec, ranges: &RangeInfo) -> Result<Self, LoadError> {
        let fields = features
            .iter()
            .map(|(name, kind)| {
                let control = match kind {
                    FeatureKind::Binary => FieldControl::Choice {
                        default: BinaryChoice::No,
                    },
                    FeatureKind::Count => {
                        let range = ranges.get(name).ok_or_else(|| {
                            LoadError::invalid(
                                Artifact::RangeInfo,
                                format!("no range entry for feature {name:?}"),
                            )
                        })?;
                        FieldControl::Slider {
                            min: range.min as i64,
                            max: range.max as i64,
                            default: range.median as i64,
                        }
                    }
                };
                Ok(FormField {
                    feature: name.to_string(),
                    label: feature_label(name),
                    control,
                })
            })
            .collect::<Result<Vec<_>, LoadError>>()?;

        Ok(Self { fields })
    }

    pub fn from_bundle(bundle: &ModelBundle) -> Result<Self, LoadError> {
        Self::new(bundle.features(), bundle.ranges())
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// Record with every field at its default.
    pub fn default_record(&self) -> InputRecord {
        self.fields
            .iter()
            .map(|field| (field.feature.clone(), field.default_answer()))
            .collect()
    }

    /// Echo a record back in form order, binary answers as Yes/No.
    pub fn summary(&self, record: &InputRecord) -> Vec<SummaryLine> {
        self.fields
            .iter()
            .filter_map(|field| {
                let answer = record.get(&field.feature)?;
                let value = match field.control {
                    FieldControl::Choice { .. } => answer
                        .to_binary()
                        .ok()
                        .and_then(BinaryChoice::from_value)
                        .map(|choice| choice.to_string()),
                    FieldControl::Slider { .. } => {
                        answer.to_count().ok().map(|n| format!("{}", n as i64))
                    }
                }
                .unwrap_or_else(|| display_raw(answer));

                Some(SummaryLine {
                    feature: field.feature.clone(),
                    label: field.label.clone(),
                    value,
                })
            })
            .collect()
    }
}

fn display_raw(answer: &AnswerValue) -> String {
    match answer {
        AnswerValue::Flag(flag) => flag.to_string(),
        AnswerValue::Number(n) => n.to_string(),
        AnswerValue::Text(text) => text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bundle::test_support::sum_threshold_bundle;

    fn form() -> QuestionnaireForm {
        QuestionnaireForm::from_bundle(&sum_threshold_bundle(None)).unwrap()
    }

    #[test]
    fn test_labels() {
        assert_eq!(feature_label(STAGE_FEAR), "Afraid of speaking in public");
        assert_eq!(feature_label("Hours_of_SLEEP"), "Hours Of Sleep");
    }

    #[test]
    fn test_fields_follow_feature_order() {
        let form = form();
        let features: Vec<&str> = form.fields().iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(features[0], STAGE_FEAR);
        assert_eq!(features.len(), 7);

        assert_eq!(
            form.fields()[0].control,
            FieldControl::Choice {
                default: BinaryChoice::No
            }
        );
        assert_eq!(
            form.fields()[2].control,
            FieldControl::Slider {
                min: 0,
                max: 15,
                default: 5
            }
        );
    }

    #[test]
    fn test_parse_answers() {
        let form = form();
        let choice = &form.fields()[0];
        let slider = &form.fields()[2];

        assert_eq!(choice.parse_answer("yes"), Ok(AnswerValue::Text("Yes".to_string())));
        assert_eq!(choice.parse_answer(""), Ok(AnswerValue::Text("No".to_string())));
        assert!(choice.parse_answer("perhaps").is_err());

        assert_eq!(slider.parse_answer("7"), Ok(AnswerValue::Number(7.0)));
        assert_eq!(slider.parse_answer(" "), Ok(AnswerValue::Number(5.0)));
        assert!(slider.parse_answer("16").is_err());
        assert!(slider.parse_answer("seven").is_err());
    }

    #[test]
    fn test_default_record_and_summary() {
        let form = form();
        let record = form.default_record().with(DRAINED_AFTER_SOCIALIZING, true);
        assert_eq!(record.len(), 7);

        let summary = form.summary(&record);
        assert_eq!(summary.len(), 7);
        assert_eq!(summary[0].value, "No");
        assert_eq!(summary[1].value, "Yes");
        assert_eq!(summary[2].label, "Time spent alone (hours per day)");
        assert_eq!(summary[2].value, "5");
    }
}
