//! Feature schema for the personality questionnaire.
//!
//! The feature order loaded from the bundle is the column order the scaler
//! and classifier were fit with. Every record is laid out in this order
//! before scaling.

use crate::error::{Artifact, LoadError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use xxhash_rust::xxh3::xxh3_64;

pub const STAGE_FEAR: &str = "Stage_fear";
pub const DRAINED_AFTER_SOCIALIZING: &str = "Drained_after_socializing";
pub const TIME_SPENT_ALONE: &str = "Time_spent_Alone";
pub const SOCIAL_EVENT_ATTENDANCE: &str = "Social_event_attendance";
pub const GOING_OUTSIDE: &str = "Going_outside";
pub const FRIENDS_CIRCLE_SIZE: &str = "Friends_circle_size";
pub const POST_FREQUENCY: &str = "Post_frequency";

/// Features answered with a Yes/No choice. They bypass range lookup.
pub const BINARY_FEATURES: [&str; 2] = [STAGE_FEAR, DRAINED_AFTER_SOCIALIZING];

/// How a feature is answered and coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Yes/No answer, coerced to 0 or 1
    Binary,
    /// Non-negative count or duration, taken as an integer
    Count,
}

impl FeatureKind {
    /// Kind of the named feature.
    pub fn of(name: &str) -> Self {
        if BINARY_FEATURES.contains(&name) {
            FeatureKind::Binary
        } else {
            FeatureKind::Count
        }
    }
}

/// Ordered list of feature identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSpec {
    names: Vec<String>,
}

impl FeatureSpec {
    /// Build a spec, rejecting empty lists and duplicate names.
    pub fn new(names: Vec<String>) -> Result<Self, LoadError> {
        if names.is_empty() {
            return Err(LoadError::invalid(
                Artifact::FeatureNames,
                "feature list is empty",
            ));
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if name.trim().is_empty() {
                return Err(LoadError::invalid(
                    Artifact::FeatureNames,
                    "feature list contains a blank name",
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(LoadError::invalid(
                    Artifact::FeatureNames,
                    format!("duplicate feature name {name:?}"),
                ));
            }
        }

        Ok(Self { names })
    }

    /// The seven questionnaire features in the order the reference model
    /// was trained with.
    pub fn personality() -> Self {
        Self {
            names: [
                STAGE_FEAR,
                DRAINED_AFTER_SOCIALIZING,
                TIME_SPENT_ALONE,
                SOCIAL_EVENT_ATTENDANCE,
                GOING_OUTSIDE,
                FRIENDS_CIRCLE_SIZE,
                POST_FREQUENCY,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Features paired with their kind, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, FeatureKind)> {
        self.names
            .iter()
            .map(|n| (n.as_str(), FeatureKind::of(n)))
    }

    /// Stable fingerprint of the feature order (xxh3-64, hex).
    pub fn fingerprint(&self) -> String {
        format!("{:016x}", xxh3_64(self.names.join("\n").as_bytes()))
    }

    /// Compare against the column order another artifact was fit with.
    ///
    /// Returns a description of the first difference.
    pub fn check_order(&self, fitted: &[String]) -> Result<(), String> {
        if fitted.len() != self.names.len() {
            return Err(format!(
                "expected {} features, artifact has {}",
                self.names.len(),
                fitted.len()
            ));
        }

        for (i, (expected, actual)) in self.names.iter().zip(fitted).enumerate() {
            if expected != actual {
                return Err(format!(
                    "column {i} is {actual:?}, expected {expected:?}"
                ));
            }
        }

        Ok(())
    }
}

/// Observed value range of a count feature. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl FeatureRange {
    fn validate(&self) -> Result<(), String> {
        if !(self.min.is_finite() && self.max.is_finite() && self.median.is_finite()) {
            return Err("non-finite bound".to_string());
        }
        if self.min > self.max {
            return Err(format!("min {} exceeds max {}", self.min, self.max));
        }
        if self.median < self.min || self.median > self.max {
            return Err(format!(
                "median {} outside [{}, {}]",
                self.median, self.min, self.max
            ));
        }
        Ok(())
    }
}

/// Per-feature range descriptor used to size form inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeInfo {
    ranges: BTreeMap<String, FeatureRange>,
}

impl RangeInfo {
    pub fn new(ranges: BTreeMap<String, FeatureRange>) -> Self {
        Self { ranges }
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureRange> {
        self.ranges.get(feature)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Every count feature needs a well-formed range; binary features are
    /// never looked up.
    pub fn validate_against(&self, spec: &FeatureSpec) -> Result<(), LoadError> {
        for (name, kind) in spec.iter() {
            if kind == FeatureKind::Binary {
                continue;
            }
            let range = self.get(name).ok_or_else(|| {
                LoadError::invalid(
                    Artifact::RangeInfo,
                    format!("no range entry for feature {name:?}"),
                )
            })?;
            range.validate().map_err(|e| {
                LoadError::invalid(Artifact::RangeInfo, format!("{name}: {e}"))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: f64, max: f64, median: f64) -> FeatureRange {
        FeatureRange { min, max, median }
    }

    #[test]
    fn test_feature_kinds() {
        assert_eq!(FeatureKind::of(STAGE_FEAR), FeatureKind::Binary);
        assert_eq!(FeatureKind::of(DRAINED_AFTER_SOCIALIZING), FeatureKind::Binary);
        assert_eq!(FeatureKind::of(TIME_SPENT_ALONE), FeatureKind::Count);
        assert_eq!(FeatureKind::of("Something_else"), FeatureKind::Count);
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(FeatureSpec::new(vec![]).is_err());
        let err = FeatureSpec::new(vec!["a".to_string(), "a".to_string()]).unwrap_err();
        assert_eq!(err.artifact(), Artifact::FeatureNames);
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let spec = FeatureSpec::personality();
        let mut reversed = spec.names().to_vec();
        reversed.reverse();
        let reversed = FeatureSpec::new(reversed).unwrap();

        assert_eq!(spec.fingerprint(), FeatureSpec::personality().fingerprint());
        assert_ne!(spec.fingerprint(), reversed.fingerprint());
        assert_eq!(spec.fingerprint().len(), 16);
    }

    #[test]
    fn test_check_order() {
        let spec = FeatureSpec::personality();
        assert!(spec.check_order(spec.names()).is_ok());

        let mut swapped = spec.names().to_vec();
        swapped.swap(2, 3);
        let err = spec.check_order(&swapped).unwrap_err();
        assert!(err.contains("column 2"));

        assert!(spec.check_order(&spec.names()[..3]).is_err());
    }

    #[test]
    fn test_range_info_validation() {
        let spec = FeatureSpec::personality();
        let mut ranges = BTreeMap::new();
        for (name, kind) in spec.iter() {
            if kind == FeatureKind::Count {
                ranges.insert(name.to_string(), range(0.0, 10.0, 4.0));
            }
        }
        let info = RangeInfo::new(ranges.clone());
        assert!(info.validate_against(&spec).is_ok());

        ranges.remove(POST_FREQUENCY);
        let err = RangeInfo::new(ranges.clone())
            .validate_against(&spec)
            .unwrap_err();
        assert_eq!(err.artifact(), Artifact::RangeInfo);

        ranges.insert(POST_FREQUENCY.to_string(), range(0.0, 10.0, 12.0));
        assert!(RangeInfo::new(ranges).validate_against(&spec).is_err());
    }

    #[test]
    fn test_range_info_deserializes_from_object() {
        let json = r#"{"Time_spent_Alone": {"min": 0, "max": 11, "median": 4}}"#;
        let info: RangeInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.get(TIME_SPENT_ALONE), Some(&range(0.0, 11.0, 4.0)));
    }
}
