//! Raw questionnaire answers as submitted by a front-end

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Two-valued answer for the binary questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BinaryChoice {
    #[default]
    No,
    Yes,
}

impl BinaryChoice {
    /// Model encoding: Yes = 1, No = 0.
    pub fn as_value(self) -> f64 {
        match self {
            BinaryChoice::Yes => 1.0,
            BinaryChoice::No => 0.0,
        }
    }

    /// Inverse of [`BinaryChoice::as_value`] for echo display.
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 1.0 {
            Some(BinaryChoice::Yes)
        } else if value == 0.0 {
            Some(BinaryChoice::No)
        } else {
            None
        }
    }
}

impl fmt::Display for BinaryChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryChoice::Yes => f.write_str("Yes"),
            BinaryChoice::No => f.write_str("No"),
        }
    }
}

impl FromStr for BinaryChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "ya"/"tidak" come from the Indonesian form
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "1" | "ya" => Ok(BinaryChoice::Yes),
            "no" | "n" | "false" | "0" | "tidak" => Ok(BinaryChoice::No),
            other => Err(format!("expected a yes/no choice, got {other:?}")),
        }
    }
}

/// One answer as it arrives from a front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl AnswerValue {
    /// Coerce a Yes/No style answer to 0 or 1.
    pub fn to_binary(&self) -> Result<f64, String> {
        match self {
            AnswerValue::Flag(flag) => Ok(if *flag { 1.0 } else { 0.0 }),
            AnswerValue::Number(n) if *n == 0.0 || *n == 1.0 => Ok(*n),
            AnswerValue::Number(n) => Err(format!("expected 0 or 1, got {n}")),
            AnswerValue::Text(text) => text.parse::<BinaryChoice>().map(BinaryChoice::as_value),
        }
    }

    /// Coerce a count answer to an integral value. No bounds are applied.
    pub fn to_count(&self) -> Result<f64, String> {
        let value = match self {
            AnswerValue::Number(n) => *n,
            AnswerValue::Text(text) => text
                .trim()
                .parse::<i64>()
                .map(|n| n as f64)
                .map_err(|_| format!("expected an integer, got {text:?}"))?,
            AnswerValue::Flag(_) => return Err("expected an integer, got a boolean".to_string()),
        };

        if !value.is_finite() {
            return Err(format!("expected a finite integer, got {value}"));
        }
        if value.fract() != 0.0 {
            return Err(format!("expected an integer, got {value}"));
        }
        Ok(value)
    }
}

impl From<BinaryChoice> for AnswerValue {
    fn from(choice: BinaryChoice) -> Self {
        AnswerValue::Text(choice.to_string())
    }
}

impl From<i64> for AnswerValue {
    fn from(n: i64) -> Self {
        AnswerValue::Number(n as f64)
    }
}

impl From<i32> for AnswerValue {
    fn from(n: i32) -> Self {
        AnswerValue::Number(f64::from(n))
    }
}

impl From<&str> for AnswerValue {
    fn from(text: &str) -> Self {
        AnswerValue::Text(text.to_string())
    }
}

impl From<String> for AnswerValue {
    fn from(text: String) -> Self {
        AnswerValue::Text(text)
    }
}

impl From<bool> for AnswerValue {
    fn from(flag: bool) -> Self {
        AnswerValue::Flag(flag)
    }
}

/// Answers keyed by feature identifier. Key order is irrelevant; the
/// pipeline lays values out in feature order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputRecord {
    answers: BTreeMap<String, AnswerValue>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, feature: impl Into<String>, value: impl Into<AnswerValue>) -> Self {
        self.insert(feature, value);
        self
    }

    pub fn insert(&mut self, feature: impl Into<String>, value: impl Into<AnswerValue>) {
        self.answers.insert(feature.into(), value.into());
    }

    pub fn remove(&mut self, feature: &str) -> Option<AnswerValue> {
        self.answers.remove(feature)
    }

    pub fn get(&self, feature: &str) -> Option<&AnswerValue> {
        self.answers.get(feature)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.answers.keys().map(String::as_str)
    }
}

impl FromIterator<(String, AnswerValue)> for InputRecord {
    fn from_iter<T: IntoIterator<Item = (String, AnswerValue)>>(iter: T) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_choice_parsing() {
        assert_eq!("Yes".parse::<BinaryChoice>(), Ok(BinaryChoice::Yes));
        assert_eq!(" no ".parse::<BinaryChoice>(), Ok(BinaryChoice::No));
        assert_eq!("Ya".parse::<BinaryChoice>(), Ok(BinaryChoice::Yes));
        assert_eq!("Tidak".parse::<BinaryChoice>(), Ok(BinaryChoice::No));
        assert!("maybe".parse::<BinaryChoice>().is_err());
    }

    #[test]
    fn test_binary_coercion() {
        assert_eq!(AnswerValue::from(BinaryChoice::Yes).to_binary(), Ok(1.0));
        assert_eq!(AnswerValue::from(BinaryChoice::No).to_binary(), Ok(0.0));
        assert_eq!(AnswerValue::Flag(true).to_binary(), Ok(1.0));
        assert_eq!(AnswerValue::Number(0.0).to_binary(), Ok(0.0));
        assert!(AnswerValue::Number(2.0).to_binary().is_err());
    }

    #[test]
    fn test_count_coercion() {
        assert_eq!(AnswerValue::Number(7.0).to_count(), Ok(7.0));
        assert_eq!(AnswerValue::Text("12".to_string()).to_count(), Ok(12.0));
        // out-of-range values pass through untouched
        assert_eq!(AnswerValue::Number(500.0).to_count(), Ok(500.0));
        assert!(AnswerValue::Number(2.5).to_count().is_err());
        assert!(AnswerValue::Number(f64::NAN).to_count().is_err());
        assert!(AnswerValue::Flag(true).to_count().is_err());
    }

    #[test]
    fn test_record_deserialization() {
        let json = r#"{"Stage_fear": "Yes", "Drained_after_socializing": false, "Going_outside": 3}"#;
        let record: InputRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.len(), 3);
        assert_eq!(
            record.get("Stage_fear"),
            Some(&AnswerValue::Text("Yes".to_string()))
        );
        assert_eq!(
            record.get("Drained_after_socializing"),
            Some(&AnswerValue::Flag(false))
        );
        assert_eq!(record.get("Going_outside"), Some(&AnswerValue::Number(3.0)));
    }
}
