//! Service request and reply payloads

use crate::form::SummaryLine;
use crate::types::prediction::PredictionResult;
use crate::types::record::InputRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One questionnaire submission sent to the prediction service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Caller-chosen identifier, generated when absent
    #[serde(default = "new_request_id")]
    pub request_id: String,

    /// Answers keyed by feature identifier
    pub answers: InputRecord,
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl PredictionRequest {
    pub fn new(answers: InputRecord) -> Self {
        Self {
            request_id: new_request_id(),
            answers,
        }
    }
}

/// Outcome carried by a reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok {
        prediction: PredictionResult,
        input_summary: Vec<SummaryLine>,
    },
    Rejected {
        /// Machine-readable error kind
        kind: String,
        error: String,
    },
}

/// Reply published for every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReply {
    pub request_id: String,

    #[serde(flatten)]
    pub status: ReplyStatus,

    /// Reply generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl PredictionReply {
    pub fn ok(
        request_id: String,
        prediction: PredictionResult,
        input_summary: Vec<SummaryLine>,
    ) -> Self {
        Self {
            request_id,
            status: ReplyStatus::Ok {
                prediction,
                input_summary,
            },
            timestamp: Utc::now(),
        }
    }

    pub fn rejected(request_id: String, kind: &str, error: impl Into<String>) -> Self {
        Self {
            request_id,
            status: ReplyStatus::Rejected {
                kind: kind.to_string(),
                error: error.into(),
            },
            timestamp: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, ReplyStatus::Ok { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::prediction::Personality;

    #[test]
    fn test_request_id_generated_when_absent() {
        let json = r#"{"answers": {"Going_outside": 4}}"#;
        let request: PredictionRequest = serde_json::from_str(json).unwrap();

        assert!(!request.request_id.is_empty());
        assert_eq!(request.answers.len(), 1);
    }

    #[test]
    fn test_reply_serialization() {
        let ok = PredictionReply::ok(
            "req_1".to_string(),
            PredictionResult::fallback(Personality::Extrovert),
            vec![],
        );
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["prediction"]["label"], "Extrovert");

        let rejected = PredictionReply::rejected("req_2".to_string(), "schema_mismatch", "missing");
        let json = serde_json::to_string(&rejected).unwrap();
        let back: PredictionReply = serde_json::from_str(&json).unwrap();
        assert!(!back.is_ok());
        assert_eq!(back.request_id, "req_2");
    }
}
