//! Request handling for the prediction service

use crate::error::LoadError;
use crate::form::QuestionnaireForm;
use crate::metrics::PredictionMetrics;
use crate::models::inference::InferencePipeline;
use crate::types::request::{PredictionReply, PredictionRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Error kind reported for payloads that are not a valid request
pub const MALFORMED_REQUEST: &str = "malformed_request";

/// Request id used when the payload could not be decoded
pub const UNKNOWN_REQUEST_ID: &str = "unknown";

/// Turns request payloads into replies and records metrics
pub struct PredictionService {
    pipeline: InferencePipeline,
    form: QuestionnaireForm,
    metrics: Arc<PredictionMetrics>,
}

impl PredictionService {
    pub fn new(
        pipeline: InferencePipeline,
        metrics: Arc<PredictionMetrics>,
    ) -> Result<Self, LoadError> {
        let form = QuestionnaireForm::from_bundle(pipeline.bundle())?;
        Ok(Self {
            pipeline,
            form,
            metrics,
        })
    }

    pub fn metrics(&self) -> &Arc<PredictionMetrics> {
        &self.metrics
    }

    /// Decode one request payload, run the pipeline and build the reply.
    pub fn handle(&self, payload: &[u8]) -> PredictionReply {
        let start_time = Instant::now();

        let request = match serde_json::from_slice::<PredictionRequest>(payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Failed to deserialize request");
                self.metrics
                    .record_rejection(start_time.elapsed(), MALFORMED_REQUEST);
                return PredictionReply::rejected(
                    UNKNOWN_REQUEST_ID.to_string(),
                    MALFORMED_REQUEST,
                    e.to_string(),
                );
            }
        };

        match self.pipeline.predict(&request.answers) {
            Ok(prediction) => {
                let processing_time = start_time.elapsed();
                self.metrics.record_prediction(processing_time, &prediction);

                debug!(
                    request_id = %request.request_id,
                    label = %prediction.label,
                    confidence = prediction.confidence_score,
                    processing_time_us = processing_time.as_micros(),
                    "Prediction served"
                );

                let summary = self.form.summary(&request.answers);
                PredictionReply::ok(request.request_id, prediction, summary)
            }
            Err(e) => {
                self.metrics.record_rejection(start_time.elapsed(), e.kind());
                warn!(
                    request_id = %request.request_id,
                    error = %e,
                    "Request rejected"
                );
                PredictionReply::rejected(request.request_id, e.kind(), e.to_string())
            }
        }
    }
}
