//! Personality Predictor Library
//!
//! Collects questionnaire answers, runs them through a pre-trained
//! introvert/extrovert classifier and reports the predicted label with a
//! confidence score and probability breakdown.

pub mod config;
pub mod consumer;
pub mod error;
pub mod features;
pub mod form;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod report;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{Artifact, InferenceError, LoadError};
pub use features::{FeatureKind, FeatureRange, FeatureSpec, RangeInfo};
pub use form::QuestionnaireForm;
pub use models::{BundleCache, BundleLoader, InferencePipeline, ModelBundle};
pub use producer::ReplyProducer;
pub use report::render_report;
pub use service::PredictionService;
pub use types::{
    AnswerValue, BinaryChoice, InputRecord, Personality, PredictionReply, PredictionRequest,
    PredictionResult,
};
