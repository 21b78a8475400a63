//! Type definitions for the personality predictor

pub mod prediction;
pub mod record;
pub mod request;

pub use prediction::{ClassProbabilities, Personality, PredictionResult, ProbabilitySource};
pub use record::{AnswerValue, BinaryChoice, InputRecord};
pub use request::{PredictionReply, PredictionRequest, ReplyStatus};
