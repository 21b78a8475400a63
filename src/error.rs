//! Error types for bundle loading and inference

use std::fmt;
use std::path::PathBuf;

/// The four artifacts that make up a model bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Classifier,
    Scaler,
    FeatureNames,
    RangeInfo,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::Classifier => "classifier",
            Artifact::Scaler => "scaler",
            Artifact::FeatureNames => "feature names",
            Artifact::RangeInfo => "range info",
        };
        f.write_str(name)
    }
}

/// Fatal startup errors. Any of these means no prediction may be served.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{artifact} artifact not found at {}", path.display())]
    Missing { artifact: Artifact, path: PathBuf },

    #[error("failed to read {artifact} artifact at {}: {source}", path.display())]
    Read {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {artifact} artifact at {}: {message}", path.display())]
    Parse {
        artifact: Artifact,
        path: PathBuf,
        message: String,
    },

    #[error("invalid {artifact} artifact: {message}")]
    Invalid { artifact: Artifact, message: String },

    #[error("{artifact} was fit with a different feature order: {message}")]
    FeatureOrder { artifact: Artifact, message: String },
}

impl LoadError {
    /// The artifact this error is about.
    pub fn artifact(&self) -> Artifact {
        match self {
            LoadError::Missing { artifact, .. }
            | LoadError::Read { artifact, .. }
            | LoadError::Parse { artifact, .. }
            | LoadError::Invalid { artifact, .. }
            | LoadError::FeatureOrder { artifact, .. } => *artifact,
        }
    }

    pub(crate) fn invalid(artifact: Artifact, message: impl Into<String>) -> Self {
        LoadError::Invalid {
            artifact,
            message: message.into(),
        }
    }
}

/// Request-time errors. The request is rejected and nothing is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("input does not match the feature schema (missing: {missing:?}, unexpected: {unexpected:?})")]
    SchemaMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("invalid value for {feature}: {reason}")]
    InvalidValue { feature: String, reason: String },

    #[error("classifier returned unexpected class {0}")]
    UnexpectedLabel(i64),

    #[error("model backend failed: {0}")]
    Model(String),
}

impl InferenceError {
    /// Short machine-readable kind, used in service replies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::SchemaMismatch { .. } => "schema_mismatch",
            InferenceError::InvalidValue { .. } => "invalid_value",
            InferenceError::UnexpectedLabel(_) => "unexpected_label",
            InferenceError::Model(_) => "model_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_names_artifact() {
        let err = LoadError::Missing {
            artifact: Artifact::Scaler,
            path: PathBuf::from("models/scaler.json"),
        };
        assert_eq!(err.artifact(), Artifact::Scaler);
        assert_eq!(
            err.to_string(),
            "scaler artifact not found at models/scaler.json"
        );
    }

    #[test]
    fn test_inference_error_kind() {
        let err = InferenceError::SchemaMismatch {
            missing: vec!["Going_outside".to_string()],
            unexpected: vec![],
        };
        assert_eq!(err.kind(), "schema_mismatch");
        assert!(err.to_string().contains("Going_outside"));
    }
}
