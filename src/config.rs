//! Configuration management for the personality predictor

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file the binaries read when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Location of the four model artifacts
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory containing the artifacts
    #[serde(default = "default_artifacts_dir")]
    pub dir: String,
    /// Classifier file; `.onnx` or `.json`
    #[serde(default = "default_classifier")]
    pub classifier: String,
    /// Fitted scaler (JSON)
    #[serde(default = "default_scaler")]
    pub scaler: String,
    /// Ordered feature names (JSON array)
    #[serde(default = "default_feature_names")]
    pub feature_names: String,
    /// Per-feature min/max/median (JSON object)
    #[serde(default = "default_range_info")]
    pub range_info: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_artifacts_dir() -> String {
    "models".to_string()
}

fn default_classifier() -> String {
    "best_model.onnx".to_string()
}

fn default_scaler() -> String {
    "scaler.json".to_string()
}

fn default_feature_names() -> String {
    "feature_names.json".to_string()
}

fn default_range_info() -> String {
    "range_info.json".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

impl ArtifactsConfig {
    /// Artifacts with default file names inside `dir`.
    pub fn in_dir(dir: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    fn resolve(&self, file: &str) -> PathBuf {
        Path::new(&self.dir).join(file)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.resolve(&self.classifier)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.resolve(&self.scaler)
    }

    pub fn feature_names_path(&self) -> PathBuf {
        self.resolve(&self.feature_names)
    }

    pub fn range_info_path(&self) -> PathBuf {
        self.resolve(&self.range_info)
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
            classifier: default_classifier(),
            scaler: default_scaler(),
            feature_names: default_feature_names(),
            range_info: default_range_info(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming prediction requests
    pub request_subject: String,
    /// Subject for replies to requests without a reply inbox
    pub response_subject: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            request_subject: "personality.predict".to_string(),
            response_subject: "personality.results".to_string(),
        }
    }
}

/// Request processing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum requests processed concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

fn default_metrics_interval() -> u64 {
    30
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            metrics_interval_secs: default_metrics_interval(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_from_path(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactsConfig::default(),
            nats: NatsConfig::default(),
            pipeline: PipelineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.nats.request_subject, "personality.predict");
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(
            config.artifacts.classifier_path(),
            PathBuf::from("models/best_model.onnx")
        );
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[artifacts]
dir = "/srv/personality"
classifier = "forest.json"

[pipeline]
workers = 8
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(
            config.artifacts.classifier_path(),
            PathBuf::from("/srv/personality/forest.json")
        );
        assert_eq!(config.artifacts.scaler, "scaler.json");
        assert_eq!(config.pipeline.workers, 8);
        assert_eq!(config.pipeline.metrics_interval_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_or_default_without_file() {
        let config = AppConfig::load_or_default("does/not/exist.toml").unwrap();
        assert_eq!(config.artifacts.dir, "models");
    }
}
