//! Artifact loader for the model bundle

use crate::config::ArtifactsConfig;
use crate::error::{Artifact, LoadError};
use crate::features::{FeatureSpec, RangeInfo};
use crate::models::bundle::ModelBundle;
use crate::models::classifier::Classifier;
use crate::models::native::NativeModel;
use crate::models::scaler::FeatureScaler;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{info, warn};

/// Loads the four bundle artifacts from local files
pub struct BundleLoader {
    config: ArtifactsConfig,
}

impl BundleLoader {
    pub fn new(config: ArtifactsConfig) -> Self {
        Self { config }
    }

    /// Load every artifact and assemble the bundle.
    ///
    /// Artifacts are read classifier, scaler, feature names, range info;
    /// the first failure is returned and names its artifact.
    pub fn load(&self) -> Result<ModelBundle, LoadError> {
        info!(dir = %self.config.dir, "Loading model bundle");

        let classifier = self.load_classifier()?;
        let scaler = self.load_scaler()?;
        let features = self.load_features()?;
        let ranges = self.load_ranges()?;

        classifier.check_fit_order(&features)?;

        let bundle = ModelBundle::new(classifier.into_boxed(), scaler, features, ranges)?;
        info!(
            classifier = bundle.classifier().name(),
            features = ?bundle.features().names(),
            fingerprint = %bundle.features().fingerprint(),
            probabilities = bundle.classifier().probability_estimator().is_some(),
            "Model bundle loaded"
        );
        Ok(bundle)
    }

    fn load_classifier(&self) -> Result<LoadedClassifier, LoadError> {
        let path = self.config.classifier_path();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "json" => {
                let model: NativeModel = read_json(Artifact::Classifier, &path)?;
                model
                    .validate()
                    .map_err(|e| LoadError::invalid(Artifact::Classifier, e))?;
                info!(path = %path.display(), model = model.name(), "Native classifier loaded");
                Ok(LoadedClassifier::Native(model))
            }
            "onnx" => self.load_onnx(&path),
            other => Err(LoadError::invalid(
                Artifact::Classifier,
                format!("unsupported classifier format {other:?} ({})", path.display()),
            )),
        }
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, path: &Path) -> Result<LoadedClassifier, LoadError> {
        ensure_exists(Artifact::Classifier, path)?;
        let model = crate::models::onnx::OnnxClassifier::load(path, self.config.onnx_threads)?;
        Ok(LoadedClassifier::Opaque(Box::new(model)))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, path: &Path) -> Result<LoadedClassifier, LoadError> {
        ensure_exists(Artifact::Classifier, path)?;
        Err(LoadError::invalid(
            Artifact::Classifier,
            "ONNX classifiers need the `onnx` feature",
        ))
    }

    fn load_scaler(&self) -> Result<FeatureScaler, LoadError> {
        let path = self.config.scaler_path();
        let scaler: FeatureScaler = read_json(Artifact::Scaler, &path)?;
        info!(path = %path.display(), columns = scaler.width(), "Scaler loaded");
        Ok(scaler)
    }

    fn load_features(&self) -> Result<FeatureSpec, LoadError> {
        let path = self.config.feature_names_path();
        let names: Vec<String> = read_json(Artifact::FeatureNames, &path)?;
        FeatureSpec::new(names)
    }

    fn load_ranges(&self) -> Result<RangeInfo, LoadError> {
        let path = self.config.range_info_path();
        let ranges: RangeInfo = read_json(Artifact::RangeInfo, &path)?;
        info!(path = %path.display(), entries = ranges.len(), "Range info loaded");
        Ok(ranges)
    }
}

/// Classifier as loaded, before it is erased behind the trait
enum LoadedClassifier {
    Native(NativeModel),
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    Opaque(Box<dyn Classifier>),
}

impl LoadedClassifier {
    /// Verify recorded fit-time feature order, when the artifact has one.
    fn check_fit_order(&self, features: &FeatureSpec) -> Result<(), LoadError> {
        let LoadedClassifier::Native(model) = self else {
            warn!("Classifier carries no feature order; trusting the feature list");
            return Ok(());
        };

        let mut verified = false;
        if let Some(names) = model.feature_names() {
            features
                .check_order(names)
                .map_err(|message| LoadError::FeatureOrder {
                    artifact: Artifact::Classifier,
                    message,
                })?;
            verified = true;
        }
        if let Some(fingerprint) = model.feature_fingerprint() {
            let expected = features.fingerprint();
            if !fingerprint.eq_ignore_ascii_case(&expected) {
                return Err(LoadError::FeatureOrder {
                    artifact: Artifact::Classifier,
                    message: format!("fingerprint {fingerprint} does not match {expected}"),
                });
            }
            verified = true;
        }
        if !verified {
            warn!("Classifier carries no feature order; trusting the feature list");
        }
        Ok(())
    }

    fn into_boxed(self) -> Box<dyn Classifier> {
        match self {
            LoadedClassifier::Native(model) => Box::new(model),
            LoadedClassifier::Opaque(model) => model,
        }
    }
}

fn ensure_exists(artifact: Artifact, path: &Path) -> Result<(), LoadError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(LoadError::Missing {
            artifact,
            path: path.to_path_buf(),
        })
    }
}

fn read_json<T: DeserializeOwned>(artifact: Artifact, path: &Path) -> Result<T, LoadError> {
    ensure_exists(artifact, path)?;

    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        artifact,
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&text).map_err(|e| LoadError::Parse {
        artifact,
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, file: &str, value: serde_json::Value) {
        fs::write(dir.path().join(file), value.to_string()).unwrap();
    }

    fn write_artifacts(dir: &TempDir) {
        let features = FeatureSpec::personality();
        write(dir, "feature_names.json", json!(features.names()));
        write(
            dir,
            "scaler.json",
            json!({
                "kind": "standard",
                "mean": [0.5, 0.5, 4.0, 4.0, 3.0, 6.0, 4.0],
                "scale": [0.5, 0.5, 3.0, 2.5, 2.0, 4.0, 3.0],
                "feature_names": features.names(),
            }),
        );
        write(
            dir,
            "range_info.json",
            json!({
                "Time_spent_Alone": {"min": 0, "max": 11, "median": 4},
                "Social_event_attendance": {"min": 0, "max": 10, "median": 3},
                "Going_outside": {"min": 0, "max": 7, "median": 3},
                "Friends_circle_size": {"min": 0, "max": 15, "median": 5},
                "Post_frequency": {"min": 0, "max": 10, "median": 3},
            }),
        );
        write(
            dir,
            "best_model.json",
            json!({
                "kind": "linear",
                "coef": [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0],
                "intercept": 0.0,
                "calibration": {"a": -1.0, "b": 0.0},
                "feature_fingerprint": features.fingerprint(),
            }),
        );
    }

    fn loader(dir: &TempDir) -> BundleLoader {
        let mut config = ArtifactsConfig::in_dir(dir.path().to_string_lossy());
        config.classifier = "best_model.json".to_string();
        BundleLoader::new(config)
    }

    #[test]
    fn test_load_bundle() {
        let dir = TempDir::new().unwrap();
        write_artifacts(&dir);

        let bundle = loader(&dir).load().unwrap();
        assert_eq!(bundle.features(), &FeatureSpec::personality());
        assert_eq!(bundle.scaler().width(), 7);
        assert_eq!(bundle.ranges().len(), 5);
        assert!(bundle.classifier().probability_estimator().is_some());
    }

    #[test]
    fn test_missing_artifact_is_named() {
        for (file, artifact) in [
            ("best_model.json", Artifact::Classifier),
            ("scaler.json", Artifact::Scaler),
            ("feature_names.json", Artifact::FeatureNames),
            ("range_info.json", Artifact::RangeInfo),
        ] {
            let dir = TempDir::new().unwrap();
            write_artifacts(&dir);
            fs::remove_file(dir.path().join(file)).unwrap();

            let err = loader(&dir).load().unwrap_err();
            assert!(matches!(err, LoadError::Missing { .. }), "{file}: {err}");
            assert_eq!(err.artifact(), artifact);
        }
    }

    #[test]
    fn test_corrupt_artifact_is_parse_error() {
        let dir = TempDir::new().unwrap();
        write_artifacts(&dir);
        fs::write(dir.path().join("scaler.json"), "not json").unwrap();

        let err = loader(&dir).load().unwrap_err();
        assert!(matches!(
            err,
            LoadError::Parse {
                artifact: Artifact::Scaler,
                ..
            }
        ));
    }

    #[test]
    fn test_fingerprint_mismatch_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_artifacts(&dir);
        let mut names = FeatureSpec::personality().names().to_vec();
        names.swap(2, 3);
        write(&dir, "feature_names.json", json!(names));
        // keep the scaler consistent so the classifier check is the one that fails
        write(
            &dir,
            "scaler.json",
            json!({"kind": "standard", "mean": vec![0.0; 7], "scale": vec![1.0; 7]}),
        );

        let err = loader(&dir).load().unwrap_err();
        assert!(matches!(
            err,
            LoadError::FeatureOrder {
                artifact: Artifact::Classifier,
                ..
            }
        ));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = TempDir::new().unwrap();
        write_artifacts(&dir);
        let mut config = ArtifactsConfig::in_dir(dir.path().to_string_lossy());
        config.classifier = "best_model.pkl".to_string();

        let err = BundleLoader::new(config).load().unwrap_err();
        assert_eq!(err.artifact(), Artifact::Classifier);
    }
}
