//! ONNX Runtime backed classifier

use crate::error::{Artifact, InferenceError, LoadError};
use crate::models::classifier::{Classifier, ProbabilityEstimator};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// Classifier exported to ONNX (e.g. a scikit-learn pipeline converted
/// with skl2onnx), with a label output and optionally a probability output.
pub struct OnnxClassifier {
    /// Model name
    name: String,
    /// ONNX Runtime session; running needs exclusive access
    session: RwLock<Session>,
    /// Input name for the model
    input_name: String,
    /// Output holding the predicted class id
    label_output: String,
    /// Output holding class probabilities, when the model exports one
    probability_output: Option<String>,
}

impl OnnxClassifier {
    /// Load a model from file with the given intra-op thread count.
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self, LoadError> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = onnx_threads, "Loading ONNX classifier");

        let session = Session::builder()
            .map_err(|e| session_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| session_error(path, e))?
            .with_intra_threads(onnx_threads)
            .map_err(|e| session_error(path, e))?
            .commit_from_file(path)
            .map_err(|e| session_error(path, e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| LoadError::invalid(Artifact::Classifier, "model has no inputs"))?;

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| LoadError::invalid(Artifact::Classifier, "model has no outputs"))?;

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx".to_string());

        info!(
            model = %name,
            input = %input_name,
            label_output = %label_output,
            probability_output = ?probability_output,
            "ONNX classifier loaded"
        );

        Ok(Self {
            name,
            session: RwLock::new(session),
            input_name,
            label_output,
            probability_output,
        })
    }

    /// Run the session on one sample and hand the outputs to `extract`.
    fn run<T>(
        &self,
        features: &[f32],
        extract: impl FnOnce(&SessionOutputs) -> Result<T, InferenceError>,
    ) -> Result<T, InferenceError> {
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| InferenceError::Model(format!("failed to create input tensor: {e}")))?;

        let mut session = self
            .session
            .write()
            .map_err(|e| InferenceError::Model(format!("lock error: {e}")))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        extract(&outputs)
    }

    fn extract_label(&self, outputs: &SessionOutputs) -> Result<i64, InferenceError> {
        let output = outputs.get(&self.label_output).ok_or_else(|| {
            InferenceError::Model(format!("missing output {}", self.label_output))
        })?;

        if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
            if let Some(&label) = data.first() {
                return Ok(label);
            }
        }

        // some exporters emit float labels
        if let Ok((_, data)) = output.try_extract_tensor::<f32>() {
            if let Some(&label) = data.first() {
                return Ok(label.round() as i64);
            }
        }

        Err(InferenceError::Model(format!(
            "could not read class id from output {}",
            self.label_output
        )))
    }

    /// Probabilities indexed by class id. Handles both tensor outputs and
    /// the seq(map(int64, float)) layout produced by zipmap exports.
    fn extract_probabilities(
        &self,
        outputs: &SessionOutputs,
        output_name: &str,
    ) -> Result<[f64; 2], InferenceError> {
        let output = outputs
            .get(output_name)
            .ok_or_else(|| InferenceError::Model(format!("missing output {output_name}")))?;

        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let n_classes = dims.last().copied().unwrap_or(0);
            if n_classes != 2 || data.len() < 2 {
                return Err(InferenceError::Model(format!(
                    "expected two class probabilities, got shape {dims:?}"
                )));
            }
            debug!(model = %self.name, "Extracted probabilities from tensor");
            return Ok([f64::from(data[0]), f64::from(data[1])]);
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return self.extract_from_sequence_map(output);
        }

        Err(InferenceError::Model(format!(
            "unsupported probability output type for {output_name}"
        )))
    }

    fn extract_from_sequence_map(&self, output: &DynValue) -> Result<[f64; 2], InferenceError> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| InferenceError::Model(format!("failed to downcast to sequence: {e}")))?;

        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        // batch size is always one
        let map_value = maps
            .first()
            .ok_or_else(|| InferenceError::Model("empty probability sequence".to_string()))?;

        let kv_pairs = map_value
            .try_extract_key_values::<i64, f32>()
            .map_err(|e| InferenceError::Model(e.to_string()))?;

        let mut by_class = [f64::NAN; 2];
        for (class_id, prob) in &kv_pairs {
            match *class_id {
                0 | 1 => by_class[*class_id as usize] = f64::from(*prob),
                other => {
                    return Err(InferenceError::Model(format!(
                        "probability map has unexpected class {other}"
                    )))
                }
            }
        }

        debug!(model = %self.name, "Extracted probabilities from seq(map)");
        Ok(by_class)
    }
}

fn session_error(path: &Path, e: impl std::fmt::Display) -> LoadError {
    LoadError::Parse {
        artifact: Artifact::Classifier,
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &[f32]) -> Result<i64, InferenceError> {
        self.run(features, |outputs| self.extract_label(outputs))
    }

    fn probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        if self.probability_output.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl ProbabilityEstimator for OnnxClassifier {
    fn predict_proba(&self, features: &[f32]) -> Result<[f64; 2], InferenceError> {
        let Some(output_name) = self.probability_output.as_deref() else {
            warn!(model = %self.name, "Probabilities requested from a label-only model");
            return Err(InferenceError::Model("model has no probability output".to_string()));
        };
        self.run(features, |outputs| {
            self.extract_probabilities(outputs, output_name)
        })
    }
}
