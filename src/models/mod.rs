//! Model bundle, classifiers and the inference pipeline

pub mod bundle;
pub mod classifier;
pub mod inference;
pub mod loader;
pub mod native;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod scaler;

pub use bundle::{BundleCache, ModelBundle};
pub use classifier::{Classifier, ProbabilityEstimator};
pub use inference::InferencePipeline;
pub use loader::BundleLoader;
pub use native::NativeModel;
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
pub use scaler::FeatureScaler;
