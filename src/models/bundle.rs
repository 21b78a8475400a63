//! The loaded model bundle and its init-once cache

use crate::error::{Artifact, LoadError};
use crate::features::{FeatureSpec, RangeInfo};
use crate::models::classifier::Classifier;
use crate::models::scaler::FeatureScaler;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::info;

/// Classifier, scaler, feature order and range descriptor. Immutable once
/// built and shared read-only between requests.
pub struct ModelBundle {
    classifier: Box<dyn Classifier>,
    scaler: FeatureScaler,
    features: FeatureSpec,
    ranges: RangeInfo,
}

impl ModelBundle {
    /// Assemble a bundle, checking that the parts agree on the number of
    /// columns and that the scaler was fit with the same feature order.
    pub fn new(
        classifier: Box<dyn Classifier>,
        scaler: FeatureScaler,
        features: FeatureSpec,
        ranges: RangeInfo,
    ) -> Result<Self, LoadError> {
        scaler
            .validate()
            .map_err(|e| LoadError::invalid(Artifact::Scaler, e))?;

        if scaler.width() != features.len() {
            return Err(LoadError::FeatureOrder {
                artifact: Artifact::Scaler,
                message: format!(
                    "scaler has {} columns, feature list has {}",
                    scaler.width(),
                    features.len()
                ),
            });
        }

        if let Some(fitted) = scaler.feature_names() {
            features
                .check_order(fitted)
                .map_err(|message| LoadError::FeatureOrder {
                    artifact: Artifact::Scaler,
                    message,
                })?;
        }

        if let Some(n) = classifier.n_features() {
            if n != features.len() {
                return Err(LoadError::FeatureOrder {
                    artifact: Artifact::Classifier,
                    message: format!(
                        "classifier expects {} columns, feature list has {}",
                        n,
                        features.len()
                    ),
                });
            }
        }

        ranges.validate_against(&features)?;

        Ok(Self {
            classifier,
            scaler,
            features,
            ranges,
        })
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    pub fn scaler(&self) -> &FeatureScaler {
        &self.scaler
    }

    pub fn features(&self) -> &FeatureSpec {
        &self.features
    }

    pub fn ranges(&self) -> &RangeInfo {
        &self.ranges
    }
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("classifier", &self.classifier.name())
            .field("scaler", &self.scaler)
            .field("features", &self.features)
            .field("ranges", &self.ranges)
            .finish()
    }
}

/// Compute-once holder for a bundle.
///
/// The first caller of [`BundleCache::get_or_load`] runs the loader while
/// concurrent callers wait; afterwards every caller gets the same `Arc`.
/// Failed loads are not cached.
pub struct BundleCache {
    bundle: OnceLock<Arc<ModelBundle>>,
    init: Mutex<()>,
}

impl BundleCache {
    pub const fn new() -> Self {
        Self {
            bundle: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// Process-wide cache for binaries.
    pub fn global() -> &'static BundleCache {
        static GLOBAL: BundleCache = BundleCache::new();
        &GLOBAL
    }

    /// The cached bundle, if loaded.
    pub fn get(&self) -> Option<Arc<ModelBundle>> {
        self.bundle.get().cloned()
    }

    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<ModelBundle>, LoadError>
    where
        F: FnOnce() -> Result<ModelBundle, LoadError>,
    {
        if let Some(bundle) = self.bundle.get() {
            return Ok(bundle.clone());
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bundle) = self.bundle.get() {
            return Ok(bundle.clone());
        }

        let bundle = Arc::new(load()?);
        info!(
            classifier = bundle.classifier().name(),
            features = bundle.features().len(),
            "Model bundle cached"
        );
        Ok(self.bundle.get_or_init(|| bundle).clone())
    }
}

impl Default for BundleCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::features::{FeatureKind, FeatureRange};
    use crate::models::classifier::test_doubles::SumThreshold;
    use std::collections::BTreeMap;

    pub fn personality_ranges() -> RangeInfo {
        let ranges = FeatureSpec::personality()
            .iter()
            .filter(|(_, kind)| *kind == FeatureKind::Count)
            .map(|(name, _)| {
                (
                    name.to_string(),
                    FeatureRange {
                        min: 0.0,
                        max: 15.0,
                        median: 5.0,
                    },
                )
            })
            .collect::<BTreeMap<_, _>>();
        RangeInfo::new(ranges)
    }

    pub fn identity_scaler(width: usize) -> FeatureScaler {
        FeatureScaler::Standard {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
            feature_names: None,
        }
    }

    /// Bundle around an arbitrary classifier with an identity scaler.
    pub fn bundle_with(classifier: Box<dyn Classifier>) -> ModelBundle {
        let features = FeatureSpec::personality();
        ModelBundle::new(
            classifier,
            identity_scaler(features.len()),
            features,
            personality_ranges(),
        )
        .unwrap()
    }

    pub fn sum_threshold_bundle(probabilities: Option<[f64; 2]>) -> ModelBundle {
        bundle_with(Box::new(SumThreshold {
            threshold: 20.0,
            probabilities,
        }))
    }
}
