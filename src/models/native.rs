//! Classifiers stored as plain JSON and evaluated in-process.
//!
//! Two model families are supported: a decision-tree ensemble (the
//! reference model is a random forest) and a linear decision function with
//! optional Platt calibration. An uncalibrated linear model has no
//! probability capability.

use crate::error::InferenceError;
use crate::models::classifier::{Classifier, ProbabilityEstimator};
use serde::{Deserialize, Serialize};

fn default_classes() -> Vec<i64> {
    vec![0, 1]
}

/// A JSON classifier artifact, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NativeModel {
    Forest(ForestClassifier),
    Linear(LinearClassifier),
}

impl NativeModel {
    pub fn validate(&self) -> Result<(), String> {
        match self {
            NativeModel::Forest(forest) => forest.validate(),
            NativeModel::Linear(linear) => linear.validate(),
        }
    }

    /// Column order the model was fit with, if recorded.
    pub fn feature_names(&self) -> Option<&[String]> {
        match self {
            NativeModel::Forest(forest) => forest.feature_names.as_deref(),
            NativeModel::Linear(linear) => linear.feature_names.as_deref(),
        }
    }

    /// Fingerprint of the fit-time feature order, if recorded.
    pub fn feature_fingerprint(&self) -> Option<&str> {
        match self {
            NativeModel::Forest(forest) => forest.feature_fingerprint.as_deref(),
            NativeModel::Linear(linear) => linear.feature_fingerprint.as_deref(),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            NativeModel::Forest(forest) => forest,
            NativeModel::Linear(linear) => linear,
        }
    }
}

impl Classifier for NativeModel {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn n_features(&self) -> Option<usize> {
        self.inner().n_features()
    }

    fn predict(&self, features: &[f32]) -> Result<i64, InferenceError> {
        self.inner().predict(features)
    }

    fn probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        self.inner().probability_estimator()
    }
}

fn check_width(expected: usize, features: &[f32]) -> Result<(), InferenceError> {
    if features.len() != expected {
        return Err(InferenceError::Model(format!(
            "model expects {} features, got {}",
            expected,
            features.len()
        )));
    }
    Ok(())
}

/// Node of a fitted decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go `left` when `x[feature] <= threshold`, else `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class weights (counts or fractions) in `classes` order
    Leaf { value: Vec<f64> },
}

/// Fitted decision tree; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn leaf(&self, features: &[f32]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if f64::from(features[*feature]) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {idx} splits on feature {feature}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    // children after parents, so every walk terminates
                    for child in [left, right] {
                        if *child <= idx || *child >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child {child}"));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {idx} has {} values for {n_classes} classes",
                            value.len()
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(format!("leaf {idx} has a negative or non-finite weight"));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(format!("leaf {idx} is empty"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Averaging ensemble of decision trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestClassifier {
    /// Class ids in leaf-value order
    #[serde(default = "default_classes")]
    pub classes: Vec<i64>,
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub feature_fingerprint: Option<String>,
}

impl ForestClassifier {
    pub fn validate(&self) -> Result<(), String> {
        validate_classes(&self.classes)?;
        if self.n_features == 0 {
            return Err("n_features must be positive".to_string());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.n_features {
                return Err(format!(
                    "{} feature names for {} features",
                    names.len(),
                    self.n_features
                ));
            }
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }

    /// Mean of the normalized leaf distributions, in `classes` order.
    fn class_distribution(&self, features: &[f32]) -> Vec<f64> {
        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = tree.leaf(features);
            let weight: f64 = leaf.iter().sum();
            for (total, v) in totals.iter_mut().zip(leaf) {
                *total += v / weight;
            }
        }
        let n_trees = self.trees.len() as f64;
        totals.iter_mut().for_each(|t| *t /= n_trees);
        totals
    }
}

fn validate_classes(classes: &[i64]) -> Result<(), String> {
    let mut sorted = classes.to_vec();
    sorted.sort_unstable();
    if sorted != [0, 1] {
        return Err(format!("classes must be 0 and 1, got {classes:?}"));
    }
    Ok(())
}

impl Classifier for ForestClassifier {
    fn name(&self) -> &str {
        "forest"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn predict(&self, features: &[f32]) -> Result<i64, InferenceError> {
        check_width(self.n_features, features)?;
        let distribution = self.class_distribution(features);

        // first maximum wins on ties
        let mut best = 0;
        for (i, p) in distribution.iter().enumerate() {
            if *p > distribution[best] {
                best = i;
            }
        }
        Ok(self.classes[best])
    }

    fn probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        Some(self)
    }
}

impl ProbabilityEstimator for ForestClassifier {
    fn predict_proba(&self, features: &[f32]) -> Result<[f64; 2], InferenceError> {
        check_width(self.n_features, features)?;
        let distribution = self.class_distribution(features);

        let mut by_class = [0.0; 2];
        for (class, p) in self.classes.iter().zip(distribution) {
            by_class[*class as usize] = p;
        }
        Ok(by_class)
    }
}

/// Sigmoid calibration `p(1) = 1 / (1 + exp(a * d + b))` of a decision value `d`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlattCalibration {
    pub a: f64,
    pub b: f64,
}

/// Linear decision function `d = coef · x + intercept`; class 1 when `d > 0`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub coef: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub calibration: Option<PlattCalibration>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub feature_fingerprint: Option<String>,
}

impl LinearClassifier {
    pub fn validate(&self) -> Result<(), String> {
        if self.coef.is_empty() {
            return Err("linear model has no coefficients".to_string());
        }
        if self.coef.iter().any(|c| !c.is_finite()) || !self.intercept.is_finite() {
            return Err("linear model parameters must be finite".to_string());
        }
        if let Some(cal) = &self.calibration {
            if !(cal.a.is_finite() && cal.b.is_finite()) {
                return Err("calibration parameters must be finite".to_string());
            }
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.coef.len() {
                return Err(format!(
                    "{} feature names for {} coefficients",
                    names.len(),
                    self.coef.len()
                ));
            }
        }
        Ok(())
    }

    pub fn decision_function(&self, features: &[f32]) -> f64 {
        self.coef
            .iter()
            .zip(features)
            .map(|(w, x)| w * f64::from(*x))
            .sum::<f64>()
            + self.intercept
    }
}

impl Classifier for LinearClassifier {
    fn name(&self) -> &str {
        "linear"
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.coef.len())
    }

    fn predict(&self, features: &[f32]) -> Result<i64, InferenceError> {
        check_width(self.coef.len(), features)?;
        Ok(if self.decision_function(features) > 0.0 {
            1
        } else {
            0
        })
    }

    fn probability_estimator(&self) -> Option<&dyn ProbabilityEstimator> {
        self.calibration.map(|_| self as &dyn ProbabilityEstimator)
    }
}

impl ProbabilityEstimator for LinearClassifier {
    fn predict_proba(&self, features: &[f32]) -> Result<[f64; 2], InferenceError> {
        check_width(self.coef.len(), features)?;
        let cal = self.calibration.ok_or_else(|| {
            InferenceError::Model("linear model is not calibrated".to_string())
        })?;
        let decision = self.decision_function(features);
        let p1 = 1.0 / (1.0 + (cal.a * decision + cal.b).exp());
        Ok([1.0 - p1, p1])
    }
}
