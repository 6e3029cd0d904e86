//! Unsupervised anomaly scoring with a pretrained model artifact.
//!
//! Models are trained offline and loaded read-only. The engine shares one
//! model across all workers of a session; scoring never mutates it.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::errors::{AuditError, Result};
use crate::core::featureset::FeatureVector;

/// Euler–Mascheroni constant, used by the harmonic number approximation
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// A pretrained scorer producing values in [0, 1]
pub trait AnomalyModel: Send + Sync {
    /// Version label of the artifact, part of the determinism contract
    fn version(&self) -> &str;

    /// Names of the features the model reads
    fn feature_names(&self) -> &[String];

    /// Anomaly score for one feature vector, 1.0 being most anomalous
    fn score(&self, features: &FeatureVector) -> f64;
}

/// One node of an isolation tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Internal split; values below `threshold` go left
    Split {
        /// Index into the model's feature names
        feature: usize,
        /// Split value
        threshold: f64,
        /// Index of the left child
        left: usize,
        /// Index of the right child
        right: usize,
    },
    /// Terminal node with the number of training samples that reached it
    Leaf {
        /// Training samples isolated in this leaf
        size: u64,
    },
}

/// Flattened isolation tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    /// Nodes, children always after their parent
    pub nodes: Vec<TreeNode>,
}

impl IsolationTree {
    fn path_length(&self, values: &[f64]) -> f64 {
        let mut index = 0;
        let mut depth = 0.0;
        // children always follow their parent, so this terminates within nodes.len() steps
        while let Some(node) = self.nodes.get(index) {
            match node {
                TreeNode::Leaf { size } => return depth + average_path_length(*size),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = values.get(*feature).copied().unwrap_or(0.0);
                    index = if value < *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
        depth
    }

    fn validate(&self, tree_index: usize, feature_count: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(AuditError::validation_field(
                format!("isolation tree {tree_index} has no nodes"),
                "trees",
            ));
        }
        for (position, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                let children_valid = [*left, *right]
                    .iter()
                    .all(|child| *child > position && *child < self.nodes.len());
                if !children_valid {
                    return Err(AuditError::validation_field(
                        format!(
                            "isolation tree {tree_index} node {position} has invalid children ({left}, {right})"
                        ),
                        "trees",
                    ));
                }
                if *feature >= feature_count {
                    return Err(AuditError::validation_field(
                        format!(
                            "isolation tree {tree_index} node {position} references feature {feature} of {feature_count}"
                        ),
                        "trees",
                    ));
                }
                if !threshold.is_finite() {
                    return Err(AuditError::validation_field(
                        format!("isolation tree {tree_index} node {position} has a non-finite threshold"),
                        "trees",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Average path length of an unsuccessful binary search tree lookup, `c(n)`
pub fn average_path_length(n: u64) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Isolation forest trained offline and shipped as a JSON artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForestModel {
    /// Artifact version
    pub version: String,
    /// Feature names addressed by split `feature` indices
    pub feature_names: Vec<String>,
    /// Subsample size each tree was grown on
    pub sample_size: u64,
    /// The ensemble
    pub trees: Vec<IsolationTree>,
}

impl IsolationForestModel {
    /// Parse and validate an artifact
    pub fn from_json_str(content: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(content)?;
        model.validate()?;
        Ok(model)
    }

    /// Load and validate an artifact from disk
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AuditError::io(
                format!("Failed to read anomaly model: {}", path.display()),
                e,
            )
        })?;
        let model = Self::from_json_str(&content)?;
        debug!(
            version = %model.version,
            trees = model.trees.len(),
            "Loaded isolation forest model"
        );
        Ok(model)
    }

    /// Structural checks run on load
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(AuditError::validation_field(
                "model version must not be empty",
                "version",
            ));
        }
        if self.feature_names.is_empty() {
            return Err(AuditError::validation_field(
                "model must declare at least one feature",
                "feature_names",
            ));
        }
        if self.sample_size < 2 {
            return Err(AuditError::validation_field(
                format!("sample_size must be at least 2, got {}", self.sample_size),
                "sample_size",
            ));
        }
        if self.trees.is_empty() {
            return Err(AuditError::validation_field(
                "model must contain at least one tree",
                "trees",
            ));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index, self.feature_names.len())?;
        }
        Ok(())
    }

    /// Mean path length across the ensemble
    fn expected_path_length(&self, values: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|tree| tree.path_length(values)).sum();
        total / self.trees.len() as f64
    }
}

impl AnomalyModel for IsolationForestModel {
    fn version(&self) -> &str {
        &self.version
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn score(&self, features: &FeatureVector) -> f64 {
        let values = features.ordered_values(&self.feature_names);
        let normalizer = average_path_length(self.sample_size);
        if normalizer <= 0.0 || self.trees.is_empty() {
            return 0.0;
        }
        let score = 2f64.powf(-self.expected_path_length(&values) / normalizer);
        score.clamp(0.0, 1.0)
    }
}

/// Session-facing wrapper that may or may not hold a model
#[derive(Clone, Default)]
pub struct AnomalyScorer {
    model: Option<Arc<dyn AnomalyModel>>,
}

impl std::fmt::Debug for AnomalyScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnomalyScorer")
            .field("model_version", &self.model_version())
            .finish()
    }
}

impl AnomalyScorer {
    /// Scorer backed by a shared model
    pub fn new(model: Arc<dyn AnomalyModel>) -> Self {
        Self { model: Some(model) }
    }

    /// Scorer with no model; every call fails with `ModelUnavailable`
    pub fn unavailable() -> Self {
        Self { model: None }
    }

    /// Build from an optional model
    pub fn from_option(model: Option<Arc<dyn AnomalyModel>>) -> Self {
        Self { model }
    }

    /// Whether a model is loaded
    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    /// Version of the loaded model
    pub fn model_version(&self) -> Option<&str> {
        self.model.as_deref().map(|model| model.version())
    }

    /// Confirm the model only reads features the builder produces
    pub fn check_features(&self, available: &[String]) -> Result<()> {
        let model = self.model()?;
        let missing: Vec<&str> = model
            .feature_names()
            .iter()
            .filter(|name| !available.contains(name))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AuditError::model_unavailable(format!(
                "model {} expects unknown features: {}",
                model.version(),
                missing.join(", ")
            )))
        }
    }

    /// Score one feature vector
    pub fn score(&self, features: &FeatureVector) -> Result<f64> {
        let score = self.model()?.score(features);
        if score.is_finite() {
            Ok(score.clamp(0.0, 1.0))
        } else {
            warn!(claim_id = %features.claim_id, "Anomaly model returned a non-finite score");
            Ok(0.0)
        }
    }

    fn model(&self) -> Result<&dyn AnomalyModel> {
        self.model
            .as_deref()
            .ok_or_else(|| AuditError::model_unavailable("no anomaly model loaded"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::featureset::PRICE_DEVIATION;
    use approx::assert_relative_eq;

    fn forest_json() -> String {
        serde_json::json!({
            "version": "iforest-test-1",
            "feature_names": [PRICE_DEVIATION],
            "sample_size": 256,
            "trees": [{
                "nodes": [
                    {"split": {"feature": 0, "threshold": 3.0, "left": 1, "right": 4}},
                    {"split": {"feature": 0, "threshold": -3.0, "left": 2, "right": 3}},
                    {"leaf": {"size": 1}},
                    {"leaf": {"size": 200}},
                    {"leaf": {"size": 1}}
                ]
            }]
        })
        .to_string()
    }

    fn vector(price_deviation: f64) -> FeatureVector {
        let mut vector = FeatureVector::new("claim");
        vector.add_feature(PRICE_DEVIATION, price_deviation);
        vector
    }

    #[test]
    fn average_path_length_matches_known_values() {
        assert_relative_eq!(average_path_length(1), 0.0);
        assert_relative_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > 10.0 && average_path_length(256) < 11.0);
    }

    #[test]
    fn isolated_points_score_higher() {
        let model = IsolationForestModel::from_json_str(&forest_json()).unwrap();
        let outlier = model.score(&vector(10.0));
        let typical = model.score(&vector(0.0));
        assert!(outlier > 0.9, "outlier score {outlier}");
        assert!(typical < 0.5, "typical score {typical}");
        assert!((0.0..=1.0).contains(&typical));
    }

    #[test]
    fn scoring_is_deterministic() {
        let model = IsolationForestModel::from_json_str(&forest_json()).unwrap();
        assert_eq!(model.score(&vector(1.5)), model.score(&vector(1.5)));
    }

    #[test]
    fn malformed_artifacts_are_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(&forest_json()).unwrap();
        value["trees"][0]["nodes"][0]["split"]["left"] = serde_json::json!(0);
        assert!(IsolationForestModel::from_json_str(&value.to_string()).is_err());

        let mut value: serde_json::Value = serde_json::from_str(&forest_json()).unwrap();
        value["trees"][0]["nodes"][0]["split"]["feature"] = serde_json::json!(3);
        assert!(IsolationForestModel::from_json_str(&value.to_string()).is_err());

        let mut value: serde_json::Value = serde_json::from_str(&forest_json()).unwrap();
        value["trees"] = serde_json::json!([]);
        assert!(IsolationForestModel::from_json_str(&value.to_string()).is_err());
    }

    #[test]
    fn missing_model_is_reported_as_unavailable() {
        let scorer = AnomalyScorer::unavailable();
        assert!(!scorer.is_available());
        assert!(matches!(
            scorer.score(&vector(0.0)),
            Err(AuditError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn feature_check_flags_unknown_features() {
        let model = IsolationForestModel::from_json_str(&forest_json()).unwrap();
        let scorer = AnomalyScorer::new(Arc::new(model));
        assert!(scorer.check_features(&[PRICE_DEVIATION.to_string()]).is_ok());
        assert!(matches!(
            scorer.check_features(&["units".to_string()]),
            Err(AuditError::ModelUnavailable { .. })
        ));
        assert_eq!(scorer.model_version(), Some("iforest-test-1"));
    }

    #[test]
    fn model_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, forest_json()).unwrap();
        let model = IsolationForestModel::from_json_file(&path).unwrap();
        assert_eq!(model.trees.len(), 1);
    }
}
