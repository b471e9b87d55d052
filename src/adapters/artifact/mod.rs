//! JSON model artifact adapter.
//!
//! Loads a pre-trained binary classifier exported as JSON and implements
//! [`ClassifierArtifact`] over it. Three model kinds are understood:
//!
//! - `logistic_regression`: probabilities, classes and coefficients
//! - `linear_svm`: classes and coefficients, no probabilities
//! - `decision_tree`: probabilities (leaf class frequencies) and classes
//!
//! Linear models may carry a standard scaler that is applied to the encoded
//! row before the dot product, mirroring the preprocessing used in training.

pub mod manifest;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::Feature;
use crate::ports::{ArtifactError, ArtifactMetadata, Capabilities, ClassifierArtifact};

pub use manifest::{VerificationPolicy, VerificationStatus};

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// File looked up when the configured model path is a directory.
pub const DEFAULT_ARTIFACT_FILE: &str = "model.json";

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("unsupported artifact format_version {0} (expected 1)")]
    UnsupportedVersion(u32),

    #[error("invalid artifact: {0}")]
    Invalid(String),

    #[error("artifact verification failed: {0}")]
    Verification(String),
}

/// On-disk artifact document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDocument {
    pub format_version: u32,
    pub name: String,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub metadata: ArtifactMetadata,
    pub model: ModelSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelSpec {
    LogisticRegression(LinearModel),
    LinearSvm(LinearModel),
    DecisionTree(DecisionTree),
}

impl ModelSpec {
    fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "logistic_regression",
            Self::LinearSvm(_) => "linear_svm",
            Self::DecisionTree(_) => "decision_tree",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl LinearModel {
    fn decision(&self, row: &[f64]) -> f64 {
        let standardized = row.iter().enumerate().map(|(i, &x)| match &self.scaler {
            Some(s) => (x - s.mean[i]) / s.scale[i],
            None => x,
        });

        self.intercept
            + standardized
                .zip(&self.coefficients)
                .map(|(x, w)| x * w)
                .sum::<f64>()
    }

    fn validate(&self, width: usize) -> Result<(), LoadError> {
        if self.coefficients.len() != width {
            return Err(LoadError::Invalid(format!(
                "{} coefficients for {width} features",
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(LoadError::Invalid("non-finite coefficient".into()));
        }
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != width || scaler.scale.len() != width {
                return Err(LoadError::Invalid(format!(
                    "scaler length does not match {width} features"
                )));
            }
            if scaler.mean.iter().any(|m| !m.is_finite())
                || scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0)
            {
                return Err(LoadError::Invalid(
                    "scaler values must be finite with non-zero scale".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Flattened binary decision tree; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Rows with `row[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Training sample counts for `[negative, positive]`.
    Leaf { class_counts: [f64; 2] },
}

impl DecisionTree {
    fn leaf(&self, row: &[f64]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if row[*feature] <= *threshold { *left } else { *right },
                TreeNode::Leaf { class_counts } => return *class_counts,
            }
        }
    }

    /// Children must point forward so traversal always terminates.
    fn validate(&self, width: usize) -> Result<(), LoadError> {
        if self.nodes.is_empty() {
            return Err(LoadError::Invalid("decision tree has no nodes".into()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= width {
                        return Err(LoadError::Invalid(format!(
                            "node {i} splits on feature {feature} of {width}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(LoadError::Invalid(format!("node {i} has non-finite threshold")));
                    }
                    for child in [left, right] {
                        if *child <= i || *child >= self.nodes.len() {
                            return Err(LoadError::Invalid(format!(
                                "node {i} has invalid child index {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { class_counts } => {
                    let total: f64 = class_counts.iter().sum();
                    if class_counts.iter().any(|c| !c.is_finite() || *c < 0.0) || total <= 0.0 {
                        return Err(LoadError::Invalid(format!(
                            "leaf {i} has invalid class counts {class_counts:?}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// A validated, read-only model artifact.
#[derive(Debug, Clone)]
pub struct JsonArtifact {
    document: ArtifactDocument,
    verification: VerificationStatus,
    source: Option<PathBuf>,
}

impl JsonArtifact {
    /// Load and verify the artifact at `path`.
    ///
    /// A directory resolves to `model.json` inside it. The file is read once
    /// and verification runs on those bytes before they are parsed.
    ///
    /// # Errors
    /// Returns `LoadError` if the file is unreadable, unverified or invalid.
    pub fn load(path: &Path, policy: &VerificationPolicy) -> Result<Self, LoadError> {
        let path = resolve_path(path);

        // Read once: the verified bytes are the parsed bytes.
        let bytes = fs::read(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let verification = manifest::verify(&path, &bytes, policy)?;
        let document: ArtifactDocument = serde_json::from_slice(&bytes)?;

        let mut artifact = Self::from_document(document)?;
        artifact.verification = verification;
        artifact.source = Some(path.clone());

        tracing::info!(
            artifact = %artifact.document.name,
            kind = artifact.document.model.kind(),
            features = artifact.document.feature_names.len(),
            verification = %verification,
            path = %path.display(),
            "Model artifact loaded"
        );

        Ok(artifact)
    }

    /// Build from an in-memory document. The result counts as unsigned.
    ///
    /// # Errors
    /// Returns `LoadError` if the document fails validation.
    pub fn from_document(document: ArtifactDocument) -> Result<Self, LoadError> {
        validate(&document)?;
        Ok(Self {
            document,
            verification: VerificationStatus::Unsigned,
            source: None,
        })
    }

    /// # Errors
    /// Returns `LoadError` if the JSON is malformed or invalid.
    pub fn from_json_str(json: &str) -> Result<Self, LoadError> {
        Self::from_document(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn document(&self) -> &ArtifactDocument {
        &self.document
    }

    #[must_use]
    pub fn verification(&self) -> VerificationStatus {
        self.verification
    }

    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.document.model.kind()
    }

    fn check_width(&self, row: &[f64]) -> Result<(), ArtifactError> {
        let expected = self.document.feature_names.len();
        if row.len() == expected {
            Ok(())
        } else {
            Err(ArtifactError::InputWidth {
                expected,
                got: row.len(),
            })
        }
    }
}

/// Resolve a configured model path to the artifact file.
#[must_use]
pub fn resolve_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(DEFAULT_ARTIFACT_FILE)
    } else {
        path.to_path_buf()
    }
}

fn validate(document: &ArtifactDocument) -> Result<(), LoadError> {
    if document.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(LoadError::UnsupportedVersion(document.format_version));
    }

    let width = document.feature_names.len();
    if width == 0 {
        return Err(LoadError::Invalid("artifact has no feature names".into()));
    }

    let mut seen = HashSet::new();
    for name in &document.feature_names {
        name.parse::<Feature>()
            .map_err(|e| LoadError::Invalid(e.to_string()))?;
        if !seen.insert(name.as_str()) {
            return Err(LoadError::Invalid(format!("duplicate feature name '{name}'")));
        }
    }

    match &document.model {
        ModelSpec::LogisticRegression(m) | ModelSpec::LinearSvm(m) => m.validate(width),
        ModelSpec::DecisionTree(t) => t.validate(width),
    }
}

/// Numerically stable logistic function.
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl ClassifierArtifact for JsonArtifact {
    fn name(&self) -> &str {
        &self.document.name
    }

    fn feature_names(&self) -> &[String] {
        &self.document.feature_names
    }

    fn capabilities(&self) -> Capabilities {
        match &self.document.model {
            ModelSpec::LogisticRegression(_) => Capabilities {
                probability: true,
                class_prediction: true,
                coefficients: true,
            },
            ModelSpec::LinearSvm(_) => Capabilities {
                probability: false,
                class_prediction: true,
                coefficients: true,
            },
            ModelSpec::DecisionTree(_) => Capabilities {
                probability: true,
                class_prediction: true,
                coefficients: false,
            },
        }
    }

    fn metadata(&self) -> ArtifactMetadata {
        self.document.metadata.clone()
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ArtifactError> {
        self.check_width(row)?;
        match &self.document.model {
            ModelSpec::LogisticRegression(m) => {
                let p = sigmoid(m.decision(row));
                Ok(vec![1.0 - p, p])
            }
            ModelSpec::DecisionTree(t) => {
                let [neg, pos] = t.leaf(row);
                let total = neg + pos;
                Ok(vec![neg / total, pos / total])
            }
            ModelSpec::LinearSvm(_) => Err(ArtifactError::Unsupported("probability estimation")),
        }
    }

    fn predict(&self, row: &[f64]) -> Result<i64, ArtifactError> {
        self.check_width(row)?;
        let positive = match &self.document.model {
            ModelSpec::LogisticRegression(m) | ModelSpec::LinearSvm(m) => m.decision(row) > 0.0,
            ModelSpec::DecisionTree(t) => {
                let [neg, pos] = t.leaf(row);
                pos > neg
            }
        };
        Ok(i64::from(positive))
    }

    fn coefficients(&self) -> Option<&[f64]> {
        match &self.document.model {
            ModelSpec::LogisticRegression(m) | ModelSpec::LinearSvm(m) => Some(&m.coefficients),
            ModelSpec::DecisionTree(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    const REDUCED: [&str; 6] = ["age", "sex", "cp", "chol", "thalch", "exang"];

    fn linear(kind: &str, coefficients: Vec<f64>, intercept: f64) -> serde_json::Value {
        json!({
            "format_version": 1,
            "name": "test",
            "feature_names": REDUCED,
            "model": { "type": kind, "coefficients": coefficients, "intercept": intercept }
        })
    }

    fn artifact(value: serde_json::Value) -> Result<JsonArtifact, LoadError> {
        JsonArtifact::from_document(serde_json::from_value(value).expect("Should deserialize"))
    }

    #[test]
    fn test_logistic_regression_probability() {
        let a = artifact(linear("logistic_regression", vec![0.0; 6], 0.0)).expect("Should load");
        let p = a.predict_proba(&[45.0, 1.0, 2.0, 250.0, 150.0, 0.0]).expect("proba");
        assert_eq!(p, vec![0.5, 0.5]);
        // p = 0.5 exactly sits on the boundary and is the negative class.
        assert_eq!(a.predict(&[45.0, 1.0, 2.0, 250.0, 150.0, 0.0]), Ok(0));

        let a = artifact(linear("logistic_regression", vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0], -1.0))
            .expect("Should load");
        let p = a.predict_proba(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]).expect("proba");
        assert!((p[1] - 0.5).abs() < 1e-12);
        assert!((p[0] + p[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaler_is_applied() {
        let mut doc = linear("logistic_regression", vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 0.0);
        doc["model"]["scaler"] = json!({
            "mean": [50.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            "scale": [10.0, 1.0, 1.0, 1.0, 1.0, 1.0]
        });
        let a = artifact(doc).expect("Should load");

        let p = a.predict_proba(&[50.0, 0.0, 0.0, 0.0, 0.0, 0.0]).expect("proba");
        assert!((p[1] - 0.5).abs() < 1e-12);
        let p = a.predict_proba(&[60.0, 0.0, 0.0, 0.0, 0.0, 0.0]).expect("proba");
        assert!((p[1] - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_linear_svm_has_no_probability() {
        let a = artifact(linear("linear_svm", vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0], -0.5))
            .expect("Should load");
        assert!(!a.capabilities().probability);
        assert!(a.capabilities().class_prediction);
        assert!(a.predict_proba(&[0.0; 6]).is_err());
        assert_eq!(a.predict(&[0.0, 1.0, 0.0, 0.0, 0.0, 0.0]), Ok(1));
        assert_eq!(a.predict(&[0.0; 6]), Ok(0));
    }

    #[test]
    fn test_decision_tree_traversal() {
        let a = artifact(json!({
            "format_version": 1,
            "name": "tree",
            "feature_names": REDUCED,
            "model": { "type": "decision_tree", "nodes": [
                { "kind": "split", "feature": 4, "threshold": 120.0, "left": 1, "right": 2 },
                { "kind": "leaf", "class_counts": [1.0, 3.0] },
                { "kind": "leaf", "class_counts": [9.0, 1.0] }
            ]}
        }))
        .expect("Should load");

        assert_eq!(a.coefficients(), None);
        assert_eq!(a.predict_proba(&[0.0, 0.0, 0.0, 0.0, 120.0, 0.0]), Ok(vec![0.25, 0.75]));
        assert_eq!(a.predict(&[0.0, 0.0, 0.0, 0.0, 120.0, 0.0]), Ok(1));
        assert_eq!(a.predict(&[0.0, 0.0, 0.0, 0.0, 121.0, 0.0]), Ok(0));
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        assert!(matches!(
            artifact(linear("logistic_regression", vec![0.0; 5], 0.0)),
            Err(LoadError::Invalid(_))
        ));

        let mut doc = linear("logistic_regression", vec![0.0; 6], 0.0);
        doc["format_version"] = json!(2);
        assert!(matches!(artifact(doc), Err(LoadError::UnsupportedVersion(2))));

        let mut doc = linear("logistic_regression", vec![0.0; 6], 0.0);
        doc["feature_names"] = json!(["age", "sex", "cp", "chol", "thalch", "smoker"]);
        assert!(matches!(artifact(doc), Err(LoadError::Invalid(_))));

        let looping = json!({
            "format_version": 1,
            "name": "tree",
            "feature_names": REDUCED,
            "model": { "type": "decision_tree", "nodes": [
                { "kind": "split", "feature": 0, "threshold": 1.0, "left": 0, "right": 1 },
                { "kind": "leaf", "class_counts": [1.0, 1.0] }
            ]}
        });
        assert!(matches!(artifact(looping), Err(LoadError::Invalid(_))));
    }

    #[test]
    fn test_wrong_row_width() {
        let a = artifact(linear("logistic_regression", vec![0.0; 6], 0.0)).expect("Should load");
        assert_eq!(
            a.predict_proba(&[0.0; 13]),
            Err(ArtifactError::InputWidth { expected: 6, got: 13 })
        );
    }

    #[test]
    fn test_load_directory_resolves_model_json() {
        let dir = tempdir().expect("tempdir");
        let doc = linear("logistic_regression", vec![0.1; 6], 0.0);
        fs::write(
            dir.path().join(DEFAULT_ARTIFACT_FILE),
            serde_json::to_vec(&doc).expect("json"),
        )
        .expect("write");

        let a = JsonArtifact::load(dir.path(), &VerificationPolicy::allow_unsigned())
            .expect("Should load");
        assert_eq!(a.verification(), VerificationStatus::Unsigned);
        assert_eq!(a.source(), Some(dir.path().join("model.json").as_path()));

        assert!(matches!(
            JsonArtifact::load(dir.path(), &VerificationPolicy::default()),
            Err(LoadError::Verification(_))
        ));
    }

    #[test]
    fn test_bundled_model_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("models");
        let a = JsonArtifact::load(&path, &VerificationPolicy::allow_unsigned())
            .expect("Should load bundled model");
        assert_eq!(a.feature_names(), REDUCED);
        assert!(a.capabilities().probability);
    }
}
