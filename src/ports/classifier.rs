//! Classifier port: Trait for the pre-trained model artifact.
//!
//! The artifact is opaque beyond this capability surface. Implementations
//! advertise which interfaces they provide; the application layer never calls
//! an interface that is not advertised.

use serde::{Deserialize, Serialize};

/// The artifact broke its side of the contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact exposes neither a probability nor a class-prediction interface")]
    NoPredictInterface,

    #[error("artifact does not support {0}")]
    Unsupported(&'static str),

    #[error("artifact expects {expected} input values, got {got}")]
    InputWidth { expected: usize, got: usize },

    #[error("artifact returned {0} class probabilities, expected 2")]
    ClassCount(usize),

    #[error("artifact returned an invalid probability: {0}")]
    InvalidProbability(f64),

    #[error("artifact returned an invalid class label: {0}")]
    InvalidClass(i64),
}

/// Interfaces an artifact provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub probability: bool,
    pub class_prediction: bool,
    pub coefficients: bool,
}

impl std::fmt::Display for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.probability {
            parts.push("predict_proba");
        }
        if self.class_prediction {
            parts.push("predict");
        }
        if self.coefficients {
            parts.push("coefficients");
        }
        if parts.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Descriptive information shipped alongside the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub positive_recall: Option<f64>,
    #[serde(default)]
    pub training_samples: Option<u32>,
}

/// Trait for a loaded binary classifier.
///
/// Row slices passed in are already encoded, in the order returned by
/// `feature_names()`. Implementations are read-only after construction and
/// shared across threads.
pub trait ClassifierArtifact: Send + Sync {
    /// Artifact identifier for display and logs.
    fn name(&self) -> &str;

    /// Column names the model was trained on, in order.
    fn feature_names(&self) -> &[String];

    fn capabilities(&self) -> Capabilities;

    fn metadata(&self) -> ArtifactMetadata {
        ArtifactMetadata::default()
    }

    /// Per-class probabilities for one row: `[negative, positive]`.
    ///
    /// # Errors
    /// `ArtifactError::Unsupported` unless `capabilities().probability`.
    fn predict_proba(&self, _row: &[f64]) -> Result<Vec<f64>, ArtifactError> {
        Err(ArtifactError::Unsupported("probability estimation"))
    }

    /// Predicted class for one row (0 or 1).
    ///
    /// # Errors
    /// `ArtifactError::Unsupported` unless `capabilities().class_prediction`.
    fn predict(&self, _row: &[f64]) -> Result<i64, ArtifactError> {
        Err(ArtifactError::Unsupported("class prediction"))
    }

    /// Linear coefficients aligned with `feature_names()`, if the model has them.
    fn coefficients(&self) -> Option<&[f64]> {
        None
    }
}
