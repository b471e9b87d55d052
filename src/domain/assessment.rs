//! Risk assessment result types.
//!
//! Represents the output of one inference: the positive-class probability
//! (when the artifact provides one) and the binary risk label derived from it.

use serde::{Deserialize, Serialize};

use super::importance::ImportanceReport;
use super::patient::EncodedRecord;
use super::profile::RiskFactorProfile;

/// Probability above which a patient is labelled high risk.
///
/// Deliberately below the 0.50 class boundary to favour recall.
pub const MEDICAL_THRESHOLD: f64 = 0.40;

/// Binary risk classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLabel {
    LowRisk,
    HighRisk,
}

impl RiskLabel {
    /// Short guidance shown under the banner.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::LowRisk => "Continue healthy lifestyle",
            Self::HighRisk => "Seek immediate medical attention",
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LowRisk => write!(f, "LOW RISK"),
            Self::HighRisk => write!(f, "HIGH RISK"),
        }
    }
}

/// How the label was derived from the artifact output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// Positive-class probability compared against a fixed threshold.
    ProbabilityThreshold { threshold: f64 },
    /// The artifact's own class prediction (0.50 boundary), taken as-is.
    NativeClass,
}

impl DecisionPolicy {
    #[must_use]
    pub fn medical() -> Self {
        Self::ProbabilityThreshold {
            threshold: MEDICAL_THRESHOLD,
        }
    }
}

impl std::fmt::Display for DecisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProbabilityThreshold { threshold } => {
                write!(f, "{:.0}% probability threshold", threshold * 100.0)
            }
            Self::NativeClass => write!(f, "model class boundary (50%)"),
        }
    }
}

/// Result of one inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Positive-class probability; absent when only class prediction was used.
    pub probability: Option<f64>,

    pub label: RiskLabel,

    pub policy: DecisionPolicy,
}

impl RiskAssessment {
    /// Classify a probability with the medical threshold.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        Self::with_threshold(probability, MEDICAL_THRESHOLD)
    }

    /// Classify a probability: strictly above `threshold` is high risk.
    #[must_use]
    pub fn with_threshold(probability: f64, threshold: f64) -> Self {
        let label = if probability > threshold {
            RiskLabel::HighRisk
        } else {
            RiskLabel::LowRisk
        };

        Self {
            probability: Some(probability),
            label,
            policy: DecisionPolicy::ProbabilityThreshold { threshold },
        }
    }

    /// Take a positive/negative class prediction as-is.
    #[must_use]
    pub fn from_class(positive: bool) -> Self {
        Self {
            probability: None,
            label: if positive {
                RiskLabel::HighRisk
            } else {
                RiskLabel::LowRisk
            },
            policy: DecisionPolicy::NativeClass,
        }
    }

    #[must_use]
    pub fn is_high_risk(&self) -> bool {
        self.label == RiskLabel::HighRisk
    }
}

/// Everything produced for one submission, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub risk: RiskAssessment,

    /// The exact record passed to the artifact.
    pub record: EncodedRecord,

    pub importance: ImportanceReport,

    pub profile: RiskFactorProfile,

    pub assessed_at: chrono::DateTime<chrono::Utc>,
}
