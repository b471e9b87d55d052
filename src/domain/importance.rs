//! Model coefficient display data.

use serde::{Deserialize, Serialize};

use super::feature::Feature;

/// Code reported when the artifact has no coefficient vector.
pub const IMPORTANCE_UNAVAILABLE: &str = "FEATURE_IMPORTANCE_UNAVAILABLE";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature: Feature,
    pub coefficient: f64,
}

/// Feature importance, or the reason it could not be produced.
///
/// `Unavailable` is a degraded result: the risk assessment itself succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportanceReport {
    Available { weights: Vec<FeatureWeight> },
    Unavailable { reason: String },
}

impl ImportanceReport {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    #[must_use]
    pub fn weights(&self) -> &[FeatureWeight] {
        match self {
            Self::Available { weights } => weights,
            Self::Unavailable { .. } => &[],
        }
    }

    /// Weights sorted by absolute size, largest first, each paired with its
    /// magnitude relative to the largest (0.0-1.0) for bar rendering.
    #[must_use]
    pub fn ranked(&self) -> Vec<(FeatureWeight, f64)> {
        let mut weights = self.weights().to_vec();
        weights.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));

        let max = weights
            .first()
            .map(|w| w.coefficient.abs())
            .unwrap_or(0.0);

        weights
            .into_iter()
            .map(|w| {
                let rel = if max > 0.0 { w.coefficient.abs() / max } else { 0.0 };
                (w, rel)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranked_orders_by_magnitude() {
        let report = ImportanceReport::Available {
            weights: vec![
                FeatureWeight { feature: Feature::Age, coefficient: 0.2 },
                FeatureWeight { feature: Feature::Exang, coefficient: -0.8 },
                FeatureWeight { feature: Feature::Sex, coefficient: 0.4 },
            ],
        };

        let ranked = report.ranked();
        assert_eq!(ranked[0].0.feature, Feature::Exang);
        assert!((ranked[0].1 - 1.0).abs() < f64::EPSILON);
        assert!((ranked[2].1 - 0.25).abs() < 1e-12);
        assert!(!report.is_degraded());
    }

    #[test]
    fn test_unavailable_is_degraded() {
        let report = ImportanceReport::Unavailable {
            reason: "decision tree".into(),
        };
        assert!(report.is_degraded());
        assert!(report.ranked().is_empty());
    }
}
