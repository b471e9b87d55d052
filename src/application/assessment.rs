//! Assessment service: turns one form submission into a risk assessment.
//!
//! This service coordinates:
//! - Field-set validation against the configured schema
//! - Encoding into the artifact's column order
//! - Probability or class prediction
//! - The decision policy
//! - Feature importance and the risk factor profile

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    Assessment, DecisionPolicy, EncodedRecord, FeatureSchema, FeatureWeight, ImportanceReport,
    PatientRecord, RawInput, RiskAssessment, RiskFactorProfile, SchemaMismatch,
    IMPORTANCE_UNAVAILABLE,
};
use crate::ports::{ArtifactError, ClassifierArtifact};
use crate::HeartRiskError;

/// Risk assessment over a shared, read-only classifier artifact.
///
/// Holds no mutable state; the same input always yields the same
/// `RiskAssessment`.
pub struct AssessmentService<A>
where
    A: ClassifierArtifact + ?Sized,
{
    artifact: Arc<A>,
    schema: FeatureSchema,
}

impl<A> AssessmentService<A>
where
    A: ClassifierArtifact + ?Sized,
{
    /// Bind an artifact to a schema.
    ///
    /// # Errors
    /// Returns `SchemaMismatch` if the artifact was trained on different
    /// columns, or `ArtifactContract` if it cannot predict at all.
    pub fn new(artifact: Arc<A>, schema: FeatureSchema) -> crate::Result<Self> {
        schema.check_columns(artifact.feature_names())?;

        let caps = artifact.capabilities();
        if !caps.probability && !caps.class_prediction {
            return Err(ArtifactError::NoPredictInterface.into());
        }

        tracing::info!(
            artifact = artifact.name(),
            schema = %schema,
            capabilities = %caps,
            "Assessment service ready"
        );

        Ok(Self { artifact, schema })
    }

    #[must_use]
    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    #[must_use]
    pub fn artifact(&self) -> &A {
        &self.artifact
    }

    /// The policy every assessment from this service will use.
    #[must_use]
    pub fn policy(&self) -> DecisionPolicy {
        if self.artifact.capabilities().probability {
            DecisionPolicy::medical()
        } else {
            DecisionPolicy::NativeClass
        }
    }

    /// Assess one raw submission.
    ///
    /// # Errors
    /// `InputEncoding` for unknown fields or bad values, `SchemaMismatch` for
    /// a field set that differs from the schema, `ArtifactContract` if the
    /// artifact misbehaves. The artifact is not called unless encoding
    /// succeeds.
    pub fn assess(&self, input: &RawInput) -> crate::Result<Assessment> {
        let fields = input.features()?;
        self.schema.check_field_set(fields)?;

        let record = PatientRecord::from_raw(input)?;
        self.assess_record(&record)
    }

    /// Assess an already parsed record.
    ///
    /// # Errors
    /// Same as [`Self::assess`].
    pub fn assess_record(&self, record: &PatientRecord) -> crate::Result<Assessment> {
        self.schema.check_field_set(record.present_features())?;

        let encoded = record.encode(self.schema)?;
        let risk = self.classify(&encoded)?;

        tracing::info!(
            label = ?risk.label,
            policy = %risk.policy,
            features = encoded.len(),
            "Assessment complete"
        );

        Ok(Assessment {
            risk,
            importance: self.feature_importance(),
            profile: RiskFactorProfile::from_record(record, self.schema),
            record: encoded,
            assessed_at: Utc::now(),
        })
    }

    /// Run the artifact on an encoded record and apply the decision policy.
    ///
    /// # Errors
    /// `SchemaMismatch::Width` if the record does not fit the artifact;
    /// `ArtifactContract` if the artifact returns something out of contract.
    pub fn classify(&self, encoded: &EncodedRecord) -> crate::Result<RiskAssessment> {
        let expected = self.artifact.feature_names().len();
        if encoded.len() != expected {
            return Err(SchemaMismatch::Width {
                encoded: encoded.len(),
                expected,
            }
            .into());
        }

        let caps = self.artifact.capabilities();
        if caps.probability {
            let proba = self.artifact.predict_proba(encoded.as_slice())?;
            let positive = positive_probability(&proba)?;
            tracing::debug!(probability = positive, "Probability interface used");
            Ok(RiskAssessment::from_probability(positive))
        } else if caps.class_prediction {
            let class = self.artifact.predict(encoded.as_slice())?;
            tracing::debug!("Class-prediction interface used");
            match class {
                0 => Ok(RiskAssessment::from_class(false)),
                1 => Ok(RiskAssessment::from_class(true)),
                other => Err(ArtifactError::InvalidClass(other).into()),
            }
        } else {
            Err(ArtifactError::NoPredictInterface.into())
        }
    }

    /// Coefficients aligned with the schema, or the reason they are missing.
    #[must_use]
    pub fn feature_importance(&self) -> ImportanceReport {
        let Some(coefficients) = self.artifact.coefficients() else {
            return self.importance_unavailable("artifact exposes no coefficients");
        };

        if coefficients.len() != self.schema.width() {
            return self.importance_unavailable("coefficient count does not match the schema");
        }

        ImportanceReport::Available {
            weights: self
                .schema
                .features()
                .iter()
                .zip(coefficients)
                .map(|(&feature, &coefficient)| FeatureWeight {
                    feature,
                    coefficient,
                })
                .collect(),
        }
    }

    fn importance_unavailable(&self, reason: &str) -> ImportanceReport {
        tracing::warn!(
            code = IMPORTANCE_UNAVAILABLE,
            artifact = self.artifact.name(),
            "Feature importance unavailable: {reason}"
        );
        ImportanceReport::Unavailable {
            reason: reason.to_string(),
        }
    }
}

fn positive_probability(proba: &[f64]) -> Result<f64, HeartRiskError> {
    let [negative, positive] = proba else {
        return Err(ArtifactError::ClassCount(proba.len()).into());
    };
    for p in [*negative, *positive] {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(ArtifactError::InvalidProbability(p).into());
        }
    }
    Ok(*positive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Feature, RiskLabel};
    use crate::ports::Capabilities;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Artifact returning canned outputs and counting calls.
    struct FixtureArtifact {
        columns: Vec<String>,
        probability: Option<f64>,
        class: Option<i64>,
        coefficients: Option<Vec<f64>>,
        calls: AtomicUsize,
    }

    impl FixtureArtifact {
        fn new(schema: FeatureSchema) -> Self {
            Self {
                columns: schema.features().iter().map(|f| f.name().to_string()).collect(),
                probability: None,
                class: None,
                coefficients: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn with_probability(mut self, p: f64) -> Self {
            self.probability = Some(p);
            self
        }

        fn with_class(mut self, class: i64) -> Self {
            self.class = Some(class);
            self
        }

        fn with_coefficients(mut self, coefficients: Vec<f64>) -> Self {
            self.coefficients = Some(coefficients);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ClassifierArtifact for FixtureArtifact {
        fn name(&self) -> &str {
            "fixture"
        }

        fn feature_names(&self) -> &[String] {
            &self.columns
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities {
                probability: self.probability.is_some(),
                class_prediction: self.class.is_some(),
                coefficients: self.coefficients.is_some(),
            }
        }

        fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>, ArtifactError> {
            assert_eq!(row.len(), self.columns.len());
            self.calls.fetch_add(1, Ordering::SeqCst);
            let p = self.probability.ok_or(ArtifactError::Unsupported("probability"))?;
            Ok(vec![1.0 - p, p])
        }

        fn predict(&self, row: &[f64]) -> Result<i64, ArtifactError> {
            assert_eq!(row.len(), self.columns.len());
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.class.ok_or(ArtifactError::Unsupported("class"))
        }

        fn coefficients(&self) -> Option<&[f64]> {
            self.coefficients.as_deref()
        }
    }

    fn reduced_input(exang: &str) -> RawInput {
        RawInput::new()
            .with("age", 45)
            .with("sex", "Male")
            .with("cp", "Type 2: Non-Anginal")
            .with("chol", 250)
            .with("thalch", 150)
            .with("exang", exang)
    }

    fn full_input() -> RawInput {
        reduced_input("No")
            .with("trestbps", 130)
            .with("fbs", "Yes")
            .with("restecg", "ST-T Abnormality")
            .with("oldpeak", 1.5)
            .with("slope", "Flat")
            .with("ca", 2)
            .with("thal", "Reversible Defect")
    }

    fn service(artifact: FixtureArtifact, schema: FeatureSchema) -> AssessmentService<FixtureArtifact> {
        AssessmentService::new(Arc::new(artifact), schema).expect("Should bind artifact")
    }

    #[test]
    fn test_probability_above_threshold_is_high_risk() {
        let svc = service(
            FixtureArtifact::new(FeatureSchema::Reduced).with_probability(0.41),
            FeatureSchema::Reduced,
        );
        let result = svc.assess(&reduced_input("No")).expect("Should assess");

        assert_eq!(result.record.values, vec![45.0, 1.0, 2.0, 250.0, 150.0, 0.0]);
        assert_eq!(result.risk.label, RiskLabel::HighRisk);
        assert_eq!(result.risk.probability, Some(0.41));
        assert_eq!(result.risk.policy, DecisionPolicy::medical());
    }

    #[test]
    fn test_probability_below_threshold_is_low_risk() {
        let svc = service(
            FixtureArtifact::new(FeatureSchema::Reduced).with_probability(0.39),
            FeatureSchema::Reduced,
        );
        let result = svc.assess(&reduced_input("Yes")).expect("Should assess");

        assert_eq!(result.record.values[5], 1.0);
        assert_eq!(result.risk.label, RiskLabel::LowRisk);
        assert_eq!(result.risk.probability, Some(0.39));
    }

    #[test]
    fn test_class_only_artifact_uses_native_class() {
        let svc = service(
            FixtureArtifact::new(FeatureSchema::Reduced).with_class(1),
            FeatureSchema::Reduced,
        );
        assert_eq!(svc.policy(), DecisionPolicy::NativeClass);

        let result = svc.assess(&reduced_input("No")).expect("Should assess");
        assert_eq!(result.risk.label, RiskLabel::HighRisk);
        assert_eq!(result.risk.probability, None);
        assert_eq!(result.risk.policy, DecisionPolicy::NativeClass);
    }

    #[test]
    fn test_probability_interface_is_preferred() {
        let artifact = FixtureArtifact::new(FeatureSchema::Reduced)
            .with_probability(0.2)
            .with_class(1);
        let svc = service(artifact, FeatureSchema::Reduced);

        let result = svc.assess(&reduced_input("No")).expect("Should assess");
        assert_eq!(result.risk.label, RiskLabel::LowRisk);
        assert_eq!(result.risk.probability, Some(0.2));
    }

    #[test]
    fn test_assessment_is_idempotent() {
        let svc = service(
            FixtureArtifact::new(FeatureSchema::Reduced).with_probability(0.55),
            FeatureSchema::Reduced,
        );
        let first = svc.assess(&reduced_input("No")).expect("Should assess");
        let second = svc.assess(&reduced_input("No")).expect("Should assess");

        assert_eq!(first.risk, second.risk);
        assert_eq!(first.record, second.record);
    }

    #[test]
    fn test_full_schema_matches_fixture_columns() {
        let svc = service(
            FixtureArtifact::new(FeatureSchema::Full).with_probability(0.7),
            FeatureSchema::Full,
        );
        let result = svc.assess(&full_input()).expect("Should assess");

        assert_eq!(result.record.len(), 13);
        assert_eq!(result.record.columns, Feature::ALL.to_vec());
        assert_eq!(
            result.record.values,
            vec![45.0, 1.0, 2.0, 130.0, 250.0, 1.0, 1.0, 150.0, 0.0, 1.5, 1.0, 2.0, 3.0]
        );
        assert_eq!(result.profile.bars.len(), 13);
    }

    #[test]
    fn test_artifact_trained_on_other_schema_is_rejected() {
        let err = AssessmentService::new(
            Arc::new(FixtureArtifact::new(FeatureSchema::Full).with_probability(0.5)),
            FeatureSchema::Reduced,
        )
        .err()
        .expect("Should reject");
        assert_eq!(err.code(), "SCHEMA_MISMATCH_ERROR");
    }

    #[test]
    fn test_extra_field_is_schema_mismatch_and_model_not_called() {
        let artifact = Arc::new(FixtureArtifact::new(FeatureSchema::Reduced).with_probability(0.5));
        let svc = AssessmentService::new(Arc::clone(&artifact), FeatureSchema::Reduced)
            .expect("Should bind");

        let err = svc
            .assess(&reduced_input("No").with("trestbps", 130))
            .unwrap_err();
        assert!(matches!(
            err,
            HeartRiskError::SchemaMismatch(SchemaMismatch::FieldSet { .. })
        ));

        let err = svc
            .assess(&RawInput::new().with("age", 45))
            .unwrap_err();
        assert_eq!(err.code(), "SCHEMA_MISMATCH_ERROR");
        assert_eq!(artifact.calls(), 0);
    }

    #[test]
    fn test_bad_values_are_encoding_errors_and_model_not_called() {
        let artifact = Arc::new(FixtureArtifact::new(FeatureSchema::Reduced).with_probability(0.5));
        let svc = AssessmentService::new(Arc::clone(&artifact), FeatureSchema::Reduced)
            .expect("Should bind");

        let unknown = svc.assess(&reduced_input("No").with("smoker", "Yes")).unwrap_err();
        assert_eq!(unknown.code(), "INPUT_ENCODING_ERROR");

        let bad_label = svc.assess(&reduced_input("Maybe")).unwrap_err();
        assert_eq!(bad_label.code(), "INPUT_ENCODING_ERROR");

        let out_of_range = svc.assess(&reduced_input("No").with("age", 130)).unwrap_err();
        assert_eq!(out_of_range.code(), "INPUT_ENCODING_ERROR");

        assert_eq!(artifact.calls(), 0);
    }

    #[test]
    fn test_artifact_without_predict_interface_is_rejected() {
        let err = AssessmentService::new(
            Arc::new(FixtureArtifact::new(FeatureSchema::Reduced)),
            FeatureSchema::Reduced,
        )
        .err()
        .expect("Should reject");
        assert!(matches!(
            err,
            HeartRiskError::ArtifactContract(ArtifactError::NoPredictInterface)
        ));
    }

    #[test]
    fn test_out_of_contract_outputs() {
        let svc = service(
            FixtureArtifact::new(FeatureSchema::Reduced).with_probability(1.5),
            FeatureSchema::Reduced,
        );
        let err = svc.assess(&reduced_input("No")).unwrap_err();
        assert_eq!(err.code(), "ARTIFACT_CONTRACT_ERROR");

        let svc = service(
            FixtureArtifact::new(FeatureSchema::Reduced).with_class(2),
            FeatureSchema::Reduced,
        );
        let err = svc.assess(&reduced_input("No")).unwrap_err();
        assert!(matches!(
            err,
            HeartRiskError::ArtifactContract(ArtifactError::InvalidClass(2))
        ));
    }

    #[test]
    fn test_missing_coefficients_degrade_importance_only() {
        let svc = service(
            FixtureArtifact::new(FeatureSchema::Reduced).with_probability(0.6),
            FeatureSchema::Reduced,
        );
        let result = svc.assess(&reduced_input("No")).expect("Should assess");

        assert!(result.importance.is_degraded());
        assert_eq!(result.risk.label, RiskLabel::HighRisk);
    }

    #[test]
    fn test_importance_follows_schema_order() {
        let svc = service(
            FixtureArtifact::new(FeatureSchema::Reduced)
                .with_probability(0.6)
                .with_coefficients(vec![0.1, 0.2, 0.3, -0.4, -0.5, 0.6]),
            FeatureSchema::Reduced,
        );
        let report = svc.feature_importance();

        assert!(!report.is_degraded());
        let weights = report.weights();
        assert_eq!(weights.len(), 6);
        assert_eq!(weights[0].feature, Feature::Age);
        assert_eq!(weights[4].feature, Feature::Thalch);
        assert_eq!(weights[4].coefficient, -0.5);
    }

    #[test]
    fn test_misaligned_coefficients_degrade_importance_only() {
        let svc = service(
            FixtureArtifact::new(FeatureSchema::Reduced)
                .with_probability(0.6)
                .with_coefficients(vec![0.1, 0.2, 0.3, -0.4, -0.5]),
            FeatureSchema::Reduced,
        );
        let result = svc.assess(&reduced_input("No")).expect("Should assess");

        assert!(result.importance.is_degraded());
        assert!(result.importance.weights().is_empty());
        assert_eq!(result.risk.label, RiskLabel::HighRisk);
    }
}
