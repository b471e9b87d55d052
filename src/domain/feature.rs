//! Feature catalogue and the column schemas an artifact can be trained on.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::labels::{
    CategoricalLabel, ChestPainType, RestingEcg, Sex, StSlope, Thalassemia, YesNo,
};

/// One clinical input column. Names match the training data columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Age,
    Sex,
    Cp,
    Trestbps,
    Chol,
    Fbs,
    Restecg,
    Thalch,
    Exang,
    Oldpeak,
    Slope,
    Ca,
    Thal,
}

/// Shape of the raw value a feature accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureKind {
    Integer { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Categorical { labels: &'static [&'static str] },
}

impl Feature {
    /// All features in full-schema column order.
    pub const ALL: [Feature; 13] = [
        Feature::Age,
        Feature::Sex,
        Feature::Cp,
        Feature::Trestbps,
        Feature::Chol,
        Feature::Fbs,
        Feature::Restecg,
        Feature::Thalch,
        Feature::Exang,
        Feature::Oldpeak,
        Feature::Slope,
        Feature::Ca,
        Feature::Thal,
    ];

    /// Column name as used by the artifact and the raw input map.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Sex => "sex",
            Self::Cp => "cp",
            Self::Trestbps => "trestbps",
            Self::Chol => "chol",
            Self::Fbs => "fbs",
            Self::Restecg => "restecg",
            Self::Thalch => "thalch",
            Self::Exang => "exang",
            Self::Oldpeak => "oldpeak",
            Self::Slope => "slope",
            Self::Ca => "ca",
            Self::Thal => "thal",
        }
    }

    /// Human-readable label for forms and tables.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Age => "Age",
            Self::Sex => "Gender",
            Self::Cp => "Chest Pain",
            Self::Trestbps => "Resting BP",
            Self::Chol => "Cholesterol",
            Self::Fbs => "Fasting Blood Sugar",
            Self::Restecg => "Resting ECG",
            Self::Thalch => "Max Heart Rate",
            Self::Exang => "Exercise Angina",
            Self::Oldpeak => "ST Depression",
            Self::Slope => "ST Slope",
            Self::Ca => "Major Vessels",
            Self::Thal => "Thalassemia",
        }
    }

    #[must_use]
    pub fn kind(self) -> FeatureKind {
        match self {
            Self::Age => FeatureKind::Integer { min: 20, max: 80 },
            Self::Trestbps => FeatureKind::Integer { min: 90, max: 200 },
            Self::Chol => FeatureKind::Integer { min: 100, max: 600 },
            Self::Thalch => FeatureKind::Integer { min: 60, max: 220 },
            Self::Ca => FeatureKind::Integer { min: 0, max: 3 },
            Self::Oldpeak => FeatureKind::Float { min: 0.0, max: 6.0 },
            Self::Sex => FeatureKind::Categorical { labels: Sex::LABELS },
            Self::Cp => FeatureKind::Categorical { labels: ChestPainType::LABELS },
            Self::Fbs | Self::Exang => FeatureKind::Categorical { labels: YesNo::LABELS },
            Self::Restecg => FeatureKind::Categorical { labels: RestingEcg::LABELS },
            Self::Slope => FeatureKind::Categorical { labels: StSlope::LABELS },
            Self::Thal => FeatureKind::Categorical { labels: Thalassemia::LABELS },
        }
    }

    /// Starting value for a numeric form control.
    #[must_use]
    pub fn default_value(self) -> Option<f64> {
        match self {
            Self::Age => Some(45.0),
            Self::Trestbps => Some(130.0),
            Self::Chol => Some(250.0),
            Self::Thalch => Some(150.0),
            Self::Oldpeak => Some(1.0),
            Self::Ca => Some(0.0),
            _ => None,
        }
    }

    /// Unit suffix shown next to numeric values.
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::Age => "years",
            Self::Trestbps => "mm Hg",
            Self::Chol => "mg/dl",
            Self::Thalch => "bpm",
            Self::Oldpeak => "mm",
            _ => "",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a column name is not part of the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown feature '{0}'")]
pub struct UnknownFeature(pub String);

impl FromStr for Feature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

/// Column layout the artifact was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSchema {
    /// age, sex, cp, chol, thalch, exang
    #[default]
    Reduced,
    /// All thirteen UCI columns.
    Full,
}

const REDUCED_FEATURES: [Feature; 6] = [
    Feature::Age,
    Feature::Sex,
    Feature::Cp,
    Feature::Chol,
    Feature::Thalch,
    Feature::Exang,
];

impl FeatureSchema {
    /// Features in the exact column order the artifact expects.
    #[must_use]
    pub fn features(self) -> &'static [Feature] {
        match self {
            Self::Reduced => &REDUCED_FEATURES,
            Self::Full => &Feature::ALL,
        }
    }

    #[must_use]
    pub fn width(self) -> usize {
        self.features().len()
    }

    #[must_use]
    pub fn contains(self, feature: Feature) -> bool {
        self.features().contains(&feature)
    }

    /// Check that the artifact's trained columns are this schema's columns,
    /// by name and in order.
    ///
    /// # Errors
    /// Returns `SchemaMismatch::Columns` on any difference.
    pub fn check_columns(self, artifact_columns: &[String]) -> Result<(), SchemaMismatch> {
        let matches = artifact_columns.len() == self.width()
            && artifact_columns
                .iter()
                .zip(self.features())
                .all(|(name, feature)| name == feature.name());

        if matches {
            Ok(())
        } else {
            Err(SchemaMismatch::Columns {
                schema: self,
                expected: self.features().iter().map(|f| f.name().to_string()).collect(),
                artifact: artifact_columns.to_vec(),
            })
        }
    }

    /// Check that a submission carries exactly this schema's fields.
    ///
    /// # Errors
    /// Returns `SchemaMismatch::FieldSet` listing missing and unexpected fields.
    pub fn check_field_set(
        self,
        present: impl IntoIterator<Item = Feature>,
    ) -> Result<(), SchemaMismatch> {
        let present: BTreeSet<Feature> = present.into_iter().collect();
        let expected: BTreeSet<Feature> = self.features().iter().copied().collect();

        if present == expected {
            return Ok(());
        }

        Err(SchemaMismatch::FieldSet {
            schema: self,
            missing: expected.difference(&present).copied().collect(),
            unexpected: present.difference(&expected).copied().collect(),
        })
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reduced => write!(f, "reduced ({} features)", self.width()),
            Self::Full => write!(f, "full ({} features)", self.width()),
        }
    }
}

impl FromStr for FeatureSchema {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reduced" | "6" => Ok(Self::Reduced),
            "full" | "13" => Ok(Self::Full),
            other => Err(format!("unknown schema '{other}' (expected reduced or full)")),
        }
    }
}

/// The submitted fields, the encoded record or the artifact columns disagree
/// with the configured schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaMismatch {
    #[error("fields do not match the {schema} schema (missing: {missing:?}, unexpected: {unexpected:?})")]
    FieldSet {
        schema: FeatureSchema,
        missing: Vec<Feature>,
        unexpected: Vec<Feature>,
    },

    #[error("artifact columns {artifact:?} do not match the {schema} schema {expected:?}")]
    Columns {
        schema: FeatureSchema,
        expected: Vec<String>,
        artifact: Vec<String>,
    },

    #[error("encoded record has {encoded} values but the artifact expects {expected}")]
    Width { encoded: usize, expected: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(schema: FeatureSchema) -> Vec<String> {
        schema.features().iter().map(|f| f.name().to_string()).collect()
    }

    #[test]
    fn test_schema_widths() {
        assert_eq!(FeatureSchema::Reduced.width(), 6);
        assert_eq!(FeatureSchema::Full.width(), 13);
        assert!(FeatureSchema::Reduced
            .features()
            .iter()
            .all(|f| FeatureSchema::Full.contains(*f)));
    }

    #[test]
    fn test_feature_names_round_trip() {
        for feature in Feature::ALL {
            assert_eq!(feature.name().parse::<Feature>(), Ok(feature));
        }
        assert!("thalach".parse::<Feature>().is_err());
    }

    #[test]
    fn test_check_columns_accepts_exact_order() {
        assert!(FeatureSchema::Reduced.check_columns(&names(FeatureSchema::Reduced)).is_ok());
        assert!(FeatureSchema::Full.check_columns(&names(FeatureSchema::Full)).is_ok());
    }

    #[test]
    fn test_check_columns_rejects_reordered_or_wrong_width() {
        let mut swapped = names(FeatureSchema::Reduced);
        swapped.swap(0, 1);
        assert!(matches!(
            FeatureSchema::Reduced.check_columns(&swapped),
            Err(SchemaMismatch::Columns { .. })
        ));

        assert!(FeatureSchema::Full
            .check_columns(&names(FeatureSchema::Reduced))
            .is_err());
    }

    #[test]
    fn test_check_field_set_reports_differences() {
        let present = [Feature::Age, Feature::Sex, Feature::Cp, Feature::Chol, Feature::Oldpeak];
        let err = FeatureSchema::Reduced.check_field_set(present).unwrap_err();
        match err {
            SchemaMismatch::FieldSet { missing, unexpected, .. } => {
                assert_eq!(missing, vec![Feature::Thalch, Feature::Exang]);
                assert_eq!(unexpected, vec![Feature::Oldpeak]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_schema_parse() {
        assert_eq!("Reduced".parse::<FeatureSchema>(), Ok(FeatureSchema::Reduced));
        assert_eq!("full".parse::<FeatureSchema>(), Ok(FeatureSchema::Full));
        assert!("wide".parse::<FeatureSchema>().is_err());
    }
}
