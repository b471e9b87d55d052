//! Patient observations and their encoding into a model record.
//!
//! Flow: `RawInput` (what the form produced) -> `PatientRecord` (typed,
//! range-checked) -> `EncodedRecord` (numeric columns in schema order).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::feature::{Feature, FeatureKind, FeatureSchema};
use super::labels::{
    CategoricalLabel, ChestPainType, RestingEcg, Sex, StSlope, Thalassemia, YesNo,
};

/// A single value as entered in the form: slider position or dropdown label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    Label(String),
}

impl RawValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "number",
            Self::Label(_) => "label",
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Label(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Label(v)
    }
}

/// Field name -> raw form value, one submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput(BTreeMap<String, RawValue>);

impl RawInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(field.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.0.get(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resolve every key to a known feature.
    ///
    /// # Errors
    /// Returns `EncodingError::UnknownField` for the first unrecognised key.
    pub fn features(&self) -> Result<Vec<Feature>, EncodingError> {
        self.0
            .keys()
            .map(|k| {
                k.parse::<Feature>()
                    .map_err(|_| EncodingError::UnknownField(k.clone()))
            })
            .collect()
    }
}

/// A raw value could not be turned into its numeric code.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodingError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("missing value for {0}")]
    MissingField(Feature),

    #[error("{feature}: unrecognised label '{label}' (expected one of: {expected})")]
    UnknownLabel {
        feature: Feature,
        label: String,
        expected: String,
    },

    #[error("{feature}: expected {expected}, got {found}")]
    WrongType {
        feature: Feature,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{feature}: value {value} out of range [{min}, {max}]")]
    OutOfRange {
        feature: Feature,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Typed clinical observations for one patient.
///
/// The six reduced-schema fields are always present; the rest only when the
/// full schema is in use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub age: u16,
    pub sex: Sex,
    pub chest_pain: ChestPainType,
    pub resting_bp: Option<u16>,
    pub cholesterol: u16,
    pub fasting_blood_sugar: Option<YesNo>,
    pub resting_ecg: Option<RestingEcg>,
    pub max_heart_rate: u16,
    pub exercise_angina: YesNo,
    pub st_depression: Option<f64>,
    pub st_slope: Option<StSlope>,
    pub major_vessels: Option<u8>,
    pub thalassemia: Option<Thalassemia>,
}

impl PatientRecord {
    /// Parse and range-check every field of a raw submission.
    ///
    /// # Errors
    /// Returns the first `EncodingError` encountered. Nothing partial is
    /// returned.
    pub fn from_raw(input: &RawInput) -> Result<Self, EncodingError> {
        input.features()?;

        let required = |feature: Feature| {
            input
                .get(feature.name())
                .ok_or(EncodingError::MissingField(feature))
        };
        let optional = |feature: Feature| input.get(feature.name());

        Ok(Self {
            age: parse_integer(Feature::Age, required(Feature::Age)?)? as u16,
            sex: parse_label(Feature::Sex, required(Feature::Sex)?)?,
            chest_pain: parse_label(Feature::Cp, required(Feature::Cp)?)?,
            resting_bp: optional(Feature::Trestbps)
                .map(|v| parse_integer(Feature::Trestbps, v).map(|n| n as u16))
                .transpose()?,
            cholesterol: parse_integer(Feature::Chol, required(Feature::Chol)?)? as u16,
            fasting_blood_sugar: optional(Feature::Fbs)
                .map(|v| parse_label(Feature::Fbs, v))
                .transpose()?,
            resting_ecg: optional(Feature::Restecg)
                .map(|v| parse_label(Feature::Restecg, v))
                .transpose()?,
            max_heart_rate: parse_integer(Feature::Thalch, required(Feature::Thalch)?)? as u16,
            exercise_angina: parse_label(Feature::Exang, required(Feature::Exang)?)?,
            st_depression: optional(Feature::Oldpeak)
                .map(|v| parse_float(Feature::Oldpeak, v))
                .transpose()?,
            st_slope: optional(Feature::Slope)
                .map(|v| parse_label(Feature::Slope, v))
                .transpose()?,
            major_vessels: optional(Feature::Ca)
                .map(|v| parse_integer(Feature::Ca, v).map(|n| n as u8))
                .transpose()?,
            thalassemia: optional(Feature::Thal)
                .map(|v| parse_label(Feature::Thal, v))
                .transpose()?,
        })
    }

    /// Features carrying a value in this record.
    #[must_use]
    pub fn present_features(&self) -> Vec<Feature> {
        Feature::ALL
            .iter()
            .copied()
            .filter(|f| self.value(*f).is_some())
            .collect()
    }

    /// Numeric code for one feature, if present.
    #[must_use]
    pub fn value(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Age => Some(f64::from(self.age)),
            Feature::Sex => Some(f64::from(self.sex.code())),
            Feature::Cp => Some(f64::from(self.chest_pain.code())),
            Feature::Trestbps => self.resting_bp.map(f64::from),
            Feature::Chol => Some(f64::from(self.cholesterol)),
            Feature::Fbs => self.fasting_blood_sugar.map(|v| f64::from(v.code())),
            Feature::Restecg => self.resting_ecg.map(|v| f64::from(v.code())),
            Feature::Thalch => Some(f64::from(self.max_heart_rate)),
            Feature::Exang => Some(f64::from(self.exercise_angina.code())),
            Feature::Oldpeak => self.st_depression,
            Feature::Slope => self.st_slope.map(|v| f64::from(v.code())),
            Feature::Ca => self.major_vessels.map(f64::from),
            Feature::Thal => self.thalassemia.map(|v| f64::from(v.code())),
        }
    }

    /// Encode into the column order of `schema`.
    ///
    /// # Errors
    /// Returns `EncodingError::MissingField` if the schema needs a field this
    /// record does not carry.
    pub fn encode(&self, schema: FeatureSchema) -> Result<EncodedRecord, EncodingError> {
        let values = schema
            .features()
            .iter()
            .map(|f| self.value(*f).ok_or(EncodingError::MissingField(*f)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EncodedRecord {
            schema,
            columns: schema.features().to_vec(),
            values,
        })
    }
}

/// Numeric model input: one value per schema column, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedRecord {
    pub schema: FeatureSchema,
    pub columns: Vec<Feature>,
    pub values: Vec<f64>,
}

impl EncodedRecord {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| *c == feature)
            .map(|i| self.values[i])
    }
}

fn parse_integer(feature: Feature, raw: &RawValue) -> Result<i64, EncodingError> {
    let FeatureKind::Integer { min, max } = feature.kind() else {
        return Err(wrong_type(feature, "integer", raw));
    };

    let value = match raw {
        RawValue::Integer(n) => *n,
        RawValue::Float(x) if x.is_finite() && x.fract() == 0.0 => *x as i64,
        _ => return Err(wrong_type(feature, "integer", raw)),
    };

    if value < min || value > max {
        return Err(EncodingError::OutOfRange {
            feature,
            value: value as f64,
            min: min as f64,
            max: max as f64,
        });
    }
    Ok(value)
}

fn parse_float(feature: Feature, raw: &RawValue) -> Result<f64, EncodingError> {
    let FeatureKind::Float { min, max } = feature.kind() else {
        return Err(wrong_type(feature, "number", raw));
    };

    let value = match raw {
        RawValue::Integer(n) => *n as f64,
        RawValue::Float(x) => *x,
        RawValue::Label(_) => return Err(wrong_type(feature, "number", raw)),
    };

    if !value.is_finite() || value < min || value > max {
        return Err(EncodingError::OutOfRange {
            feature,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

fn parse_label<T: CategoricalLabel>(feature: Feature, raw: &RawValue) -> Result<T, EncodingError> {
    let RawValue::Label(label) = raw else {
        return Err(wrong_type(feature, "label", raw));
    };

    T::from_label(label).ok_or_else(|| EncodingError::UnknownLabel {
        feature,
        label: label.clone(),
        expected: T::LABELS.join(", "),
    })
}

fn wrong_type(feature: Feature, expected: &'static str, raw: &RawValue) -> EncodingError {
    EncodingError::WrongType {
        feature,
        expected,
        found: raw.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduced_input() -> RawInput {
        RawInput::new()
            .with("age", 45)
            .with("sex", "Male")
            .with("cp", "Type 2: Non-Anginal")
            .with("chol", 250)
            .with("thalch", 150)
            .with("exang", "No")
    }

    fn full_input() -> RawInput {
        reduced_input()
            .with("trestbps", 130)
            .with("fbs", "Yes")
            .with("restecg", "ST-T Abnormality")
            .with("oldpeak", 1.5)
            .with("slope", "Flat")
            .with("ca", 2)
            .with("thal", "Reversible Defect")
    }

    #[test]
    fn test_reduced_record_encodes_in_schema_order() {
        let record = PatientRecord::from_raw(&reduced_input()).expect("Should parse");
        let encoded = record.encode(FeatureSchema::Reduced).expect("Should encode");

        assert_eq!(encoded.values, vec![45.0, 1.0, 2.0, 250.0, 150.0, 0.0]);
        assert_eq!(encoded.columns, FeatureSchema::Reduced.features());
    }

    #[test]
    fn test_full_record_encodes_all_thirteen_columns() {
        let record = PatientRecord::from_raw(&full_input()).expect("Should parse");
        let encoded = record.encode(FeatureSchema::Full).expect("Should encode");

        assert_eq!(
            encoded.values,
            vec![45.0, 1.0, 2.0, 130.0, 250.0, 1.0, 1.0, 150.0, 0.0, 1.5, 1.0, 2.0, 3.0]
        );
        assert_eq!(encoded.get(Feature::Thal), Some(3.0));
    }

    #[test]
    fn test_reduced_record_cannot_fill_full_schema() {
        let record = PatientRecord::from_raw(&reduced_input()).expect("Should parse");
        assert_eq!(
            record.encode(FeatureSchema::Full),
            Err(EncodingError::MissingField(Feature::Trestbps))
        );
    }

    #[test]
    fn test_raw_input_from_json() {
        let json = r#"{"age": 45, "sex": "Female", "cp": "Type 3", "chol": 250.0, "thalch": 150, "exang": "Yes"}"#;
        let input: RawInput = serde_json::from_str(json).expect("Should deserialize");
        let record = PatientRecord::from_raw(&input).expect("Should parse");

        assert_eq!(record.cholesterol, 250);
        assert_eq!(record.sex, Sex::Female);
        assert_eq!(record.chest_pain, ChestPainType::Asymptomatic);
        assert!(record.exercise_angina.is_yes());
    }

    #[test]
    fn test_malformed_label_is_an_encoding_error() {
        let input = reduced_input().with("cp", "Type two");
        let err = PatientRecord::from_raw(&input).unwrap_err();
        assert!(matches!(err, EncodingError::UnknownLabel { feature: Feature::Cp, .. }));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let err = PatientRecord::from_raw(&reduced_input().with("age", 19)).unwrap_err();
        assert!(matches!(err, EncodingError::OutOfRange { feature: Feature::Age, .. }));

        let err = PatientRecord::from_raw(&full_input().with("oldpeak", 6.5)).unwrap_err();
        assert!(matches!(err, EncodingError::OutOfRange { feature: Feature::Oldpeak, .. }));
    }

    #[test]
    fn test_type_mismatches_are_rejected() {
        let err = PatientRecord::from_raw(&reduced_input().with("chol", 250.5)).unwrap_err();
        assert!(matches!(err, EncodingError::WrongType { feature: Feature::Chol, .. }));

        let err = PatientRecord::from_raw(&reduced_input().with("sex", 1)).unwrap_err();
        assert!(matches!(err, EncodingError::WrongType { feature: Feature::Sex, .. }));
    }

    #[test]
    fn test_unknown_and_missing_fields() {
        let err = PatientRecord::from_raw(&reduced_input().with("bmi", 31)).unwrap_err();
        assert_eq!(err, EncodingError::UnknownField("bmi".to_string()));

        let mut input = RawInput::new();
        input.insert("age", 50);
        let err = PatientRecord::from_raw(&input).unwrap_err();
        assert_eq!(err, EncodingError::MissingField(Feature::Sex));
    }

    #[test]
    fn test_present_features() {
        let record = PatientRecord::from_raw(&reduced_input()).expect("Should parse");
        assert_eq!(record.present_features(), FeatureSchema::Reduced.features());
    }
}
