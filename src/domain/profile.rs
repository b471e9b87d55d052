//! Per-factor risk bars and the patient summary table.
//!
//! These are descriptive views of the submitted values, independent of the
//! model: each factor is scaled to 0-1 against its clinical range and each
//! summary row gets a coarse Low/Medium/High rating.

use serde::{Deserialize, Serialize};

use super::feature::{Feature, FeatureSchema};
use super::labels::{CategoricalLabel, RestingEcg, Sex, StSlope, Thalassemia};
use super::patient::PatientRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactorLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for FactorLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// One bar in the "risk factors" chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorBar {
    pub feature: Feature,
    pub label: String,
    /// Normalised to 0.0-1.0.
    pub value: f64,
}

/// One row in the patient summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub feature: Feature,
    pub value: String,
    pub level: FactorLevel,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactorProfile {
    pub bars: Vec<FactorBar>,
    pub summary: Vec<SummaryRow>,
}

impl RiskFactorProfile {
    /// Build bars and rows for every schema feature present in `record`.
    #[must_use]
    pub fn from_record(record: &PatientRecord, schema: FeatureSchema) -> Self {
        let mut bars = Vec::with_capacity(schema.width());
        let mut summary = Vec::with_capacity(schema.width());

        for &feature in schema.features() {
            if let Some(bar) = factor_bar(record, feature) {
                bars.push(bar);
            }
            if let Some(row) = summary_row(record, feature) {
                summary.push(row);
            }
        }

        Self { bars, summary }
    }
}

fn factor_bar(record: &PatientRecord, feature: Feature) -> Option<FactorBar> {
    let (label, value) = match feature {
        Feature::Age => ("Age", f64::from(record.age) / 80.0),
        Feature::Sex => ("Male", f64::from(record.sex.code())),
        Feature::Cp => ("Chest Pain Type", f64::from(record.chest_pain.code()) / 3.0),
        Feature::Trestbps => ("Resting BP", f64::from(record.resting_bp?) / 200.0),
        Feature::Chol => ("Cholesterol", f64::from(record.cholesterol) / 600.0),
        Feature::Fbs => ("Fasting Blood Sugar", f64::from(record.fasting_blood_sugar?.code())),
        Feature::Restecg => ("Resting ECG", f64::from(record.resting_ecg?.code()) / 2.0),
        // Lower peak heart rate is the risk signal.
        Feature::Thalch => ("Heart Rate", (220.0 - f64::from(record.max_heart_rate)) / 220.0),
        Feature::Exang => ("Exercise Angina", f64::from(record.exercise_angina.code())),
        Feature::Oldpeak => ("ST Depression", record.st_depression? / 6.0),
        Feature::Slope => ("ST Slope", f64::from(record.st_slope?.code()) / 2.0),
        Feature::Ca => ("Major Vessels", f64::from(record.major_vessels?) / 3.0),
        Feature::Thal => ("Thalassemia", f64::from(record.thalassemia?.code() - 1) / 2.0),
    };

    Some(FactorBar {
        feature,
        label: label.to_string(),
        value: value.clamp(0.0, 1.0),
    })
}

fn summary_row(record: &PatientRecord, feature: Feature) -> Option<SummaryRow> {
    let row = |value: String, level: FactorLevel| SummaryRow {
        feature,
        value,
        level,
        detail: None,
    };

    Some(match feature {
        Feature::Age => row(format!("{} years", record.age), FactorLevel::Medium),
        Feature::Sex => row(
            record.sex.label().to_string(),
            if record.sex == Sex::Male {
                FactorLevel::High
            } else {
                FactorLevel::Low
            },
        ),
        Feature::Cp => SummaryRow {
            detail: Some(format!("{}/3", record.chest_pain.code())),
            // Any reported chest pain type is rated high; the code shows severity.
            ..row(record.chest_pain.short_name().to_string(), FactorLevel::High)
        },
        Feature::Trestbps => {
            let bp = record.resting_bp?;
            row(
                format!("{bp} mm Hg"),
                if bp >= 140 {
                    FactorLevel::High
                } else if bp >= 120 {
                    FactorLevel::Medium
                } else {
                    FactorLevel::Low
                },
            )
        }
        Feature::Chol => row(
            format!("{} mg/dl", record.cholesterol),
            if record.cholesterol > 300 {
                FactorLevel::High
            } else {
                FactorLevel::Medium
            },
        ),
        Feature::Fbs => {
            let fbs = record.fasting_blood_sugar?;
            row(
                fbs.label().to_string(),
                if fbs.is_yes() {
                    FactorLevel::High
                } else {
                    FactorLevel::Low
                },
            )
        }
        Feature::Restecg => {
            let ecg = record.resting_ecg?;
            row(
                ecg.label().to_string(),
                if ecg == RestingEcg::Normal {
                    FactorLevel::Low
                } else {
                    FactorLevel::High
                },
            )
        }
        Feature::Thalch => row(
            format!("{} bpm", record.max_heart_rate),
            if record.max_heart_rate < 120 {
                FactorLevel::High
            } else {
                FactorLevel::Low
            },
        ),
        Feature::Exang => row(
            record.exercise_angina.label().to_string(),
            if record.exercise_angina.is_yes() {
                FactorLevel::High
            } else {
                FactorLevel::Low
            },
        ),
        Feature::Oldpeak => {
            let st = record.st_depression?;
            row(
                format!("{st:.1} mm"),
                if st >= 2.0 {
                    FactorLevel::High
                } else if st >= 1.0 {
                    FactorLevel::Medium
                } else {
                    FactorLevel::Low
                },
            )
        }
        Feature::Slope => {
            let slope = record.st_slope?;
            row(
                slope.label().to_string(),
                match slope {
                    StSlope::Upsloping => FactorLevel::Low,
                    StSlope::Flat => FactorLevel::Medium,
                    StSlope::Downsloping => FactorLevel::High,
                },
            )
        }
        Feature::Ca => {
            let ca = record.major_vessels?;
            SummaryRow {
                detail: Some(format!("{ca}/3")),
                ..row(
                    ca.to_string(),
                    if ca == 0 {
                        FactorLevel::Low
                    } else {
                        FactorLevel::High
                    },
                )
            }
        }
        Feature::Thal => {
            let thal = record.thalassemia?;
            row(
                thal.label().to_string(),
                if thal == Thalassemia::Normal {
                    FactorLevel::Low
                } else {
                    FactorLevel::High
                },
            )
        }
    })
}
