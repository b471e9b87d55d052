//! Categorical clinical labels and their numeric codes.
//!
//! Each dropdown in the form maps to one of these enums. The mapping from a
//! label to the code the artifact was trained on is an explicit table: the
//! label text is matched, never sliced apart for digits.

use serde::{Deserialize, Serialize};

/// A closed set of labels with a fixed numeric encoding.
pub trait CategoricalLabel: Sized + Copy + PartialEq + 'static {
    /// Every variant, in the order the form presents them.
    const VARIANTS: &'static [Self];

    /// Canonical label for each entry of `VARIANTS`, same order.
    const LABELS: &'static [&'static str];

    /// Numeric code fed to the model.
    fn code(self) -> u8;

    /// Extra spellings accepted on input.
    fn aliases(self) -> &'static [&'static str] {
        &[]
    }

    /// Canonical label text.
    fn label(self) -> &'static str {
        let idx = Self::VARIANTS
            .iter()
            .position(|v| *v == self)
            .unwrap_or_default();
        Self::LABELS[idx]
    }

    /// Look up a label (canonical or alias). Whitespace is trimmed and ASCII
    /// case is ignored.
    fn from_label(input: &str) -> Option<Self> {
        let needle = input.trim();
        Self::VARIANTS.iter().copied().find(|v| {
            v.label().eq_ignore_ascii_case(needle)
                || v.aliases().iter().any(|a| a.eq_ignore_ascii_case(needle))
        })
    }
}

/// Biological sex as recorded in the training data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl CategoricalLabel for Sex {
    const VARIANTS: &'static [Self] = &[Self::Male, Self::Female];
    const LABELS: &'static [&'static str] = &["Male", "Female"];

    fn code(self) -> u8 {
        match self {
            Self::Male => 1,
            Self::Female => 0,
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Male => &["M"],
            Self::Female => &["F"],
        }
    }
}

/// Binary yes/no answer (fasting blood sugar > 120 mg/dl, exercise angina).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    No,
    Yes,
}

impl YesNo {
    #[must_use]
    pub fn is_yes(self) -> bool {
        self == Self::Yes
    }
}

impl CategoricalLabel for YesNo {
    const VARIANTS: &'static [Self] = &[Self::No, Self::Yes];
    const LABELS: &'static [&'static str] = &["No", "Yes"];

    fn code(self) -> u8 {
        match self {
            Self::No => 0,
            Self::Yes => 1,
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::No => &["N", "False"],
            Self::Yes => &["Y", "True"],
        }
    }
}

/// Chest pain type (`cp`), ordinal 0-3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChestPainType {
    TypicalAngina,
    AtypicalAngina,
    NonAnginal,
    Asymptomatic,
}

impl ChestPainType {
    /// Label without the "Type N:" prefix, used in the patient summary.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::TypicalAngina => "Typical Angina",
            Self::AtypicalAngina => "Atypical",
            Self::NonAnginal => "Non-Anginal",
            Self::Asymptomatic => "Asymptomatic",
        }
    }
}

impl CategoricalLabel for ChestPainType {
    const VARIANTS: &'static [Self] = &[
        Self::TypicalAngina,
        Self::AtypicalAngina,
        Self::NonAnginal,
        Self::Asymptomatic,
    ];
    const LABELS: &'static [&'static str] = &[
        "Type 0: Typical Angina",
        "Type 1: Atypical",
        "Type 2: Non-Anginal",
        "Type 3: Asymptomatic",
    ];

    fn code(self) -> u8 {
        match self {
            Self::TypicalAngina => 0,
            Self::AtypicalAngina => 1,
            Self::NonAnginal => 2,
            Self::Asymptomatic => 3,
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::TypicalAngina => &["Type 0", "Typical Angina"],
            Self::AtypicalAngina => &["Type 1", "Atypical", "Atypical Angina"],
            Self::NonAnginal => &["Type 2", "Non-Anginal", "Non-Anginal Pain"],
            Self::Asymptomatic => &["Type 3", "Asymptomatic"],
        }
    }
}

/// Resting electrocardiogram result (`restecg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestingEcg {
    Normal,
    StTAbnormality,
    LvHypertrophy,
}

impl CategoricalLabel for RestingEcg {
    const VARIANTS: &'static [Self] = &[Self::Normal, Self::StTAbnormality, Self::LvHypertrophy];
    const LABELS: &'static [&'static str] = &["Normal", "ST-T Abnormality", "LV Hypertrophy"];

    fn code(self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::StTAbnormality => 1,
            Self::LvHypertrophy => 2,
        }
    }
}

/// Slope of the peak exercise ST segment (`slope`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StSlope {
    Upsloping,
    Flat,
    Downsloping,
}

impl CategoricalLabel for StSlope {
    const VARIANTS: &'static [Self] = &[Self::Upsloping, Self::Flat, Self::Downsloping];
    const LABELS: &'static [&'static str] = &["Upsloping", "Flat", "Downsloping"];

    fn code(self) -> u8 {
        match self {
            Self::Upsloping => 0,
            Self::Flat => 1,
            Self::Downsloping => 2,
        }
    }
}

/// Thallium stress test result (`thal`). Codes start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Thalassemia {
    Normal,
    FixedDefect,
    ReversibleDefect,
}

impl CategoricalLabel for Thalassemia {
    const VARIANTS: &'static [Self] = &[Self::Normal, Self::FixedDefect, Self::ReversibleDefect];
    const LABELS: &'static [&'static str] = &["Normal", "Fixed Defect", "Reversible Defect"];

    fn code(self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::FixedDefect => 2,
            Self::ReversibleDefect => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_table_total<T: CategoricalLabel + std::fmt::Debug>() {
        assert_eq!(T::VARIANTS.len(), T::LABELS.len());
        for (variant, label) in T::VARIANTS.iter().zip(T::LABELS) {
            assert_eq!(variant.label(), *label);
            assert_eq!(T::from_label(label), Some(*variant));
            for alias in variant.aliases() {
                assert_eq!(T::from_label(alias), Some(*variant), "alias {alias}");
            }
        }
    }

    #[test]
    fn test_every_label_has_a_code() {
        assert_table_total::<Sex>();
        assert_table_total::<YesNo>();
        assert_table_total::<ChestPainType>();
        assert_table_total::<RestingEcg>();
        assert_table_total::<StSlope>();
        assert_table_total::<Thalassemia>();
    }

    #[test]
    fn test_codes_match_training_encoding() {
        assert_eq!(Sex::Male.code(), 1);
        assert_eq!(Sex::Female.code(), 0);
        assert_eq!(YesNo::Yes.code(), 1);
        assert_eq!(
            ChestPainType::VARIANTS.iter().map(|v| v.code()).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(RestingEcg::StTAbnormality.code(), 1);
        assert_eq!(StSlope::Downsloping.code(), 2);
        assert_eq!(Thalassemia::Normal.code(), 1);
        assert_eq!(Thalassemia::ReversibleDefect.code(), 3);
    }

    #[test]
    fn test_label_lookup_is_lenient_on_case_and_spacing() {
        assert_eq!(ChestPainType::from_label("  type 2 "), Some(ChestPainType::NonAnginal));
        assert_eq!(RestingEcg::from_label("st-t abnormality"), Some(RestingEcg::StTAbnormality));
        assert_eq!(Thalassemia::from_label("REVERSIBLE DEFECT"), Some(Thalassemia::ReversibleDefect));
    }

    #[test]
    fn test_unknown_labels_are_rejected() {
        assert_eq!(ChestPainType::from_label("Type 4"), None);
        assert_eq!(ChestPainType::from_label("Type"), None);
        assert_eq!(Sex::from_label(""), None);
        assert_eq!(StSlope::from_label("Sideways"), None);
    }

    #[test]
    fn test_lookup_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(ChestPainType::from_label("Type 2: Non-Anginal").map(|c| c.code()), Some(2));
        }
    }
}
