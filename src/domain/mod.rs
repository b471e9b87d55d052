//! Domain layer: Core clinical types and encoding rules.
//!
//! Pure Rust types with no I/O. Everything here is deterministic and
//! serializable.

mod assessment;
mod feature;
mod importance;
pub mod labels;
mod patient;
mod profile;

pub use assessment::{Assessment, DecisionPolicy, RiskAssessment, RiskLabel, MEDICAL_THRESHOLD};
pub use feature::{Feature, FeatureKind, FeatureSchema, SchemaMismatch, UnknownFeature};
pub use importance::{FeatureWeight, ImportanceReport, IMPORTANCE_UNAVAILABLE};
pub use patient::{EncodedRecord, EncodingError, PatientRecord, RawInput, RawValue};
pub use profile::{FactorBar, FactorLevel, RiskFactorProfile, SummaryRow};
