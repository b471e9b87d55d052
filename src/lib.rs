//! # heartrisk
//!
//! Heart disease risk inference adapter.
//!
//! This crate provides:
//! - Encoding of clinical form values into the exact numeric record a
//!   pre-trained classifier expects
//! - A medically tuned decision policy (HIGH RISK above 40% probability)
//! - Feature importance and per-factor views for the result screen
//! - Terminal UI and a JSON command-line front end
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Feature schema, label tables, patient record, assessment
//! - `ports`: The classifier artifact capability trait
//! - `adapters`: JSON artifact loader with signature checks, log redaction
//! - `application`: The assessment use case
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod logging;
pub mod ports;
pub mod tui;

pub use application::AssessmentService;
pub use config::AppConfig;
pub use domain::{Assessment, FeatureSchema, RawInput, RiskAssessment, RiskLabel};

/// Result type for heartrisk operations
pub type Result<T> = std::result::Result<T, HeartRiskError>;

/// Main error type for heartrisk
#[derive(Debug, thiserror::Error)]
pub enum HeartRiskError {
    #[error("Invalid input: {0}")]
    InputEncoding(#[from] domain::EncodingError),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(#[from] domain::SchemaMismatch),

    #[error("Model artifact contract violated: {0}")]
    ArtifactContract(#[from] ports::ArtifactError),

    #[error("Model artifact could not be loaded: {0}")]
    ArtifactLoad(#[from] adapters::LoadError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HeartRiskError {
    /// Stable error code for display and scripting.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputEncoding(_) => "INPUT_ENCODING_ERROR",
            Self::SchemaMismatch(_) => "SCHEMA_MISMATCH_ERROR",
            Self::ArtifactContract(_) => "ARTIFACT_CONTRACT_ERROR",
            Self::ArtifactLoad(_) => "ARTIFACT_LOAD_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
