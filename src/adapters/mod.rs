//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifact`: JSON model artifacts with signed-manifest verification
//! - `sanitize`: redaction of clinical values in logs

pub mod artifact;
pub mod sanitize;

pub use artifact::{JsonArtifact, LoadError};
