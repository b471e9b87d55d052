//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the application and the model artifact.

mod classifier;

pub use classifier::{ArtifactError, ArtifactMetadata, Capabilities, ClassifierArtifact};
