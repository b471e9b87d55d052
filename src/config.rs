//! Runtime configuration from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use crate::adapters::artifact::manifest::verifying_key_from_b64;
use crate::adapters::artifact::VerificationPolicy;
use crate::domain::FeatureSchema;

pub const DEFAULT_MODEL_PATH: &str = "models";
pub const DEFAULT_LOG_FILE: &str = "heartrisk.log";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("HEARTRISK_SCHEMA: {0}")]
    Schema(String),

    #[error("HEARTRISK_LOG_MODE: unknown mode '{0}' (expected auto, file, stdout or stderr)")]
    LogMode(String),

    #[error("failed to read {path:?}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model public key: {0}")]
    PublicKey(String),
}

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    /// File when stdout is a terminal (the TUI owns it), stdout otherwise.
    #[default]
    Auto,
    File,
    Stdout,
    /// Keeps stdout free for machine-readable output.
    Stderr,
}

impl FromStr for LogMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "file" => Ok(Self::File),
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            other => Err(ConfigError::LogMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Artifact file, or a directory containing `model.json`.
    pub model_path: PathBuf,
    pub schema: FeatureSchema,
    pub allow_unsigned_models: bool,
    /// Base64 Ed25519 public key used to verify the artifact manifest.
    pub model_public_key_b64: Option<String>,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            schema: FeatureSchema::default(),
            allow_unsigned_models: false,
            model_public_key_b64: None,
            log_mode: LogMode::Auto,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl AppConfig {
    /// # Errors
    /// Returns `ConfigError` on an unparseable variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    ///
    /// # Errors
    /// Returns `ConfigError` on an unparseable variable or unreadable key file.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let schema = match var("HEARTRISK_SCHEMA") {
            Some(v) => v.parse().map_err(ConfigError::Schema)?,
            None => defaults.schema,
        };

        let log_mode = match var("HEARTRISK_LOG_MODE") {
            Some(v) => v.parse()?,
            None => defaults.log_mode,
        };

        let model_public_key_b64 = match var("HEARTRISK_MODEL_PUBKEY_B64") {
            Some(v) => Some(v.trim().to_string()),
            None => match var("HEARTRISK_MODEL_PUBKEY_B64_FILE") {
                Some(path) => {
                    let path = PathBuf::from(path);
                    let contents = std::fs::read_to_string(&path)
                        .map_err(|source| ConfigError::KeyFile { path, source })?;
                    Some(contents.trim().to_string())
                }
                None => None,
            },
        };

        Ok(Self {
            model_path: var("HEARTRISK_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            schema,
            allow_unsigned_models: var("HEARTRISK_ALLOW_UNSIGNED_MODELS")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            model_public_key_b64,
            log_mode,
            log_file: var("HEARTRISK_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
        })
    }

    /// # Errors
    /// Returns `ConfigError::PublicKey` if the configured key does not parse.
    pub fn verification_policy(&self) -> Result<VerificationPolicy, ConfigError> {
        let public_key = self
            .model_public_key_b64
            .as_deref()
            .map(verifying_key_from_b64)
            .transpose()
            .map_err(ConfigError::PublicKey)?;

        Ok(VerificationPolicy {
            public_key,
            allow_unsigned: self.allow_unsigned_models,
        })
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}
