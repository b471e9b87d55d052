//! Signed manifest verification for artifact files.
//!
//! A deployment directory may carry, next to the artifact:
//! - `manifest.json`: SHA-256 digests of the files it binds
//! - `model.sig`: raw 64-byte Ed25519 signature over the manifest bytes
//!
//! The artifact is only trusted when the signature verifies against the
//! configured key and the artifact file is bound by the manifest with a
//! matching digest. Unsigned artifacts load only under an explicit override.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::LoadError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";
pub const MANIFEST_VERSION: u32 = 1;

/// Allowed clock skew for `created_at`, in seconds.
const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Content of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedManifest {
    pub version: u32,
    /// Monotonic release number of the artifact set.
    pub serial: u64,
    /// Unix timestamp (seconds) when the manifest was created.
    pub created_at: i64,
    /// File name (relative to the manifest) -> lowercase hex SHA-256.
    pub files: BTreeMap<String, String>,
}

/// What the loader requires before trusting an artifact.
#[derive(Debug, Clone, Default)]
pub struct VerificationPolicy {
    pub public_key: Option<VerifyingKey>,
    pub allow_unsigned: bool,
}

impl VerificationPolicy {
    #[must_use]
    pub fn require(public_key: VerifyingKey) -> Self {
        Self {
            public_key: Some(public_key),
            allow_unsigned: false,
        }
    }

    #[must_use]
    pub fn allow_unsigned() -> Self {
        Self {
            public_key: None,
            allow_unsigned: true,
        }
    }
}

/// Outcome of verification, kept for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationStatus {
    Signed { serial: u64 },
    Unsigned,
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signed { serial } => write!(f, "signed (serial {serial})"),
            Self::Unsigned => write!(f, "UNSIGNED"),
        }
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Parse a base64-encoded 32-byte Ed25519 public key.
///
/// # Errors
/// Returns a description of what is wrong with the key.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| format!("invalid public key base64: {e}"))?;
    let key: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("public key must be 32 bytes, got {}", bytes.len()))?;
    VerifyingKey::from_bytes(&key).map_err(|_| "invalid Ed25519 public key".to_string())
}

/// Verify the signed manifest that should accompany `artifact_path`.
///
/// The artifact digest is taken over `artifact_bytes`, the exact bytes the
/// caller will parse, not over a second read of the file.
///
/// # Errors
/// Returns `LoadError::Verification` when the policy is not satisfied.
pub fn verify(
    artifact_path: &Path,
    artifact_bytes: &[u8],
    policy: &VerificationPolicy,
) -> Result<VerificationStatus, LoadError> {
    let base_dir = artifact_path.parent().unwrap_or_else(|| Path::new("."));
    let artifact_name = artifact_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| LoadError::Verification(format!("invalid artifact path {artifact_path:?}")))?;

    let sig_path = base_dir.join(SIGNATURE_FILE);
    let manifest_path = base_dir.join(MANIFEST_FILE);

    if !sig_path.exists() || !manifest_path.exists() {
        return unsigned_or_refuse(policy, "no signed manifest found next to the artifact");
    }

    let Some(public_key) = policy.public_key.as_ref() else {
        return unsigned_or_refuse(policy, "no verifying key configured");
    };

    let sig_bytes = read(&sig_path)?;
    let sig: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
        LoadError::Verification("invalid signature length (expected 64 bytes)".into())
    })?;
    let signature = Signature::from_bytes(&sig);

    let manifest_bytes = read(&manifest_path)?;
    public_key
        .verify(&manifest_bytes, &signature)
        .map_err(|_| LoadError::Verification("invalid manifest signature".into()))?;

    let manifest: SignedManifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| LoadError::Verification(format!("malformed manifest: {e}")))?;

    if manifest.version != MANIFEST_VERSION {
        return Err(LoadError::Verification(format!(
            "unsupported manifest version {}",
            manifest.version
        )));
    }

    if manifest.created_at > unix_now() + MAX_FUTURE_SKEW_SECS {
        return Err(LoadError::Verification(
            "manifest created_at is in the future".into(),
        ));
    }

    if !manifest.files.contains_key(artifact_name) {
        return Err(LoadError::Verification(format!(
            "manifest does not bind {artifact_name}"
        )));
    }

    for (rel, expected_hex) in &manifest.files {
        let actual_hex = if rel == artifact_name {
            sha256_hex(artifact_bytes)
        } else {
            sha256_hex(&read(&base_dir.join(rel))?)
        };
        if !constant_time_eq_str(&actual_hex, expected_hex) {
            return Err(LoadError::Verification(format!("digest mismatch for {rel}")));
        }
    }

    tracing::info!(
        serial = manifest.serial,
        files = manifest.files.len(),
        "Artifact manifest signature and digests verified"
    );

    Ok(VerificationStatus::Signed {
        serial: manifest.serial,
    })
}

fn unsigned_or_refuse(
    policy: &VerificationPolicy,
    reason: &str,
) -> Result<VerificationStatus, LoadError> {
    if policy.allow_unsigned {
        tracing::warn!("Loading UNSIGNED artifact: {reason}");
        Ok(VerificationStatus::Unsigned)
    } else {
        tracing::error!("Refusing unsigned artifact: {reason}");
        Err(LoadError::Verification(format!(
            "{reason}; set HEARTRISK_ALLOW_UNSIGNED_MODELS=true to load anyway"
        )))
    }
}

fn read(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn constant_time_eq_str(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
