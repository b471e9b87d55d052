//! Model signing utility.
//!
//! Writes `manifest.json` (SHA-256 of every artifact JSON in the directory)
//! and `model.sig` (Ed25519 signature over the manifest bytes).
//!
//! # Usage
//!
//! ```bash
//! HEARTRISK_MODEL_SIGNING_KEY_B64_FILE=keys/model.seed \
//!     cargo run --bin sign_model -- <model_dir> [--serial <n>]
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use heartrisk::adapters::artifact::manifest::{
    sha256_hex, SignedManifest, MANIFEST_FILE, MANIFEST_VERSION, SIGNATURE_FILE,
};

const KEY_FILE_ENV: &str = "HEARTRISK_MODEL_SIGNING_KEY_B64_FILE";
const KEY_ENV: &str = "HEARTRISK_MODEL_SIGNING_KEY_B64";

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    let secret = if let Ok(path) = env::var(KEY_FILE_ENV) {
        let content = fs::read_to_string(path.trim())
            .with_context(|| format!("Failed reading signing key file {path:?}"))?;
        Zeroizing::new(content.trim().to_string())
    } else if cfg!(debug_assertions) {
        // Env fallback for local development only.
        let v = env::var(KEY_ENV)
            .map_err(|_| anyhow!("Missing signing key. Set {KEY_FILE_ENV} (or {KEY_ENV} in debug builds)."))?;
        Zeroizing::new(v.trim().to_string())
    } else {
        bail!("Missing signing key. Set {KEY_FILE_ENV}.");
    };

    if secret.is_empty() {
        bail!("Empty signing key");
    }
    Ok(secret)
}

fn read_signing_seed() -> Result<Seed> {
    let b64 = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(b64.as_bytes())
            .context("Invalid base64 in signing key")?,
    );

    let seed: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        anyhow!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(seed))
}

fn usage() -> anyhow::Error {
    anyhow!("Usage: sign_model <model_dir> [--serial <u64>]")
}

fn parse_args() -> Result<(PathBuf, Option<u64>)> {
    let mut args = env::args().skip(1);
    let mut model_dir: Option<PathBuf> = None;
    let mut serial: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--serial" => {
                let v = args.next().ok_or_else(usage)?;
                serial = Some(v.trim().parse().context("--serial must be a u64")?);
            }
            "-h" | "--help" => return Err(usage()),
            _ if model_dir.is_none() => model_dir = Some(PathBuf::from(arg)),
            _ => return Err(usage()),
        }
    }

    Ok((model_dir.ok_or_else(usage)?, serial))
}

/// Directory to sign: the path itself, or the directory holding an artifact
/// file. A bare file name resolves to the current directory.
fn signing_dir(path: &Path) -> PathBuf {
    if !path.is_file() {
        return path.to_path_buf();
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Every `*.json` in `dir` except the manifest itself.
fn artifact_files(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {dir:?}"))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if path.is_file() && name.ends_with(".json") && name != MANIFEST_FILE {
            let bytes = fs::read(&path).with_context(|| format!("Failed to read {path:?}"))?;
            files.insert(name.to_string(), sha256_hex(&bytes));
        }
    }
    Ok(files)
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn main() -> Result<()> {
    let (model_dir, serial_arg) = parse_args()?;

    let model_dir = signing_dir(&model_dir);

    let files = artifact_files(&model_dir)?;
    if files.is_empty() {
        bail!("No artifact JSON found in {model_dir:?}");
    }

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let created_at = unix_now();
    let manifest = SignedManifest {
        version: MANIFEST_VERSION,
        serial: serial_arg.unwrap_or(created_at.max(1) as u64),
        created_at,
        files,
    };
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {manifest_path:?}"))?;

    let sig_path = model_dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, signing_key.sign(&manifest_bytes).to_bytes())
        .with_context(|| format!("Failed to write {sig_path:?}"))?;

    println!("Signed {} file(s), serial {}", manifest.files.len(), manifest.serial);
    println!("Wrote manifest: {manifest_path:?}");
    println!("Wrote signature: {sig_path:?}");
    println!(
        "HEARTRISK_MODEL_PUBKEY_B64={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_dir_resolution() {
        let dir = tempfile::tempdir().expect("Should create tempdir");
        let model = dir.path().join("model.json");
        fs::write(&model, b"{}").expect("Should write model");

        assert_eq!(signing_dir(dir.path()), dir.path());
        assert_eq!(signing_dir(&model), dir.path());
    }

    #[test]
    fn test_bare_file_name_signs_current_dir() {
        // Cargo.toml always exists in the package root tests run from.
        assert_eq!(signing_dir(Path::new("Cargo.toml")), PathBuf::from("."));
        assert!(artifact_files(&signing_dir(Path::new("Cargo.toml"))).is_ok());
    }
}
