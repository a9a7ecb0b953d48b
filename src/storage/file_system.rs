//! File system operations for keystore persistence
//!
//! Manages the keystores directory and saving/loading encrypted account keys.

use std::fs;
use std::path::{Path, PathBuf};

use secp256k1::SecretKey;

use crate::config::NetworkType;
use crate::storage::keys::KeyError;
use crate::storage::models::{KeystoreFile, KeystoreInfo};

/// File system errors
#[derive(Debug, thiserror::Error)]
pub enum FileSystemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Keystore already exists: {0}")]
    KeystoreExists(String),

    #[error("Keystore not found: {0}")]
    KeystoreNotFound(String),

    #[error("Keystores directory not found")]
    KeystoresDirectoryNotFound,

    #[error("Invalid keystore name: {0:?}")]
    InvalidKeystoreName(String),
}

/// Get the default keystores directory path
///
/// Returns: `~/.escrow-wallet/keystores/`
pub fn default_keystores_dir() -> Result<PathBuf, FileSystemError> {
    let config_dir = crate::config::default_config_dir()
        .map_err(|_| FileSystemError::KeystoresDirectoryNotFound)?;
    Ok(config_dir.join("keystores"))
}

/// Get the keystores directory (custom or default)
pub fn keystores_dir(custom_dir: Option<&str>) -> Result<PathBuf, FileSystemError> {
    match custom_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => default_keystores_dir(),
    }
}

/// Path of the keystore file for `name`
///
/// Names are plain file stems: empty names, path separators and `..` are
/// rejected so the file always lands inside the keystores directory.
pub fn keystore_path(name: &str, custom_base: Option<&str>) -> Result<PathBuf, FileSystemError> {
    validate_keystore_name(name)?;
    Ok(keystores_dir(custom_base)?.join(format!("{}.json", name)))
}

fn validate_keystore_name(name: &str) -> Result<(), FileSystemError> {
    let invalid = name.trim().is_empty()
        || name.contains("..")
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).is_absolute();
    if invalid {
        return Err(FileSystemError::InvalidKeystoreName(name.to_string()));
    }
    Ok(())
}

/// Encrypt and save a new keystore
///
/// # Errors
///
/// Returns error if:
/// - A keystore with this name already exists
/// - Encryption fails
/// - Cannot write the file
///
/// # Example
///
/// ```ignore
/// let secret_key = generate_secret_key();
/// let keystore = save_keystore("trading", &secret_key, "password", NetworkType::Dev, None)?;
/// println!("Saved {}", keystore.address);
/// ```
pub fn save_keystore(
    name: &str,
    secret_key: &SecretKey,
    password: &str,
    network: NetworkType,
    custom_base: Option<&str>,
) -> Result<KeystoreFile, FileSystemError> {
    let path = keystore_path(name, custom_base)?;

    if path.exists() {
        return Err(FileSystemError::KeystoreExists(name.to_string()));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let keystore = KeystoreFile::encrypt(name.to_string(), secret_key, password, network)?;
    let json = serde_json::to_string_pretty(&keystore)?;
    fs::write(&path, json)?;

    log::info!("Saved keystore '{}' for {}", name, keystore.address);

    Ok(keystore)
}

/// Read a keystore file without decrypting it
pub fn read_keystore(path: &Path) -> Result<KeystoreFile, FileSystemError> {
    if !path.exists() {
        return Err(FileSystemError::KeystoreNotFound(
            path.display().to_string(),
        ));
    }

    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Read the keystore named `name`
pub fn load_keystore(name: &str, custom_base: Option<&str>) -> Result<KeystoreFile, FileSystemError> {
    let path = keystore_path(name, custom_base)?;
    if !path.exists() {
        return Err(FileSystemError::KeystoreNotFound(name.to_string()));
    }
    read_keystore(&path)
}

/// List all keystores, sorted by name
///
/// Files that are not valid keystores are skipped.
pub fn list_keystores(custom_base: Option<&str>) -> Result<Vec<KeystoreInfo>, FileSystemError> {
    let dir = keystores_dir(custom_base)?;

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut keystores = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match read_keystore(&path) {
            Ok(keystore) => keystores.push(KeystoreInfo::from(&keystore)),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    keystores.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(keystores)
}
