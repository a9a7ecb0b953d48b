//! Storage data models
//!
//! Defines keystore structures for persistence and user output.

use chrono::{DateTime, Utc};
use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::config::NetworkType;
use crate::storage::keys::{address_from_secret_key, encrypt_secret_key, KeyError};

/// Encrypted account key as saved to disk
///
/// Saved to: `~/.escrow-wallet/keystores/<name>.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreFile {
    /// Keystore name (unique identifier)
    pub name: String,

    /// Account address (public, stored for listing without the password)
    pub address: Address,

    /// Encrypted secp256k1 secret key (hex-encoded salt || nonce || ciphertext)
    pub encrypted_private_key: String,

    /// Network this account was created for
    pub network: NetworkType,

    /// When the keystore was created
    pub created_at: DateTime<Utc>,
}

impl KeystoreFile {
    /// Encrypt `secret_key` under `password`
    pub fn encrypt(
        name: String,
        secret_key: &SecretKey,
        password: &str,
        network: NetworkType,
    ) -> Result<Self, KeyError> {
        Ok(Self {
            name,
            address: address_from_secret_key(secret_key),
            encrypted_private_key: encrypt_secret_key(secret_key, password)?,
            network,
            created_at: Utc::now(),
        })
    }
}

/// User-facing keystore information (no key material)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeystoreInfo {
    pub name: String,
    pub address: Address,
    pub network: NetworkType,
    pub created_at: DateTime<Utc>,
}

impl From<&KeystoreFile> for KeystoreInfo {
    fn from(file: &KeystoreFile) -> Self {
        Self {
            name: file.name.clone(),
            address: file.address,
            network: file.network,
            created_at: file.created_at,
        }
    }
}
