//! Signing credentials
//!
//! The wallet never touches raw key material outside this module: it asks a
//! [`CredentialStore`] to sign 32-byte digests.

use std::path::Path;
use std::sync::RwLock;

use secp256k1::SecretKey;

use crate::address::Address;
use crate::crypto::Signature;
use crate::storage::file_system::{read_keystore, FileSystemError};
use crate::storage::keys::{address_from_secret_key, decrypt_secret_key};

/// Credential errors
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Credential for {0} is locked or invalid")]
    LockedOrInvalidCredential(Address),

    #[error("Keystore error: {0}")]
    Keystore(#[from] FileSystemError),
}

/// Signs digests on behalf of a single account
pub trait CredentialStore: Send + Sync {
    /// Account the credential signs for
    fn address(&self) -> Address;

    /// Produce a recoverable signature over `digest`
    fn sign(&self, digest: &[u8; 32]) -> Result<Signature, CredentialError>;

    /// Release the underlying key material
    fn lock(&self) {}
}

/// In-process credential backed by a secp256k1 secret key
pub struct LocalCredential {
    address: Address,
    secret_key: RwLock<Option<SecretKey>>,
}

impl LocalCredential {
    pub fn new(secret_key: SecretKey) -> Self {
        Self {
            address: address_from_secret_key(&secret_key),
            secret_key: RwLock::new(Some(secret_key)),
        }
    }

    /// Unlock an encrypted keystore file
    ///
    /// # Example
    ///
    /// ```ignore
    /// let credential = LocalCredential::unlock(&keystore_path, "password")?;
    /// println!("Unlocked {}", credential.address());
    /// ```
    pub fn unlock(keystore_path: &Path, password: &str) -> Result<Self, CredentialError> {
        let keystore = read_keystore(keystore_path)?;
        let secret_key = decrypt_secret_key(&keystore.encrypted_private_key, password)
            .map_err(|_| CredentialError::LockedOrInvalidCredential(keystore.address))?;

        let credential = Self::new(secret_key);
        if credential.address != keystore.address {
            return Err(CredentialError::LockedOrInvalidCredential(keystore.address));
        }
        Ok(credential)
    }

    pub fn is_locked(&self) -> bool {
        self.secret_key.read().map(|key| key.is_none()).unwrap_or(true)
    }
}

impl CredentialStore for LocalCredential {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, digest: &[u8; 32]) -> Result<Signature, CredentialError> {
        let guard = self
            .secret_key
            .read()
            .map_err(|_| CredentialError::LockedOrInvalidCredential(self.address))?;
        let secret_key = guard
            .as_ref()
            .ok_or(CredentialError::LockedOrInvalidCredential(self.address))?;
        Ok(Signature::sign_digest(digest, secret_key))
    }

    fn lock(&self) {
        if let Ok(mut key) = self.secret_key.write() {
            if key.take().is_some() {
                log::info!("Credential for {} locked", self.address);
            }
        }
    }
}

impl std::fmt::Debug for LocalCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCredential")
            .field("address", &self.address)
            .field("locked", &self.is_locked())
            .finish()
    }
}
