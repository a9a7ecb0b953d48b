//! Key generation and encryption utilities
//!
//! Provides secp256k1 account key generation, address derivation, and
//! AES-GCM encryption for secure storage.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha2::Sha256;

use crate::address::Address;

/// PBKDF2 iteration count (OWASP recommendation as of 2023)
const PBKDF2_ITERATIONS: u32 = 600_000;

/// Key generation and encryption errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("Secp256k1 error: {0}")]
    Secp256k1(String),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Decryption error: {0}")]
    Decryption(String),
}

/// Generate a new random account key
///
/// # Example
///
/// ```ignore
/// let secret_key = generate_secret_key();
/// let address = address_from_secret_key(&secret_key);
/// ```
pub fn generate_secret_key() -> SecretKey {
    SecretKey::new(&mut rand::rngs::OsRng)
}

/// Parse a hex-encoded (optionally `0x`-prefixed) secret key
pub fn parse_secret_key(hex_key: &str) -> Result<SecretKey, KeyError> {
    let digits = hex_key.trim().strip_prefix("0x").unwrap_or(hex_key.trim());
    let bytes = hex::decode(digits).map_err(|e| KeyError::Secp256k1(e.to_string()))?;
    SecretKey::from_slice(&bytes)
        .map_err(|e| KeyError::Secp256k1(format!("Invalid secret key: {}", e)))
}

/// Derive the account address controlled by `secret_key`
pub fn address_from_secret_key(secret_key: &SecretKey) -> Address {
    let secp = Secp256k1::signing_only();
    Address::from_public_key(&PublicKey::from_secret_key(&secp, secret_key))
}

/// Encrypt data using AES-256-GCM with password-derived key
///
/// Uses password-based encryption:
/// - PBKDF2-HMAC-SHA256 with 600,000 iterations
/// - Random 128-bit salt
/// - Random 96-bit nonce for each encryption
/// - Returns: salt (16 bytes) || nonce (12 bytes) || ciphertext || tag (16 bytes)
///
/// # Example
///
/// ```ignore
/// let encrypted = encrypt_data(b"secret", "my_password")?;
/// let decrypted = decrypt_data(&encrypted, "my_password")?;
/// ```
pub fn encrypt_data(data: &[u8], password: &str) -> Result<String, KeyError> {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);

    let cipher = cipher_for(password, &salt);

    let mut nonce_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, data)
        .map_err(|e| KeyError::Encryption(e.to_string()))?;

    // salt || nonce || ciphertext
    let mut result = salt.to_vec();
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(hex::encode(result))
}

/// Decrypt data encrypted with encrypt_data()
pub fn decrypt_data(encrypted_hex: &str, password: &str) -> Result<Vec<u8>, KeyError> {
    let encrypted_bytes =
        hex::decode(encrypted_hex).map_err(|e| KeyError::Decryption(e.to_string()))?;

    // Minimum size: salt (16) + nonce (12) + tag (16) = 44 bytes
    if encrypted_bytes.len() < 44 {
        return Err(KeyError::Decryption(
            "Data too short (minimum 44 bytes required)".to_string(),
        ));
    }

    let (salt, rest) = encrypted_bytes.split_at(16);
    let (nonce_bytes, ciphertext) = rest.split_at(12);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = cipher_for(password, salt);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| KeyError::Decryption(format!("Decryption failed (wrong password?): {}", e)))
}

/// Encrypt secp256k1 secret key for secure storage
pub fn encrypt_secret_key(secret_key: &SecretKey, password: &str) -> Result<String, KeyError> {
    encrypt_data(&secret_key.secret_bytes(), password)
}

/// Decrypt secp256k1 secret key
pub fn decrypt_secret_key(encrypted_hex: &str, password: &str) -> Result<SecretKey, KeyError> {
    let decrypted_bytes = decrypt_data(encrypted_hex, password)?;

    SecretKey::from_slice(&decrypted_bytes)
        .map_err(|e| KeyError::Secp256k1(format!("Invalid secret key: {}", e)))
}

fn cipher_for(password: &str, salt: &[u8]) -> Aes256Gcm {
    let mut key_bytes = [0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key_bytes);
    let key = aes_gcm::Key::<Aes256Gcm>::from_slice(&key_bytes);
    Aes256Gcm::new(key)
}
