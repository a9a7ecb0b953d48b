//! Hashing and signature primitives
//!
//! Keccak-256 (the chain's native hash, not standardized SHA3-256) and
//! recoverable secp256k1 signatures over 32-byte digests.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::address::Address;

/// Signature and recovery errors
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Signature recovery failed: {0}")]
    RecoveryFailed(String),
}

/// Keccak-256 of `data`
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Recoverable ECDSA signature split into its on-chain components
///
/// `v` holds the raw recovery id (0 or 1). Contract calls and legacy
/// transactions add their own offsets (27, or `35 + 2 * chain_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl Signature {
    /// Sign a 32-byte digest with a secp256k1 secret key
    pub fn sign_digest(digest: &[u8; 32], secret_key: &SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let message = Message::from_digest(*digest);
        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&message, secret_key)
            .serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);

        Self {
            v: recovery_id.to_i32() as u8,
            r,
            s,
        }
    }

    /// Recover the address that produced this signature over `digest`
    pub fn recover(&self, digest: &[u8; 32]) -> Result<Address, SignatureError> {
        let recovery_id = RecoveryId::from_i32(i32::from(self.v))
            .map_err(|_| SignatureError::InvalidRecoveryId(self.v))?;

        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&self.r);
        compact[32..].copy_from_slice(&self.s);

        let signature = RecoverableSignature::from_compact(&compact, recovery_id)
            .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;

        let secp = Secp256k1::verification_only();
        let public_key = secp
            .recover_ecdsa(&Message::from_digest(*digest), &signature)
            .map_err(|e| SignatureError::RecoveryFailed(e.to_string()))?;

        Ok(Address::from_public_key(&public_key))
    }

    /// `v` as expected by contract-side `ecrecover` (27 or 28)
    pub fn contract_v(&self) -> u8 {
        self.v + 27
    }
}
