//! Commitment hashes of redeem scripts

use primitive_types::H256;
use serde::{Deserialize, Serialize};

use crate::crypto::keccak256;

/// Keccak-256 over a canonical script encoding
///
/// Every party recomputes this from the script alone; it is the identifier the
/// escrow contract stores.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitmentHash(H256);

impl CommitmentHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(H256(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }

    /// Parse `0x`-prefixed (or bare) hex
    pub fn from_hex(text: &str) -> Result<Self, hex::FromHexError> {
        let digits = text.strip_prefix("0x").unwrap_or(text);
        let mut hash = H256::zero();
        hex::decode_to_slice(digits, hash.as_bytes_mut())?;
        Ok(Self(hash))
    }
}

/// Hash a canonical script encoding
///
/// Applied exactly once over the binary form produced by
/// [`RedeemScript::serialize`](crate::escrow::RedeemScript::serialize).
pub fn hash_script(canonical: &[u8]) -> CommitmentHash {
    CommitmentHash::from_bytes(keccak256(canonical))
}

impl std::fmt::Display for CommitmentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl std::fmt::Debug for CommitmentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommitmentHash({})", self)
    }
}
