//! Participant and contract addresses
//!
//! Addresses are 20-byte values. The textual form is `0x`-prefixed hex with an
//! EIP-55 mixed-case checksum; comparison always happens on the bytes.

use primitive_types::H160;
use secp256k1::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::crypto::keccak256;

/// Width of an address in bytes
pub const ADDRESS_LEN: usize = 20;

/// Address parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Invalid address length: expected 40 hex digits, got {0}")]
    InvalidLength(usize),

    #[error("Invalid hex in address: {0}")]
    InvalidHex(String),

    #[error("Address checksum mismatch: {0}")]
    ChecksumMismatch(String),
}

/// A 20-byte account or contract address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(H160);

impl Address {
    /// The all-zero address
    pub const ZERO: Address = Address(H160([0u8; ADDRESS_LEN]));

    pub const fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(H160(bytes))
    }

    /// Build an address from a slice that must be exactly 20 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        let array: [u8; ADDRESS_LEN] = bytes
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len() * 2))?;
        Ok(Self::from_bytes(array))
    }

    /// Derive the account address controlled by a public key
    ///
    /// Last 20 bytes of Keccak-256 over the uncompressed key without the
    /// `0x04` prefix.
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let uncompressed = public_key.serialize_uncompressed();
        let hash = keccak256(&uncompressed[1..]);
        Self(H160::from_slice(&hash[12..]))
    }

    /// Parse the textual form
    ///
    /// The `0x` prefix is optional. Single-case input is accepted as is;
    /// mixed-case input must carry a valid EIP-55 checksum.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);

        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength(digits.len()));
        }

        let decoded =
            hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let address = Self::from_slice(&decoded)?;

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && &address.to_checksum()[2..] != digits {
            return Err(AddressError::ChecksumMismatch(text.to_string()));
        }

        Ok(address)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0 .0
    }

    pub fn as_h160(&self) -> &H160 {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// EIP-55 checksummed form, `0x`-prefixed
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.as_bytes());
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Left-pad to a 32-byte ABI word
    pub fn to_word(&self) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(self.as_bytes());
        word
    }
}

impl std::str::FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_checksum())
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

impl From<H160> for Address {
    fn from(value: H160) -> Self {
        Self(value)
    }
}

impl rlp::Encodable for Address {
    fn rlp_append(&self, s: &mut rlp::RlpStream) {
        rlp::Encodable::rlp_append(&self.0, s);
    }
}

impl rlp::Decodable for Address {
    fn decode(rlp: &rlp::Rlp) -> Result<Self, rlp::DecoderError> {
        <H160 as rlp::Decodable>::decode(rlp).map(Self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Address::parse(&text).map_err(serde::de::Error::custom)
    }
}
