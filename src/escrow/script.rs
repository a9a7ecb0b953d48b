//! Escrow redeem scripts and their canonical encoding
//!
//! The canonical byte form is a wire format shared with every counterparty:
//!
//! ```text
//! id (20) | threshold (1) | timeout_hours (4, big-endian) | buyer (20) | seller (20) | [moderator (20)]
//! ```
//!
//! The moderator field is omitted, not zero-filled, when the threshold is 1.
//! Changing field order or widths is a breaking protocol change.

use primitive_types::H160;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::address::{Address, ADDRESS_LEN};
use crate::escrow::hash::{hash_script, CommitmentHash};

/// Width of an escrow identifier in bytes
pub const SCRIPT_ID_LEN: usize = 20;

/// Encoded length of a buyer/seller script
pub const TWO_PARTY_SCRIPT_LEN: usize = SCRIPT_ID_LEN + 1 + 4 + 2 * ADDRESS_LEN;

/// Encoded length of a moderated script
pub const MODERATED_SCRIPT_LEN: usize = TWO_PARTY_SCRIPT_LEN + ADDRESS_LEN;

/// Redeem script errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("Invalid script: {0}")]
    InvalidScript(String),

    #[error("Malformed script encoding: {0}")]
    Malformed(String),
}

/// Process-unique escrow identifier
///
/// Generated from the OS RNG when an escrow is opened; never derived from
/// chain state.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptId(H160);

impl ScriptId {
    pub fn generate() -> Self {
        let mut id = H160::zero();
        OsRng.fill_bytes(id.as_bytes_mut());
        Self(id)
    }

    pub const fn from_bytes(bytes: [u8; SCRIPT_ID_LEN]) -> Self {
        Self(H160(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SCRIPT_ID_LEN] {
        &self.0 .0
    }
}

impl std::fmt::Display for ScriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl std::fmt::Debug for ScriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScriptId({})", self)
    }
}

/// Caller-supplied parameters for opening an escrow
#[derive(Debug, Clone)]
pub struct EscrowParams {
    pub buyer: Address,
    pub seller: Address,
    /// Present for moderated (2-of-3) escrows
    pub moderator: Option<Address>,
    /// Hours after which the seller may reclaim alone; 0 disables the escape
    pub timeout_hours: u32,
}

/// Release condition of a single escrow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemScript {
    pub txn_id: ScriptId,
    pub timeout_hours: u32,
    pub threshold: u8,
    pub buyer: Address,
    pub seller: Address,
    pub moderator: Option<Address>,
}

impl RedeemScript {
    /// Build the script for a new escrow
    ///
    /// Generates a fresh identifier and derives the threshold from moderator
    /// presence: 2 when a moderator participates, 1 otherwise.
    pub fn open(params: EscrowParams) -> Result<Self, ScriptError> {
        let script = Self {
            txn_id: ScriptId::generate(),
            timeout_hours: params.timeout_hours,
            threshold: if params.moderator.is_some() { 2 } else { 1 },
            buyer: params.buyer,
            seller: params.seller,
            moderator: params.moderator,
        };
        script.validate()?;
        Ok(script)
    }

    /// Check the release-condition invariants
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.threshold == 0 {
            return Err(invalid("threshold must be at least 1"));
        }
        if self.threshold > 2 {
            return Err(invalid(format!(
                "threshold {} exceeds the number of authorizing parties",
                self.threshold
            )));
        }
        if self.threshold > 1 && self.moderator.is_none() {
            return Err(invalid("threshold > 1 requires a moderator"));
        }
        if self.threshold == 1 && self.moderator.is_some() {
            return Err(invalid("moderator given for a threshold-1 script"));
        }
        if self.buyer == self.seller {
            return Err(invalid("buyer and seller must differ"));
        }
        if self.buyer.is_zero() || self.seller.is_zero() {
            return Err(invalid("participants must not be the zero address"));
        }
        if let Some(moderator) = self.moderator {
            if moderator.is_zero() {
                return Err(invalid("moderator must not be the zero address"));
            }
            if moderator == self.buyer || moderator == self.seller {
                return Err(invalid("moderator must differ from buyer and seller"));
            }
        }
        Ok(())
    }

    /// Canonical byte encoding
    pub fn serialize(&self) -> Result<Vec<u8>, ScriptError> {
        self.validate()?;

        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(self.txn_id.as_bytes());
        out.push(self.threshold);
        out.extend_from_slice(&self.timeout_hours.to_be_bytes());
        out.extend_from_slice(self.buyer.as_bytes());
        out.extend_from_slice(self.seller.as_bytes());
        if let Some(moderator) = &self.moderator {
            out.extend_from_slice(moderator.as_bytes());
        }
        Ok(out)
    }

    /// Decode a canonical encoding received from a counterparty
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ScriptError> {
        if bytes.len() != TWO_PARTY_SCRIPT_LEN && bytes.len() != MODERATED_SCRIPT_LEN {
            return Err(ScriptError::Malformed(format!(
                "expected {} or {} bytes, got {}",
                TWO_PARTY_SCRIPT_LEN,
                MODERATED_SCRIPT_LEN,
                bytes.len()
            )));
        }

        let (id, rest) = bytes.split_at(SCRIPT_ID_LEN);
        let (threshold, rest) = rest.split_at(1);
        let (timeout, rest) = rest.split_at(4);
        let (buyer, rest) = rest.split_at(ADDRESS_LEN);
        let (seller, rest) = rest.split_at(ADDRESS_LEN);

        let mut id_bytes = [0u8; SCRIPT_ID_LEN];
        id_bytes.copy_from_slice(id);
        let mut timeout_bytes = [0u8; 4];
        timeout_bytes.copy_from_slice(timeout);

        let moderator = if rest.is_empty() {
            None
        } else {
            Some(Address::from_slice(rest).map_err(malformed)?)
        };

        let script = Self {
            txn_id: ScriptId::from_bytes(id_bytes),
            timeout_hours: u32::from_be_bytes(timeout_bytes),
            threshold: threshold[0],
            buyer: Address::from_slice(buyer).map_err(malformed)?,
            seller: Address::from_slice(seller).map_err(malformed)?,
            moderator,
        };
        script.validate()?;
        Ok(script)
    }

    /// Commitment hash over the canonical encoding
    pub fn commitment_hash(&self) -> Result<CommitmentHash, ScriptError> {
        Ok(hash_script(&self.serialize()?))
    }

    /// Whether `address` is one of the parties that may authorize a release
    pub fn is_participant(&self, address: &Address) -> bool {
        *address == self.buyer || *address == self.seller || self.moderator.as_ref() == Some(address)
    }

    /// Timeout after which the seller may release alone
    pub fn timeout(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.timeout_hours))
    }

    fn encoded_len(&self) -> usize {
        if self.moderator.is_some() {
            MODERATED_SCRIPT_LEN
        } else {
            TWO_PARTY_SCRIPT_LEN
        }
    }
}

fn invalid(reason: impl Into<String>) -> ScriptError {
    ScriptError::InvalidScript(reason.into())
}

fn malformed(e: crate::address::AddressError) -> ScriptError {
    ScriptError::Malformed(e.to_string())
}
