//! Release terms and party authorizations

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::crypto::{keccak256, Signature, SignatureError};
use crate::escrow::abi::uint_word;
use crate::escrow::hash::CommitmentHash;
use crate::storage::credential::{CredentialError, CredentialStore};

const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// One output of an escrow release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub destination: Address,
    pub amount: U256,
}

impl Payout {
    pub fn new(destination: Address, amount: U256) -> Self {
        Self {
            destination,
            amount,
        }
    }
}

/// A party's signature approving a specific release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub signer: Address,
    pub signature: Signature,
}

impl Authorization {
    /// Sign the release digest with `credential`
    pub fn sign(
        credential: &dyn CredentialStore,
        contract: &Address,
        script_hash: &CommitmentHash,
        payouts: &[Payout],
    ) -> Result<Self, CredentialError> {
        let digest = release_digest(contract, script_hash, payouts);
        Ok(Self {
            signer: credential.address(),
            signature: credential.sign(&digest)?,
        })
    }

    /// True when the signature recovers to `signer` over `digest`
    pub fn verify(&self, digest: &[u8; 32]) -> Result<bool, SignatureError> {
        Ok(self.signature.recover(digest)? == self.signer)
    }
}

/// Digest each authorizing party signs
///
/// Matches what the escrow contract rebuilds before `ecrecover`: an EIP-191
/// version-0 payload bound to the contract, wrapped in the signed-message
/// prefix.
pub fn release_digest(
    contract: &Address,
    script_hash: &CommitmentHash,
    payouts: &[Payout],
) -> [u8; 32] {
    let mut payload = Vec::with_capacity(22 + 64 * payouts.len() + 32);
    payload.push(0x19);
    payload.push(0x00);
    payload.extend_from_slice(contract.as_bytes());
    for payout in payouts {
        payload.extend_from_slice(&payout.destination.to_word());
    }
    for payout in payouts {
        payload.extend_from_slice(&uint_word(payout.amount));
    }
    payload.extend_from_slice(script_hash.as_bytes());
    let inner = keccak256(&payload);

    let mut prefixed = SIGNED_MESSAGE_PREFIX.to_vec();
    prefixed.extend_from_slice(&inner);
    keccak256(&prefixed)
}
