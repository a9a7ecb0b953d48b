//! Escrow command implementations
//!
//! Offline: scripts and hashes are computed locally so counterparties can
//! cross-check what they will commit on chain.

use crate::address::{Address, AddressError};
use crate::escrow::{CommitmentHash, EscrowParams, RedeemScript, ScriptError};

#[derive(Debug, thiserror::Error)]
pub enum EscrowCommandError {
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Commitment mismatch: expected {expected}, computed {computed}")]
    HashMismatch {
        expected: CommitmentHash,
        computed: CommitmentHash,
    },
}

/// Build a new redeem script and print its canonical form
pub fn open(
    buyer: String,
    seller: String,
    moderator: Option<String>,
    timeout_hours: u32,
) -> Result<(), EscrowCommandError> {
    let params = EscrowParams {
        buyer: Address::parse(&buyer)?,
        seller: Address::parse(&seller)?,
        moderator: moderator.as_deref().map(Address::parse).transpose()?,
        timeout_hours,
    };

    let script = RedeemScript::open(params)?;
    let serialized = script.serialize()?;
    let script_hash = crate::escrow::hash_script(&serialized);

    println!("✓ Escrow script created");
    println!();
    print_script(&script);
    println!("  Script:      0x{}", hex::encode(&serialized));
    println!("  Commitment:  {}", script_hash);
    println!();
    println!("  Share the script with every party; each recomputes the commitment.");

    Ok(())
}

/// Decode a serialized script and check it against an expected commitment
pub fn verify(script_hex: String, expected: Option<String>) -> Result<(), EscrowCommandError> {
    let digits = script_hex
        .trim()
        .strip_prefix("0x")
        .unwrap_or(script_hex.trim());
    let bytes = hex::decode(digits).map_err(|e| EscrowCommandError::InvalidHex(e.to_string()))?;

    let script = RedeemScript::deserialize(&bytes)?;
    let computed = script.commitment_hash()?;

    print_script(&script);
    println!("  Commitment:  {}", computed);

    if let Some(expected) = expected {
        let expected = CommitmentHash::from_hex(&expected)
            .map_err(|e| EscrowCommandError::InvalidHex(e.to_string()))?;
        if expected != computed {
            return Err(EscrowCommandError::HashMismatch { expected, computed });
        }
        println!("  ✓ Commitment matches");
    }

    Ok(())
}

fn print_script(script: &RedeemScript) {
    println!("  Escrow ID:   {}", script.txn_id);
    println!("  Threshold:   {}", script.threshold);
    println!("  Timeout:     {}h", script.timeout_hours);
    println!("  Buyer:       {}", script.buyer);
    println!("  Seller:      {}", script.seller);
    if let Some(moderator) = &script.moderator {
        println!("  Moderator:   {}", moderator);
    }
}
