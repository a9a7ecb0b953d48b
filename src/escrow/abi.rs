//! Escrow contract call encoding
//!
//! Only the two entry points the wallet drives are covered: opening an escrow
//! (`addTransaction`) and releasing it (`execute`). Arguments are either single
//! 32-byte words or arrays of words, which is all these calls need.

use primitive_types::U256;

use crate::address::Address;
use crate::crypto::{keccak256, Signature};
use crate::escrow::hash::CommitmentHash;
use crate::escrow::release::Payout;
use crate::escrow::script::RedeemScript;

pub const ADD_TRANSACTION_SIGNATURE: &str =
    "addTransaction(address,address,address,uint8,uint32,bytes32,bytes20)";

pub const EXECUTE_SIGNATURE: &str =
    "execute(uint8[],bytes32[],bytes32[],bytes32,address[],uint256[])";

/// ABI argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Static value occupying one word
    Word([u8; 32]),
    /// Dynamic array of static values
    Array(Vec<[u8; 32]>),
}

impl Token {
    pub fn address(address: &Address) -> Self {
        Token::Word(address.to_word())
    }

    pub fn uint(value: U256) -> Self {
        Token::Word(uint_word(value))
    }

    /// `bytesN`: left-aligned, zero-padded on the right
    pub fn fixed_bytes(bytes: &[u8]) -> Self {
        let mut word = [0u8; 32];
        let len = bytes.len().min(32);
        word[..len].copy_from_slice(&bytes[..len]);
        Token::Word(word)
    }
}

/// First four bytes of the Keccak-256 of the canonical signature
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Selector followed by the encoded arguments
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut out = function_selector(signature).to_vec();
    out.extend(encode_tokens(tokens));
    out
}

/// Head/tail encoding of a top-level argument list
pub fn encode_tokens(tokens: &[Token]) -> Vec<u8> {
    let head_len = 32 * tokens.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::Word(word) => head.extend_from_slice(word),
            Token::Array(items) => {
                head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
                tail.extend_from_slice(&uint_word(U256::from(items.len())));
                for item in items {
                    tail.extend_from_slice(item);
                }
            }
        }
    }

    head.extend(tail);
    head
}

/// `addTransaction` call data for funding `script`
///
/// Two-party scripts pass the zero address as moderator; the contract
/// ignores it when the threshold is 1.
pub fn add_transaction_call(script: &RedeemScript, script_hash: &CommitmentHash) -> Vec<u8> {
    let moderator = script.moderator.unwrap_or(Address::ZERO);
    encode_call(
        ADD_TRANSACTION_SIGNATURE,
        &[
            Token::address(&script.buyer),
            Token::address(&script.seller),
            Token::address(&moderator),
            Token::uint(U256::from(script.threshold)),
            Token::uint(U256::from(script.timeout_hours)),
            Token::Word(*script_hash.as_bytes()),
            Token::fixed_bytes(script.txn_id.as_bytes()),
        ],
    )
}

/// `execute` call data releasing an escrow to `payouts`
pub fn execute_call(
    signatures: &[Signature],
    script_hash: &CommitmentHash,
    payouts: &[Payout],
) -> Vec<u8> {
    let sig_v = signatures
        .iter()
        .map(|s| uint_word(U256::from(s.contract_v())))
        .collect();
    let sig_r = signatures.iter().map(|s| s.r).collect();
    let sig_s = signatures.iter().map(|s| s.s).collect();
    let destinations = payouts.iter().map(|p| p.destination.to_word()).collect();
    let amounts = payouts.iter().map(|p| uint_word(p.amount)).collect();

    encode_call(
        EXECUTE_SIGNATURE,
        &[
            Token::Array(sig_v),
            Token::Array(sig_r),
            Token::Array(sig_s),
            Token::Word(*script_hash.as_bytes()),
            Token::Array(destinations),
            Token::Array(amounts),
        ],
    )
}

pub(crate) fn uint_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}
