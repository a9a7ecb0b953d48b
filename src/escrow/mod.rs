//! Escrow primitives
//!
//! Redeem scripts, their commitment hashes, and the contract calls that open
//! and release an escrow.

pub mod abi;
pub mod hash;
pub mod release;
pub mod script;

pub use hash::{hash_script, CommitmentHash};
pub use release::{release_digest, Authorization, Payout};
pub use script::{EscrowParams, RedeemScript, ScriptError, ScriptId};
