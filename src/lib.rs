//! Escrow Wallet
//!
//! Single-account wallet adapter with a threshold escrow primitive for
//! peer-to-peer marketplaces: canonical redeem scripts and their commitment
//! hashes, balance bookkeeping, and serialized transaction issuance over an
//! external chain client.

pub mod address;
pub mod chain;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod escrow;
pub mod manager;
pub mod storage;
pub mod wallet;
