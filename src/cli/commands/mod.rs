//! CLI command implementations

pub mod config;
pub mod escrow;
pub mod keystore;
