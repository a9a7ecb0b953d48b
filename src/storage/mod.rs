//! Storage layer for wallet credentials
//!
//! Manages key generation, encryption, keystore persistence, and the
//! signing credential handed to the wallet.

pub mod credential;
pub mod file_system;
pub mod keys;
pub mod models;

pub use credential::{CredentialError, CredentialStore, LocalCredential};
