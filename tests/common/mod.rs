//! Common test utilities for escrow-wallet integration tests
//!
//! This module provides shared test infrastructure including:
//! - An in-memory chain client with scriptable balances, nonces and failures
//! - Deterministic credentials and escrow fixtures
//! - Logger setup

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use escrow_wallet::address::Address;
use escrow_wallet::chain::{ChainClient, ChainClientError, EscrowRecord, TransactionHandle};
use escrow_wallet::config::GlobalConfig;
use escrow_wallet::escrow::{RedeemScript, ScriptId};
use escrow_wallet::storage::LocalCredential;
use escrow_wallet::wallet::SignedTransaction;
use primitive_types::U256;
use secp256k1::SecretKey;

pub const GWEI: u64 = 1_000_000_000;

/// One ether in wei
pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(1_000_000_000_000_000_000u64)
}

/// Initialize test logging, ignoring repeated calls
pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

#[derive(Default)]
struct MockState {
    confirmed: U256,
    pending: U256,
    nonce: u64,
    fee_rate: U256,
    records: HashMap<ScriptId, EscrowRecord>,
    submitted: Vec<SignedTransaction>,
    failure: Option<ChainClientError>,
    rejection: Option<String>,
    delay: Option<Duration>,
}

/// In-memory chain client
///
/// The chain nonce stays where it is set regardless of submissions, which
/// models a node that has not yet seen the wallet's pending transactions.
pub struct MockChainClient {
    state: Mutex<MockState>,
}

impl MockChainClient {
    /// 10 ETH confirmed, nothing pending, nonce 0, 1 gwei fee rate
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                confirmed: ether(10),
                fee_rate: U256::from(GWEI),
                ..MockState::default()
            }),
        }
    }

    pub fn with_balance(confirmed: U256, pending: U256) -> Self {
        let client = Self::new();
        client.set_balance(confirmed, pending);
        client
    }

    pub fn set_balance(&self, confirmed: U256, pending: U256) {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.confirmed = confirmed;
        state.pending = pending;
    }

    pub fn set_nonce(&self, nonce: u64) {
        self.state.lock().expect("mock state poisoned").nonce = nonce;
    }

    pub fn set_fee_rate(&self, fee_rate: U256) {
        self.state.lock().expect("mock state poisoned").fee_rate = fee_rate;
    }

    pub fn insert_record(&self, script_id: ScriptId, record: EscrowRecord) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .records
            .insert(script_id, record);
    }

    /// Make every call fail with `error`
    pub fn fail_with(&self, error: ChainClientError) {
        self.state.lock().expect("mock state poisoned").failure = Some(error);
    }

    /// Make `submit` fail with `Rejected(reason)`
    pub fn reject_submissions(&self, reason: &str) {
        self.state.lock().expect("mock state poisoned").rejection = Some(reason.to_string());
    }

    /// Delay every answer by `delay`
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().expect("mock state poisoned").delay = Some(delay);
    }

    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.state.lock().expect("mock state poisoned").submitted.clone()
    }

    pub fn submit_count(&self) -> usize {
        self.state.lock().expect("mock state poisoned").submitted.len()
    }

    async fn answer<T>(
        &self,
        read: impl FnOnce(&mut MockState) -> T,
    ) -> Result<T, ChainClientError> {
        let delay = self.state.lock().expect("mock state poisoned").delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().expect("mock state poisoned");
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        Ok(read(&mut state))
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn confirmed_balance(&self, _address: &Address) -> Result<U256, ChainClientError> {
        self.answer(|s| s.confirmed).await
    }

    async fn pending_balance(&self, _address: &Address) -> Result<U256, ChainClientError> {
        self.answer(|s| s.pending).await
    }

    async fn nonce(&self, _address: &Address) -> Result<u64, ChainClientError> {
        self.answer(|s| s.nonce).await
    }

    async fn suggest_fee_rate(&self) -> Result<U256, ChainClientError> {
        self.answer(|s| s.fee_rate).await
    }

    async fn escrow_record(
        &self,
        _contract: &Address,
        script_id: &ScriptId,
    ) -> Result<Option<EscrowRecord>, ChainClientError> {
        self.answer(|s| s.records.get(script_id).cloned()).await
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TransactionHandle, ChainClientError> {
        let outcome = self
            .answer(|s| {
                if let Some(reason) = &s.rejection {
                    return Err(ChainClientError::Rejected(reason.clone()));
                }
                s.submitted.push(tx.clone());
                Ok(TransactionHandle {
                    tx_hash: tx.hash(),
                    nonce: tx.nonce(),
                })
            })
            .await?;
        outcome
    }
}

/// Deterministic credential whose secret key is `byte` repeated
pub fn credential(byte: u8) -> LocalCredential {
    let secret_key = SecretKey::from_slice(&[byte; 32]).expect("valid fixture key");
    LocalCredential::new(secret_key)
}

/// Escrow contract used by test configurations
pub fn contract_address() -> Address {
    Address::from_bytes([0xEE; 20])
}

/// Dev configuration with an escrow contract and a short request timeout
pub fn test_config() -> GlobalConfig {
    let mut config = GlobalConfig::default_dev();
    config.chain.escrow_contract = Some(contract_address());
    config.chain.request_timeout_secs = 1;
    config
}

/// Fixed escrow identifier 0x0102..14
pub fn fixture_script_id() -> ScriptId {
    let mut id = [0u8; 20];
    for (i, byte) in id.iter_mut().enumerate() {
        *byte = (i + 1) as u8;
    }
    ScriptId::from_bytes(id)
}

/// Buyer 0xAA.., seller 0xBB.., moderator 0xCC.., threshold 2, 24 hours
pub fn moderated_fixture() -> RedeemScript {
    RedeemScript {
        txn_id: fixture_script_id(),
        timeout_hours: 24,
        threshold: 2,
        buyer: Address::from_bytes([0xAA; 20]),
        seller: Address::from_bytes([0xBB; 20]),
        moderator: Some(Address::from_bytes([0xCC; 20])),
    }
}

/// Moderated escrow between the given credentials' accounts
pub fn script_between(
    buyer: Address,
    seller: Address,
    moderator: Option<Address>,
    timeout_hours: u32,
) -> RedeemScript {
    RedeemScript {
        txn_id: ScriptId::generate(),
        timeout_hours,
        threshold: if moderator.is_some() { 2 } else { 1 },
        buyer,
        seller,
        moderator,
    }
}

/// Record the chain would hold after funding `script` with `balance`
pub fn record_for(script: &RedeemScript, balance: U256, opened_at: DateTime<Utc>) -> EscrowRecord {
    EscrowRecord {
        script_hash: script.commitment_hash().expect("valid fixture script"),
        opened_at,
        balance,
    }
}

pub fn shared(client: MockChainClient) -> Arc<MockChainClient> {
    Arc::new(client)
}
