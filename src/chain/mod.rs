//! Chain client port
//!
//! The wallet does not talk to the network itself. Balances, nonces, fee
//! rates, escrow records and broadcasting are delegated to a [`ChainClient`],
//! and every call is bounded by [`call_with_timeout`]. Retries are the
//! client's business; failures here are surfaced, never papered over.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::escrow::{CommitmentHash, ScriptId};
use crate::wallet::transaction::{SignedTransaction, TxHash};

/// Errors reported by a chain client
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainClientError {
    #[error("Chain client unavailable: {0}")]
    Unavailable(String),

    #[error("Chain client call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rejected by network: {0}")]
    Rejected(String),

    #[error("Invalid response from chain client: {0}")]
    InvalidResponse(String),
}

/// What the escrow contract recorded when an escrow was funded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRecord {
    pub script_hash: CommitmentHash,
    pub opened_at: DateTime<Utc>,
    /// Funds still held by the escrow (wei)
    pub balance: U256,
}

/// Reference to a broadcast transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHandle {
    pub tx_hash: TxHash,
    pub nonce: u64,
}

/// Access to chain state and broadcasting for one network
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Balance included in blocks
    async fn confirmed_balance(&self, address: &Address) -> Result<U256, ChainClientError>;

    /// Net balance change of not-yet-confirmed transactions
    async fn pending_balance(&self, address: &Address) -> Result<U256, ChainClientError>;

    /// Next nonce the chain expects from `address`, pending transactions included
    async fn nonce(&self, address: &Address) -> Result<u64, ChainClientError>;

    /// Suggested gas price (wei)
    async fn suggest_fee_rate(&self) -> Result<U256, ChainClientError>;

    /// Escrow recorded under `script_id` by `contract`, if any
    async fn escrow_record(
        &self,
        contract: &Address,
        script_id: &ScriptId,
    ) -> Result<Option<EscrowRecord>, ChainClientError>;

    /// Broadcast a signed transaction
    async fn submit(&self, tx: &SignedTransaction) -> Result<TransactionHandle, ChainClientError>;
}

/// Run a chain client call with an upper time bound
pub async fn call_with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, ChainClientError>
where
    F: Future<Output = Result<T, ChainClientError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ChainClientError::Timeout(timeout)),
    }
}
