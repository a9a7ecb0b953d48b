//! Transaction assembly and serialized issuance
//!
//! Nonce fetch and broadcast are not atomic against the chain, so every
//! transaction that will be submitted is built inside an [`IssuanceSession`].
//! A session holds the builder's sequencing lock until it is dropped; two
//! sessions never interleave, so two transactions from this account never
//! race for the same nonce. Building has no side effects: a session dropped
//! before [`IssuanceSession::submit`] leaves nothing behind.
//!
//! A transaction that outlives its session must be reserved with
//! [`IssuanceSession::reserve`]. Its nonce is then skipped by later builds
//! until it is submitted or handed back with [`IssuanceSession::discard`].

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use primitive_types::{H256, U256};
use rlp::RlpStream;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::address::Address;
use crate::chain::{call_with_timeout, ChainClient, ChainClientError, TransactionHandle};
use crate::config::GlobalConfig;
use crate::crypto::{keccak256, Signature};
use crate::escrow::abi::{add_transaction_call, execute_call};
use crate::escrow::{
    release_digest, Authorization, CommitmentHash, Payout, RedeemScript, ScriptError, ScriptId,
};
use crate::storage::credential::{CredentialError, CredentialStore};

/// Errors that can occur while building or submitting a transaction
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error(transparent)]
    InvalidScript(#[from] ScriptError),

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds: need {needed} wei, have {available} wei")]
    InsufficientFunds { needed: U256, available: U256 },

    #[error("Threshold not met: {required} authorizations required, {provided} provided")]
    ThresholdNotMet { required: usize, provided: usize },

    #[error("Script mismatch for escrow {script_id}: computed {expected}, recorded {recorded:?}")]
    ScriptMismatch {
        script_id: ScriptId,
        expected: CommitmentHash,
        recorded: Option<CommitmentHash>,
    },

    #[error("{0} is not a party to this escrow")]
    UnauthorizedParty(Address),

    #[error("Invalid authorization from {signer}: {reason}")]
    InvalidAuthorization { signer: Address, reason: String },

    #[error("Suggested fee rate {suggested} wei exceeds ceiling {ceiling} wei")]
    FeeRateExceedsCeiling { suggested: U256, ceiling: U256 },

    #[error("No escrow contract configured")]
    EscrowContractNotConfigured,

    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    #[error("Account nonce {0} cannot be followed by another transaction")]
    NonceExhausted(u64),

    #[error("Ledger unavailable during {operation} for {address}: {reason}")]
    UnavailableLedger {
        operation: &'static str,
        address: Address,
        reason: String,
    },

    #[error("Chain client unavailable during {operation} for {address}: {reason}")]
    UnavailableClient {
        operation: &'static str,
        address: Address,
        reason: String,
    },

    #[error("Transaction {tx_hash} rejected by network: {reason}")]
    RejectedByNetwork { tx_hash: TxHash, reason: String },

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
}

/// Keccak-256 of a signed transaction's raw encoding
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(H256);

impl TxHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(H256(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl std::fmt::Debug for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

/// Unsigned EIP-155 legacy transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

impl TransactionRequest {
    /// Hash the account signs: `keccak256(rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]))`
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak256(&stream.out())
    }

    /// Most this transaction can cost in fees
    pub fn fee_ceiling(&self) -> Option<U256> {
        self.gas_price.checked_mul(U256::from(self.gas_limit))
    }

    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        stream.append(&self.to);
        stream.append(&self.value);
        stream.append(&self.data);
    }
}

/// Signed, broadcast-ready transaction
///
/// Owned by the issuing session until [`IssuanceSession::submit`] hands it
/// to the chain client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    request: TransactionRequest,
    authorization: Signature,
    raw: Vec<u8>,
    hash: TxHash,
}

impl SignedTransaction {
    pub fn new(request: TransactionRequest, authorization: Signature) -> Self {
        let v = U256::from(request.chain_id) * U256::from(2u64)
            + U256::from(35u64 + u64::from(authorization.v));

        let mut stream = RlpStream::new_list(9);
        request.append_body(&mut stream);
        stream.append(&v);
        stream.append(&U256::from_big_endian(&authorization.r));
        stream.append(&U256::from_big_endian(&authorization.s));
        let raw = stream.out().to_vec();
        let hash = TxHash::from_bytes(keccak256(&raw));

        Self {
            request,
            authorization,
            raw,
            hash,
        }
    }

    pub fn request(&self) -> &TransactionRequest {
        &self.request
    }

    pub fn nonce(&self) -> u64 {
        self.request.nonce
    }

    pub fn recipient(&self) -> Address {
        self.request.to
    }

    pub fn amount(&self) -> U256 {
        self.request.value
    }

    pub fn fee_ceiling(&self) -> Option<U256> {
        self.request.fee_ceiling()
    }

    pub fn authorization(&self) -> &Signature {
        &self.authorization
    }

    /// RLP encoding for broadcast
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }
}

/// Parameters the builder needs from the wallet configuration
#[derive(Debug, Clone)]
pub struct TxConfig {
    pub chain_id: u64,
    pub transfer_gas_limit: u64,
    pub escrow_gas_limit: u64,
    pub max_fee_rate: U256,
    pub escrow_contract: Option<Address>,
    pub timeout: Duration,
}

impl TxConfig {
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            chain_id: config.chain.chain_id,
            transfer_gas_limit: config.wallet.transfer_gas_limit,
            escrow_gas_limit: config.wallet.escrow_gas_limit,
            max_fee_rate: U256::from(config.wallet.max_fee_rate),
            escrow_contract: config.chain.escrow_contract,
            timeout: config.request_timeout(),
        }
    }
}

#[derive(Debug, Default)]
struct NonceSequencer {
    /// Nonce after the last transaction this process submitted
    next_nonce: Option<u64>,
    /// Nonces of built transactions awaiting submission outside a session
    reserved: BTreeSet<u64>,
}

impl NonceSequencer {
    /// Lowest nonce usable given the chain's view, skipping reservations
    fn resolve(&mut self, chain_nonce: u64) -> Result<u64, TransactionError> {
        // Reservations the chain has already consumed are settled
        self.reserved = self.reserved.split_off(&chain_nonce);

        let mut nonce = match self.next_nonce {
            Some(local) if local > chain_nonce => {
                log::debug!("Chain nonce {} is behind local {}, using local", chain_nonce, local);
                local
            }
            _ => chain_nonce,
        };
        while self.reserved.contains(&nonce) {
            nonce = following(nonce)?;
        }
        following(nonce)?;
        Ok(nonce)
    }

    fn record_submitted(&mut self, nonce: u64, next: u64) {
        self.reserved.remove(&nonce);
        self.next_nonce = Some(self.next_nonce.map_or(next, |current| current.max(next)));
    }
}

fn following(nonce: u64) -> Result<u64, TransactionError> {
    nonce
        .checked_add(1)
        .ok_or(TransactionError::NonceExhausted(nonce))
}

/// Builds and signs transactions for the wallet account
pub struct TransactionBuilder {
    client: Arc<dyn ChainClient>,
    credential: Arc<dyn CredentialStore>,
    config: TxConfig,
    sequencer: Mutex<NonceSequencer>,
}

impl TransactionBuilder {
    pub fn new(
        client: Arc<dyn ChainClient>,
        credential: Arc<dyn CredentialStore>,
        config: TxConfig,
    ) -> Self {
        Self {
            client,
            credential,
            config,
            sequencer: Mutex::new(NonceSequencer::default()),
        }
    }

    /// Wait for exclusive issuance rights
    pub async fn session(&self) -> IssuanceSession<'_> {
        IssuanceSession {
            builder: self,
            sequencer: self.sequencer.lock().await,
        }
    }

    pub fn address(&self) -> Address {
        self.credential.address()
    }

    pub fn config(&self) -> &TxConfig {
        &self.config
    }
}

/// Exclusive window for building and submitting transactions
pub struct IssuanceSession<'a> {
    builder: &'a TransactionBuilder,
    sequencer: MutexGuard<'a, NonceSequencer>,
}

impl<'a> IssuanceSession<'a> {
    /// Build a plain value transfer
    ///
    /// `destination` is validated before any chain call is made.
    pub async fn build_transfer(
        &mut self,
        destination: &str,
        amount: U256,
    ) -> Result<SignedTransaction, TransactionError> {
        let recipient = parse_destination(destination)?;

        let gas_limit = self.builder.config.transfer_gas_limit;
        let gas_price = self.fee_rate().await?;
        self.ensure_funds(amount, fee_ceiling(gas_price, gas_limit)?)
            .await?;
        let nonce = self.next_nonce().await?;

        let tx = self.sign(TransactionRequest {
            nonce,
            gas_price,
            gas_limit,
            to: recipient,
            value: amount,
            data: Vec::new(),
            chain_id: self.builder.config.chain_id,
        })?;

        log::info!(
            "Built transfer {} of {} wei to {} (nonce {})",
            tx.hash(),
            amount,
            recipient,
            nonce
        );
        Ok(tx)
    }

    /// Build the call that funds a new escrow with `amount`
    pub async fn build_escrow_funding(
        &mut self,
        script: &RedeemScript,
        amount: U256,
    ) -> Result<SignedTransaction, TransactionError> {
        let script_hash = script.commitment_hash()?;
        let contract = self.escrow_contract()?;
        if amount.is_zero() {
            return Err(TransactionError::InvalidAmount(
                "escrow funding must be positive".to_string(),
            ));
        }

        let gas_limit = self.builder.config.escrow_gas_limit;
        let gas_price = self.fee_rate().await?;
        self.ensure_funds(amount, fee_ceiling(gas_price, gas_limit)?)
            .await?;
        let nonce = self.next_nonce().await?;

        let tx = self.sign(TransactionRequest {
            nonce,
            gas_price,
            gas_limit,
            to: contract,
            value: amount,
            data: add_transaction_call(script, &script_hash),
            chain_id: self.builder.config.chain_id,
        })?;

        log::info!(
            "Built escrow funding {} for {} ({} wei, nonce {})",
            tx.hash(),
            script.txn_id,
            amount,
            nonce
        );
        Ok(tx)
    }

    /// Build the contract call releasing an escrow to `payouts`
    ///
    /// Authorizations are checked locally first: one per distinct party, each
    /// party a participant, each signature made over these exact terms. The
    /// commitment is then compared with what the chain recorded. When the
    /// script has a timeout that has elapsed, the seller alone suffices.
    pub async fn build_release(
        &mut self,
        script: &RedeemScript,
        payouts: &[Payout],
        authorizations: &[Authorization],
    ) -> Result<SignedTransaction, TransactionError> {
        let script_hash = script.commitment_hash()?;
        let contract = self.escrow_contract()?;
        let payout_total = validate_payouts(payouts)?;

        let mut parties: Vec<&Authorization> = Vec::with_capacity(authorizations.len());
        for authorization in authorizations {
            if !script.is_participant(&authorization.signer) {
                return Err(TransactionError::UnauthorizedParty(authorization.signer));
            }
            if !parties.iter().any(|p| p.signer == authorization.signer) {
                parties.push(authorization);
            }
        }

        let required = usize::from(script.threshold);
        let seller_signed = parties.iter().any(|p| p.signer == script.seller);
        let timeout_escape = script.timeout_hours > 0 && seller_signed;
        if parties.len() < required && !timeout_escape {
            return Err(TransactionError::ThresholdNotMet {
                required,
                provided: parties.len(),
            });
        }

        let digest = release_digest(&contract, &script_hash, payouts);
        for party in &parties {
            match party.verify(&digest) {
                Ok(true) => {}
                Ok(false) => {
                    return Err(TransactionError::InvalidAuthorization {
                        signer: party.signer,
                        reason: "signature does not match the release terms".to_string(),
                    })
                }
                Err(e) => {
                    return Err(TransactionError::InvalidAuthorization {
                        signer: party.signer,
                        reason: e.to_string(),
                    })
                }
            }
        }

        let address = self.builder.address();
        let record = call_with_timeout(
            self.builder.config.timeout,
            self.builder.client.escrow_record(&contract, &script.txn_id),
        )
        .await
        .map_err(|e| unavailable_client("escrow_record", address, e))?;

        let record = match record {
            Some(record) if record.script_hash == script_hash => record,
            other => {
                return Err(TransactionError::ScriptMismatch {
                    script_id: script.txn_id,
                    expected: script_hash,
                    recorded: other.map(|r| r.script_hash),
                })
            }
        };

        if parties.len() < required {
            let unlocks_at = record.opened_at + script.timeout();
            if Utc::now() < unlocks_at {
                return Err(TransactionError::ThresholdNotMet {
                    required,
                    provided: parties.len(),
                });
            }
            log::info!(
                "Escrow {} timed out at {}, releasing on seller authorization",
                script.txn_id,
                unlocks_at
            );
        }

        if payout_total > record.balance {
            return Err(TransactionError::InsufficientFunds {
                needed: payout_total,
                available: record.balance,
            });
        }

        parties.sort_by_key(|p| p.signer);
        let signatures: Vec<Signature> = parties.iter().map(|p| p.signature).collect();

        let gas_limit = self.builder.config.escrow_gas_limit;
        let gas_price = self.fee_rate().await?;
        self.ensure_funds(U256::zero(), fee_ceiling(gas_price, gas_limit)?)
            .await?;
        let nonce = self.next_nonce().await?;

        let tx = self.sign(TransactionRequest {
            nonce,
            gas_price,
            gas_limit,
            to: contract,
            value: U256::zero(),
            data: execute_call(&signatures, &script_hash, payouts),
            chain_id: self.builder.config.chain_id,
        })?;

        log::info!(
            "Built release {} for escrow {} with {} authorization(s) (nonce {})",
            tx.hash(),
            script.txn_id,
            signatures.len(),
            nonce
        );
        Ok(tx)
    }

    /// Broadcast `tx` through the chain client
    ///
    /// Ownership of the transaction passes to the client; on success its
    /// nonce is recorded so later builds never reuse it. The local sequence
    /// never moves backwards, so an older reserved transaction may be
    /// submitted after newer ones.
    pub async fn submit(
        &mut self,
        tx: SignedTransaction,
    ) -> Result<TransactionHandle, TransactionError> {
        let address = self.builder.address();
        let nonce = tx.nonce();
        let next = following(nonce)?;
        let tx_hash = tx.hash();

        let handle = call_with_timeout(self.builder.config.timeout, self.builder.client.submit(&tx))
            .await
            .map_err(|e| match e {
                ChainClientError::Rejected(reason) => {
                    log::warn!("Transaction {} rejected: {}", tx_hash, reason);
                    TransactionError::RejectedByNetwork { tx_hash, reason }
                }
                other => unavailable_client("submit", address, other),
            });

        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                if matches!(e, TransactionError::RejectedByNetwork { .. }) {
                    self.sequencer.reserved.remove(&nonce);
                }
                return Err(e);
            }
        };

        self.sequencer.record_submitted(nonce, next);
        log::info!("Submitted {} (nonce {})", handle.tx_hash, nonce);
        Ok(handle)
    }

    /// Hold `tx`'s nonce for submission after this session ends
    pub fn reserve(&mut self, tx: &SignedTransaction) {
        log::debug!("Reserving nonce {} for {}", tx.nonce(), tx.hash());
        self.sequencer.reserved.insert(tx.nonce());
    }

    /// Give back the nonce of a reserved transaction that will not be sent
    pub fn discard(&mut self, tx: SignedTransaction) {
        if self.sequencer.reserved.remove(&tx.nonce()) {
            log::info!("Discarded {} (nonce {})", tx.hash(), tx.nonce());
        }
    }

    async fn fee_rate(&self) -> Result<U256, TransactionError> {
        let address = self.builder.address();
        let suggested = call_with_timeout(
            self.builder.config.timeout,
            self.builder.client.suggest_fee_rate(),
        )
        .await
        .map_err(|e| unavailable_client("suggest_fee_rate", address, e))?;

        let ceiling = self.builder.config.max_fee_rate;
        if suggested > ceiling {
            return Err(TransactionError::FeeRateExceedsCeiling { suggested, ceiling });
        }
        log::debug!("Using fee rate {} wei", suggested);
        Ok(suggested)
    }

    async fn next_nonce(&mut self) -> Result<u64, TransactionError> {
        let address = self.builder.address();
        let chain_nonce = call_with_timeout(
            self.builder.config.timeout,
            self.builder.client.nonce(&address),
        )
        .await
        .map_err(|e| unavailable_client("nonce", address, e))?;

        self.sequencer.resolve(chain_nonce)
    }

    async fn ensure_funds(&self, amount: U256, fee: U256) -> Result<(), TransactionError> {
        let needed = amount
            .checked_add(fee)
            .ok_or_else(|| TransactionError::AmountOverflow(format!("{} + {}", amount, fee)))?;

        let address = self.builder.address();
        let available = call_with_timeout(
            self.builder.config.timeout,
            self.builder.client.confirmed_balance(&address),
        )
        .await
        .map_err(|e| {
            log::warn!("confirmed_balance failed for {}: {}", address, e);
            TransactionError::UnavailableLedger {
                operation: "confirmed_balance",
                address,
                reason: e.to_string(),
            }
        })?;

        if needed > available {
            return Err(TransactionError::InsufficientFunds { needed, available });
        }
        Ok(())
    }

    fn escrow_contract(&self) -> Result<Address, TransactionError> {
        self.builder
            .config
            .escrow_contract
            .ok_or(TransactionError::EscrowContractNotConfigured)
    }

    fn sign(&self, request: TransactionRequest) -> Result<SignedTransaction, TransactionError> {
        let signature = self.builder.credential.sign(&request.signing_hash())?;
        Ok(SignedTransaction::new(request, signature))
    }
}

/// Parse and vet a transfer destination
pub fn parse_destination(destination: &str) -> Result<Address, TransactionError> {
    let address = Address::parse(destination)
        .map_err(|e| TransactionError::InvalidDestination(format!("{}: {}", destination, e)))?;
    if address.is_zero() {
        return Err(TransactionError::InvalidDestination(
            "zero address".to_string(),
        ));
    }
    Ok(address)
}

fn validate_payouts(payouts: &[Payout]) -> Result<U256, TransactionError> {
    if payouts.is_empty() {
        return Err(TransactionError::InvalidAmount(
            "release needs at least one payout".to_string(),
        ));
    }

    let mut total = U256::zero();
    for payout in payouts {
        if payout.destination.is_zero() {
            return Err(TransactionError::InvalidDestination(
                "zero address".to_string(),
            ));
        }
        if payout.amount.is_zero() {
            return Err(TransactionError::InvalidAmount(format!(
                "zero payout to {}",
                payout.destination
            )));
        }
        total = total
            .checked_add(payout.amount)
            .ok_or_else(|| TransactionError::AmountOverflow("payout total".to_string()))?;
    }
    Ok(total)
}

fn fee_ceiling(gas_price: U256, gas_limit: u64) -> Result<U256, TransactionError> {
    gas_price
        .checked_mul(U256::from(gas_limit))
        .ok_or_else(|| TransactionError::AmountOverflow(format!("{} * {}", gas_price, gas_limit)))
}

fn unavailable_client(
    operation: &'static str,
    address: Address,
    error: ChainClientError,
) -> TransactionError {
    log::warn!("{} failed for {}: {}", operation, address, error);
    TransactionError::UnavailableClient {
        operation,
        address,
        reason: error.to_string(),
    }
}
