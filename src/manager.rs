//! Escrow wallet - Main integration layer
//!
//! Coordinates config, credentials, balance aggregation, escrow scripts and
//! transaction issuance for one account.

use std::sync::Arc;

use primitive_types::U256;

use crate::address::{Address, AddressError};
use crate::chain::{ChainClient, TransactionHandle};
use crate::config::{ConfigError, GlobalConfig};
use crate::escrow::{
    Authorization, CommitmentHash, EscrowParams, Payout, RedeemScript, ScriptError,
};
use crate::storage::credential::{CredentialError, CredentialStore};
use crate::storage::file_system::FileSystemError;
use crate::storage::keys::KeyError;
use crate::wallet::{
    BalanceAggregator, BalanceError, BalanceSnapshot, SignedTransaction, TransactionBuilder,
    TransactionError, TransferEligibility, TxConfig,
};

/// Errors that can occur in the escrow wallet
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("File system error: {0}")]
    FileSystem(#[from] FileSystemError),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),

    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Balance error: {0}")]
    Balance(#[from] BalanceError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

/// A freshly opened escrow as shared with the counterparties
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowCommitment {
    pub script: RedeemScript,
    /// Canonical encoding every party hashes
    pub serialized: Vec<u8>,
    pub script_hash: CommitmentHash,
}

/// Escrow-capable wallet for a single account
///
/// An explicit handle: construct once, share by reference, and call
/// [`EscrowWallet::close`] to release the credential.
pub struct EscrowWallet {
    /// Global configuration
    config: GlobalConfig,

    credential: Arc<dyn CredentialStore>,

    balances: BalanceAggregator,

    /// Sole issuing point for this account's transactions
    builder: TransactionBuilder,
}

impl EscrowWallet {
    /// Create a wallet over a chain client and a signing credential
    ///
    /// # Example
    ///
    /// ```ignore
    /// use escrow_wallet::manager::EscrowWallet;
    /// use escrow_wallet::config::GlobalConfig;
    ///
    /// let config = GlobalConfig::default_dev();
    /// let wallet = EscrowWallet::new(config, client, Arc::new(credential))?;
    /// println!("Wallet address: {}", wallet.address());
    /// ```
    pub fn new(
        config: GlobalConfig,
        client: Arc<dyn ChainClient>,
        credential: Arc<dyn CredentialStore>,
    ) -> Result<Self, ManagerError> {
        config.validate()?;

        let address = credential.address();
        let balances = BalanceAggregator::new(
            client.clone(),
            address,
            U256::from(config.wallet.dust_threshold),
            config.request_timeout(),
        );
        let builder =
            TransactionBuilder::new(client, credential.clone(), TxConfig::from_config(&config));

        log::info!(
            "Escrow wallet ready for {} on {} (chain id {})",
            address,
            config.chain.network,
            config.chain.chain_id
        );

        Ok(Self {
            config,
            credential,
            balances,
            builder,
        })
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// The wallet's account address
    pub fn address(&self) -> Address {
        self.credential.address()
    }

    pub fn current_address(&self) -> Address {
        self.address()
    }

    /// Receive address for a new payment
    ///
    /// Single-account wallet: always the account address.
    pub fn new_address(&self) -> Address {
        self.address()
    }

    /// Confirmed and unconfirmed funds
    pub async fn balance(&self) -> Result<BalanceSnapshot, ManagerError> {
        Ok(self.balances.snapshot().await?)
    }

    /// Confirmed plus unconfirmed funds, or confirmed only
    pub async fn total_balance(&self, confirmed_only: bool) -> Result<U256, ManagerError> {
        Ok(self.balances.balance(confirmed_only).await?)
    }

    /// Whether `amount` is covered by confirmed funds
    pub async fn check_transfer(&self, amount: U256) -> Result<TransferEligibility, ManagerError> {
        Ok(self.balances.eligibility(amount).await?)
    }

    pub fn currency_code(&self) -> &str {
        &self.config.wallet.currency_code
    }

    pub fn is_dust(&self, amount: U256) -> bool {
        self.balances.is_dust(amount)
    }

    /// Send `amount` wei to `destination` and broadcast it
    ///
    /// # Example
    ///
    /// ```ignore
    /// let handle = wallet.transfer("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed", amount).await?;
    /// println!("Sent! tx: {}", handle.tx_hash);
    /// ```
    pub async fn transfer(
        &self,
        destination: &str,
        amount: U256,
    ) -> Result<TransactionHandle, ManagerError> {
        if self.is_dust(amount) {
            log::warn!("Transferring dust amount {} wei to {}", amount, destination);
        }

        let mut session = self.builder.session().await;
        let tx = session.build_transfer(destination, amount).await?;
        Ok(session.submit(tx).await?)
    }

    /// Create the redeem script and commitment for a new escrow
    ///
    /// Pure: nothing touches the chain until the escrow is funded.
    pub fn open_escrow(&self, params: EscrowParams) -> Result<EscrowCommitment, ManagerError> {
        let script = RedeemScript::open(params)?;
        let serialized = script.serialize()?;
        let script_hash = crate::escrow::hash_script(&serialized);

        log::info!(
            "Opened escrow {} (threshold {}, timeout {}h): {}",
            script.txn_id,
            script.threshold,
            script.timeout_hours,
            script_hash
        );

        Ok(EscrowCommitment {
            script,
            serialized,
            script_hash,
        })
    }

    /// Lock `amount` wei into the escrow contract under `script`
    pub async fn fund_escrow(
        &self,
        script: &RedeemScript,
        amount: U256,
    ) -> Result<TransactionHandle, ManagerError> {
        let mut session = self.builder.session().await;
        let tx = session.build_escrow_funding(script, amount).await?;
        Ok(session.submit(tx).await?)
    }

    /// Sign this account's approval of a release
    pub fn authorize_release(
        &self,
        script: &RedeemScript,
        payouts: &[Payout],
    ) -> Result<Authorization, ManagerError> {
        let address = self.address();
        if !script.is_participant(&address) {
            return Err(TransactionError::UnauthorizedParty(address).into());
        }
        let contract = self
            .config
            .chain
            .escrow_contract
            .ok_or(TransactionError::EscrowContractNotConfigured)?;

        let script_hash = script.commitment_hash()?;
        let authorization =
            Authorization::sign(self.credential.as_ref(), &contract, &script_hash, payouts)?;
        log::info!("Authorized release of escrow {} by {}", script.txn_id, address);
        Ok(authorization)
    }

    /// Build, without broadcasting, the release of an escrow
    ///
    /// The returned transaction's nonce stays reserved: other issuance from
    /// this account skips it until it is passed to [`EscrowWallet::submit`]
    /// or [`EscrowWallet::discard`].
    pub async fn build_escrow_transaction(
        &self,
        script: &RedeemScript,
        payouts: &[Payout],
        authorizations: &[Authorization],
    ) -> Result<SignedTransaction, ManagerError> {
        let mut session = self.builder.session().await;
        let tx = session
            .build_release(script, payouts, authorizations)
            .await?;
        session.reserve(&tx);
        Ok(tx)
    }

    /// Build and broadcast the release of an escrow
    pub async fn release_escrow(
        &self,
        script: &RedeemScript,
        payouts: &[Payout],
        authorizations: &[Authorization],
    ) -> Result<TransactionHandle, ManagerError> {
        let mut session = self.builder.session().await;
        let tx = session
            .build_release(script, payouts, authorizations)
            .await?;
        Ok(session.submit(tx).await?)
    }

    /// Broadcast a previously built transaction
    pub async fn submit(&self, tx: SignedTransaction) -> Result<TransactionHandle, ManagerError> {
        let mut session = self.builder.session().await;
        Ok(session.submit(tx).await?)
    }

    /// Drop a built transaction without broadcasting it, freeing its nonce
    pub async fn discard(&self, tx: SignedTransaction) {
        self.builder.session().await.discard(tx);
    }

    /// Release the credential; the wallet cannot sign afterwards
    pub fn close(self) {
        self.credential.lock();
        log::info!("Escrow wallet for {} closed", self.credential.address());
    }
}
