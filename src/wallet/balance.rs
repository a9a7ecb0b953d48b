//! Balance queries and dust classification

use std::sync::Arc;
use std::time::Duration;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::chain::{call_with_timeout, ChainClient};

/// Errors that can occur during balance operations
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("Ledger unavailable during {operation} for {address}: {reason}")]
    UnavailableLedger {
        operation: &'static str,
        address: Address,
        reason: String,
    },

    #[error("Balance overflow: confirmed {confirmed} + unconfirmed {unconfirmed}")]
    Overflow { confirmed: U256, unconfirmed: U256 },
}

/// Confirmed and pending funds of the wallet account (wei)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub confirmed: U256,
    pub unconfirmed: U256,
}

impl BalanceSnapshot {
    pub fn new(confirmed: U256, unconfirmed: U256) -> Self {
        Self {
            confirmed,
            unconfirmed,
        }
    }

    /// Funds usable for spend planning (confirmed only)
    pub fn available(&self) -> U256 {
        self.confirmed
    }

    /// Confirmed plus unconfirmed
    pub fn total(&self) -> Result<U256, BalanceError> {
        self.confirmed
            .checked_add(self.unconfirmed)
            .ok_or(BalanceError::Overflow {
                confirmed: self.confirmed,
                unconfirmed: self.unconfirmed,
            })
    }

    /// Total, or confirmed only when `confirmed_only` is set
    pub fn reported(&self, confirmed_only: bool) -> Result<U256, BalanceError> {
        if confirmed_only {
            Ok(self.confirmed)
        } else {
            self.total()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_zero() && self.unconfirmed.is_zero()
    }
}

/// Whether a requested amount can be spent right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEligibility {
    pub requested: U256,
    /// Confirmed funds
    pub spendable: U256,
    /// Confirmed plus unconfirmed funds
    pub total: U256,
    pub eligible: bool,
}

/// Combines confirmed and pending ledger state for one address
pub struct BalanceAggregator {
    client: Arc<dyn ChainClient>,
    address: Address,
    dust_threshold: U256,
    timeout: Duration,
}

impl BalanceAggregator {
    pub fn new(
        client: Arc<dyn ChainClient>,
        address: Address,
        dust_threshold: U256,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            address,
            dust_threshold,
            timeout,
        }
    }

    /// Query confirmed and pending balances
    ///
    /// Both queries run concurrently. Any client failure is returned as
    /// `UnavailableLedger`; a zero balance is never guessed.
    pub async fn snapshot(&self) -> Result<BalanceSnapshot, BalanceError> {
        let (confirmed, unconfirmed) = tokio::join!(
            call_with_timeout(self.timeout, self.client.confirmed_balance(&self.address)),
            call_with_timeout(self.timeout, self.client.pending_balance(&self.address)),
        );

        let confirmed = confirmed.map_err(|e| self.unavailable("confirmed_balance", e))?;
        let unconfirmed = unconfirmed.map_err(|e| self.unavailable("pending_balance", e))?;

        log::debug!(
            "Balance of {}: confirmed={}, unconfirmed={}",
            self.address,
            confirmed,
            unconfirmed
        );

        Ok(BalanceSnapshot::new(confirmed, unconfirmed))
    }

    /// Total balance, or confirmed funds only when `confirmed_only` is set
    pub async fn balance(&self, confirmed_only: bool) -> Result<U256, BalanceError> {
        self.snapshot().await?.reported(confirmed_only)
    }

    /// Report whether `amount` is covered by confirmed funds
    pub async fn eligibility(&self, amount: U256) -> Result<TransferEligibility, BalanceError> {
        let snapshot = self.snapshot().await?;
        Ok(TransferEligibility {
            requested: amount,
            spendable: snapshot.available(),
            total: snapshot.total()?,
            eligible: amount <= snapshot.available(),
        })
    }

    /// True iff `amount` is strictly below the configured dust threshold
    pub fn is_dust(&self, amount: U256) -> bool {
        amount < self.dust_threshold
    }

    pub fn dust_threshold(&self) -> U256 {
        self.dust_threshold
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn unavailable(
        &self,
        operation: &'static str,
        error: crate::chain::ChainClientError,
    ) -> BalanceError {
        log::warn!("{} failed for {}: {}", operation, self.address, error);
        BalanceError::UnavailableLedger {
            operation,
            address: self.address,
            reason: error.to_string(),
        }
    }
}
