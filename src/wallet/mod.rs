//! Account bookkeeping
//!
//! Balance aggregation over the chain client and serialized transaction
//! issuance for the single wallet account.

pub mod balance;
pub mod transaction;

pub use balance::{BalanceAggregator, BalanceError, BalanceSnapshot, TransferEligibility};
pub use transaction::{
    IssuanceSession, SignedTransaction, TransactionBuilder, TransactionError, TransactionRequest,
    TxConfig, TxHash,
};
