//! Integration tests for balance aggregation
//!
//! Tests confirmed/unconfirmed snapshots, transfer eligibility, dust
//! classification, and failure reporting when the ledger is unavailable.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ether, init_logger, MockChainClient};
use escrow_wallet::address::Address;
use escrow_wallet::chain::ChainClientError;
use escrow_wallet::wallet::{BalanceAggregator, BalanceError, BalanceSnapshot};
use primitive_types::U256;

fn aggregator(client: Arc<MockChainClient>, timeout: Duration) -> BalanceAggregator {
    BalanceAggregator::new(
        client,
        Address::from_bytes([0xAA; 20]),
        U256::from(10_000u64),
        timeout,
    )
}

#[tokio::test]
async fn test_snapshot_reports_confirmed_and_pending() {
    init_logger();
    let client = Arc::new(MockChainClient::with_balance(ether(3), ether(1)));
    let balances = aggregator(client, Duration::from_secs(1));

    let snapshot = balances.snapshot().await.expect("ledger available");
    assert_eq!(snapshot, BalanceSnapshot::new(ether(3), ether(1)));
    assert_eq!(snapshot.available(), ether(3));
    assert_eq!(snapshot.total().expect("no overflow"), ether(4));

    assert_eq!(balances.balance(false).await.expect("available"), ether(4));
    assert_eq!(balances.balance(true).await.expect("available"), ether(3));
}

#[tokio::test]
async fn test_snapshot_sum_matches_eligibility_total() {
    let client = Arc::new(MockChainClient::with_balance(
        U256::from(70_000u64),
        U256::from(30_000u64),
    ));
    let balances = aggregator(client, Duration::from_secs(1));

    let snapshot = balances.snapshot().await.expect("ledger available");
    let eligibility = balances
        .eligibility(U256::from(50_000u64))
        .await
        .expect("ledger available");

    assert_eq!(
        snapshot.confirmed + snapshot.unconfirmed,
        eligibility.total,
        "eligibility must see the same total as the snapshot"
    );
    assert_eq!(eligibility.spendable, snapshot.confirmed);
    assert!(eligibility.eligible);
}

#[tokio::test]
async fn test_pending_funds_are_not_spendable() {
    let client = Arc::new(MockChainClient::with_balance(
        U256::from(1_000u64),
        U256::from(1_000_000u64),
    ));
    let balances = aggregator(client, Duration::from_secs(1));

    let eligibility = balances
        .eligibility(U256::from(2_000u64))
        .await
        .expect("ledger available");
    assert!(!eligibility.eligible);
    assert_eq!(eligibility.total, U256::from(1_001_000u64));
}

#[tokio::test]
async fn test_unavailable_client_is_reported_not_zeroed() {
    let client = Arc::new(MockChainClient::new());
    client.fail_with(ChainClientError::Unavailable("connection refused".to_string()));
    let balances = aggregator(client, Duration::from_secs(1));

    let result = balances.snapshot().await;
    match result {
        Err(BalanceError::UnavailableLedger {
            operation,
            address,
            reason,
        }) => {
            assert!(operation == "confirmed_balance" || operation == "pending_balance");
            assert_eq!(address, Address::from_bytes([0xAA; 20]));
            assert!(reason.contains("connection refused"));
        }
        other => panic!("Expected UnavailableLedger, got {:?}", other),
    }
}

#[tokio::test]
async fn test_slow_client_times_out() {
    let client = Arc::new(MockChainClient::new());
    client.set_delay(Duration::from_millis(500));
    let balances = aggregator(client, Duration::from_millis(50));

    let result = balances.balance(false).await;
    assert!(
        matches!(result, Err(BalanceError::UnavailableLedger { .. })),
        "Expected UnavailableLedger on timeout, got {:?}",
        result
    );
}

#[test]
fn test_dust_classification_is_monotonic() {
    let client = Arc::new(MockChainClient::new());
    let balances = aggregator(client, Duration::from_secs(1));

    assert!(balances.is_dust(U256::zero()));
    assert!(balances.is_dust(U256::from(9_999u64)));
    assert!(!balances.is_dust(U256::from(10_000u64)));
    assert!(!balances.is_dust(ether(1)));

    let samples: Vec<U256> = [0u64, 1, 500, 9_998, 9_999, 10_000, 10_001, 1_000_000]
        .iter()
        .map(|v| U256::from(*v))
        .collect();
    for a in &samples {
        for b in &samples {
            if balances.is_dust(*a) && b <= a {
                assert!(balances.is_dust(*b), "{} is dust but {} is not", a, b);
            }
        }
    }
}

#[test]
fn test_snapshot_total_overflow_is_an_error() {
    let snapshot = BalanceSnapshot::new(U256::MAX, U256::one());
    assert!(matches!(
        snapshot.total(),
        Err(BalanceError::Overflow { .. })
    ));
    assert_eq!(snapshot.reported(true).expect("confirmed only"), U256::MAX);
}
