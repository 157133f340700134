//! Integration Tests - Merge Worker Cycles Against Mocked Ports
//!
//! Drives `MergeWorker` through whole cycles with mockall doubles for
//! the metadata store, balance reader and relay. Timer-driven paths run
//! on a paused tokio clock.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{address, Address, B256, U256};
use mockall::mock;
use uuid::Uuid;

use polymarket_merge_bot::adapters::metrics::{HealthState, MetricsRegistry};
use polymarket_merge_bot::domain::batch::TransactionBatch;
use polymarket_merge_bot::domain::market::{MarketDescriptor, PositionId};
use polymarket_merge_bot::domain::merge::MergeTarget;
use polymarket_merge_bot::domain::quota::QuotaTracker;
use polymarket_merge_bot::ports::relay::{RelayError, RelayHandle, RelayOutcome};
use polymarket_merge_bot::ports::telemetry::NoopTelemetry;
use polymarket_merge_bot::usecases::orchestrator::{MergeWorker, WorkerSettings};
use polymarket_merge_bot::usecases::shutdown::{self, ShutdownSignal};

// ---- Mock Definitions ----

mock! {
    pub Metadata {}

    #[async_trait::async_trait]
    impl polymarket_merge_bot::ports::metadata::MetadataSource for Metadata {
        async fn markets_for_asset(&self, asset: &str) -> anyhow::Result<Vec<MarketDescriptor>>;
    }
}

mock! {
    pub Balances {}

    #[async_trait::async_trait]
    impl polymarket_merge_bot::ports::balances::BalanceReader for Balances {
        async fn balance_of(&self, owner: Address, position_id: PositionId) -> anyhow::Result<U256>;
    }
}

mock! {
    pub Relayer {}

    #[async_trait::async_trait]
    impl polymarket_merge_bot::ports::relay::Relay for Relayer {
        async fn execute(&self, batch: &TransactionBatch) -> Result<RelayHandle, RelayError>;
        async fn wait(&self, handle: &RelayHandle) -> Result<Option<RelayOutcome>, RelayError>;
    }
}

// ---- Fixtures ----

const OWNER: Address = address!("00000000000000000000000000000000000000aa");
const ONE_USDC: u64 = 1_000_000;

fn settings() -> WorkerSettings {
    WorkerSettings {
        asset: "btc".to_string(),
        owner: OWNER,
        min_merge_amount: U256::from(ONE_USDC),
        max_batch_size: 10,
        max_attempts: 3,
        merge_interval: Duration::from_secs(300),
        batch_delay: Duration::from_secs(5),
        target: MergeTarget {
            ctf: Address::repeat_byte(0xc7),
            collateral: Address::repeat_byte(0xcc),
        },
    }
}

fn markets(n: u64) -> Vec<MarketDescriptor> {
    (0..n)
        .map(|i| MarketDescriptor {
            condition_id: B256::left_padding_from(&(i + 1).to_be_bytes()),
            yes_token_id: U256::from(2 * i),
            no_token_id: U256::from(2 * i + 1),
            slug: Some(format!("btc-updown-{i}")),
            question: None,
        })
        .collect()
}

fn metadata_with(n: u64) -> MockMetadata {
    let mut metadata = MockMetadata::new();
    metadata
        .expect_markets_for_asset()
        .returning(move |_| Ok(markets(n)));
    metadata
}

fn balances_all(amount: u64) -> MockBalances {
    let mut balances = MockBalances::new();
    balances
        .expect_balance_of()
        .returning(move |_, _| Ok(U256::from(amount)));
    balances
}

fn mined() -> Result<Option<RelayOutcome>, RelayError> {
    Ok(Some(RelayOutcome {
        state: "STATE_MINED".to_string(),
        transaction_hash: Some("0xfeed".to_string()),
        proxy_address: Some(OWNER),
    }))
}

fn handle_for(batch: &TransactionBatch) -> Result<RelayHandle, RelayError> {
    Ok(RelayHandle {
        transaction_id: format!("tx-{}", batch.index),
    })
}

fn worker(
    metadata: MockMetadata,
    balances: MockBalances,
    relay: MockRelayer,
    quota_limit: u32,
) -> MergeWorker<MockMetadata, MockBalances, MockRelayer> {
    MergeWorker::new(
        settings(),
        Arc::new(metadata),
        Arc::new(balances),
        Arc::new(relay),
        QuotaTracker::new(quota_limit),
        Arc::new(NoopTelemetry),
    )
}

// ---- Integration Tests ----

#[tokio::test(start_paused = true)]
async fn test_23_candidates_merge_in_three_batches() {
    let mut relay = MockRelayer::new();
    relay
        .expect_execute()
        .times(3)
        .returning(|batch| {
            let expected = [10, 10, 3][batch.index];
            assert_eq!(batch.len(), expected);
            assert!(batch.label.starts_with(&format!("Merge BTC batch {}/3", batch.index + 1)));
            handle_for(batch)
        });
    relay.expect_wait().times(3).returning(|_| mined());

    let mut worker = worker(metadata_with(23), balances_all(2 * ONE_USDC), relay, 100);
    let mut signal = ShutdownSignal::never();

    let started = tokio::time::Instant::now();
    let summary = worker.run_cycle(Uuid::new_v4(), &mut signal).await.unwrap();

    assert_eq!(summary.markets, 23);
    assert_eq!(summary.eligible, 23);
    assert_eq!(summary.batches_submitted, 3);
    assert_eq!(summary.merged, 23);
    assert_eq!(summary.errored, 0);
    assert_eq!(summary.deferred, 0);
    assert!(summary.is_balanced());
    assert_eq!(worker.quota().calls_this_window(), 3);
    // Two inter-batch delays, none after the last batch.
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_local_quota_defers_remaining_batches() {
    let mut relay = MockRelayer::new();
    relay.expect_execute().times(2).returning(handle_for);
    relay.expect_wait().times(2).returning(|_| mined());

    let mut worker = worker(metadata_with(23), balances_all(2 * ONE_USDC), relay, 2);
    let mut signal = ShutdownSignal::never();

    let summary = worker.run_cycle(Uuid::new_v4(), &mut signal).await.unwrap();

    assert_eq!(summary.batches_submitted, 2);
    assert_eq!(summary.merged, 20);
    assert_eq!(summary.deferred, 3);
    assert!(summary.quota_exhausted);
    assert!(summary.is_balanced());
}

#[tokio::test(start_paused = true)]
async fn test_relay_quota_exhaustion_stops_cycle() {
    let mut relay = MockRelayer::new();
    relay
        .expect_execute()
        .withf(|batch| batch.index == 0)
        .times(1)
        .returning(handle_for);
    relay
        .expect_execute()
        .withf(|batch| batch.index == 1)
        .times(1)
        .returning(|_| {
            Err(RelayError::Rejected {
                status: 429,
                message: "quota exceeded: 0 units remaining, resets in 1800 seconds".into(),
            })
        });
    relay.expect_wait().times(1).returning(|_| mined());

    let mut worker = worker(metadata_with(23), balances_all(2 * ONE_USDC), relay, 100);
    let mut signal = ShutdownSignal::never();

    let summary = worker.run_cycle(Uuid::new_v4(), &mut signal).await.unwrap();

    assert_eq!(summary.merged, 10);
    assert_eq!(summary.errored, 10);
    assert_eq!(summary.deferred, 3);
    assert!(summary.quota_exhausted);
    assert_eq!(worker.quota().remaining(), 0);

    // Next cycle is skipped before touching the store.
    let next = worker.run_cycle(Uuid::new_v4(), &mut signal).await.unwrap();
    assert!(next.quota_exhausted);
    assert_eq!(next.markets, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_retries_then_fails_batch_only() {
    let mut relay = MockRelayer::new();
    relay
        .expect_execute()
        .withf(|batch| batch.index == 0)
        .times(3)
        .returning(|_| {
            Err(RelayError::Rejected {
                status: 429,
                message: "Too Many Requests".into(),
            })
        });
    relay
        .expect_execute()
        .withf(|batch| batch.index == 1)
        .times(1)
        .returning(handle_for);
    relay.expect_wait().times(1).returning(|_| mined());

    let mut worker = worker(metadata_with(13), balances_all(2 * ONE_USDC), relay, 100);
    let mut signal = ShutdownSignal::never();

    let summary = worker.run_cycle(Uuid::new_v4(), &mut signal).await.unwrap();

    assert_eq!(summary.errored, 10);
    assert_eq!(summary.merged, 3);
    assert!(!summary.quota_exhausted);
    assert_eq!(worker.quota().calls_this_window(), 4);
}

#[tokio::test]
async fn test_scan_failures_and_skips_are_counted() {
    let mut balances = MockBalances::new();
    balances.expect_balance_of().returning(|_, id| {
        match id.to::<u64>() {
            // market 0: read fails
            0 => Err(anyhow::anyhow!("rpc timeout")),
            // market 1: one side empty
            2 => Ok(U256::ZERO),
            // market 2: below minimum
            4 => Ok(U256::from(ONE_USDC / 2)),
            _ => Ok(U256::from(3 * ONE_USDC)),
        }
    });

    let mut relay = MockRelayer::new();
    relay
        .expect_execute()
        .times(1)
        .returning(|batch| {
            assert_eq!(batch.len(), 2);
            handle_for(batch)
        });
    relay.expect_wait().times(1).returning(|_| mined());

    let mut worker = worker(metadata_with(5), balances, relay, 100);
    let mut signal = ShutdownSignal::never();

    let summary = worker.run_cycle(Uuid::new_v4(), &mut signal).await.unwrap();

    assert_eq!(summary.markets, 5);
    assert_eq!(summary.scan_failed, 1);
    assert_eq!(summary.skipped_zero, 1);
    assert_eq!(summary.skipped_below_min, 1);
    assert_eq!(summary.eligible, 2);
    assert_eq!(summary.merged, 2);
}

#[tokio::test]
async fn test_metadata_failure_fails_cycle() {
    let mut metadata = MockMetadata::new();
    metadata
        .expect_markets_for_asset()
        .returning(|_| Err(anyhow::anyhow!("connection refused")));
    let mut relay = MockRelayer::new();
    relay.expect_execute().never();

    let mut worker = worker(metadata, MockBalances::new(), relay, 100);
    let mut signal = ShutdownSignal::never();

    let err = worker.run_cycle(Uuid::new_v4(), &mut signal).await.unwrap_err();
    assert!(format!("{err:#}").contains("connection refused"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_cycle_is_retried_after_interval() {
    let (trigger, signal) = shutdown::channel();
    let trigger = Arc::new(trigger);
    let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut seq = mockall::Sequence::new();

    let mut metadata = MockMetadata::new();
    let first = Arc::clone(&calls);
    metadata
        .expect_markets_for_asset()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_| {
            first.lock().unwrap().push(tokio::time::Instant::now());
            Err(anyhow::anyhow!("connection refused"))
        });
    let second = Arc::clone(&calls);
    let on_second = Arc::clone(&trigger);
    metadata
        .expect_markets_for_asset()
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_| {
            second.lock().unwrap().push(tokio::time::Instant::now());
            on_second.trigger();
            Ok(Vec::new())
        });

    let health = Arc::new(HealthState::new());
    let metrics = Arc::new(MetricsRegistry::new("btc", Arc::clone(&health)).unwrap());
    let mut worker = MergeWorker::new(
        settings(),
        Arc::new(metadata),
        Arc::new(MockBalances::new()),
        Arc::new(MockRelayer::new()),
        QuotaTracker::new(100),
        Arc::clone(&metrics) as Arc<dyn polymarket_merge_bot::ports::telemetry::WorkerTelemetry>,
    );

    tokio::time::timeout(Duration::from_secs(3600), worker.run(signal))
        .await
        .expect("worker did not stop");

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1] - calls[0], settings().merge_interval);
    assert_eq!(metrics.cycles.with_label_values(&["btc", "failed"]).get(), 1);
    assert_eq!(metrics.cycles.with_label_values(&["btc", "ok"]).get(), 1);
    assert!(health.is_ready());
}

#[tokio::test]
async fn test_no_candidates_means_no_relay_calls() {
    let mut relay = MockRelayer::new();
    relay.expect_execute().never();

    let mut worker = worker(metadata_with(4), balances_all(0), relay, 100);
    let mut signal = ShutdownSignal::never();

    let summary = worker.run_cycle(Uuid::new_v4(), &mut signal).await.unwrap();
    assert_eq!(summary.skipped_zero, 4);
    assert_eq!(summary.batches_submitted, 0);
    assert_eq!(worker.quota().calls_this_window(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_ends_run_during_interval_sleep() {
    let mut metadata = MockMetadata::new();
    metadata
        .expect_markets_for_asset()
        .times(1)
        .returning(|_| Ok(Vec::new()));

    let mut worker = worker(metadata, MockBalances::new(), MockRelayer::new(), 100);
    let (trigger, signal) = shutdown::channel();

    let handle = tokio::spawn(async move {
        worker.run(signal).await;
    });

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(trigger.trigger());

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("worker did not stop")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_during_batch_delay_defers_rest() {
    let (trigger, mut signal) = shutdown::channel();
    let trigger = Arc::new(trigger);

    let mut relay = MockRelayer::new();
    relay.expect_execute().times(1).returning(handle_for);
    let on_wait = Arc::clone(&trigger);
    relay.expect_wait().times(1).returning(move |_| {
        on_wait.trigger();
        mined()
    });

    let mut worker = worker(metadata_with(23), balances_all(2 * ONE_USDC), relay, 100);

    let summary = worker.run_cycle(Uuid::new_v4(), &mut signal).await.unwrap();

    assert_eq!(summary.merged, 10);
    assert_eq!(summary.deferred, 13);
    assert!(summary.is_balanced());
}
