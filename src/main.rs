//! Polymarket Merge Bot - Entry Point
//!
//! Wiring sequence:
//! 1. Load `.env`, parse CLI (password, optional asset)
//! 2. Load config (defaults → merger.toml → env → CLI) + validate
//! 3. Init tracing (JSON or pretty structured logging)
//! 4. Decrypt the keystore signer, resolve the proxy wallet
//! 5. Install SIGINT/SIGTERM handler (one-shot shutdown flag)
//! 6. Connect RPC + CTF balance reader, open the Redis market store
//! 7. Spawn health/metrics server when configured
//! 8. Run the merge worker (relayer or dry run) until shutdown
//! 9. Close the store and exit 0

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};

use polymarket_merge_bot::adapters::chain::{decrypt_keystore, CtfBalances, PolygonProvider};
use polymarket_merge_bot::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use polymarket_merge_bot::adapters::relay::{BuilderAuth, DryRunRelay, RelayClient, RelayClientConfig};
use polymarket_merge_bot::adapters::store::RedisMarketStore;
use polymarket_merge_bot::config::{self, AppConfig, LogFormat, StartupError};
use polymarket_merge_bot::domain::merge::MergeTarget;
use polymarket_merge_bot::domain::quota::QuotaTracker;
use polymarket_merge_bot::ports::relay::Relay;
use polymarket_merge_bot::ports::telemetry::{NoopTelemetry, WorkerTelemetry};
use polymarket_merge_bot::usecases::orchestrator::{MergeWorker, WorkerSettings};
use polymarket_merge_bot::usecases::shutdown::{self, ShutdownSignal, ShutdownTrigger};

/// Merge complementary CTF positions back into collateral.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Keystore password.
    #[arg(env = "MERGER_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Asset to scan (overrides MERGE_ASSET).
    asset: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment + CLI ────────────────────────────────
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // ── 2. Configuration ────────────────────────────────────
    let config = config::loader::load_config(cli.asset.as_deref())
        .context("Failed to load configuration")?;

    // ── 3. Structured logging ───────────────────────────────
    init_tracing(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        asset = %config.worker.asset,
        dry_run = config.worker.dry_run,
        "Starting Polymarket merge worker"
    );

    // ── 4. Credentials ──────────────────────────────────────
    let proxy_wallet = config
        .chain
        .proxy_address
        .ok_or(StartupError::MissingProxyAddress)?;
    let password = cli
        .password
        .filter(|p| !p.is_empty())
        .ok_or(StartupError::MissingPassword)?;
    let signer = decrypt_keystore(Path::new(&config.chain.keystore_path), &password)?;
    drop(password);

    // ── 5. Shutdown signal ──────────────────────────────────
    let (trigger, shutdown_signal) = shutdown::channel();
    let health = Arc::new(HealthState::new());
    let metrics_shutdown = trigger.subscribe();
    tokio::spawn(watch_signals(trigger));

    // ── 6. Chain + metadata store ───────────────────────────
    let provider = Arc::new(
        PolygonProvider::connect(&config.chain.rpc_url, config.chain.chain_id)
            .await
            .context("Failed to connect to chain RPC")?,
    );
    let balances = Arc::new(CtfBalances::new(Arc::clone(&provider), config.chain.ctf_address).await?);

    let store = Arc::new(RedisMarketStore::new(
        &config.store.redis_url,
        &config.store.key_prefix,
    )?);
    store.open().await?;

    // ── 7. Metrics + health ─────────────────────────────────
    let (telemetry, metrics_handle): (Arc<dyn WorkerTelemetry>, _) =
        match &config.metrics.bind_address {
            Some(bind) => {
                let metrics = Arc::new(
                    MetricsRegistry::new(&config.worker.asset, Arc::clone(&health))
                        .context("Failed to register metrics")?,
                );
                let server = HealthServer::new(Arc::clone(&health), Arc::clone(&metrics), bind.clone());
                let handle = tokio::spawn(async move {
                    if let Err(e) = server.run(metrics_shutdown).await {
                        error!(error = %e, "Health server failed");
                    }
                });
                (metrics as Arc<dyn WorkerTelemetry>, Some(handle))
            }
            None => (Arc::new(NoopTelemetry) as Arc<dyn WorkerTelemetry>, None),
        };

    // ── 8. Merge worker ─────────────────────────────────────
    let settings = worker_settings(&config, proxy_wallet);
    if config.worker.dry_run {
        warn!("Dry-run mode: batches are logged, nothing is relayed");
        let relay = Arc::new(DryRunRelay::new(proxy_wallet));
        run_worker(&config, settings, Arc::clone(&store), balances, relay, telemetry, shutdown_signal).await;
    } else {
        let relay = Arc::new(
            RelayClient::new(
                RelayClientConfig::from(&config.relay),
                signer,
                proxy_wallet,
                BuilderAuth::from_config(&config.relay),
            )
            .context("Failed to create relay client")?,
        );
        run_worker(&config, settings, Arc::clone(&store), balances, relay, telemetry, shutdown_signal).await;
    }

    // ── 9. Teardown ─────────────────────────────────────────
    store.close().await;
    if let Some(handle) = metrics_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!("Shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).pretty().init(),
    }
}

fn worker_settings(config: &AppConfig, owner: alloy::primitives::Address) -> WorkerSettings {
    WorkerSettings {
        asset: config.worker.asset.clone(),
        owner,
        min_merge_amount: U256::from(config.worker.min_merge_amount),
        max_batch_size: config.worker.max_batch_size,
        max_attempts: config.worker.max_relay_attempts,
        merge_interval: Duration::from_millis(config.worker.merge_interval_ms),
        batch_delay: Duration::from_millis(config.worker.batch_delay_ms),
        target: MergeTarget {
            ctf: config.chain.ctf_address,
            collateral: config.chain.collateral_address,
        },
    }
}

async fn run_worker<R: Relay>(
    config: &AppConfig,
    settings: WorkerSettings,
    store: Arc<RedisMarketStore>,
    balances: Arc<CtfBalances>,
    relay: Arc<R>,
    telemetry: Arc<dyn WorkerTelemetry>,
    shutdown: ShutdownSignal,
) {
    let quota = QuotaTracker::new(config.worker.hourly_quota);
    let mut worker = MergeWorker::new(settings, store, balances, relay, quota, telemetry);
    worker.run(shutdown).await;
}

/// Flip the shutdown flag on the first SIGINT/SIGTERM; log and ignore repeats.
async fn watch_signals(trigger: ShutdownTrigger) {
    let mut terminate = sigterm_stream();

    loop {
        let name = tokio::select! {
            result = signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for SIGINT");
                    return;
                }
                "SIGINT"
            }
            () = next_sigterm(&mut terminate) => "SIGTERM",
        };

        if trigger.trigger() {
            info!(signal = name, "Shutdown requested, finishing current step");
        } else {
            warn!(signal = name, "Shutdown already in progress, ignoring signal");
        }
    }
}

#[cfg(unix)]
type TermStream = Option<signal::unix::Signal>;

#[cfg(not(unix))]
type TermStream = Option<()>;

#[cfg(unix)]
fn sigterm_stream() -> TermStream {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(error = %e, "SIGTERM handler unavailable");
            None
        }
    }
}

#[cfg(not(unix))]
fn sigterm_stream() -> TermStream {
    None
}

#[cfg(unix)]
async fn next_sigterm(stream: &mut TermStream) {
    if let Some(s) = stream {
        if s.recv().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await;
}

#[cfg(not(unix))]
async fn next_sigterm(_stream: &mut TermStream) {
    std::future::pending::<()>().await;
}
