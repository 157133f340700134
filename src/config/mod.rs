//! Configuration Module - Layered Worker Configuration
//!
//! Defaults, then an optional `merger.toml`, then environment variables
//! (loaded from `.env` by `main`), then the CLI asset override.
//! Contract addresses and endpoints live here; nothing is hardcoded in
//! the domain layer.

pub mod loader;

use alloy::primitives::{address, Address};
use serde::Deserialize;

/// Top-level worker configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// Cycle timing, thresholds and batching.
  pub worker: WorkerConfig,
  /// Relay endpoint and builder credentials.
  pub relay: RelayConfig,
  /// RPC endpoint, keystore and contract addresses.
  pub chain: ChainConfig,
  /// Market metadata store.
  pub store: StoreConfig,
  pub logging: LoggingConfig,
  pub metrics: MetricsConfig,
}

/// Merge cycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
  /// Asset key scanned by this process (e.g. `btc`).
  pub asset: String,
  /// Sleep between cycles (milliseconds).
  pub merge_interval_ms: u64,
  /// Pause between consecutive batches (milliseconds).
  pub batch_delay_ms: u64,
  /// Minimum mergeable amount in collateral base units (6 decimals).
  pub min_merge_amount: u64,
  /// Transactions per relay call.
  pub max_batch_size: usize,
  /// Submissions per batch before it is marked failed.
  pub max_relay_attempts: u32,
  /// Relay calls allowed per rolling hour.
  pub hourly_quota: u32,
  /// Log batches instead of relaying them.
  pub dry_run: bool,
}

impl Default for WorkerConfig {
  fn default() -> Self {
    Self {
      asset: default_asset(),
      merge_interval_ms: 300_000,
      batch_delay_ms: 5_000,
      min_merge_amount: 1_000_000,
      max_batch_size: 10,
      max_relay_attempts: 3,
      hourly_quota: 100,
      dry_run: false,
    }
  }
}

/// How the relay executes calls for the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelayTxType {
  /// Gnosis Safe proxy wallet.
  #[default]
  Safe,
  /// Polymarket proxy wallet.
  Proxy,
}

impl RelayTxType {
  pub const fn as_str(self) -> &'static str {
    match self {
      Self::Safe => "SAFE",
      Self::Proxy => "PROXY",
    }
  }
}

impl std::str::FromStr for RelayTxType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_uppercase().as_str() {
      "SAFE" => Ok(Self::Safe),
      "PROXY" => Ok(Self::Proxy),
      other => Err(format!("unknown relay tx type '{other}', expected SAFE or PROXY")),
    }
  }
}

/// Relay endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
  /// Relay base URL.
  pub url: String,
  pub tx_type: RelayTxType,
  /// Delay between transaction status polls (milliseconds).
  pub poll_interval_ms: u64,
  /// Polls before a submitted transaction counts as unresolved.
  pub max_polls: u32,
  /// HTTP request timeout (seconds).
  pub timeout_seconds: u64,
  /// Builder API key. Builder credentials are all set or all unset.
  pub builder_api_key: Option<String>,
  pub builder_secret: Option<String>,
  pub builder_passphrase: Option<String>,
}

impl Default for RelayConfig {
  fn default() -> Self {
    Self {
      url: "https://relayer-v2.polymarket.com".to_string(),
      tx_type: RelayTxType::Safe,
      poll_interval_ms: 2_000,
      max_polls: 60,
      timeout_seconds: 30,
      builder_api_key: None,
      builder_secret: None,
      builder_passphrase: None,
    }
  }
}

impl RelayConfig {
  /// Number of builder credential fields that are set.
  pub fn builder_fields_set(&self) -> usize {
    [
      &self.builder_api_key,
      &self.builder_secret,
      &self.builder_passphrase,
    ]
    .iter()
    .filter(|v| v.is_some())
    .count()
  }
}

/// Chain configuration.
///
/// Contract addresses default to Polygon mainnet.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
  /// JSON-RPC endpoint.
  pub rpc_url: String,
  /// Expected chain ID, checked at connect.
  pub chain_id: u64,
  /// Path to the encrypted keystore of the relay signer.
  pub keystore_path: String,
  /// Proxy wallet that owns the positions. Required.
  pub proxy_address: Option<Address>,
  /// ConditionalTokens contract.
  pub ctf_address: Address,
  /// Collateral token (USDC.e).
  pub collateral_address: Address,
}

impl Default for ChainConfig {
  fn default() -> Self {
    Self {
      rpc_url: "https://polygon-rpc.com".to_string(),
      chain_id: 137,
      keystore_path: "keystore.json".to_string(),
      proxy_address: None,
      ctf_address: POLYGON_CTF,
      collateral_address: POLYGON_USDCE,
    }
  }
}

/// Polygon ConditionalTokens deployment.
pub const POLYGON_CTF: Address = address!("4D97DCd97eC945f40cF65F87097ACe5EA0476045");

/// Polygon bridged USDC.
pub const POLYGON_USDCE: Address = address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174");

/// Market metadata store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  pub redis_url: String,
  /// Hash key is `{key_prefix}:{asset}`.
  pub key_prefix: String,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      redis_url: "redis://127.0.0.1:6379".to_string(),
      key_prefix: "markets".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
  #[default]
  Json,
  Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Default filter when `RUST_LOG` is unset.
  pub level: String,
  pub format: LogFormat,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      format: LogFormat::Json,
    }
  }
}

/// Metrics and health endpoint configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
  /// Listener for /metrics, /live and /ready. Disabled when unset.
  pub bind_address: Option<String>,
}

/// Fatal startup conditions reported to the operator before exit.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
  #[error("keystore password not provided (set MERGER_PASSWORD or pass it as the first argument)")]
  MissingPassword,
  #[error("PROXY_ADDRESS is not configured")]
  MissingProxyAddress,
  #[error("failed to decrypt keystore {path}: {reason}")]
  Decryption { path: String, reason: String },
  #[error("keystore {path} does not hold a valid secp256k1 private key")]
  MalformedKey { path: String },
}

// Default value functions

fn default_asset() -> String {
  "btc".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}
