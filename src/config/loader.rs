//! Configuration Loader - File Overlay, Environment and Validation
//!
//! Reads the optional TOML file, applies environment overrides and
//! validates the result, with clear error messages for misconfiguration.

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use tracing::{debug, info};

use super::{AppConfig, LogFormat, RelayTxType};

/// Environment variable naming the TOML overlay.
pub const CONFIG_PATH_VAR: &str = "MERGER_CONFIG";

/// Overlay path used when `MERGER_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "merger.toml";

/// Upper bound on `max_batch_size`.
pub const MAX_BATCH_SIZE_LIMIT: usize = 100;

/// Load, override and validate configuration from the process environment.
///
/// # Errors
/// Returns detailed error if:
/// - The overlay file exists but can't be read or parsed
/// - An environment variable holds an unparsable value
/// - Validation rules are violated
pub fn load_config(asset_override: Option<&str>) -> Result<AppConfig> {
  let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
  let mut config = read_overlay(Path::new(&path))?;

  apply_env(&mut config, |name| std::env::var(name).ok())?;

  if let Some(asset) = asset_override {
    config.worker.asset = asset.trim().to_ascii_lowercase();
  }

  validate_config(&config)?;

  info!(
    asset = %config.worker.asset,
    interval_ms = config.worker.merge_interval_ms,
    max_batch_size = config.worker.max_batch_size,
    hourly_quota = config.worker.hourly_quota,
    dry_run = config.worker.dry_run,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse the TOML overlay, or fall back to defaults when it is absent.
pub fn read_overlay(path: &Path) -> Result<AppConfig> {
  if !path.exists() {
    debug!(path = %path.display(), "No config file, using defaults");
    return Ok(AppConfig::default());
  }

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  toml::from_str(&content)
    .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Apply environment overrides through `lookup`.
///
/// Empty values count as unset.
pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
  F: Fn(&str) -> Option<String>,
{
  let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

  let worker = &mut config.worker;
  if let Some(v) = get("MERGE_ASSET") {
    worker.asset = v.trim().to_ascii_lowercase();
  }
  set_parsed(&get, "MERGE_INTERVAL_MS", &mut worker.merge_interval_ms)?;
  set_parsed(&get, "BATCH_DELAY_MS", &mut worker.batch_delay_ms)?;
  set_parsed(&get, "MIN_MERGE_AMOUNT", &mut worker.min_merge_amount)?;
  set_parsed(&get, "MAX_BATCH_SIZE", &mut worker.max_batch_size)?;
  set_parsed(&get, "MAX_RELAY_ATTEMPTS", &mut worker.max_relay_attempts)?;
  set_parsed(&get, "RELAY_HOURLY_QUOTA", &mut worker.hourly_quota)?;
  if let Some(v) = get("DRY_RUN") {
    worker.dry_run = parse_bool(&v).with_context(|| format!("Invalid DRY_RUN value '{v}'"))?;
  }

  let relay = &mut config.relay;
  if let Some(v) = get("RELAYER_URL") {
    relay.url = v;
  }
  set_parsed::<RelayTxType, _>(&get, "RELAY_TX_TYPE", &mut relay.tx_type)?;
  set_parsed(&get, "RELAY_POLL_INTERVAL_MS", &mut relay.poll_interval_ms)?;
  set_parsed(&get, "RELAY_MAX_POLLS", &mut relay.max_polls)?;
  for (name, slot) in [
    ("BUILDER_API_KEY", &mut relay.builder_api_key),
    ("BUILDER_SECRET", &mut relay.builder_secret),
    ("BUILDER_PASSPHRASE", &mut relay.builder_passphrase),
  ] {
    if let Some(v) = get(name) {
      *slot = Some(v);
    }
  }

  let chain = &mut config.chain;
  if let Some(v) = get("RPC_URL") {
    chain.rpc_url = v;
  }
  set_parsed(&get, "CHAIN_ID", &mut chain.chain_id)?;
  if let Some(v) = get("ENCRYPTED_KEY") {
    chain.keystore_path = v;
  }
  if let Some(v) = get("PROXY_ADDRESS") {
    chain.proxy_address = Some(parse_value::<Address>("PROXY_ADDRESS", &v)?);
  }
  set_parsed(&get, "CTF_ADDRESS", &mut chain.ctf_address)?;
  set_parsed(&get, "COLLATERAL_ADDRESS", &mut chain.collateral_address)?;

  if let Some(v) = get("REDIS_URL") {
    config.store.redis_url = v;
  }
  if let Some(v) = get("MARKET_KEY_PREFIX") {
    config.store.key_prefix = v;
  }

  if let Some(v) = get("LOG_LEVEL") {
    config.logging.level = v;
  }
  if let Some(v) = get("LOG_FORMAT") {
    config.logging.format = match v.trim().to_ascii_lowercase().as_str() {
      "json" => LogFormat::Json,
      "pretty" => LogFormat::Pretty,
      other => anyhow::bail!("Invalid LOG_FORMAT '{other}', expected json or pretty"),
    };
  }

  if let Some(v) = get("METRICS_BIND") {
    config.metrics.bind_address = Some(v);
  }

  Ok(())
}

/// Validate all configuration parameters.
pub fn validate_config(config: &AppConfig) -> Result<()> {
  let worker = &config.worker;
  anyhow::ensure!(!worker.asset.is_empty(), "Merge asset must not be empty");
  anyhow::ensure!(
    worker.merge_interval_ms > 0,
    "merge_interval_ms must be positive"
  );
  anyhow::ensure!(
    (1..=MAX_BATCH_SIZE_LIMIT).contains(&worker.max_batch_size),
    "max_batch_size must be in [1, {MAX_BATCH_SIZE_LIMIT}], got {}",
    worker.max_batch_size
  );
  anyhow::ensure!(worker.hourly_quota > 0, "hourly_quota must be positive");
  anyhow::ensure!(
    worker.max_relay_attempts >= 1,
    "max_relay_attempts must be at least 1"
  );

  let relay = &config.relay;
  anyhow::ensure!(!relay.url.is_empty(), "Relayer URL must not be empty");
  anyhow::ensure!(relay.poll_interval_ms > 0, "poll_interval_ms must be positive");
  anyhow::ensure!(relay.max_polls > 0, "max_polls must be positive");
  let builder_fields = relay.builder_fields_set();
  anyhow::ensure!(
    builder_fields == 0 || builder_fields == 3,
    "Builder credentials must be set together (BUILDER_API_KEY, BUILDER_SECRET, BUILDER_PASSPHRASE)"
  );

  anyhow::ensure!(!config.chain.rpc_url.is_empty(), "RPC URL must not be empty");
  anyhow::ensure!(
    !config.chain.keystore_path.is_empty(),
    "Keystore path must not be empty"
  );
  anyhow::ensure!(
    !config.store.redis_url.is_empty(),
    "Redis URL must not be empty"
  );
  anyhow::ensure!(
    !config.store.key_prefix.is_empty(),
    "Market key prefix must not be empty"
  );

  Ok(())
}

fn set_parsed<T, G>(get: &G, name: &str, slot: &mut T) -> Result<()>
where
  T: FromStr,
  T::Err: Display,
  G: Fn(&str) -> Option<String>,
{
  if let Some(raw) = get(name) {
    *slot = parse_value(name, &raw)?;
  }
  Ok(())
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: Display,
{
  raw
    .trim()
    .parse()
    .map_err(|e| anyhow::anyhow!("Invalid {name} value '{raw}': {e}"))
}

fn parse_bool(raw: &str) -> Result<bool> {
  match raw.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Ok(true),
    "0" | "false" | "no" | "off" => Ok(false),
    _ => anyhow::bail!("expected true or false"),
  }
}
