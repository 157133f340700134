//! Polygon RPC Provider - alloy-rs 0.9 Connection Management
//!
//! Connects to the configured RPC endpoint, checks the chain ID once at
//! startup and hands out a shared, type-erased provider.

use std::sync::Arc;

use alloy::providers::{Provider, ProviderBuilder};
use anyhow::{bail, Context, Result};
use tracing::{info, instrument};

/// Shared RPC provider backed by alloy-rs 0.9.
///
/// Built with `on_builtin` so the transport is boxed and the provider can
/// be stored as `dyn Provider` across the adapter layer.
pub struct PolygonProvider {
    provider: Arc<dyn Provider + Send + Sync>,
    chain_id: u64,
}

impl PolygonProvider {
    /// Connect and verify that the endpoint serves `expected_chain_id`.
    #[instrument(skip_all, fields(expected_chain_id))]
    pub async fn connect(rpc_url: &str, expected_chain_id: u64) -> Result<Self> {
        let provider = ProviderBuilder::new()
            .on_builtin(rpc_url)
            .await
            .context("Failed to connect to RPC endpoint")?;
        let provider: Arc<dyn Provider + Send + Sync> = Arc::new(provider);

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Failed to query chain ID")?;

        if chain_id != expected_chain_id {
            bail!("Expected chain_id={expected_chain_id}, RPC reports {chain_id}");
        }

        info!(chain_id, "Connected to RPC");

        Ok(Self { provider, chain_id })
    }

    /// Get a shared reference to the alloy provider (type-erased).
    pub fn inner(&self) -> Arc<dyn Provider + Send + Sync> {
        Arc::clone(&self.provider)
    }

    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }
}
