//! Metadata Source Port - Market Descriptor Lookup
//!
//! The worker scans one asset per process. The source returns every
//! known binary market for that asset; malformed records are the
//! adapter's problem and never reach the use cases.

use async_trait::async_trait;

use crate::domain::market::MarketDescriptor;

/// Trait for market metadata providers.
#[async_trait]
pub trait MetadataSource: Send + Sync + 'static {
  /// Fetch all well-formed market descriptors for an asset key.
  ///
  /// # Errors
  /// Returns error if the backing store is unreachable.
  async fn markets_for_asset(&self, asset: &str) -> anyhow::Result<Vec<MarketDescriptor>>;
}
