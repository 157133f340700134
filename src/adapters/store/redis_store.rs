//! Redis Market Store - Market Descriptors from a Shared Hash
//!
//! Market discovery runs elsewhere and writes one JSON record per market
//! into the hash `{prefix}:{asset}`. This adapter reads the whole hash
//! with `HGETALL`, drops records it cannot use and returns the rest
//! ordered by hash field so every cycle sees the same order.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::domain::market::{MarketDescriptor, RawMarketRecord};
use crate::ports::metadata::MetadataSource;

/// Market metadata reader over a multiplexed Redis connection.
pub struct RedisMarketStore {
    client: redis::Client,
    key_prefix: String,
    connection: RwLock<Option<MultiplexedConnection>>,
}

impl RedisMarketStore {
    /// Build the client. No connection is made until [`open`](Self::open).
    pub fn new(redis_url: &str, key_prefix: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Invalid Redis URL")?;
        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
            connection: RwLock::new(None),
        })
    }

    /// Connect and keep the multiplexed connection for later reads.
    #[instrument(skip(self))]
    pub async fn open(&self) -> Result<()> {
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;
        *self.connection.write().await = Some(conn);
        info!(prefix = %self.key_prefix, "Market store connected");
        Ok(())
    }

    /// Release the connection. Later reads fail until reopened.
    pub async fn close(&self) {
        if self.connection.write().await.take().is_some() {
            info!("Market store closed");
        }
    }

    /// Hash key holding the records for `asset`.
    pub fn hash_key(&self, asset: &str) -> String {
        format!("{}:{}", self.key_prefix, asset)
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.connection
            .read()
            .await
            .clone()
            .context("Market store is not open")
    }
}

#[async_trait]
impl MetadataSource for RedisMarketStore {
    #[instrument(skip(self))]
    async fn markets_for_asset(&self, asset: &str) -> Result<Vec<MarketDescriptor>> {
        let key = self.hash_key(asset);
        let mut conn = self.connection().await?;

        let entries: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .with_context(|| format!("HGETALL {key} failed"))?;

        let total = entries.len();
        let markets = parse_records(entries);
        debug!(key = %key, total, usable = markets.len(), "Fetched market records");

        Ok(markets)
    }
}

/// Decode hash entries into descriptors, ordered by field name.
///
/// Undecodable or incomplete records are logged and skipped.
pub fn parse_records(entries: HashMap<String, String>) -> Vec<MarketDescriptor> {
    let ordered: BTreeMap<String, String> = entries.into_iter().collect();
    let mut markets = Vec::with_capacity(ordered.len());

    for (field, value) in ordered {
        let raw: RawMarketRecord = match serde_json::from_str(&value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(field = %field, error = %e, "Skipping undecodable market record");
                continue;
            }
        };

        match MarketDescriptor::try_from(raw) {
            Ok(descriptor) => markets.push(descriptor),
            Err(e) => warn!(field = %field, error = %e, "Skipping incomplete market record"),
        }
    }

    markets
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{B256, U256};

    use super::*;

    const CONDITION_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const CONDITION_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn entry(field: &str, json: String) -> (String, String) {
        (field.to_string(), json)
    }

    #[test]
    fn test_parse_sorts_by_field_and_drops_bad_records() {
        let entries = HashMap::from([
            entry(
                "btc-up-or-down-2",
                format!(
                    r#"{{"conditionId":"{CONDITION_B}","upTokenId":"3","downTokenId":"4","slug":"btc-up-or-down-2"}}"#
                ),
            ),
            entry(
                "btc-up-or-down-1",
                format!(
                    r#"{{"condition_id":"{CONDITION_A}","yes_token_id":"1","no_token_id":"2","question":"Bitcoin up?"}}"#
                ),
            ),
            entry("broken", "not json".to_string()),
            entry(
                "incomplete",
                format!(r#"{{"conditionId":"{CONDITION_A}","yesTokenId":"5"}}"#),
            ),
        ]);

        let markets = parse_records(entries);

        assert_eq!(markets.len(), 2);
        assert_eq!(markets[0].condition_id, B256::repeat_byte(0xaa));
        assert_eq!(markets[0].yes_token_id, U256::from(1u64));
        assert_eq!(markets[0].question.as_deref(), Some("Bitcoin up?"));
        assert_eq!(markets[1].condition_id, B256::repeat_byte(0xbb));
        assert_eq!(markets[1].no_token_id, U256::from(4u64));
        assert_eq!(markets[1].slug.as_deref(), Some("btc-up-or-down-2"));
    }

    #[test]
    fn test_hash_key_format() {
        let store = RedisMarketStore::new("redis://127.0.0.1:6379", "markets").unwrap();
        assert_eq!(store.hash_key("btc"), "markets:btc");
    }

    #[tokio::test]
    async fn test_read_before_open_fails() {
        let store = RedisMarketStore::new("redis://127.0.0.1:6379", "markets").unwrap();
        assert!(store.markets_for_asset("btc").await.is_err());
    }
}
