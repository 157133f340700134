//! Market Metadata Store Adapters
//!
//! Implements the `MetadataSource` port over Redis.

pub mod redis_store;

pub use redis_store::RedisMarketStore;
