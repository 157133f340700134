//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (Redis, blockchain RPC, the relayer HTTP API).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `chain`: Polygon RPC, CTF balances, keystore signer
//! - `metrics`: Prometheus metrics export and health checks
//! - `relay`: relayer client, builder auth, dry run
//! - `store`: market metadata in Redis

pub mod chain;
pub mod metrics;
pub mod relay;
pub mod store;
