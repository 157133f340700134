//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use-case layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `MetadataSource`: market descriptors per asset (key-value store)
//! - `BalanceReader`: ERC-1155 position balances (chain RPC)
//! - `Relay`: gasless transaction relay with its own rate limits
//! - `WorkerTelemetry`: metrics and health reporting

pub mod balances;
pub mod metadata;
pub mod relay;
pub mod telemetry;
