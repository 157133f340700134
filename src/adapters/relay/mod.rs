//! Relayer Adapters
//!
//! Implements the `Relay` port for the gasless relayer API.
//!
//! Sub-modules:
//! - `auth`: builder HMAC headers and request nonces
//! - `client`: signed submission and status polling over HTTP
//! - `dry_run`: log-only relay for rehearsals
//! - `types`: API request/response type definitions

pub mod auth;
pub mod client;
pub mod dry_run;
pub mod types;

pub use auth::BuilderAuth;
pub use client::{RelayClient, RelayClientConfig};
pub use dry_run::DryRunRelay;
