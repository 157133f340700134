//! Chain Adapters - Polygon Blockchain Interaction Layer
//!
//! Provides on-chain access via alloy-rs 0.9 for:
//! - RPC provider management with chain ID validation
//! - CTF outcome token balances
//! - Keystore decryption of the relay signer

pub mod contracts;
pub mod provider;
pub mod signer;

pub use contracts::CtfBalances;
pub use provider::PolygonProvider;
pub use signer::decrypt_keystore;
