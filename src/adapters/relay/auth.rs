//! Relayer Authentication - Builder HMAC Headers and Request Nonces
//!
//! Builder credentials are optional. When configured, every relayer
//! request carries HMAC-SHA256 headers over
//! `timestamp + method + path + body`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;

use crate::config::RelayConfig;

/// Builder credential headers attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderHeaders {
    pub api_key: String,
    pub timestamp: String,
    pub passphrase: String,
    pub signature: String,
}

impl BuilderHeaders {
    /// Header name/value pairs in wire order.
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("POLY_BUILDER_API_KEY", self.api_key.as_str()),
            ("POLY_BUILDER_TIMESTAMP", self.timestamp.as_str()),
            ("POLY_BUILDER_PASSPHRASE", self.passphrase.as_str()),
            ("POLY_BUILDER_SIGNATURE", self.signature.as_str()),
        ]
    }
}

/// Builder API credentials.
///
/// The secret is never sent, only the computed signature.
pub struct BuilderAuth {
    api_key: String,
    secret: Vec<u8>,
    passphrase: String,
}

impl std::fmt::Debug for BuilderAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderAuth")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

impl BuilderAuth {
    /// Build from raw credentials. A base64url secret is decoded;
    /// anything else is used as raw bytes.
    pub fn new(api_key: String, secret: &str, passphrase: String) -> Self {
        let secret = base64::engine::general_purpose::URL_SAFE
            .decode(secret)
            .unwrap_or_else(|_| secret.as_bytes().to_vec());
        Self {
            api_key,
            secret,
            passphrase,
        }
    }

    /// Credentials from config, when all three are present.
    pub fn from_config(config: &RelayConfig) -> Option<Self> {
        match (
            &config.builder_api_key,
            &config.builder_secret,
            &config.builder_passphrase,
        ) {
            (Some(key), Some(secret), Some(passphrase)) => {
                Some(Self::new(key.clone(), secret, passphrase.clone()))
            }
            _ => None,
        }
    }

    /// Sign `timestamp + method + path + body`, base64url encoded.
    pub fn sign(&self, timestamp: &str, method: &str, path: &str, body: &str) -> String {
        let message = format!("{timestamp}{method}{path}{body}");
        let mac = hmac_sha256::HMAC::mac(message.as_bytes(), &self.secret);
        base64::engine::general_purpose::URL_SAFE.encode(mac)
    }

    /// All builder headers for one request, stamped now.
    pub fn headers(&self, method: &str, path: &str, body: &str) -> BuilderHeaders {
        let timestamp = unix_seconds().to_string();
        let signature = self.sign(&timestamp, method, path, body);
        BuilderHeaders {
            api_key: self.api_key.clone(),
            timestamp,
            passphrase: self.passphrase.clone(),
            signature,
        }
    }
}

/// Monotonic nonce source: millisecond seed plus an atomic counter.
#[derive(Debug)]
pub struct RequestNonce {
    seed: u64,
    counter: AtomicU64,
}

impl Default for RequestNonce {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestNonce {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        Self::with_seed(seed)
    }

    pub const fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            counter: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> u64 {
        self.seed.saturating_add(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
