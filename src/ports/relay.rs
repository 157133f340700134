//! Relay Port - Gasless Transaction Submission
//!
//! The relay executes a list of calls from the proxy wallet and hands
//! back a handle that resolves to a terminal state. It enforces its own
//! rate limits and reports them through [`RelayError`].

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::domain::batch::TransactionBatch;
use crate::domain::throttle::{self, ThrottleSignal};

/// Reference to a submitted relay transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayHandle {
  /// Relay-assigned transaction ID.
  pub transaction_id: String,
}

/// Terminal result of a relay transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
  /// Terminal state reported by the relay (e.g. `STATE_MINED`).
  pub state: String,
  /// On-chain transaction hash, when the relay reports one.
  pub transaction_hash: Option<String>,
  /// Proxy wallet that executed the calls.
  pub proxy_address: Option<Address>,
}

/// Errors raised by relay calls.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RelayError {
  /// The relay answered with a non-success HTTP status.
  #[error("relay rejected request with HTTP {status}: {message}")]
  Rejected {
    /// HTTP status code.
    status: u16,
    /// Response body or error message.
    message: String,
  },
  /// Network or protocol failure before a response was read.
  #[error("relay transport error: {0}")]
  Transport(String),
  /// Response body did not match the expected shape.
  #[error("relay response could not be decoded: {0}")]
  Decode(String),
  /// Local failure while preparing the request (e.g. signing).
  #[error("relay request could not be prepared: {0}")]
  Request(String),
}

impl RelayError {
  /// HTTP status, if the relay produced one.
  pub const fn status(&self) -> Option<u16> {
    match self {
      Self::Rejected { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// Throttling information carried by this error.
  pub fn throttle(&self) -> ThrottleSignal {
    throttle::classify_error(self.status(), &self.to_string())
  }
}

/// Trait for transaction relay providers.
#[async_trait]
pub trait Relay: Send + Sync + 'static {
  /// Submit all transactions of a batch under its label.
  ///
  /// # Errors
  /// Returns [`RelayError`] on rejection (including rate limiting).
  async fn execute(&self, batch: &TransactionBatch) -> Result<RelayHandle, RelayError>;

  /// Wait until the transaction reaches a terminal state.
  ///
  /// Returns `Ok(None)` when the relay gives no usable result
  /// (failed on-chain, invalid, or never settled).
  async fn wait(&self, handle: &RelayHandle) -> Result<Option<RelayOutcome>, RelayError>;
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[test]
  fn test_rejected_429_is_rate_limited() {
    let err = RelayError::Rejected {
      status: 429,
      message: "rate limit exceeded, resets in 12 seconds".into(),
    };
    assert_eq!(err.throttle().backoff(), Some(Duration::from_secs(17)));
  }

  #[test]
  fn test_server_error_with_429_digits_is_not_retryable() {
    let err = RelayError::Rejected {
      status: 500,
      message: "execution reverted for nonce 14290".into(),
    };
    assert!(!err.throttle().rate_limited);
    assert_eq!(err.throttle().backoff(), None);
  }

  #[test]
  fn test_transport_error_is_not_retryable() {
    let err = RelayError::Transport("connection reset".into());
    assert_eq!(err.status(), None);
    assert_eq!(err.throttle().backoff(), None);
  }
}
