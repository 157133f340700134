//! Execution Engine Use Case - Submit One Batch with Bounded Retries
//!
//! Per-batch state machine:
//!
//! ```text
//!   Attempting ──result──────────────▶ Succeeded
//!       │  ▲
//!       │  └── RateLimited (sleep backoff, attempt < max)
//!       ├──── "0 units remaining" ───▶ QuotaExhausted (stops the cycle)
//!       └──── no result / other error / attempts spent ──▶ Failed
//! ```
//!
//! Every submission consumes one unit of quota, whatever its outcome.
//! The transition function is pure so the termination rules can be
//! tested without timers.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use tracing::{error, info, instrument, warn};

use crate::domain::batch::TransactionBatch;
use crate::domain::quota::QuotaTracker;
use crate::ports::relay::{Relay, RelayError, RelayOutcome};
use crate::ports::telemetry::WorkerTelemetry;

use super::shutdown::ShutdownSignal;

/// Default number of submissions per batch.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// What one submission produced.
#[derive(Debug, Clone)]
pub enum AttemptResult {
  /// The relay reached a terminal state with a result.
  Delivered(RelayOutcome),
  /// The relay returned no usable result.
  NoResult,
  /// Submission or wait raised an error.
  Error(RelayError),
}

/// Next state after an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
  Succeeded(RelayOutcome),
  /// Rate limited with attempts left: sleep, then resubmit the same batch.
  Retry { backoff: Duration },
  /// The relay has no capacity left this hour.
  QuotaExhausted,
  Failed { reason: String },
}

/// Decide the next state. `attempt` is 1-based.
pub fn next_transition(attempt: u32, max_attempts: u32, result: AttemptResult) -> Transition {
  match result {
    AttemptResult::Delivered(outcome) => Transition::Succeeded(outcome),
    AttemptResult::NoResult => Transition::Failed {
      reason: "relay returned no result".to_string(),
    },
    AttemptResult::Error(err) => {
      let signal = err.throttle();
      if signal.quota_exhausted {
        return Transition::QuotaExhausted;
      }
      match signal.backoff() {
        Some(backoff) if attempt < max_attempts => Transition::Retry { backoff },
        Some(_) => Transition::Failed {
          reason: format!("still rate limited after {attempt} attempts: {err}"),
        },
        None => Transition::Failed {
          reason: err.to_string(),
        },
      }
    }
  }
}

/// Terminal status of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
  Succeeded { transaction_hash: Option<String> },
  Failed { reason: String },
  /// No quota left; the orchestrator must stop submitting this cycle.
  QuotaExhausted,
  /// Shutdown arrived during a backoff sleep.
  Interrupted,
}

/// Outcome of executing one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
  pub status: BatchStatus,
  /// Submissions sent for this batch.
  pub attempts: u32,
  pub merged: usize,
  pub errored: usize,
}

impl BatchReport {
  fn succeeded(attempts: u32, size: usize, transaction_hash: Option<String>) -> Self {
    Self {
      status: BatchStatus::Succeeded { transaction_hash },
      attempts,
      merged: size,
      errored: 0,
    }
  }

  fn errored(status: BatchStatus, attempts: u32, size: usize) -> Self {
    Self {
      status,
      attempts,
      merged: 0,
      errored: size,
    }
  }

  /// Whether the remaining batches of the cycle must be skipped.
  pub const fn stops_cycle(&self) -> bool {
    matches!(
      self.status,
      BatchStatus::QuotaExhausted | BatchStatus::Interrupted
    )
  }
}

/// Submits batches to the relay and applies the retry policy.
pub struct ExecutionEngine<R: Relay> {
  relay: Arc<R>,
  max_attempts: u32,
  /// Proxy wallet the relay is expected to execute from.
  expected_proxy: Address,
  telemetry: Arc<dyn WorkerTelemetry>,
}

impl<R: Relay> ExecutionEngine<R> {
  pub fn new(
    relay: Arc<R>,
    max_attempts: u32,
    expected_proxy: Address,
    telemetry: Arc<dyn WorkerTelemetry>,
  ) -> Self {
    Self {
      relay,
      max_attempts: max_attempts.max(1),
      expected_proxy,
      telemetry,
    }
  }

  /// Run the state machine for one batch until it is terminal.
  #[instrument(skip_all, fields(batch = batch.index, size = batch.len()))]
  pub async fn execute(
    &self,
    batch: &TransactionBatch,
    quota: &mut QuotaTracker,
    shutdown: &mut ShutdownSignal,
  ) -> BatchReport {
    let size = batch.len();
    let mut attempt = 1;

    loop {
      quota.increment();
      self.telemetry.relay_submitted();
      self
        .telemetry
        .quota_updated(quota.calls_this_window(), quota.limit());

      info!(
        attempt,
        label = %batch.label,
        quota_used = quota.calls_this_window(),
        quota_limit = quota.limit(),
        "Submitting merge batch"
      );

      let result = self.attempt(batch).await;
      if let AttemptResult::Error(err) = &result {
        if err.throttle().rate_limited {
          self.telemetry.relay_rate_limited();
        }
      }

      match next_transition(attempt, self.max_attempts, result) {
        Transition::Succeeded(outcome) => {
          self.check_proxy(&outcome);
          info!(
            attempt,
            state = %outcome.state,
            tx_hash = outcome.transaction_hash.as_deref().unwrap_or("-"),
            merged = size,
            "Merge batch confirmed"
          );
          return BatchReport::succeeded(attempt, size, outcome.transaction_hash);
        }
        Transition::QuotaExhausted => {
          quota.mark_exhausted();
          self
            .telemetry
            .quota_updated(quota.calls_this_window(), quota.limit());
          warn!(
            attempt,
            errored = size,
            "Relay reports hourly quota exhausted, stopping batches for this cycle"
          );
          return BatchReport::errored(BatchStatus::QuotaExhausted, attempt, size);
        }
        Transition::Failed { reason } => {
          error!(attempt, errored = size, reason = %reason, "Merge batch failed");
          return BatchReport::errored(BatchStatus::Failed { reason }, attempt, size);
        }
        Transition::Retry { backoff } => {
          warn!(
            attempt,
            max_attempts = self.max_attempts,
            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
            "Relay rate limited, backing off"
          );

          if !shutdown.sleep(backoff).await {
            warn!(attempt, errored = size, "Shutdown during backoff, abandoning batch");
            return BatchReport::errored(BatchStatus::Interrupted, attempt, size);
          }

          if !quota.check_and_update() {
            warn!(
              attempt,
              errored = size,
              "Local quota used up before retry, stopping batches for this cycle"
            );
            return BatchReport::errored(BatchStatus::QuotaExhausted, attempt, size);
          }

          attempt += 1;
        }
      }
    }
  }

  async fn attempt(&self, batch: &TransactionBatch) -> AttemptResult {
    let handle = match self.relay.execute(batch).await {
      Ok(handle) => handle,
      Err(err) => return AttemptResult::Error(err),
    };

    match self.relay.wait(&handle).await {
      Ok(Some(outcome)) => AttemptResult::Delivered(outcome),
      Ok(None) => {
        warn!(transaction_id = %handle.transaction_id, "Relay returned no result");
        AttemptResult::NoResult
      }
      Err(err) => AttemptResult::Error(err),
    }
  }

  fn check_proxy(&self, outcome: &RelayOutcome) {
    if let Some(proxy) = outcome.proxy_address {
      if proxy != self.expected_proxy {
        warn!(
          expected = %self.expected_proxy,
          reported = %proxy,
          "Relay executed from an unexpected proxy address"
        );
      }
    }
  }
}
