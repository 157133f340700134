//! Telemetry Port - Worker Observability Hooks
//!
//! The worker reports what it did; adapters decide where it goes
//! (Prometheus, health probes). All methods are synchronous and cheap.

use std::time::Duration;

use crate::domain::summary::CycleSummary;

/// Sink for worker events.
pub trait WorkerTelemetry: Send + Sync + 'static {
  /// A cycle ran to completion.
  fn cycle_completed(&self, summary: &CycleSummary, elapsed: Duration);

  /// A cycle aborted with an unexpected error.
  fn cycle_failed(&self);

  /// One relay submission was sent.
  fn relay_submitted(&self);

  /// The relay rate-limited a submission.
  fn relay_rate_limited(&self);

  /// Local quota estimate changed.
  fn quota_updated(&self, used: u32, limit: u32);
}

/// Telemetry sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl WorkerTelemetry for NoopTelemetry {
  fn cycle_completed(&self, _summary: &CycleSummary, _elapsed: Duration) {}
  fn cycle_failed(&self) {}
  fn relay_submitted(&self) {}
  fn relay_rate_limited(&self) {}
  fn quota_updated(&self, _used: u32, _limit: u32) {}
}
