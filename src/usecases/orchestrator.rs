//! Merge Worker Use Case - Scan, Batch, Execute, Sleep
//!
//! Owns the process-lifetime state (quota tracker) and drives one cycle
//! per merge interval:
//! 1. Check the relay quota
//! 2. Fetch market descriptors for the asset
//! 3. Scan balances and classify markets
//! 4. Build bounded batches of merge transactions
//! 5. Execute batches one by one, re-checking quota before each
//! 6. Log the cycle summary and sleep
//!
//! A failed cycle is logged and retried on the next interval; it never
//! stops the worker. Only the shutdown signal does.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::domain::batch::{BatchBuilder, TransactionBatch};
use crate::domain::merge::MergeTarget;
use crate::domain::quota::QuotaTracker;
use crate::domain::summary::CycleSummary;
use crate::ports::balances::BalanceReader;
use crate::ports::metadata::MetadataSource;
use crate::ports::relay::Relay;
use crate::ports::telemetry::WorkerTelemetry;

use super::executor::{BatchStatus, ExecutionEngine};
use super::scanner::CandidateScanner;
use super::shutdown::ShutdownSignal;

/// Static parameters of the worker, resolved from config at startup.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
  /// Asset key scanned by this process (e.g. `btc`).
  pub asset: String,
  /// Proxy wallet holding the positions.
  pub owner: Address,
  /// Minimum mergeable amount in raw units.
  pub min_merge_amount: U256,
  /// Maximum transactions per relay call.
  pub max_batch_size: usize,
  /// Submissions per batch before giving up.
  pub max_attempts: u32,
  /// Sleep between cycles.
  pub merge_interval: Duration,
  /// Pause between consecutive batches of a cycle.
  pub batch_delay: Duration,
  /// Merge call target and collateral.
  pub target: MergeTarget,
}

/// The long-running merge worker.
pub struct MergeWorker<M: MetadataSource, B: BalanceReader, R: Relay> {
  metadata: Arc<M>,
  scanner: CandidateScanner<B>,
  builder: BatchBuilder,
  engine: ExecutionEngine<R>,
  quota: QuotaTracker,
  settings: WorkerSettings,
  telemetry: Arc<dyn WorkerTelemetry>,
}

impl<M: MetadataSource, B: BalanceReader, R: Relay> MergeWorker<M, B, R> {
  /// Wire the worker from its collaborators and owned quota state.
  pub fn new(
    settings: WorkerSettings,
    metadata: Arc<M>,
    balances: Arc<B>,
    relay: Arc<R>,
    quota: QuotaTracker,
    telemetry: Arc<dyn WorkerTelemetry>,
  ) -> Self {
    let scanner = CandidateScanner::new(balances, settings.owner, settings.min_merge_amount);
    let builder = BatchBuilder::new(settings.target, settings.max_batch_size);
    let engine = ExecutionEngine::new(
      relay,
      settings.max_attempts,
      settings.owner,
      Arc::clone(&telemetry),
    );

    Self {
      metadata,
      scanner,
      builder,
      engine,
      quota,
      settings,
      telemetry,
    }
  }

  /// Current quota state.
  pub const fn quota(&self) -> &QuotaTracker {
    &self.quota
  }

  /// Run cycles until shutdown is requested.
  pub async fn run(&mut self, mut shutdown: ShutdownSignal) {
    info!(
      asset = %self.settings.asset,
      owner = %self.settings.owner,
      interval_ms = millis(self.settings.merge_interval),
      batch_delay_ms = millis(self.settings.batch_delay),
      max_batch_size = self.settings.max_batch_size,
      quota_limit = self.quota.limit(),
      "Merge worker started"
    );

    while !shutdown.is_requested() {
      let cycle_id = Uuid::new_v4();
      let span = info_span!("merge_cycle", %cycle_id, asset = %self.settings.asset);
      let started = Instant::now();

      match self.run_cycle(cycle_id, &mut shutdown).instrument(span).await {
        Ok(summary) => self.telemetry.cycle_completed(&summary, started.elapsed()),
        Err(e) => {
          error!(%cycle_id, error = format!("{e:#}"), "Merge cycle failed");
          self.telemetry.cycle_failed();
        }
      }

      if shutdown.is_requested() {
        break;
      }
      debug!(
        sleep_ms = millis(self.settings.merge_interval),
        "Sleeping until next cycle"
      );
      if !shutdown.sleep(self.settings.merge_interval).await {
        break;
      }
    }

    info!("Merge worker stopped");
  }

  /// Run one scan + execute pass.
  ///
  /// # Errors
  /// Returns error only for cycle-wide failures (metadata unreachable).
  /// Per-market and per-batch failures are counted in the summary.
  pub async fn run_cycle(
    &mut self,
    cycle_id: Uuid,
    shutdown: &mut ShutdownSignal,
  ) -> Result<CycleSummary> {
    let mut summary = CycleSummary::new(cycle_id);

    if !self.quota.check_and_update() {
      summary.quota_exhausted = true;
      warn!(
        used = self.quota.calls_this_window(),
        limit = self.quota.limit(),
        resets_in_secs = self.quota.resets_in_at(Instant::now()).as_secs(),
        "Relay quota exhausted, skipping cycle"
      );
      return Ok(summary);
    }

    let markets = self
      .metadata
      .markets_for_asset(&self.settings.asset)
      .await
      .context("Failed to fetch market metadata")?;
    summary.markets = markets.len();

    let report = self.scanner.scan(&markets).await;
    summary.eligible = report.candidates.len();
    summary.skipped_zero = report.skipped_zero;
    summary.skipped_below_min = report.skipped_below_min;
    summary.scan_failed = report.failed;

    info!(
      markets = summary.markets,
      eligible = summary.eligible,
      skipped_zero = summary.skipped_zero,
      skipped_below_min = summary.skipped_below_min,
      scan_failed = summary.scan_failed,
      "Scan complete"
    );

    if report.candidates.is_empty() {
      info!("No mergeable positions this cycle");
      return Ok(summary);
    }

    let batches = self.builder.build(&self.settings.asset, &report.candidates);
    info!(
      batches = batches.len(),
      max_batch_size = self.builder.max_batch_size(),
      "Built merge batches"
    );

    self.execute_batches(&batches, &mut summary, shutdown).await;

    info!(
      merged = summary.merged,
      errored = summary.errored,
      deferred = summary.deferred,
      batches_submitted = summary.batches_submitted,
      quota_exhausted = summary.quota_exhausted,
      quota_used = self.quota.calls_this_window(),
      "Merge cycle complete"
    );

    Ok(summary)
  }

  async fn execute_batches(
    &mut self,
    batches: &[TransactionBatch],
    summary: &mut CycleSummary,
    shutdown: &mut ShutdownSignal,
  ) {
    for (i, batch) in batches.iter().enumerate() {
      if shutdown.is_requested() {
        summary.deferred += pending(&batches[i..]);
        warn!(deferred = summary.deferred, "Shutdown requested, deferring remaining batches");
        return;
      }

      if !self.quota.check_and_update() {
        summary.quota_exhausted = true;
        summary.deferred += pending(&batches[i..]);
        warn!(
          remaining_batches = batches.len() - i,
          deferred = summary.deferred,
          "Relay quota exhausted, deferring remaining batches to next cycle"
        );
        return;
      }

      let report = self.engine.execute(batch, &mut self.quota, shutdown).await;
      summary.batches_submitted += 1;
      summary.merged += report.merged;
      summary.errored += report.errored;

      if report.stops_cycle() {
        if report.status == BatchStatus::QuotaExhausted {
          summary.quota_exhausted = true;
        }
        summary.deferred += pending(&batches[i + 1..]);
        return;
      }

      let is_last = i + 1 == batches.len();
      if !is_last && !shutdown.sleep(self.settings.batch_delay).await {
        summary.deferred += pending(&batches[i + 1..]);
        warn!(deferred = summary.deferred, "Shutdown requested, deferring remaining batches");
        return;
      }
    }
  }
}

fn pending(batches: &[TransactionBatch]) -> usize {
  batches.iter().map(TransactionBatch::len).sum()
}

fn millis(duration: Duration) -> u64 {
  u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
