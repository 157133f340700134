//! Prometheus Metrics Registry - Merge Worker Observability
//!
//! Registers the worker's counters and gauges and implements the
//! `WorkerTelemetry` port on top of them. Served as text by the
//! health server under `/metrics`.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::domain::summary::CycleSummary;
use crate::ports::telemetry::WorkerTelemetry;

use super::health::HealthState;

/// Centralized Prometheus metrics for the merge worker.
///
/// All metrics follow the naming convention `polymarket_merger_*` and
/// carry an `asset` label so several workers can share one dashboard.
pub struct MetricsRegistry {
    registry: Registry,
    asset: String,
    /// Markets merged (transactions in confirmed batches).
    pub merged: IntCounterVec,
    /// Markets in failed batches.
    pub errored: IntCounterVec,
    /// Markets skipped, by reason.
    pub skipped: IntCounterVec,
    /// Relay submissions sent.
    pub relay_submissions: IntCounterVec,
    /// Relay responses classified as rate limiting.
    pub rate_limited: IntCounterVec,
    /// Cycles by result (`ok` / `failed`).
    pub cycles: IntCounterVec,
    /// Relay calls in the current quota window.
    pub quota_used: IntGauge,
    /// Relay calls left in the current quota window.
    pub quota_remaining: IntGauge,
    /// Wall-clock duration of completed cycles.
    pub cycle_seconds: Histogram,
    health: Arc<HealthState>,
}

impl MetricsRegistry {
    /// Create and register all metrics for one asset.
    pub fn new(asset: &str, health: Arc<HealthState>) -> anyhow::Result<Self> {
        let registry = Registry::new();

        let merged = IntCounterVec::new(
            Opts::new("polymarket_merger_merged_total", "Markets merged"),
            &["asset"],
        )?;
        let errored = IntCounterVec::new(
            Opts::new(
                "polymarket_merger_errored_total",
                "Markets whose merge batch failed",
            ),
            &["asset"],
        )?;
        let skipped = IntCounterVec::new(
            Opts::new("polymarket_merger_skipped_total", "Markets skipped by reason"),
            &["asset", "reason"],
        )?;
        let relay_submissions = IntCounterVec::new(
            Opts::new(
                "polymarket_merger_relay_submissions_total",
                "Relay submissions sent",
            ),
            &["asset"],
        )?;
        let rate_limited = IntCounterVec::new(
            Opts::new(
                "polymarket_merger_relay_rate_limited_total",
                "Relay submissions rejected by rate limiting",
            ),
            &["asset"],
        )?;
        let cycles = IntCounterVec::new(
            Opts::new("polymarket_merger_cycles_total", "Merge cycles by result"),
            &["asset", "result"],
        )?;
        let quota_used = IntGauge::new(
            "polymarket_merger_quota_used",
            "Relay calls counted in the current hourly window",
        )?;
        let quota_remaining = IntGauge::new(
            "polymarket_merger_quota_remaining",
            "Relay calls left in the current hourly window",
        )?;
        let cycle_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "polymarket_merger_cycle_seconds",
                "Duration of completed merge cycles",
            )
            .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0]),
        )?;

        registry.register(Box::new(merged.clone()))?;
        registry.register(Box::new(errored.clone()))?;
        registry.register(Box::new(skipped.clone()))?;
        registry.register(Box::new(relay_submissions.clone()))?;
        registry.register(Box::new(rate_limited.clone()))?;
        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(quota_used.clone()))?;
        registry.register(Box::new(quota_remaining.clone()))?;
        registry.register(Box::new(cycle_seconds.clone()))?;

        Ok(Self {
            registry,
            asset: asset.to_string(),
            merged,
            errored,
            skipped,
            relay_submissions,
            rate_limited,
            cycles,
            quota_used,
            quota_remaining,
            cycle_seconds,
            health,
        })
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    fn add(counter: &IntCounterVec, labels: &[&str], n: usize) {
        counter
            .with_label_values(labels)
            .inc_by(u64::try_from(n).unwrap_or(u64::MAX));
    }
}

impl WorkerTelemetry for MetricsRegistry {
    fn cycle_completed(&self, summary: &CycleSummary, elapsed: Duration) {
        let asset = self.asset.as_str();
        Self::add(&self.merged, &[asset], summary.merged);
        Self::add(&self.errored, &[asset], summary.errored);
        Self::add(&self.skipped, &[asset, "zero"], summary.skipped_zero);
        Self::add(&self.skipped, &[asset, "below_min"], summary.skipped_below_min);
        Self::add(&self.skipped, &[asset, "scan_failed"], summary.scan_failed);
        self.cycles.with_label_values(&[asset, "ok"]).inc();
        self.cycle_seconds.observe(elapsed.as_secs_f64());
        self.health.set_last_cycle_ok(true);
    }

    fn cycle_failed(&self) {
        self.cycles.with_label_values(&[self.asset.as_str(), "failed"]).inc();
        self.health.set_last_cycle_ok(false);
    }

    fn relay_submitted(&self) {
        self.relay_submissions
            .with_label_values(&[self.asset.as_str()])
            .inc();
    }

    fn relay_rate_limited(&self) {
        self.rate_limited.with_label_values(&[self.asset.as_str()]).inc();
    }

    fn quota_updated(&self, used: u32, limit: u32) {
        self.quota_used.set(i64::from(used));
        self.quota_remaining.set(i64::from(limit.saturating_sub(used)));
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_cycle_summary_feeds_counters() {
        let health = Arc::new(HealthState::new());
        let metrics = MetricsRegistry::new("btc", Arc::clone(&health)).unwrap();

        let mut summary = CycleSummary::new(Uuid::nil());
        summary.merged = 7;
        summary.errored = 3;
        summary.skipped_zero = 2;
        metrics.cycle_completed(&summary, Duration::from_secs(4));
        metrics.quota_updated(40, 100);

        assert_eq!(metrics.merged.with_label_values(&["btc"]).get(), 7);
        assert_eq!(metrics.errored.with_label_values(&["btc"]).get(), 3);
        assert_eq!(metrics.skipped.with_label_values(&["btc", "zero"]).get(), 2);
        assert_eq!(metrics.quota_remaining.get(), 60);

        let text = metrics.render().unwrap();
        assert!(text.contains("polymarket_merger_merged_total"));
        assert!(text.contains("polymarket_merger_cycle_seconds"));
    }

    #[test]
    fn test_failed_cycle_clears_readiness() {
        let health = Arc::new(HealthState::new());
        let metrics = MetricsRegistry::new("eth", Arc::clone(&health)).unwrap();

        metrics.cycle_failed();
        assert!(!health.is_ready());

        metrics.cycle_completed(&CycleSummary::new(Uuid::nil()), Duration::ZERO);
        assert!(health.is_ready());
    }
}
