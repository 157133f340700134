//! Per-cycle accounting.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Counts for one scan + execute pass. Logged, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    /// Correlation ID shared by every log line of the cycle.
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Well-formed descriptors returned by the metadata source.
    pub markets: usize,
    pub eligible: usize,
    pub skipped_zero: usize,
    pub skipped_below_min: usize,
    /// Descriptors dropped because a balance read failed.
    pub scan_failed: usize,
    pub batches_submitted: usize,
    /// Candidates merged by successful batches.
    pub merged: usize,
    /// Candidates in batches that ended failed.
    pub errored: usize,
    /// Candidates left for the next cycle because the quota ran out.
    pub deferred: usize,
    /// Whether the quota stopped the cycle early.
    pub quota_exhausted: bool,
}

impl CycleSummary {
    pub fn new(cycle_id: Uuid) -> Self {
        Self {
            cycle_id,
            started_at: Utc::now(),
            markets: 0,
            eligible: 0,
            skipped_zero: 0,
            skipped_below_min: 0,
            scan_failed: 0,
            batches_submitted: 0,
            merged: 0,
            errored: 0,
            deferred: 0,
            quota_exhausted: false,
        }
    }

    /// Every eligible candidate is merged, errored or deferred.
    pub const fn is_balanced(&self) -> bool {
        self.merged + self.errored + self.deferred == self.eligible
    }
}
