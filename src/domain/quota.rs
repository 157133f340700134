//! Relay quota tracking over a rolling one-hour window.
//!
//! The relay allows a fixed number of submissions per hour. The tracker
//! keeps a local estimate; when the relay itself reports that nothing is
//! left, [`QuotaTracker::mark_exhausted`] overrides the estimate.

use std::time::Duration;

use tokio::time::Instant;

/// Length of the quota window.
pub const QUOTA_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Counter of relay calls made in the current window.
#[derive(Debug, Clone)]
pub struct QuotaTracker {
    limit: u32,
    calls_this_window: u32,
    window_start: Instant,
}

impl QuotaTracker {
    /// Create a tracker whose window starts now.
    pub fn new(limit: u32) -> Self {
        Self::starting_at(limit, Instant::now())
    }

    /// Create a tracker whose window starts at `now`.
    pub const fn starting_at(limit: u32, now: Instant) -> Self {
        Self {
            limit,
            calls_this_window: 0,
            window_start: now,
        }
    }

    /// Roll the window if it expired, then report whether a call is allowed.
    pub fn check_and_update(&mut self) -> bool {
        self.check_and_update_at(Instant::now())
    }

    /// Same as [`check_and_update`](Self::check_and_update) with an explicit clock.
    pub fn check_and_update_at(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.window_start) >= QUOTA_WINDOW {
            self.calls_this_window = 0;
            self.window_start = now;
        }
        self.calls_this_window < self.limit
    }

    /// Record one submission that was actually sent.
    pub fn increment(&mut self) {
        self.calls_this_window = self.calls_this_window.saturating_add(1);
    }

    /// Trust the relay: no capacity left until the window rolls.
    pub fn mark_exhausted(&mut self) {
        self.calls_this_window = self.limit;
    }

    pub const fn calls_this_window(&self) -> u32 {
        self.calls_this_window
    }

    pub const fn limit(&self) -> u32 {
        self.limit
    }

    pub const fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.calls_this_window)
    }

    /// Time until the current window rolls over.
    pub fn resets_in_at(&self, now: Instant) -> Duration {
        QUOTA_WINDOW.saturating_sub(now.saturating_duration_since(self.window_start))
    }
}
