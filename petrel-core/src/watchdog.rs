//! Watchdog stall arithmetic.
//!
//! The watchdog's decision is pure: given the timestamp of the last
//! completed cycle and the current time (milliseconds on the same
//! monotonic clock), has the loop been silent for more than
//! [`STALL_FACTOR`] poll intervals? A last-poll value of zero means no
//! cycle has completed yet, which is never a stall.

use std::time::Duration;

/// Poll intervals of silence tolerated before declaring a stall.
pub const STALL_FACTOR: u64 = 50;

/// Decides whether the poll loop has stalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallDetector {
    poll_rate_ms: u64,
}

impl StallDetector {
    /// Create a detector for the given poll rate.
    pub fn new(poll_rate: Duration) -> Self {
        Self {
            poll_rate_ms: poll_rate.as_millis() as u64,
        }
    }

    /// The silence threshold in milliseconds.
    pub fn threshold_ms(&self) -> u64 {
        self.poll_rate_ms.saturating_mul(STALL_FACTOR)
    }

    /// Whether the loop is stalled at `now_ms`, given the last completed
    /// cycle at `last_poll_ms` (0 = no cycle completed yet).
    ///
    /// Saturating subtraction keeps a timestamp ahead of `now_ms` from
    /// underflowing.
    pub fn is_stalled(&self, last_poll_ms: u64, now_ms: u64) -> bool {
        if last_poll_ms == 0 {
            return false;
        }
        now_ms.saturating_sub(last_poll_ms) > self.threshold_ms()
    }
}
