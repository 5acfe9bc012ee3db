//! Engine configuration.

use std::time::Duration;

use petrel_types::PollCursor;

/// Default interval between poll cycles.
pub const DEFAULT_POLL_RATE: Duration = Duration::from_secs(2);

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fixed interval between poll cycles. The cadence does not adapt
    /// to load; closing the engine is the only way to stop it.
    pub poll_rate: Duration,
    /// Inbox cursor to resume from, persisted by the caller from earlier
    /// cursor-update events. Empty means fetch from the beginning.
    pub initial_cursor: PollCursor,
    /// Capacity of the event broadcast channel. Slow subscribers see
    /// `Lagged` once more than this many events pile up.
    pub event_capacity: usize,
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            poll_rate: DEFAULT_POLL_RATE,
            initial_cursor: PollCursor::empty(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Set the poll interval.
    pub fn with_poll_rate(mut self, poll_rate: Duration) -> Self {
        self.poll_rate = poll_rate;
        self
    }

    /// Set the cursor to resume polling from.
    pub fn with_initial_cursor(mut self, cursor: PollCursor) -> Self {
        self.initial_cursor = cursor;
        self
    }

    /// Set the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
