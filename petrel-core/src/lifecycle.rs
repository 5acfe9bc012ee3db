//! Poll lifecycle state machine.
//!
//! Pure transitions, no I/O: an event applied to a phase yields the next
//! phase, and invalid combinations keep the current phase. `petrel-client`
//! drives this machine from the poll task and reads it from the watchdog.

/// Lifecycle phase of the poll loop.
///
/// `Closed → Open → Polling → Scheduled → Polling → … → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Not running. The initial phase, and the terminal phase after close.
    Closed,
    /// Opened, first cycle not yet begun.
    Open,
    /// A cycle is executing.
    Polling,
    /// Waiting out the fixed delay before the next cycle.
    Scheduled,
}

/// Events driving the poll lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// The engine was opened.
    Opened,
    /// A cycle began executing.
    CycleStarted,
    /// A cycle completed and the next one was scheduled.
    CycleFinished,
    /// The closing flag was observed at a cycle boundary.
    Closed,
}

impl PollPhase {
    /// Apply an event, returning the next phase.
    ///
    /// Invalid transitions keep the current phase.
    pub fn on_event(self, event: PhaseEvent) -> PollPhase {
        match (self, event) {
            (Self::Closed, PhaseEvent::Opened) => Self::Open,
            (Self::Open, PhaseEvent::CycleStarted) => Self::Polling,
            (Self::Scheduled, PhaseEvent::CycleStarted) => Self::Polling,
            (Self::Polling, PhaseEvent::CycleFinished) => Self::Scheduled,
            (_, PhaseEvent::Closed) => Self::Closed,

            // Invalid transitions - stay in current phase
            (phase, _) => phase,
        }
    }

    /// Whether the loop is running in any form.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

impl Default for PollPhase {
    fn default() -> Self {
        Self::Closed
    }
}
