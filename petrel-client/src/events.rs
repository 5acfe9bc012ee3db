//! Event fan-out to engine subscribers.

use tokio::sync::broadcast;

use petrel_types::EngineEvent;

/// Receiver half of the engine event stream.
pub type EventReceiver = broadcast::Receiver<EngineEvent>;

/// Broadcast fan-out for [`EngineEvent`]s.
///
/// Publishing never blocks and never fails: with no subscribers the
/// event is dropped, and a slow subscriber observes `Lagged` on its
/// receiver instead of back-pressuring the poll loop.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> EventReceiver {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}
