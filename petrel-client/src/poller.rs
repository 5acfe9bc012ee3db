//! The poll task, its watchdog, and the shared state they drive.
//!
//! One cycle is one concurrent fan-out (a single inbox fetch plus one
//! fetch per registered group), one merge pass, and at most one batch
//! of normalized messages on the event bus. The poll task owns the
//! cursor while it runs and stamps `last_poll_ms` after each cycle;
//! the watchdog reads that timestamp from its own timer and resets it
//! when it reports a stall. Open zeroes the timestamp and close aborts
//! the watchdog, so nothing from one run carries into the next.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::time::{interval, Instant};

use petrel_core::classify::{classify, is_own_group_message, normalize_group_message, Classified};
use petrel_core::cursor::CursorState;
use petrel_core::lifecycle::{PhaseEvent, PollPhase};
use petrel_core::watchdog::{StallDetector, STALL_FACTOR};
use petrel_types::{EngineEvent, NormalizedMessage, PollCursor};

use crate::config::EngineConfig;
use crate::crypto::CryptoIdentity;
use crate::events::EventBus;
use crate::groups::GroupRegistry;
use crate::identity::Identity;
use crate::transport::{AvatarStore, GroupTransport, InboxTransport};

/// Operational counters for one engine instance.
///
/// All counters only ever increase. Reads are approximate while the
/// poll task is mid-cycle.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Completed poll cycles.
    pub cycles_total: AtomicU64,
    /// Inbox fetches degraded to "no new data".
    pub inbox_failures: AtomicU64,
    /// Group fetches degraded to "no new data".
    pub group_failures: AtomicU64,
    /// Normalized messages published in batches.
    pub messages_emitted: AtomicU64,
    /// Envelopes dropped as unclassifiable.
    pub envelopes_dropped: AtomicU64,
    /// Stalls reported by the watchdog.
    pub stalls_detected: AtomicU64,
}

/// Thread-safe holder for the lifecycle phase. All transitions go
/// through the pure [`PollPhase::on_event`] table.
#[derive(Debug)]
pub(crate) struct PhaseCell(StdMutex<PollPhase>);

impl PhaseCell {
    pub(crate) fn new() -> Self {
        Self(StdMutex::new(PollPhase::Closed))
    }

    pub(crate) fn get(&self) -> PollPhase {
        *self.0.lock().unwrap()
    }

    pub(crate) fn apply(&self, event: PhaseEvent) {
        let mut phase = self.0.lock().unwrap();
        *phase = phase.on_event(event);
    }

    /// Atomically transition Closed to Open. Returns false if the
    /// engine was not closed.
    pub(crate) fn begin_open(&self) -> bool {
        let mut phase = self.0.lock().unwrap();
        if *phase != PollPhase::Closed {
            return false;
        }
        *phase = phase.on_event(PhaseEvent::Opened);
        true
    }
}

/// State shared between the facade, the poll task, and the watchdog.
pub(crate) struct EngineShared {
    pub(crate) config: EngineConfig,
    pub(crate) inbox: Arc<dyn InboxTransport>,
    pub(crate) groups: Arc<dyn GroupTransport>,
    pub(crate) avatars: Arc<dyn AvatarStore>,
    pub(crate) crypto: Arc<dyn CryptoIdentity>,
    pub(crate) registry: GroupRegistry,
    pub(crate) events: EventBus,
    pub(crate) metrics: EngineMetrics,
    pub(crate) phase: PhaseCell,
    /// Cooperative close flag, observed at the top of each cycle.
    pub(crate) closing: AtomicBool,
    /// Handle of the running watchdog task. Close takes it and aborts
    /// it; open aborts any stale one it replaces.
    pub(crate) watchdog: StdMutex<Option<tokio::task::JoinHandle<()>>>,
    /// Engine-clock millis of the last completed cycle. 0 means no
    /// cycle has completed yet.
    pub(crate) last_poll_ms: AtomicU64,
    /// Origin of the engine clock. Both the poll task and the watchdog
    /// measure from here.
    pub(crate) origin: Instant,
    pub(crate) identity: tokio::sync::Mutex<Option<Identity>>,
    /// Cursor resume slot: seeded from config, read at open, written
    /// back when the poll task stops.
    pub(crate) cursor: tokio::sync::Mutex<PollCursor>,
}

impl EngineShared {
    /// Millis elapsed on the engine clock.
    pub(crate) fn clock_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// The poll task. Owns the cursor while running.
pub(crate) struct PollLoop {
    shared: Arc<EngineShared>,
    identity: Identity,
    cursor: CursorState,
}

impl PollLoop {
    pub(crate) fn new(shared: Arc<EngineShared>, identity: Identity, initial: PollCursor) -> Self {
        Self {
            shared,
            identity,
            cursor: CursorState::new(initial),
        }
    }

    /// Run cycles at the configured rate until the closing flag is
    /// observed at a cycle boundary.
    pub(crate) async fn run(mut self) {
        tracing::info!(
            "poll loop started (rate {:?}, cursor {:?})",
            self.shared.config.poll_rate,
            self.cursor.current()
        );
        loop {
            if self.shared.closing.load(Ordering::Acquire) {
                break;
            }
            self.shared.phase.apply(PhaseEvent::CycleStarted);
            self.cycle().await;
            // 0 stays reserved for "never completed a cycle".
            self.shared
                .last_poll_ms
                .store(self.shared.clock_ms().max(1), Ordering::Release);
            self.shared
                .metrics
                .cycles_total
                .fetch_add(1, Ordering::Relaxed);
            self.shared.phase.apply(PhaseEvent::CycleFinished);
            tokio::time::sleep(self.shared.config.poll_rate).await;
        }
        *self.shared.cursor.lock().await = self.cursor.current().clone();
        self.shared.phase.apply(PhaseEvent::Closed);
        tracing::info!("poll loop stopped");
    }

    /// One full cycle: fan out, merge, classify, publish.
    async fn cycle(&mut self) {
        let shared = &self.shared;
        let request_cursor = self.cursor.current().clone();

        let (inbox_result, group_results) = tokio::join!(
            shared.inbox.fetch(&self.identity, &request_cursor),
            shared.registry.fetch_all(shared.groups.as_ref()),
        );

        let mut batch: Vec<NormalizedMessage> = Vec::new();

        match inbox_result {
            Ok(page) => {
                if self.cursor.should_advance(&page.cursor) {
                    // Subscribers hear about the new position before the
                    // engine polls with it.
                    shared.events.publish(EngineEvent::CursorUpdated {
                        cursor: page.cursor.clone(),
                    });
                    self.cursor.advance(page.cursor);
                }
                for envelope in page.envelopes {
                    match classify(envelope) {
                        Classified::Message(message) => batch.push(message),
                        Classified::PreKeyBundle(bundle) => {
                            shared.events.publish(EngineEvent::PreKeyBundle(bundle));
                        }
                        Classified::Receipt(receipt) => {
                            shared.events.publish(EngineEvent::Receipt(receipt));
                        }
                        Classified::SessionEstablished(envelope) => {
                            shared
                                .events
                                .publish(EngineEvent::SessionEstablished(envelope));
                        }
                        Classified::Suppressed => {
                            tracing::debug!("suppressing session-reset envelope");
                        }
                        Classified::Unclassified(envelope) => {
                            shared
                                .metrics
                                .envelopes_dropped
                                .fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(
                                "dropping unclassifiable envelope (source {:?})",
                                envelope.source
                            );
                        }
                    }
                }
            }
            Err(e) => {
                shared.metrics.inbox_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("inbox fetch failed, treating as empty: {}", e);
            }
        }

        for (group_id, result) in group_results {
            match result {
                Ok(messages) => {
                    for message in messages {
                        if is_own_group_message(&message, self.identity.pubkey.as_hex()) {
                            continue;
                        }
                        batch.push(normalize_group_message(&group_id, message));
                    }
                }
                Err(e) => {
                    shared.metrics.group_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("group {} fetch failed, treating as empty: {}", group_id, e);
                }
            }
        }

        if !batch.is_empty() {
            shared
                .metrics
                .messages_emitted
                .fetch_add(batch.len() as u64, Ordering::Relaxed);
            shared.events.publish(EngineEvent::Messages(batch));
        }
    }
}

/// Spawn the poll task for an opened engine.
pub(crate) fn spawn_poll_loop(
    shared: Arc<EngineShared>,
    identity: Identity,
    initial: PollCursor,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(PollLoop::new(shared, identity, initial).run())
}

/// Spawn the watchdog task for an opened engine.
///
/// Ticks on its own timer at the poll rate. When the poll task has not
/// completed a cycle for more than [`STALL_FACTOR`] intervals it logs
/// the stall, bumps the counter, and resets the timestamp so the same
/// stall is reported once. Close aborts the task through the stored
/// handle; observing Closed at a tick stops it as well.
pub(crate) fn spawn_watchdog(shared: Arc<EngineShared>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let detector = StallDetector::new(shared.config.poll_rate);
        let mut timer = interval(shared.config.poll_rate);
        loop {
            timer.tick().await;
            if shared.phase.get() == PollPhase::Closed {
                break;
            }
            let last = shared.last_poll_ms.load(Ordering::Acquire);
            let now = shared.clock_ms();
            if detector.is_stalled(last, now) {
                shared
                    .metrics
                    .stalls_detected
                    .fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    "poll loop silent for over {} intervals (last cycle at {}ms, now {}ms)",
                    STALL_FACTOR,
                    last,
                    now
                );
                shared.last_poll_ms.store(now.max(1), Ordering::Release);
            }
        }
        tracing::debug!("watchdog stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_cell_follows_transition_table() {
        let cell = PhaseCell::new();
        assert_eq!(cell.get(), PollPhase::Closed);

        assert!(cell.begin_open());
        assert_eq!(cell.get(), PollPhase::Open);

        cell.apply(PhaseEvent::CycleStarted);
        assert_eq!(cell.get(), PollPhase::Polling);

        cell.apply(PhaseEvent::CycleFinished);
        assert_eq!(cell.get(), PollPhase::Scheduled);

        cell.apply(PhaseEvent::Closed);
        assert_eq!(cell.get(), PollPhase::Closed);
    }

    #[test]
    fn begin_open_claims_exactly_once() {
        let cell = PhaseCell::new();
        assert!(cell.begin_open());
        assert!(!cell.begin_open());
    }

    #[test]
    fn metrics_start_at_zero() {
        let metrics = EngineMetrics::default();
        assert_eq!(metrics.cycles_total.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.inbox_failures.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.stalls_detected.load(Ordering::Relaxed), 0);
    }
}
