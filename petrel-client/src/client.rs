//! SyncEngine - the public interface of petrel.
//!
//! # Architecture
//!
//! The engine owns no sockets and no key derivation: four injected
//! ports (inbox, groups, avatars, crypto) do all the work on the edge,
//! `petrel-core` supplies the decision rules, and a background poll
//! task merges every source into one broadcast event stream.
//!
//! ```text
//! Application code
//!       |
//!   SyncEngine ----> InboxTransport / GroupTransport / AvatarStore / CryptoIdentity
//!       |
//!   poll task + watchdog ----> EngineEvent stream
//! ```
//!
//! # Example
//!
//! ```ignore
//! use petrel_client::{
//!     EngineConfig, LoadIdentityOptions, MockAvatarStore, MockCrypto, MockGroupServer,
//!     MockInbox, SyncEngine,
//! };
//!
//! let engine = SyncEngine::new(
//!     EngineConfig::new(),
//!     MockInbox::new(),
//!     MockGroupServer::new(),
//!     MockAvatarStore::new(),
//!     MockCrypto::new(),
//! );
//! let mut events = engine.subscribe();
//! engine.load_identity(LoadIdentityOptions::generate()).await?;
//! engine.open().await?;
//! while let Ok(event) = events.recv().await {
//!     // handle EngineEvent
//! }
//! engine.close();
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use thiserror::Error;
use tokio::time::Instant;

use petrel_core::lifecycle::PollPhase;
use petrel_types::{EngineEvent, OutboundMessage, PubKey, SendOptions};

use crate::avatar;
use crate::config::EngineConfig;
use crate::crypto::{CryptoError, CryptoIdentity};
use crate::events::{EventBus, EventReceiver};
use crate::groups::{GroupError, GroupRegistration, GroupRegistry};
use crate::identity::{Identity, LoadIdentityOptions, LoadedIdentity};
use crate::poller::{spawn_poll_loop, spawn_watchdog, EngineMetrics, EngineShared, PhaseCell};
use crate::transport::{AvatarPointer, AvatarStore, GroupTransport, InboxTransport, TransportError};

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No identity is loaded, or the crypto provider produced an
    /// unusable one.
    #[error("identity not ready: {0}")]
    IdentityNotReady(String),

    /// The engine is already open (or an identity load raced with it).
    #[error("engine is already open")]
    AlreadyOpen,

    /// A transport operation failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The crypto provider failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A group operation failed.
    #[error(transparent)]
    Group(#[from] GroupError),

    /// An avatar decryption key did not decode.
    #[error("invalid avatar key: {0}")]
    AvatarKey(#[from] base64::DecodeError),
}

/// The petrel sync engine.
///
/// Create one per account, subscribe to its events, load an identity,
/// then [`open`](SyncEngine::open) it. All methods take `&self`; the
/// engine is internally synchronized and can be shared across tasks.
pub struct SyncEngine {
    shared: Arc<EngineShared>,
}

impl SyncEngine {
    /// Create an engine over the four ports. Nothing happens on the
    /// network until [`open`](SyncEngine::open).
    pub fn new<I, G, A, C>(config: EngineConfig, inbox: I, groups: G, avatars: A, crypto: C) -> Self
    where
        I: InboxTransport + 'static,
        G: GroupTransport + 'static,
        A: AvatarStore + 'static,
        C: CryptoIdentity + 'static,
    {
        let events = EventBus::new(config.event_capacity);
        let initial_cursor = config.initial_cursor.clone();
        Self {
            shared: Arc::new(EngineShared {
                config,
                inbox: Arc::new(inbox),
                groups: Arc::new(groups),
                avatars: Arc::new(avatars),
                crypto: Arc::new(crypto),
                registry: GroupRegistry::new(),
                events,
                metrics: EngineMetrics::default(),
                phase: PhaseCell::new(),
                closing: AtomicBool::new(false),
                watchdog: StdMutex::new(None),
                last_poll_ms: AtomicU64::new(0),
                origin: Instant::now(),
                identity: tokio::sync::Mutex::new(None),
                cursor: tokio::sync::Mutex::new(initial_cursor),
            }),
        }
    }

    /// Subscribe to the engine's event stream. Events published before
    /// this call are not replayed.
    pub fn subscribe(&self) -> EventReceiver {
        self.shared.events.subscribe()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> PollPhase {
        self.shared.phase.get()
    }

    /// Operational counters for this engine instance.
    pub fn metrics(&self) -> &EngineMetrics {
        &self.shared.metrics
    }

    /// Load (or generate) the account identity.
    ///
    /// With seed words the keypair is derived deterministically; without
    /// them a fresh one is generated and the recovery words are returned
    /// exactly once in [`LoadedIdentity::generated_words`]. Loading also
    /// acquires a file-server token (published as
    /// [`EngineEvent::FileServerToken`]) and reconciles the local avatar
    /// bytes, both best-effort: their failures are logged, not returned.
    ///
    /// Fails with [`EngineError::AlreadyOpen`] unless the engine is
    /// closed.
    pub async fn load_identity(
        &self,
        options: LoadIdentityOptions,
    ) -> Result<LoadedIdentity, EngineError> {
        if self.shared.phase.get() != PollPhase::Closed {
            return Err(EngineError::AlreadyOpen);
        }

        let (keypair, generated_words) = match options.seed_words.as_deref() {
            Some(words) => (self.shared.crypto.derive_from_seed(words)?, None),
            None => {
                let generated = self.shared.crypto.generate()?;
                (generated.keypair, Some(generated.words))
            }
        };

        let pubkey = PubKey::parse(keypair.public_hex())
            .map_err(|e| EngineError::IdentityNotReady(format!("unusable public key: {}", e)))?;

        let mut identity = Identity {
            pubkey: pubkey.clone(),
            keypair,
            display_name: options.display_name.clone(),
            avatar: None,
        };

        match self.shared.avatars.fetch_token(&identity).await {
            Ok(token) => self
                .shared
                .events
                .publish(EngineEvent::FileServerToken { token }),
            Err(e) => tracing::warn!("file server token acquisition failed: {}", e),
        }

        if let Some(local) = options.avatar.as_deref() {
            match avatar::reconcile(self.shared.avatars.as_ref(), &identity, local).await {
                Ok(Some(pointer)) => identity.avatar = Some(pointer),
                Ok(None) => {}
                Err(e) => tracing::warn!("avatar reconciliation failed: {}", e),
            }
        }

        let loaded = LoadedIdentity {
            pubkey,
            display_name: identity.display_name.clone(),
            generated_words,
        };
        *self.shared.identity.lock().await = Some(identity);
        tracing::info!("identity loaded: {}", loaded.pubkey);
        Ok(loaded)
    }

    /// Open the engine: start the poll task and its watchdog. The first
    /// cycle begins immediately.
    ///
    /// Fails with [`EngineError::IdentityNotReady`] when no identity is
    /// loaded and [`EngineError::AlreadyOpen`] when the engine is not
    /// closed.
    pub async fn open(&self) -> Result<(), EngineError> {
        let identity = {
            let guard = self.shared.identity.lock().await;
            match guard.as_ref() {
                Some(identity) => identity.clone(),
                None => {
                    return Err(EngineError::IdentityNotReady(
                        "no identity loaded".to_string(),
                    ))
                }
            }
        };

        if !self.shared.phase.begin_open() {
            return Err(EngineError::AlreadyOpen);
        }
        self.shared.closing.store(false, Ordering::Release);
        // Time spent closed is not poll-loop silence.
        self.shared.last_poll_ms.store(0, Ordering::Release);

        let initial = self.shared.cursor.lock().await.clone();
        spawn_poll_loop(self.shared.clone(), identity, initial);
        let watchdog = spawn_watchdog(self.shared.clone());
        if let Some(stale) = self.shared.watchdog.lock().unwrap().replace(watchdog) {
            stale.abort();
        }
        tracing::info!("engine opened");
        Ok(())
    }

    /// Request close. Returns immediately; the watchdog is aborted on
    /// the spot and the poll task observes the flag at its next cycle
    /// boundary, so at most one more cycle runs. The phase reads
    /// [`PollPhase::Closed`] once the task has stopped. Idempotent, and
    /// a no-op on a closed engine.
    pub fn close(&self) {
        self.shared.closing.store(true, Ordering::Release);
        if let Some(watchdog) = self.shared.watchdog.lock().unwrap().take() {
            watchdog.abort();
        }
        tracing::info!("close requested");
    }

    /// Send a direct message. Requires a loaded identity; the poll loop
    /// does not have to be running.
    pub async fn send(
        &self,
        to: &PubKey,
        body: &str,
        options: SendOptions,
    ) -> Result<(), EngineError> {
        let identity = self.require_identity().await?;
        let message = OutboundMessage {
            body: body.to_string(),
            attachments: options.attachments,
        };
        self.shared.inbox.send(&identity, to, message).await?;
        Ok(())
    }

    /// Join an open-group channel. The next poll cycle starts fetching
    /// it; re-joining replaces the existing registration.
    pub async fn join_group(
        &self,
        url: &str,
        channel_id: u32,
    ) -> Result<GroupRegistration, EngineError> {
        let identity = self.require_identity().await?;
        let registration = self
            .shared
            .registry
            .join(self.shared.groups.as_ref(), &identity, url, channel_id)
            .await?;
        tracing::info!("joined group {}", registration.id);
        Ok(registration)
    }

    /// Post a message to a joined group. Accepts canonical or legacy ids.
    pub async fn send_group_message(&self, group_id: &str, body: &str) -> Result<(), EngineError> {
        self.shared
            .registry
            .send(self.shared.groups.as_ref(), group_id, body)
            .await?;
        Ok(())
    }

    /// Delete messages from a joined group by server id. Accepts
    /// canonical or legacy ids.
    pub async fn delete_group_message(
        &self,
        group_id: &str,
        message_ids: &[u64],
    ) -> Result<(), EngineError> {
        self.shared
            .registry
            .delete(self.shared.groups.as_ref(), group_id, message_ids)
            .await?;
        Ok(())
    }

    /// Upload new avatar bytes and cache the returned pointer on the
    /// identity.
    pub async fn change_avatar(&self, bytes: &[u8]) -> Result<AvatarPointer, EngineError> {
        let identity = self.require_identity().await?;
        let pointer = self.shared.avatars.upload(&identity, bytes).await?;
        {
            let mut guard = self.shared.identity.lock().await;
            if let Some(identity) = guard.as_mut() {
                identity.avatar = Some(pointer.clone());
            }
        }
        tracing::info!("avatar changed, now at {}", pointer.url);
        Ok(pointer)
    }

    /// Download a peer's avatar bytes. Pass an empty `url` to use the
    /// one from the peer's published meta.
    pub async fn get_avatar(&self, url: &str, pubkey: &PubKey) -> Result<Vec<u8>, EngineError> {
        avatar::fetch(self.shared.avatars.as_ref(), url, pubkey).await
    }

    /// Update the identity's display name.
    pub async fn set_display_name(&self, name: &str) -> Result<(), EngineError> {
        let mut guard = self.shared.identity.lock().await;
        match guard.as_mut() {
            Some(identity) => {
                identity.display_name = Some(name.to_string());
                Ok(())
            }
            None => Err(EngineError::IdentityNotReady(
                "no identity loaded".to_string(),
            )),
        }
    }

    async fn require_identity(&self) -> Result<Identity, EngineError> {
        let guard = self.shared.identity.lock().await;
        guard
            .clone()
            .ok_or_else(|| EngineError::IdentityNotReady("no identity loaded".to_string()))
    }
}
