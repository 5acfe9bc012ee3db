//! # petrel-client
//!
//! Client-side sync engine for the petrel messaging network.
//!
//! One [`SyncEngine`] merges an account's encrypted inbox and any number
//! of joined open groups into a single ordered stream of
//! [`EngineEvent`]s:
//! - **Poll loop** - fixed-cadence concurrent fan-out over every source,
//!   with per-source fault isolation
//! - **Transport ports** - [`InboxTransport`], [`GroupTransport`],
//!   [`AvatarStore`], and [`CryptoIdentity`] keep all I/O and key
//!   derivation injectable
//! - **Group registry** - join-token and read-watermark tracking with
//!   legacy id resolution
//! - **Avatar reconciliation** - local bytes uploaded only when the
//!   network copy differs or cannot be read
//! - **Watchdog** - independent stall detection for the poll loop
//!
//! The decision rules themselves live in `petrel-core`; the shared data
//! model lives in `petrel-types`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod crypto;
pub mod events;
pub mod groups;
pub mod identity;
pub mod transport;

mod avatar;
mod poller;

pub use client::{EngineError, SyncEngine};
pub use config::{EngineConfig, DEFAULT_EVENT_CAPACITY, DEFAULT_POLL_RATE};
pub use crypto::{CryptoError, CryptoIdentity, GeneratedKeypair, Keypair, MockCrypto};
pub use events::{EventBus, EventReceiver};
pub use groups::{GroupError, GroupRegistration, GroupRegistry};
pub use identity::{Identity, LoadIdentityOptions, LoadedIdentity};
pub use poller::EngineMetrics;
pub use transport::{
    AvatarPointer, AvatarStore, GroupJoinInfo, GroupTransport, InboxPage, InboxTransport,
    MockAvatarStore, MockGroupServer, MockInbox, TransportError,
};

// Re-exported so engine callers can match on phases and events without
// depending on the inner crates directly.
pub use petrel_core::lifecycle::PollPhase;
pub use petrel_types::EngineEvent;
