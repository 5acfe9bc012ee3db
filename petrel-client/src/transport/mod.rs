//! Transport ports for the sync engine.
//!
//! The engine owns no sockets: everything that touches the network sits
//! behind the three traits in this module. [`InboxTransport`] covers the
//! identity's encrypted inbox on its swarm, [`GroupTransport`] covers
//! open-group servers, and [`AvatarStore`] covers the file server that
//! holds encrypted avatars.
//!
//! # Design
//!
//! - All methods are async and return [`TransportError`] on failure
//! - Implementations must be `Send + Sync` (shared across the poll task
//!   and the facade)
//! - Poll-path failures are never fatal: the engine degrades a failing
//!   source to "no new data" for that cycle and keeps going
//!
//! The [`MockInbox`], [`MockGroupServer`], and [`MockAvatarStore`]
//! implementations drive the test suites without any network.

mod mock;

pub use mock::{MockAvatarStore, MockGroupServer, MockInbox};

use async_trait::async_trait;
use thiserror::Error;

use petrel_types::{GroupMessage, InboxEnvelope, OutboundMessage, PollCursor, PubKey};

use crate::groups::GroupRegistration;
use crate::identity::Identity;

/// Errors that can occur during transport operations.
///
/// On the poll path these are always non-fatal: the failing source is
/// treated as having returned nothing and the cycle continues.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote could not be reached at all.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The remote was reached but answered with a failure.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The remote rejected the caller's credentials.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// The operation timed out.
    #[error("operation timed out")]
    Timeout,
}

/// One page of inbox poll results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxPage {
    /// Position after this page. Servers that have nothing new echo the
    /// request cursor (or an empty one); the engine only advances and
    /// announces the cursor when this differs from what it asked with.
    pub cursor: PollCursor,
    /// Envelopes newer than the request cursor, in server order.
    pub envelopes: Vec<InboxEnvelope>,
}

/// Result of joining an open-group channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupJoinInfo {
    /// Opaque auth token for subsequent calls against this channel.
    pub token: String,
    /// Highest message id the server reported at join time.
    pub last_message_id: u64,
}

/// Pointer to encrypted avatar bytes on the file server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarPointer {
    /// Download URL of the encrypted blob.
    pub url: String,
    /// Decryption key, base64-encoded.
    pub key_base64: String,
}

/// Port to the identity's encrypted inbox.
#[async_trait]
pub trait InboxTransport: Send + Sync {
    /// Fetch envelopes newer than `cursor` from the identity's swarm.
    async fn fetch(
        &self,
        identity: &Identity,
        cursor: &PollCursor,
    ) -> Result<InboxPage, TransportError>;

    /// Deliver a direct message to a recipient's swarm.
    async fn send(
        &self,
        identity: &Identity,
        to: &PubKey,
        message: OutboundMessage,
    ) -> Result<(), TransportError>;
}

/// Port to open-group servers.
#[async_trait]
pub trait GroupTransport: Send + Sync {
    /// Join a channel on a server, acquiring an auth token.
    async fn join(
        &self,
        url: &str,
        channel_id: u32,
        identity: &Identity,
    ) -> Result<GroupJoinInfo, TransportError>;

    /// Fetch messages newer than the registration's high-water mark,
    /// in server order.
    async fn fetch(
        &self,
        registration: &GroupRegistration,
    ) -> Result<Vec<GroupMessage>, TransportError>;

    /// Post a message to the channel.
    async fn send(
        &self,
        registration: &GroupRegistration,
        body: &str,
    ) -> Result<(), TransportError>;

    /// Delete messages from the channel by server id.
    async fn delete(
        &self,
        registration: &GroupRegistration,
        message_ids: &[u64],
    ) -> Result<(), TransportError>;
}

/// Port to the avatar file server.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    /// Acquire a file-server auth token for the identity.
    async fn fetch_token(&self, identity: &Identity) -> Result<String, TransportError>;

    /// Fetch the avatar pointer a peer has published, if any.
    async fn fetch_meta(&self, pubkey: &PubKey) -> Result<AvatarPointer, TransportError>;

    /// Download and decrypt avatar bytes.
    async fn download(&self, url: &str, key: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Encrypt and upload avatar bytes, publishing the new pointer
    /// under the identity's public key.
    async fn upload(
        &self,
        identity: &Identity,
        bytes: &[u8],
    ) -> Result<AvatarPointer, TransportError>;
}
