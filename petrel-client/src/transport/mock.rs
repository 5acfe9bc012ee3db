//! Mock transports for testing.
//!
//! In-memory implementations of the three transport ports. Each mock
//! records the calls made against it, serves queued responses, and can
//! be told to fail (or hang) on demand, so engine behavior under
//! transport faults is testable without any network.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};

use petrel_types::{GroupMessage, InboxEnvelope, OpenGroupId, OutboundMessage, PollCursor, PubKey};

use crate::groups::GroupRegistration;
use crate::identity::Identity;

use super::{
    AvatarPointer, AvatarStore, GroupJoinInfo, GroupTransport, InboxPage, InboxTransport,
    TransportError,
};

// ============================================================
// MockInbox
// ============================================================

#[derive(Debug, Default)]
struct MockInboxInner {
    /// Pages to serve, oldest first. When empty the mock echoes the
    /// request cursor with no envelopes ("nothing new").
    pages: VecDeque<InboxPage>,
    /// Cursor of every fetch call, in order.
    fetch_cursors: Vec<PollCursor>,
    /// Every message handed to `send`.
    sent: Vec<(PubKey, OutboundMessage)>,
    /// If set, the next fetch fails with this message.
    fail_next_fetch: Option<String>,
    /// If set, the next send fails with this message.
    fail_next_send: Option<String>,
    /// If true, fetches with no queued page never resolve.
    hang_when_empty: bool,
}

/// Mock inbox transport for testing.
///
/// Clones share state, so tests can hand one clone to the engine and
/// keep another for queuing pages and inspecting recorded calls.
#[derive(Debug, Default)]
pub struct MockInbox {
    inner: Arc<Mutex<MockInboxInner>>,
}

impl Clone for MockInbox {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MockInbox {
    /// Create a new mock inbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page to serve on a future fetch.
    pub fn queue_page(&self, cursor: &str, envelopes: Vec<InboxEnvelope>) {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.push_back(InboxPage {
            cursor: PollCursor::new(cursor),
            envelopes,
        });
    }

    /// Make the next fetch fail with the given error message.
    pub fn fail_next_fetch(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_fetch = Some(error.to_string());
    }

    /// Make the next send fail with the given error message.
    pub fn fail_next_send(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_send = Some(error.to_string());
    }

    /// When enabled, a fetch that finds no queued page never resolves.
    /// Simulates a wedged swarm connection for watchdog tests.
    pub fn set_hang_when_empty(&self, hang: bool) {
        self.inner.lock().unwrap().hang_when_empty = hang;
    }

    /// Number of fetch calls made so far.
    pub fn fetch_count(&self) -> usize {
        self.inner.lock().unwrap().fetch_cursors.len()
    }

    /// Cursors of every fetch call, in order.
    pub fn fetch_cursors(&self) -> Vec<PollCursor> {
        self.inner.lock().unwrap().fetch_cursors.clone()
    }

    /// Every message handed to `send`, in order.
    pub fn sent(&self) -> Vec<(PubKey, OutboundMessage)> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Clear all queued pages and recorded calls.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockInboxInner::default();
    }
}

enum FetchStep {
    Page(InboxPage),
    Fail(String),
    Hang,
}

#[async_trait]
impl InboxTransport for MockInbox {
    async fn fetch(
        &self,
        _identity: &Identity,
        cursor: &PollCursor,
    ) -> Result<InboxPage, TransportError> {
        // Decide under the lock, then release it before any await.
        let step = {
            let mut inner = self.inner.lock().unwrap();
            inner.fetch_cursors.push(cursor.clone());
            if let Some(error) = inner.fail_next_fetch.take() {
                FetchStep::Fail(error)
            } else if let Some(page) = inner.pages.pop_front() {
                FetchStep::Page(page)
            } else if inner.hang_when_empty {
                FetchStep::Hang
            } else {
                FetchStep::Page(InboxPage {
                    cursor: cursor.clone(),
                    envelopes: Vec::new(),
                })
            }
        };
        match step {
            FetchStep::Page(page) => Ok(page),
            FetchStep::Fail(error) => Err(TransportError::RequestFailed(error)),
            FetchStep::Hang => {
                std::future::pending::<()>().await;
                unreachable!("pending future resolved")
            }
        }
    }

    async fn send(
        &self,
        _identity: &Identity,
        to: &PubKey,
        message: OutboundMessage,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::RequestFailed(error));
        }
        inner.sent.push((to.clone(), message));
        Ok(())
    }
}

// ============================================================
// MockGroupServer
// ============================================================

#[derive(Debug, Default)]
struct MockGroupServerInner {
    /// Message pages to serve per group, oldest first.
    pages: HashMap<OpenGroupId, VecDeque<Vec<GroupMessage>>>,
    /// Watermark reported at join time, keyed by (url, channel).
    join_watermarks: HashMap<(String, u32), u64>,
    /// Every join call, in order.
    joins: Vec<(String, u32)>,
    /// Every posted message, in order.
    sent: Vec<(OpenGroupId, String)>,
    /// Every delete call, in order.
    deleted: Vec<(OpenGroupId, Vec<u64>)>,
    /// Registrations fetched, in call order.
    fetched: Vec<OpenGroupId>,
    /// Per-group one-shot fetch failures.
    fail_fetch: HashMap<OpenGroupId, String>,
    fail_next_join: Option<String>,
    fail_next_send: Option<String>,
    fail_next_delete: Option<String>,
    join_counter: u64,
}

/// Mock group server for testing.
///
/// Serves any number of groups at once; clones share state.
#[derive(Debug, Default)]
pub struct MockGroupServer {
    inner: Arc<Mutex<MockGroupServerInner>>,
}

impl Clone for MockGroupServer {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MockGroupServer {
    /// Create a new mock group server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the message-id watermark reported when a channel is joined.
    pub fn set_join_watermark(&self, url: &str, channel_id: u32, last_message_id: u64) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .join_watermarks
            .insert((url.to_string(), channel_id), last_message_id);
    }

    /// Queue messages to serve on a future fetch of the given group.
    pub fn queue_messages(&self, id: &OpenGroupId, messages: Vec<GroupMessage>) {
        let mut inner = self.inner.lock().unwrap();
        inner.pages.entry(id.clone()).or_default().push_back(messages);
    }

    /// Make the next join fail with the given error message.
    pub fn fail_next_join(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_join = Some(error.to_string());
    }

    /// Make the next fetch of one specific group fail.
    pub fn fail_next_fetch_for(&self, id: &OpenGroupId, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_fetch.insert(id.clone(), error.to_string());
    }

    /// Make the next send fail with the given error message.
    pub fn fail_next_send(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_send = Some(error.to_string());
    }

    /// Make the next delete fail with the given error message.
    pub fn fail_next_delete(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_delete = Some(error.to_string());
    }

    /// Every join call, in order.
    pub fn joins(&self) -> Vec<(String, u32)> {
        self.inner.lock().unwrap().joins.clone()
    }

    /// Every posted message, in order.
    pub fn sent(&self) -> Vec<(OpenGroupId, String)> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Every delete call, in order.
    pub fn deleted(&self) -> Vec<(OpenGroupId, Vec<u64>)> {
        self.inner.lock().unwrap().deleted.clone()
    }

    /// Group ids fetched, in call order.
    pub fn fetched(&self) -> Vec<OpenGroupId> {
        self.inner.lock().unwrap().fetched.clone()
    }

    /// Clear all queued messages and recorded calls.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockGroupServerInner::default();
    }
}

#[async_trait]
impl GroupTransport for MockGroupServer {
    async fn join(
        &self,
        url: &str,
        channel_id: u32,
        _identity: &Identity,
    ) -> Result<GroupJoinInfo, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_join.take() {
            return Err(TransportError::RequestFailed(error));
        }
        inner.joins.push((url.to_string(), channel_id));
        inner.join_counter += 1;
        let token = format!("token-{}", inner.join_counter);
        let last_message_id = inner
            .join_watermarks
            .get(&(url.to_string(), channel_id))
            .copied()
            .unwrap_or(0);
        Ok(GroupJoinInfo {
            token,
            last_message_id,
        })
    }

    async fn fetch(
        &self,
        registration: &GroupRegistration,
    ) -> Result<Vec<GroupMessage>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.fetched.push(registration.id.clone());
        if let Some(error) = inner.fail_fetch.remove(&registration.id) {
            return Err(TransportError::RequestFailed(error));
        }
        let messages = inner
            .pages
            .get_mut(&registration.id)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_default();
        Ok(messages)
    }

    async fn send(
        &self,
        registration: &GroupRegistration,
        body: &str,
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::RequestFailed(error));
        }
        inner.sent.push((registration.id.clone(), body.to_string()));
        Ok(())
    }

    async fn delete(
        &self,
        registration: &GroupRegistration,
        message_ids: &[u64],
    ) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_delete.take() {
            return Err(TransportError::RequestFailed(error));
        }
        inner
            .deleted
            .push((registration.id.clone(), message_ids.to_vec()));
        Ok(())
    }
}

// ============================================================
// MockAvatarStore
// ============================================================

#[derive(Debug, Default)]
struct MockAvatarStoreInner {
    /// Published avatar pointers, keyed by pubkey hex.
    metas: HashMap<String, AvatarPointer>,
    /// Stored blobs, keyed by URL.
    blobs: HashMap<String, Vec<u8>>,
    /// Bytes of every upload, in order.
    uploads: Vec<Vec<u8>>,
    /// URL of every download, in order.
    downloads: Vec<String>,
    /// Token returned by `fetch_token`.
    token: Option<String>,
    fail_next_token: Option<String>,
    fail_next_meta: Option<String>,
    fail_next_download: Option<String>,
    fail_next_upload: Option<String>,
    upload_counter: u64,
}

/// Mock avatar file server for testing.
///
/// Clones share state.
#[derive(Debug, Default)]
pub struct MockAvatarStore {
    inner: Arc<Mutex<MockAvatarStoreInner>>,
}

impl Clone for MockAvatarStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MockAvatarStore {
    /// Create a new mock avatar store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token `fetch_token` returns (default `"mock-file-token"`).
    pub fn set_token(&self, token: &str) {
        self.inner.lock().unwrap().token = Some(token.to_string());
    }

    /// Publish an avatar pointer for a pubkey without storing a blob.
    pub fn set_remote_meta(&self, pubkey: &PubKey, pointer: AvatarPointer) {
        let mut inner = self.inner.lock().unwrap();
        inner.metas.insert(pubkey.as_hex().to_string(), pointer);
    }

    /// Store a downloadable blob at a URL.
    pub fn set_blob(&self, url: &str, bytes: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        inner.blobs.insert(url.to_string(), bytes);
    }

    /// Publish a complete remote avatar (pointer plus blob) for a
    /// pubkey, returning the pointer.
    pub fn set_remote_avatar(&self, pubkey: &PubKey, bytes: &[u8]) -> AvatarPointer {
        let mut inner = self.inner.lock().unwrap();
        inner.upload_counter += 1;
        let n = inner.upload_counter;
        let pointer = AvatarPointer {
            url: format!("mock://avatars/{}", n),
            key_base64: STANDARD.encode(format!("key-{}", n)),
        };
        inner.blobs.insert(pointer.url.clone(), bytes.to_vec());
        inner
            .metas
            .insert(pubkey.as_hex().to_string(), pointer.clone());
        pointer
    }

    /// Make the next token fetch fail with the given error message.
    pub fn fail_next_token(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_token = Some(error.to_string());
    }

    /// Make the next meta fetch fail with the given error message.
    pub fn fail_next_meta(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_meta = Some(error.to_string());
    }

    /// Make the next download fail with the given error message.
    pub fn fail_next_download(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_download = Some(error.to_string());
    }

    /// Make the next upload fail with the given error message.
    pub fn fail_next_upload(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_upload = Some(error.to_string());
    }

    /// Bytes of every upload, in order.
    pub fn uploads(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().uploads.clone()
    }

    /// Number of uploads so far.
    pub fn upload_count(&self) -> usize {
        self.inner.lock().unwrap().uploads.len()
    }

    /// URL of every download, in order.
    pub fn downloads(&self) -> Vec<String> {
        self.inner.lock().unwrap().downloads.clone()
    }

    /// Clear all stored avatars and recorded calls.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockAvatarStoreInner::default();
    }
}

#[async_trait]
impl AvatarStore for MockAvatarStore {
    async fn fetch_token(&self, _identity: &Identity) -> Result<String, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_token.take() {
            return Err(TransportError::RequestFailed(error));
        }
        Ok(inner
            .token
            .clone()
            .unwrap_or_else(|| "mock-file-token".to_string()))
    }

    async fn fetch_meta(&self, pubkey: &PubKey) -> Result<AvatarPointer, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_meta.take() {
            return Err(TransportError::RequestFailed(error));
        }
        inner
            .metas
            .get(pubkey.as_hex())
            .cloned()
            .ok_or_else(|| TransportError::RequestFailed("no avatar published".to_string()))
    }

    async fn download(&self, url: &str, _key: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_download.take() {
            return Err(TransportError::RequestFailed(error));
        }
        inner.downloads.push(url.to_string());
        inner
            .blobs
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::RequestFailed("blob not found".to_string()))
    }

    async fn upload(
        &self,
        identity: &Identity,
        bytes: &[u8],
    ) -> Result<AvatarPointer, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_upload.take() {
            return Err(TransportError::RequestFailed(error));
        }
        inner.upload_counter += 1;
        let n = inner.upload_counter;
        let pointer = AvatarPointer {
            url: format!("mock://avatars/{}", n),
            key_base64: STANDARD.encode(format!("key-{}", n)),
        };
        inner.uploads.push(bytes.to_vec());
        inner.blobs.insert(pointer.url.clone(), bytes.to_vec());
        inner
            .metas
            .insert(identity.pubkey.as_hex().to_string(), pointer.clone());
        Ok(pointer)
    }
}
