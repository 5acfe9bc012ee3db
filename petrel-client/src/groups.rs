//! Open-group registry.
//!
//! One registration per joined channel, keyed by the derived id
//! (`"{url}_{channel}"`). Joins overwrite any existing registration for
//! the same channel, lookups tolerate legacy ids that lack the channel
//! suffix, and the per-cycle fetch fans out to every group concurrently
//! so one slow or broken server cannot hold up the rest.

use dashmap::DashMap;
use futures_util::future::join_all;
use thiserror::Error;

use petrel_types::{GroupMessage, OpenGroupId};

use crate::identity::Identity;
use crate::transport::{GroupTransport, TransportError};

/// Errors that can occur during group operations.
#[derive(Debug, Error)]
pub enum GroupError {
    /// No registration matched the id, even after legacy fallback.
    #[error("group not found: {0}")]
    NotFound(String),

    /// The group server rejected or failed the operation.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// State for one joined open-group channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRegistration {
    /// Derived id (`"{url}_{channel}"`).
    pub id: OpenGroupId,
    /// Group server base URL.
    pub url: String,
    /// Channel number on that server.
    pub channel_id: u32,
    /// Opaque auth token from the most recent join.
    pub token: String,
    /// Highest message id seen from this channel so far.
    pub last_seen_id: u64,
}

/// Registry of joined open groups.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    entries: DashMap<OpenGroupId, GroupRegistration>,
}

impl GroupRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a channel and record the registration.
    ///
    /// Re-joining a channel that is already registered replaces the
    /// registration wholesale; the newest token and watermark win.
    pub async fn join(
        &self,
        transport: &dyn GroupTransport,
        identity: &Identity,
        url: &str,
        channel_id: u32,
    ) -> Result<GroupRegistration, GroupError> {
        let info = transport.join(url, channel_id, identity).await?;
        let registration = GroupRegistration {
            id: OpenGroupId::from_parts(url, channel_id),
            url: url.to_string(),
            channel_id,
            token: info.token,
            last_seen_id: info.last_message_id,
        };
        self.entries
            .insert(registration.id.clone(), registration.clone());
        Ok(registration)
    }

    /// Resolve an id to its registration, tolerating the legacy form
    /// without a channel suffix.
    ///
    /// Tries the exact id, then the id with the default channel
    /// appended, then the id with a trailing default suffix stripped.
    pub fn resolve(&self, raw: &str) -> Result<GroupRegistration, GroupError> {
        let id = OpenGroupId::from_raw(raw);
        if let Some(entry) = self.entries.get(&id) {
            return Ok(entry.clone());
        }
        let suffixed = id.with_default_channel();
        if let Some(entry) = self.entries.get(&suffixed) {
            return Ok(entry.clone());
        }
        if let Some(stripped) = id.without_default_channel() {
            if let Some(entry) = self.entries.get(&stripped) {
                return Ok(entry.clone());
            }
        }
        Err(GroupError::NotFound(raw.to_string()))
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any groups are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of all registrations, in no particular order.
    pub fn snapshot(&self) -> Vec<GroupRegistration> {
        self.entries.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Fetch every registered group concurrently.
    ///
    /// Returns each group's result tagged with its id so the caller can
    /// degrade failures individually. Successful fetches advance the
    /// registration's high-water mark; failed ones leave it untouched.
    pub async fn fetch_all(
        &self,
        transport: &dyn GroupTransport,
    ) -> Vec<(OpenGroupId, Result<Vec<GroupMessage>, TransportError>)> {
        let fetches = self.snapshot().into_iter().map(|registration| async move {
            let id = registration.id.clone();
            let result = transport.fetch(&registration).await;
            (id, result)
        });
        let settled = join_all(fetches).await;
        for (id, result) in &settled {
            if let Ok(messages) = result {
                if let Some(seen) = messages.iter().map(|m| m.id).max() {
                    self.record_progress(id, seen);
                }
            }
        }
        settled
    }

    /// Send a message to a joined group. Accepts canonical or legacy ids.
    pub async fn send(
        &self,
        transport: &dyn GroupTransport,
        raw_id: &str,
        body: &str,
    ) -> Result<(), GroupError> {
        let registration = self.resolve(raw_id)?;
        transport.send(&registration, body).await?;
        Ok(())
    }

    /// Delete messages from a joined group. Accepts canonical or legacy ids.
    pub async fn delete(
        &self,
        transport: &dyn GroupTransport,
        raw_id: &str,
        message_ids: &[u64],
    ) -> Result<(), GroupError> {
        let registration = self.resolve(raw_id)?;
        transport.delete(&registration, message_ids).await?;
        Ok(())
    }

    /// Advance a registration's high-water mark, never backwards.
    fn record_progress(&self, id: &OpenGroupId, seen_id: u64) {
        if let Some(mut entry) = self.entries.get_mut(id) {
            if seen_id > entry.last_seen_id {
                entry.last_seen_id = seen_id;
            }
        }
    }
}
