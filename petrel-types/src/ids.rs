//! Identity and position types for petrel.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::PubkeyError;

/// Length of a public key in hex characters (33 bytes, two characters each).
pub const PUBKEY_HEX_LEN: usize = 66;

/// Channel number assumed for open groups that do not specify one.
pub const DEFAULT_CHANNEL: u32 = 1;

/// A hex-encoded public key identifying one account on the network.
///
/// 33 bytes, stored as 66 lowercase hex characters. The only public
/// constructor is [`PubKey::parse`], so a held `PubKey` is always
/// well-formed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PubKey(String);

impl PubKey {
    /// Parse a hex public key, validating length and character set.
    ///
    /// Uppercase input is accepted and normalized to lowercase.
    pub fn parse(hex_str: &str) -> Result<Self, PubkeyError> {
        if hex_str.len() != PUBKEY_HEX_LEN {
            return Err(PubkeyError::BadLength(hex_str.len()));
        }
        if hex::decode(hex_str).is_err() {
            return Err(PubkeyError::NotHex);
        }
        Ok(Self(hex_str.to_ascii_lowercase()))
    }

    /// Create a random PubKey (for testing).
    pub fn random() -> Self {
        let mut bytes = [0u8; 33];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(hex::encode(bytes))
    }

    /// The hex string form of this key.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PubKey {
    type Error = PubkeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PubKey> for String {
    fn from(key: PubKey) -> Self {
        key.0
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PubKey({})", &self.0[..8])
    }
}

/// Identifier of one open-group channel registration.
///
/// Derived deterministically from the server URL and channel number as
/// `"{url}_{channel}"`, so joining the same channel twice maps to the
/// same registration.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpenGroupId(String);

impl OpenGroupId {
    /// Derive the id for a server URL and channel number.
    pub fn from_parts(url: &str, channel_id: u32) -> Self {
        Self(format!("{}_{}", url, channel_id))
    }

    /// Wrap a caller-supplied id string verbatim (canonical or legacy form).
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.to_string())
    }

    /// The string form of this id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// This id with the default channel suffix appended.
    pub fn with_default_channel(&self) -> Self {
        Self(format!("{}_{}", self.0, DEFAULT_CHANNEL))
    }

    /// This id with a trailing default channel suffix stripped, if present.
    pub fn without_default_channel(&self) -> Option<Self> {
        let suffix = format!("_{}", DEFAULT_CHANNEL);
        self.0.strip_suffix(&suffix).map(|s| Self(s.to_string()))
    }
}

impl fmt::Display for OpenGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for OpenGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenGroupId({})", self.0)
    }
}

/// Opaque read-position token for the primary inbox (the "last hash").
///
/// Issued by the inbox transport; the engine never inspects the contents,
/// only whether a returned cursor is empty or equal to the current one.
/// An empty cursor means "no position yet, fetch from the beginning".
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PollCursor(String);

impl PollCursor {
    /// Wrap a cursor string issued by the inbox transport.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The cursor for "no position yet".
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Whether this cursor denotes "no position yet".
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw cursor string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PollCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PollCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PollCursor({})", self.0)
    }
}
