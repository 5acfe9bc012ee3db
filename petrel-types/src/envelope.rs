//! Raw inbox envelopes as decoded from the swarm.
//!
//! Every unit fetched from the primary inbox arrives as exactly one of
//! these variants. Classification into caller-facing outcomes happens in
//! `petrel-core`; this crate only models the shapes.

use serde::{Deserialize, Serialize};

use crate::{Attachment, PubKey};

/// Flag value marking a session-reset control envelope.
///
/// An envelope whose flags equal this value must never surface as a data
/// message, whatever its body or attachments contain.
pub const FLAG_SESSION_RESET: u32 = 1;

/// One raw unit from the primary inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboxEnvelope {
    /// Ordinary content from a peer
    Data(DataEnvelope),
    /// Session bootstrap material
    PreKeyBundle(PreKeyBundleEnvelope),
    /// Delivery/read receipt
    Receipt(ReceiptEnvelope),
    /// Empty envelope signaling session establishment
    Null(NullEnvelope),
    /// The decoder could not infer a type
    Unclassified(UnclassifiedEnvelope),
}

/// Ordinary content envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEnvelope {
    /// Author of the message
    pub source: PubKey,
    /// Text body, if any
    pub body: Option<String>,
    /// Attachment pointers, if any
    pub attachments: Vec<Attachment>,
    /// Control flag bits
    pub flags: u32,
}

impl DataEnvelope {
    /// Whether the flags mark this envelope as a session reset.
    pub fn is_session_reset(&self) -> bool {
        self.flags == FLAG_SESSION_RESET
    }

    /// Whether the envelope carries a non-empty body or any attachments.
    pub fn has_content(&self) -> bool {
        self.body.as_deref().map_or(false, |b| !b.is_empty()) || !self.attachments.is_empty()
    }
}

/// Session bootstrap material. The payload is opaque to the engine and
/// handed to subscribers verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreKeyBundleEnvelope {
    /// Peer the bundle belongs to
    pub source: PubKey,
    /// Serialized bundle, not interpreted here
    pub payload: Vec<u8>,
}

/// Delivery/read receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEnvelope {
    /// Peer acknowledging delivery
    pub source: PubKey,
    /// Timestamps of the acknowledged messages
    pub timestamps: Vec<u64>,
}

/// Empty envelope; its arrival alone signals that an end-to-end session
/// was established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullEnvelope {
    /// Peer the session was established with
    pub source: PubKey,
}

/// Envelope the decoder could not classify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnclassifiedEnvelope {
    /// Claimed author, when the decoder got that far
    pub source: Option<PubKey>,
}
