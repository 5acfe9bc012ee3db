//! # petrel-types
//!
//! Shared data model for the petrel sync engine.
//!
//! This crate provides the foundational types used across all petrel crates:
//! - [`PubKey`], [`OpenGroupId`], [`PollCursor`] - Identity and position types
//! - [`InboxEnvelope`] - Raw inbox envelopes as decoded from the swarm
//! - [`GroupMessage`], [`NormalizedMessage`] - Raw and unified message shapes
//! - [`EngineEvent`] - Events published to engine subscribers

#![warn(missing_docs)]
#![warn(clippy::all)]

mod envelope;
mod error;
mod event;
mod ids;
mod message;

pub use envelope::{
    DataEnvelope, InboxEnvelope, NullEnvelope, PreKeyBundleEnvelope, ReceiptEnvelope,
    UnclassifiedEnvelope, FLAG_SESSION_RESET,
};
pub use error::PubkeyError;
pub use event::EngineEvent;
pub use ids::{OpenGroupId, PollCursor, PubKey, DEFAULT_CHANNEL, PUBKEY_HEX_LEN};
pub use message::{
    Attachment, GroupMessage, GroupUser, NormalizedMessage, OutboundMessage, Profile, SendOptions,
};
