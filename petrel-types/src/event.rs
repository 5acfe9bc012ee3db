//! Events published to engine subscribers.

use serde::{Deserialize, Serialize};

use crate::{NormalizedMessage, NullEnvelope, PollCursor, PreKeyBundleEnvelope, ReceiptEnvelope};

/// One event on the engine's broadcast stream.
///
/// The broadcast channel clones events per subscriber, so every payload
/// is plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// The inbox read position advanced; callers should persist the new
    /// cursor and supply it back on the next engine start.
    CursorUpdated {
        /// The new position
        cursor: PollCursor,
    },
    /// Session bootstrap material arrived (published immediately, never batched)
    PreKeyBundle(PreKeyBundleEnvelope),
    /// A delivery/read receipt arrived (immediate)
    Receipt(ReceiptEnvelope),
    /// An empty envelope signaled session establishment (immediate)
    SessionEstablished(NullEnvelope),
    /// One poll cycle's admissible messages: direct messages first, then
    /// group messages grouped by group, each in server order
    Messages(Vec<NormalizedMessage>),
    /// A file-server auth token was acquired during identity load
    FileServerToken {
        /// The opaque token
        token: String,
    },
}
