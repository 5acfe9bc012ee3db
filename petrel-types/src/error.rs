//! Error types for petrel's shared data model.

use thiserror::Error;

/// Errors from parsing a [`PubKey`](crate::PubKey).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PubkeyError {
    /// Wrong number of hex characters
    #[error("public key must be 66 hex characters, got {0}")]
    BadLength(usize),

    /// Non-hex characters present
    #[error("public key is not valid hex")]
    NotHex,
}
