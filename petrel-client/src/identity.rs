//! Identity state for one account.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use petrel_types::PubKey;

use crate::crypto::Keypair;
use crate::transport::AvatarPointer;

/// The loaded account identity the engine operates for.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Public key identifying the account on the network.
    pub pubkey: PubKey,
    /// Keypair handle. Secret half is redacted in Debug and zeroed on drop.
    pub keypair: Keypair,
    /// Profile display name, if set.
    pub display_name: Option<String>,
    /// Pointer to the account's uploaded avatar, if any.
    pub avatar: Option<AvatarPointer>,
}

/// Options for [`SyncEngine::load_identity`](crate::SyncEngine::load_identity).
///
/// Zeroed on drop because it may carry recovery seed words.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct LoadIdentityOptions {
    /// Recovery seed words. Omit to generate a fresh identity.
    pub seed_words: Option<String>,
    /// Display name to record on the identity.
    pub display_name: Option<String>,
    /// Local avatar bytes to reconcile against the network.
    pub avatar: Option<Vec<u8>>,
}

impl LoadIdentityOptions {
    /// Restore an identity from recovery seed words.
    pub fn from_seed(words: &str) -> Self {
        Self {
            seed_words: Some(words.to_string()),
            display_name: None,
            avatar: None,
        }
    }

    /// Generate a fresh identity.
    pub fn generate() -> Self {
        Self::default()
    }

    /// Set the display name.
    pub fn with_display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    /// Set local avatar bytes to reconcile at load time.
    pub fn with_avatar(mut self, bytes: Vec<u8>) -> Self {
        self.avatar = Some(bytes);
        self
    }
}

// Intentionally opaque debug to avoid logging secrets
impl fmt::Debug for LoadIdentityOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadIdentityOptions")
            .field("seed_words", &self.seed_words.as_ref().map(|_| "[REDACTED]"))
            .field("display_name", &self.display_name)
            .field("avatar", &self.avatar.as_ref().map(|b| b.len()))
            .finish()
    }
}

/// Result of a successful identity load.
pub struct LoadedIdentity {
    /// Public key of the loaded identity.
    pub pubkey: PubKey,
    /// Display name recorded on the identity, if any.
    pub display_name: Option<String>,
    /// Recovery seed words, present only when a fresh identity was
    /// generated. Show them to the user once; they are not retrievable
    /// again.
    pub generated_words: Option<String>,
}

// Intentionally opaque debug to avoid logging secrets
impl fmt::Debug for LoadedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedIdentity")
            .field("pubkey", &self.pubkey)
            .field("display_name", &self.display_name)
            .field(
                "generated_words",
                &self.generated_words.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}
