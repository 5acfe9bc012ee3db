//! Identity crypto port.
//!
//! Key derivation and generation live outside the engine, behind the
//! [`CryptoIdentity`] trait. The engine treats the keypair as an opaque
//! handle: it validates the public half, hands the whole thing to
//! transports, and never interprets the secret bytes itself.

use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors that can occur in the crypto provider.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Seed words could not be turned into a keypair.
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),

    /// Fresh keypair generation failed.
    #[error("key generation failed: {0}")]
    GenerationFailed(String),

    /// The provider produced malformed key material.
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

/// Secret half of a keypair. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct SecretKey(Vec<u8>);

/// An identity keypair.
///
/// Transports borrow it for decryption and signing; everything else
/// only ever looks at the public half.
#[derive(Clone)]
pub struct Keypair {
    public_hex: String,
    secret: SecretKey,
}

impl Keypair {
    /// Wrap provider-produced key material.
    pub fn new(public_hex: impl Into<String>, secret: Vec<u8>) -> Self {
        Self {
            public_hex: public_hex.into(),
            secret: SecretKey(secret),
        }
    }

    /// Hex form of the public key.
    pub fn public_hex(&self) -> &str {
        &self.public_hex
    }

    /// Borrow the secret bytes.
    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret.0
    }
}

// Intentionally opaque debug to avoid logging secrets
impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_hex", &self.public_hex)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// A freshly generated keypair together with the seed words that
/// recover it. The words are surfaced to the caller exactly once.
pub struct GeneratedKeypair {
    /// The generated keypair.
    pub keypair: Keypair,
    /// Recovery seed words.
    pub words: String,
}

// Intentionally opaque debug to avoid logging secrets
impl fmt::Debug for GeneratedKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedKeypair")
            .field("keypair", &self.keypair)
            .field("words", &"[REDACTED]")
            .finish()
    }
}

/// Port to the identity key provider.
pub trait CryptoIdentity: Send + Sync {
    /// Derive the identity keypair from recovery seed words.
    /// Deterministic: the same words always yield the same keypair.
    fn derive_from_seed(&self, words: &str) -> Result<Keypair, CryptoError>;

    /// Generate a fresh keypair and the seed words that recover it.
    fn generate(&self) -> Result<GeneratedKeypair, CryptoError>;
}

/// Deterministic crypto provider for testing.
///
/// Derivation stretches the seed words over 33 bytes, so the same words
/// always produce the same keypair and generated words round-trip
/// through [`derive_from_seed`](CryptoIdentity::derive_from_seed).
#[derive(Debug, Clone, Default)]
pub struct MockCrypto;

impl MockCrypto {
    /// Create a new mock provider.
    pub fn new() -> Self {
        Self
    }

    fn stretch(words: &str) -> [u8; 33] {
        let seed = words.as_bytes();
        let mut bytes = [0u8; 33];
        for (i, slot) in bytes.iter_mut().enumerate() {
            let byte = seed[i % seed.len()];
            *slot = byte ^ (i as u8).wrapping_mul(31);
        }
        bytes
    }
}

impl CryptoIdentity for MockCrypto {
    fn derive_from_seed(&self, words: &str) -> Result<Keypair, CryptoError> {
        let words = words.trim();
        if words.is_empty() {
            return Err(CryptoError::DerivationFailed(
                "empty seed words".to_string(),
            ));
        }
        let bytes = Self::stretch(words);
        Ok(Keypair::new(hex::encode(bytes), bytes.to_vec()))
    }

    fn generate(&self) -> Result<GeneratedKeypair, CryptoError> {
        let mut seed = [0u8; 8];
        getrandom::getrandom(&mut seed)
            .map_err(|e| CryptoError::GenerationFailed(e.to_string()))?;
        let words = seed
            .iter()
            .map(|b| format!("w{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ");
        let keypair = self.derive_from_seed(&words)?;
        Ok(GeneratedKeypair { keypair, words })
    }
}
