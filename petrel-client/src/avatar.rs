//! Avatar reconciliation and retrieval over the [`AvatarStore`] port.
//!
//! Reconciliation runs once, at identity load, when the caller supplies
//! local avatar bytes: fetch what the network has, compare byte-exact,
//! and upload only on mismatch. A remote that cannot be read (missing
//! meta, undecodable key, failed download) is handled exactly like a
//! mismatch. The decision rule itself lives in [`petrel_core::avatar`].

use base64::{engine::general_purpose::STANDARD, Engine as _};

use petrel_core::avatar::{decide, AvatarDecision};
use petrel_types::PubKey;

use crate::client::EngineError;
use crate::identity::Identity;
use crate::transport::{AvatarPointer, AvatarStore, TransportError};

/// Fetch the remote avatar bytes for comparison. Any failure along the
/// way collapses to `None`.
async fn remote_bytes(store: &dyn AvatarStore, pubkey: &PubKey) -> Option<Vec<u8>> {
    let meta = match store.fetch_meta(pubkey).await {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!("no readable avatar meta for {}: {}", pubkey, e);
            return None;
        }
    };
    let key = match STANDARD.decode(&meta.key_base64) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!("avatar key for {} does not decode: {}", pubkey, e);
            return None;
        }
    };
    match store.download(&meta.url, &key).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("avatar download from {} failed: {}", meta.url, e);
            None
        }
    }
}

/// Reconcile local avatar bytes against the network.
///
/// Returns the fresh pointer when an upload happened, `None` when the
/// remote already matched byte for byte.
pub(crate) async fn reconcile(
    store: &dyn AvatarStore,
    identity: &Identity,
    local: &[u8],
) -> Result<Option<AvatarPointer>, TransportError> {
    let remote = remote_bytes(store, &identity.pubkey).await;
    match decide(local, remote.as_deref()) {
        AvatarDecision::Keep => {
            tracing::debug!("avatar already current, skipping upload");
            Ok(None)
        }
        AvatarDecision::Upload => {
            let pointer = store.upload(identity, local).await?;
            tracing::info!("avatar uploaded to {}", pointer.url);
            Ok(Some(pointer))
        }
    }
}

/// Download a peer's avatar bytes.
///
/// The decryption key always comes from the peer's published meta; an
/// empty `url` means "use the URL from the meta" as well.
pub(crate) async fn fetch(
    store: &dyn AvatarStore,
    url: &str,
    pubkey: &PubKey,
) -> Result<Vec<u8>, EngineError> {
    let meta = store.fetch_meta(pubkey).await?;
    let key = STANDARD.decode(&meta.key_base64)?;
    let target = if url.is_empty() { meta.url.as_str() } else { url };
    Ok(store.download(target, &key).await?)
}
