//! Avatar reconciliation decision table.
//!
//! Three observed outcomes (remote matches, remote differs, remote
//! missing or unreadable) collapse into two actions: keep what the
//! network has, or upload the local bytes. Comparison is byte-exact,
//! length first.

/// What to do after comparing local avatar bytes against remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarDecision {
    /// Remote bytes match the local ones; no network write.
    Keep,
    /// Remote differs, is missing, or could not be read; upload local bytes.
    Upload,
}

/// Decide between keeping the remote avatar and uploading the local one.
///
/// `remote` is `None` when there is no remote avatar or its bytes could
/// not be fetched or decoded; both are treated identically to a mismatch.
pub fn decide(local: &[u8], remote: Option<&[u8]>) -> AvatarDecision {
    match remote {
        Some(bytes) if bytes == local => AvatarDecision::Keep,
        _ => AvatarDecision::Upload,
    }
}
