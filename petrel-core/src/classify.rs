//! Envelope classification and message normalization.
//!
//! The classifier is a pure, total function: every envelope maps to exactly
//! one outcome, and rule order is part of the contract. The session-reset
//! check runs before the content check because the reset sentinel overrides
//! whatever body or attachments the envelope carries.

use petrel_types::{
    DataEnvelope, GroupMessage, InboxEnvelope, NormalizedMessage, NullEnvelope, OpenGroupId,
    PreKeyBundleEnvelope, Profile, ReceiptEnvelope, UnclassifiedEnvelope,
};

/// Outcome of classifying one inbox envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// A data message admissible for the per-cycle batch.
    Message(NormalizedMessage),
    /// A session-reset control envelope; dropped without surfacing.
    Suppressed,
    /// Session bootstrap material; published immediately, never batched.
    PreKeyBundle(PreKeyBundleEnvelope),
    /// A delivery/read receipt; published immediately, never batched.
    Receipt(ReceiptEnvelope),
    /// Session establishment signal; published immediately, never batched.
    SessionEstablished(NullEnvelope),
    /// Nothing matched; the caller logs and drops it.
    Unclassified(UnclassifiedEnvelope),
}

/// Classify one raw inbox envelope.
///
/// First matching rule wins:
/// 1. Data with the session-reset flag → [`Classified::Suppressed`]
/// 2. Data with a non-empty body or attachments → [`Classified::Message`]
/// 3. Pre-key bundle → [`Classified::PreKeyBundle`]
/// 4. Receipt → [`Classified::Receipt`]
/// 5. Null → [`Classified::SessionEstablished`]
/// 6. Anything else → [`Classified::Unclassified`]
pub fn classify(envelope: InboxEnvelope) -> Classified {
    match envelope {
        InboxEnvelope::Data(data) if data.is_session_reset() => Classified::Suppressed,
        InboxEnvelope::Data(data) if data.has_content() => Classified::Message(normalize_data(data)),
        InboxEnvelope::Data(data) => Classified::Unclassified(UnclassifiedEnvelope {
            source: Some(data.source),
        }),
        InboxEnvelope::PreKeyBundle(bundle) => Classified::PreKeyBundle(bundle),
        InboxEnvelope::Receipt(receipt) => Classified::Receipt(receipt),
        InboxEnvelope::Null(null) => Classified::SessionEstablished(null),
        InboxEnvelope::Unclassified(raw) => Classified::Unclassified(raw),
    }
}

/// Flatten a data envelope into the unified message shape.
fn normalize_data(data: DataEnvelope) -> NormalizedMessage {
    NormalizedMessage {
        source: data.source.as_hex().to_string(),
        body: data.body.filter(|b| !b.is_empty()),
        attachments: data.attachments,
        origin_group: None,
        profile: None,
    }
}

/// Normalize a raw open-group message into the unified shape.
///
/// The sender profile rides along so callers can render names and avatars
/// without a directory lookup.
pub fn normalize_group_message(group: &OpenGroupId, message: GroupMessage) -> NormalizedMessage {
    NormalizedMessage {
        source: message.user.username,
        body: if message.text.is_empty() {
            None
        } else {
            Some(message.text)
        },
        attachments: Vec::new(),
        origin_group: Some(group.clone()),
        profile: Some(Profile {
            display_name: message.user.name,
            avatar_url: message.user.avatar_url,
        }),
    }
}

/// Whether a raw group message was authored by the local identity.
pub fn is_own_group_message(message: &GroupMessage, own_pubkey_hex: &str) -> bool {
    message.user.username == own_pubkey_hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use petrel_types::{Attachment, GroupUser, PubKey, FLAG_SESSION_RESET};

    fn data_envelope(body: Option<&str>, attachments: Vec<Attachment>, flags: u32) -> InboxEnvelope {
        InboxEnvelope::Data(DataEnvelope {
            source: PubKey::random(),
            body: body.map(String::from),
            attachments,
            flags,
        })
    }

    fn attachment() -> Attachment {
        Attachment {
            url: "https://files.example.org/a7".into(),
            content_type: "image/png".into(),
            size_bytes: 512,
        }
    }

    fn group_message(id: u64, text: &str, username: &str) -> GroupMessage {
        GroupMessage {
            id,
            text: text.into(),
            user: GroupUser {
                id: 42,
                username: username.into(),
                name: Some("Pat".into()),
                avatar_url: Some("https://files.example.org/av".into()),
            },
        }
    }

    // --- Rule priority ---

    #[test]
    fn session_reset_is_suppressed() {
        let outcome = classify(data_envelope(None, vec![], FLAG_SESSION_RESET));
        assert_eq!(outcome, Classified::Suppressed);
    }

    #[test]
    fn session_reset_suppresses_even_with_content() {
        // The sentinel overrides body and attachments
        let outcome = classify(data_envelope(
            Some("should never surface"),
            vec![attachment()],
            FLAG_SESSION_RESET,
        ));
        assert_eq!(outcome, Classified::Suppressed);
    }

    #[test]
    fn data_with_body_is_a_message() {
        let outcome = classify(data_envelope(Some("hello"), vec![], 0));
        match outcome {
            Classified::Message(msg) => {
                assert_eq!(msg.body.as_deref(), Some("hello"));
                assert!(msg.origin_group.is_none());
                assert!(msg.profile.is_none());
            }
            other => panic!("expected Message, got {:?}", other),
        }
    }

    #[test]
    fn data_with_attachments_only_is_a_message() {
        let outcome = classify(data_envelope(None, vec![attachment()], 0));
        match outcome {
            Classified::Message(msg) => {
                assert!(msg.body.is_none());
                assert_eq!(msg.attachments.len(), 1);
            }
            other => panic!("expected Message, got {:?}", other),
        }
    }

    #[test]
    fn empty_data_is_unclassified() {
        let outcome = classify(data_envelope(None, vec![], 0));
        assert!(matches!(outcome, Classified::Unclassified(env) if env.source.is_some()));
    }

    #[test]
    fn empty_string_body_is_not_content() {
        let outcome = classify(data_envelope(Some(""), vec![], 0));
        assert!(matches!(outcome, Classified::Unclassified(_)));
    }

    #[test]
    fn pre_key_bundle_passes_through() {
        let source = PubKey::random();
        let envelope = InboxEnvelope::PreKeyBundle(PreKeyBundleEnvelope {
            source: source.clone(),
            payload: vec![1, 2, 3],
        });
        assert!(matches!(
            classify(envelope),
            Classified::PreKeyBundle(bundle) if bundle.source == source
        ));
    }

    #[test]
    fn receipt_passes_through() {
        let envelope = InboxEnvelope::Receipt(ReceiptEnvelope {
            source: PubKey::random(),
            timestamps: vec![1705000000],
        });
        assert!(matches!(classify(envelope), Classified::Receipt(_)));
    }

    #[test]
    fn null_is_session_established() {
        let envelope = InboxEnvelope::Null(NullEnvelope {
            source: PubKey::random(),
        });
        assert!(matches!(classify(envelope), Classified::SessionEstablished(_)));
    }

    #[test]
    fn decoder_unclassified_stays_unclassified() {
        let envelope = InboxEnvelope::Unclassified(UnclassifiedEnvelope { source: None });
        assert!(matches!(classify(envelope), Classified::Unclassified(_)));
    }

    // --- Group normalization ---

    #[test]
    fn group_message_normalizes_with_origin_and_profile() {
        let group = OpenGroupId::from_parts("https://groups.example.org", 1);
        let msg = normalize_group_message(&group, group_message(7, "hi all", "05aa"));

        assert_eq!(msg.source, "05aa");
        assert_eq!(msg.body.as_deref(), Some("hi all"));
        assert_eq!(msg.origin_group.as_ref(), Some(&group));
        let profile = msg.profile.expect("group messages carry a profile");
        assert_eq!(profile.display_name.as_deref(), Some("Pat"));
    }

    #[test]
    fn group_message_empty_text_normalizes_to_no_body() {
        let group = OpenGroupId::from_parts("https://groups.example.org", 1);
        let msg = normalize_group_message(&group, group_message(8, "", "05aa"));
        assert!(msg.body.is_none());
    }

    // --- Self filter ---

    #[test]
    fn own_message_is_detected() {
        let me = PubKey::random();
        let msg = group_message(9, "echo", me.as_hex());
        assert!(is_own_group_message(&msg, me.as_hex()));
    }

    #[test]
    fn other_authors_are_not_own() {
        let me = PubKey::random();
        let msg = group_message(10, "hi", PubKey::random().as_hex());
        assert!(!is_own_group_message(&msg, me.as_hex()));
    }
}
