//! Message shapes: raw open-group messages and the unified normalized form.

use serde::{Deserialize, Serialize};

use crate::OpenGroupId;

/// Pointer to an attachment already uploaded to a file server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Download URL
    pub url: String,
    /// MIME type
    pub content_type: String,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Sender profile carried on group-origin messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Display name, if the sender set one
    pub display_name: Option<String>,
    /// Avatar URL, if the sender set one
    pub avatar_url: Option<String>,
}

/// Author record attached to a raw open-group message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupUser {
    /// Server-local numeric id
    pub id: u64,
    /// Network-wide author identifier (pubkey hex)
    pub username: String,
    /// Display name, if set
    pub name: Option<String>,
    /// Avatar URL, if set
    pub avatar_url: Option<String>,
}

/// One message as served by an open-group server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessage {
    /// Server-assigned serial, monotonic within one group
    pub id: u64,
    /// Message text
    pub text: String,
    /// Author record
    pub user: GroupUser,
}

/// The unified message shape produced for callers.
///
/// Direct and open-group messages both normalize into this; `origin_group`
/// and `profile` are populated only for group-origin messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Author identifier (pubkey hex)
    pub source: String,
    /// Text body, if any
    pub body: Option<String>,
    /// Attachments, if any
    pub attachments: Vec<Attachment>,
    /// Originating group, `None` for direct messages
    pub origin_group: Option<OpenGroupId>,
    /// Sender profile, populated for group-origin messages
    pub profile: Option<Profile>,
}

impl NormalizedMessage {
    /// Whether this message came from an open group.
    pub fn is_group(&self) -> bool {
        self.origin_group.is_some()
    }
}

/// Body of a direct message handed to the inbox transport for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Text body
    pub body: String,
    /// Attachments already uploaded to a file server
    pub attachments: Vec<Attachment>,
}

/// Options for sending a direct message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOptions {
    /// Attachments to reference from the message
    pub attachments: Vec<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_group_flag() {
        let direct = NormalizedMessage {
            source: "05ab".into(),
            body: Some("hi".into()),
            attachments: vec![],
            origin_group: None,
            profile: None,
        };
        assert!(!direct.is_group());

        let grouped = NormalizedMessage {
            origin_group: Some(OpenGroupId::from_parts("https://g.example.org", 1)),
            ..direct
        };
        assert!(grouped.is_group());
    }
}
