//! Chat message records.

use crate::ids::{CorrelationId, MessageId, UserId};
use crate::session::Session;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message in a conversation.
///
/// Two producers create these with different shapes: server-originated
/// records carry a `server_id` and an authoritative `created_at`, while
/// optimistic local echoes have no `server_id`, a client-stamped
/// `created_at`, and a local `correlation` id used to reconcile them
/// against the eventual server copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned identifier, absent on optimistic local echoes.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<MessageId>,

    /// Author of the message.
    pub sender_id: UserId,

    /// Display name of the author.
    pub sender_name: String,

    /// Message body.
    pub content: String,

    /// Creation time: authoritative for server records, client-stamped
    /// for optimistic echoes.
    pub created_at: DateTime<Utc>,

    /// Local correlation id for optimistic sends. Never serialized: the
    /// outbound payload shape is owned by the backend and cannot carry it.
    #[serde(skip)]
    pub correlation: Option<CorrelationId>,
}

impl Message {
    /// Build an optimistic local echo for an outgoing send.
    ///
    /// Stamped with the local session identity and the current time, and
    /// tagged with a fresh correlation id so the store can reconcile it
    /// once the server copy shows up in a history fetch.
    pub fn optimistic(session: &Session, content: impl Into<String>) -> Self {
        Self {
            server_id: None,
            sender_id: session.user_id.clone(),
            sender_name: session.display_name.clone(),
            content: content.into(),
            created_at: Utc::now(),
            correlation: Some(CorrelationId::generate()),
        }
    }

    /// Whether this record is an optimistic local echo still awaiting its
    /// server copy.
    pub fn is_pending(&self) -> bool {
        self.correlation.is_some() && self.server_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[test]
    fn test_optimistic_message_shape() {
        let session = Session::new("U1", "Ada", Role::Buyer);
        let msg = Message::optimistic(&session, "hello");

        assert_eq!(msg.sender_id, UserId::new("U1"));
        assert_eq!(msg.sender_name, "Ada");
        assert_eq!(msg.content, "hello");
        assert!(msg.server_id.is_none());
        assert!(msg.is_pending());
    }

    #[test]
    fn test_server_message_deserializes_wire_shape() {
        let raw = r#"{
            "_id": "m-1",
            "senderId": "U2",
            "senderName": "Grace",
            "content": "hi",
            "createdAt": "2025-03-01T12:00:00Z"
        }"#;

        let msg: Message = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.server_id, Some(MessageId::new("m-1")));
        assert_eq!(msg.sender_id, UserId::new("U2"));
        assert!(msg.correlation.is_none());
        assert!(!msg.is_pending());
    }

    #[test]
    fn test_correlation_never_serialized() {
        let session = Session::new("U1", "Ada", Role::Buyer);
        let msg = Message::optimistic(&session, "hello");

        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("correlation").is_none());
        assert!(json.get("_id").is_none());
    }
}
