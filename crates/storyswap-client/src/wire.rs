//! JSON event frames for the live channel.
//!
//! Event names and payload shapes are owned by the backend; the client
//! only mirrors them.

use serde::{Deserialize, Serialize};
use storyswap_core::{ConversationId, Message, ProductId, UserId};

/// Events the client emits on the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join the room keyed by the conversation id. Sent once, right after
    /// the channel connects.
    #[serde(rename_all = "camelCase")]
    JoinConversation { conversation_id: ConversationId },

    /// Fire-and-forget outgoing message. No acknowledgment is awaited;
    /// the optimistic echo is already in the store when this goes out.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        conversation_id: ConversationId,
        receiver_id: UserId,
        content: String,
        product_id: Option<ProductId>,
    },
}

/// Events the server pushes on the live channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// A message stored for the joined conversation.
    ReceiveMessage(Message),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_message_wire_shape() {
        let event = ClientEvent::SendMessage {
            conversation_id: ConversationId::new("C1"),
            receiver_id: UserId::new("U2"),
            content: "hello".to_string(),
            product_id: None,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "sendMessage",
                "data": {
                    "conversationId": "C1",
                    "receiverId": "U2",
                    "content": "hello",
                    "productId": null
                }
            })
        );
    }

    #[test]
    fn test_join_conversation_wire_shape() {
        let event = ClientEvent::JoinConversation {
            conversation_id: ConversationId::new("C1"),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "joinConversation",
                "data": { "conversationId": "C1" }
            })
        );
    }

    #[test]
    fn test_receive_message_decodes() {
        let raw = r#"{
            "event": "receiveMessage",
            "data": {
                "_id": "m1",
                "senderId": "U2",
                "senderName": "Grace",
                "content": "hi",
                "createdAt": "2025-03-01T12:00:00Z"
            }
        }"#;

        let ServerEvent::ReceiveMessage(msg) = serde_json::from_str::<ServerEvent>(raw).unwrap();
        assert_eq!(msg.sender_id, UserId::new("U2"));
        assert_eq!(msg.content, "hi");
    }
}
