//! Client-side message store for the active conversation.

use crate::message::Message;

/// Ordered, append-only list of messages for one conversation.
///
/// Populated by three independent sources that all funnel here: the
/// initial bulk fetch, the periodic poll re-fetch, and the live push
/// channel. The store never reorders; the visible list is always
/// "server history plus any not-yet-acknowledged local sends".
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The visible message list, in arrival order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of visible messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Push one record to the end of the list.
    ///
    /// Used for live-pushed messages and for the optimistic local echo.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the list with the server's full history, reconciling
    /// pending optimistic sends.
    ///
    /// A pending echo is considered acknowledged when the history holds a
    /// same-sender, same-content message stamped at or after the echo;
    /// acknowledged echoes are dropped in favour of the server copy,
    /// unacknowledged ones are re-appended after the history so they stay
    /// visible between polls. With nothing pending this is exactly the
    /// server array, in server order.
    pub fn load_all(&mut self, history: Vec<Message>) {
        let pending: Vec<Message> = self
            .messages
            .drain(..)
            .filter(|m| m.is_pending())
            .filter(|m| !Self::acknowledged_by(m, &history))
            .collect();

        self.messages = history;
        self.messages.extend(pending);
    }

    fn acknowledged_by(pending: &Message, history: &[Message]) -> bool {
        history.iter().any(|server| {
            server.server_id.is_some()
                && server.sender_id == pending.sender_id
                && server.content == pending.content
                && server.created_at >= pending.created_at
        })
    }
}
