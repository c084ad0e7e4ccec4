//! Conversation message types.
//!
//! This module contains the message model shared by the chat controller
//! and the renderer, and the append-only thread that holds a session's
//! conversation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of most recent messages sent to the server with every turn.
pub const HISTORY_WINDOW: usize = 5;

/// Fixed assistant reply appended when a chat turn fails.
///
/// The raw error is never shown to the user.
pub const CONNECTION_ERROR_MESSAGE: &str = "❌ **Error de conexión**\n\n\
No pude procesar tu consulta. Por favor verifica:\n\
- Que el servidor esté funcionando\n\
- Tu conexión a internet\n\
- Intenta nuevamente en unos momentos";

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the local user.
    User,
    /// Reply from the accounting assistant (or the fixed error reply).
    Assistant,
}

/// A single message in a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Builds an assistant message from an arbitrary JSON value.
    ///
    /// Strings are taken verbatim; anything else is stringified as JSON.
    pub fn assistant_from_value(value: &Value) -> Self {
        Self::assistant(content_to_text(value))
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}

/// Converts untrusted message content into display text.
pub fn content_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Append-only, ordered sequence of messages for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageThread {
    messages: Vec<ChatMessage>,
}

impl MessageThread {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// The last [`HISTORY_WINDOW`] messages, oldest first.
    ///
    /// Recomputed on every call; the window is never stored.
    pub fn history_window(&self) -> Vec<ChatMessage> {
        let start = self.messages.len().saturating_sub(HISTORY_WINDOW);
        self.messages[start..].to_vec()
    }

    /// Most recent user message followed by an assistant reply.
    pub fn last_exchange(&self) -> Option<(&ChatMessage, &ChatMessage)> {
        self.messages
            .windows(2)
            .rev()
            .find(|pair| pair[0].is_user() && !pair[1].is_user())
            .map(|pair| (&pair[0], &pair[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn thread_with(count: usize) -> MessageThread {
        let mut thread = MessageThread::new();
        for i in 0..count {
            if i % 2 == 0 {
                thread.push(ChatMessage::user(format!("q{i}")));
            } else {
                thread.push(ChatMessage::assistant(format!("a{i}")));
            }
        }
        thread
    }

    #[test]
    fn history_window_is_bounded_by_five() {
        for prior in 0..12 {
            let mut thread = thread_with(prior);
            thread.push(ChatMessage::user("new"));
            let window = thread.history_window();
            assert_eq!(window.len(), (prior + 1).min(HISTORY_WINDOW));
            assert_eq!(window.last().unwrap().content, "new");
        }
    }

    #[test]
    fn history_window_keeps_order() {
        let thread = thread_with(8);
        let contents: Vec<_> = thread
            .history_window()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["a3", "q4", "a5", "q6", "a7"]);
    }

    #[test]
    fn non_string_content_is_stringified() {
        let msg = ChatMessage::assistant_from_value(&json!({"total": 10}));
        assert_eq!(msg.content, r#"{"total":10}"#);

        let msg = ChatMessage::assistant_from_value(&json!("hola"));
        assert_eq!(msg.content, "hola");
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn last_exchange_skips_trailing_user_message() {
        let mut thread = thread_with(4);
        thread.push(ChatMessage::user("pending"));
        let (q, a) = thread.last_exchange().unwrap();
        assert_eq!(q.content, "q2");
        assert_eq!(a.content, "a3");
    }
}
