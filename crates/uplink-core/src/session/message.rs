//! Conversation message types.
//!
//! Messages are immutable once created: a session only ever appends them.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Typed by the user.
    User,
    /// Produced by the backend (or the client on its behalf).
    Ai,
}

/// A single message in a chat session.
///
/// Serialized with the field names `id`, `text`, `sender` and an optional
/// `sources` list, which is omitted entirely when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Millisecond timestamp, unique within a store instance.
    pub id: u64,
    /// The message body (Markdown for AI replies).
    pub text: String,
    /// The author of the message.
    pub sender: Sender,
    /// Source document names backing an AI reply, in backend order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl Message {
    /// Creates a user message.
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            sender: Sender::User,
            sources: None,
        }
    }

    /// Creates an AI message with optional sources.
    pub fn ai(id: u64, text: impl Into<String>, sources: Option<Vec<String>>) -> Self {
        Self {
            id,
            text: text.into(),
            sender: Sender::Ai,
            sources,
        }
    }

    /// Returns true when the user authored this message.
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}
