//! Chat session domain model.
//!
//! A [`ChatSession`] is one independent chat thread. The persisted form of
//! the whole collection is a plain JSON array of sessions, so the helpers
//! here encode and decode exactly that shape.

use super::message::Message;
use crate::error::{Result, UplinkError};
use std::collections::HashSet;
use serde::{Deserialize, Serialize};

/// Maximum number of UTF-16 code units kept when deriving a title.
pub const TITLE_MAX_CHARS: usize = 30;

/// Title given to sessions created through the store.
pub const NEW_SESSION_TITLE: &str = "New Analytical Thread";

/// Greeting seeded into sessions created through the store.
pub const NEW_SESSION_GREETING: &str = "New Mission Thread Initialized. Ready for data transmission.";

/// Identifier of the built-in session used when nothing is persisted.
pub const DEFAULT_SESSION_ID: &str = "1";

/// Title of the built-in session.
pub const DEFAULT_SESSION_TITLE: &str = "Initial Mission Briefing";

/// Creation timestamp of the built-in session (2024-01-28T08:00:00Z).
pub const DEFAULT_SESSION_TIMESTAMP: u64 = 1_706_428_800_000;

/// Greeting seeded into the built-in session.
pub const DEFAULT_SESSION_GREETING: &str = "System Online. Connected to ISRO Mainframe.\nHello, I am your Mission Assistant. How can I help you today?";

/// Id of the seeded AI message in every fresh session.
const SEED_MESSAGE_ID: u64 = 1;

/// One chat thread with its own history and title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    /// Unique session identifier (millisecond timestamp as a string)
    pub id: String,
    /// Human-readable title, derived from the first user message
    pub title: String,
    /// Append-only history, never empty
    pub messages: Vec<Message>,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl ChatSession {
    /// The session used when storage holds nothing usable.
    pub fn default_seed() -> Self {
        Self {
            id: DEFAULT_SESSION_ID.to_string(),
            title: DEFAULT_SESSION_TITLE.to_string(),
            messages: vec![Message::ai(SEED_MESSAGE_ID, DEFAULT_SESSION_GREETING, None)],
            timestamp: DEFAULT_SESSION_TIMESTAMP,
        }
    }

    /// A fresh thread with the placeholder title and the seeded greeting.
    pub fn new_thread(id: impl Into<String>, timestamp: u64) -> Self {
        Self {
            id: id.into(),
            title: NEW_SESSION_TITLE.to_string(),
            messages: vec![Message::ai(SEED_MESSAGE_ID, NEW_SESSION_GREETING, None)],
            timestamp,
        }
    }

    /// Appends a user message, deriving the title if this is the first
    /// question asked in the session.
    pub(crate) fn push_user_message(&mut self, message: Message) {
        if self.messages.len() <= 1 {
            self.title = derive_title(&message.text);
        }
        self.messages.push(message);
    }

    /// Number of messages authored by the user.
    pub fn user_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_user()).count()
    }

    /// The most recent message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Derives a session title: the first 30 UTF-16 code units of `text`,
/// followed by `...` when anything was cut off.
///
/// A character that would straddle the limit (an astral-plane character
/// taking two units) is dropped whole rather than split.
pub fn derive_title(text: &str) -> String {
    let mut units = 0;
    let mut end = text.len();
    for (index, ch) in text.char_indices() {
        if units + ch.len_utf16() > TITLE_MAX_CHARS {
            end = index;
            break;
        }
        units += ch.len_utf16();
    }

    if end < text.len() {
        format!("{}...", &text[..end])
    } else {
        text.to_string()
    }
}

/// Serializes a session collection into its persisted JSON array form.
pub fn encode_sessions(sessions: &[ChatSession]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(sessions)?)
}

/// Parses a persisted JSON array of sessions.
///
/// Anything that is not an array of well-formed sessions is an error, and so
/// is a session with no messages or an id that appears twice. An empty array
/// decodes successfully; callers decide whether to adopt it.
pub fn decode_sessions(bytes: &[u8]) -> Result<Vec<ChatSession>> {
    let sessions: Vec<ChatSession> = serde_json::from_slice(bytes)?;

    let mut seen = HashSet::with_capacity(sessions.len());
    for session in &sessions {
        if session.messages.is_empty() {
            return Err(invalid_layout(format!(
                "session {} has no messages",
                session.id
            )));
        }
        if !seen.insert(session.id.as_str()) {
            return Err(invalid_layout(format!(
                "session id {} appears more than once",
                session.id
            )));
        }
    }

    Ok(sessions)
}

fn invalid_layout(message: String) -> UplinkError {
    UplinkError::Serialization {
        format: "JSON".to_string(),
        message,
    }
}
