use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Role of a participant in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The user/human participant in the conversation
    User,
    /// The assistant participant in the conversation
    Assistant,
}

/// A reference to a retrieved source backing part of an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Path of the source file the passage was retrieved from.
    pub file: String,
    /// First line of the cited range.
    #[serde(default)]
    pub line_start: u32,
    /// Last line of the cited range (inclusive).
    #[serde(default)]
    pub line_end: u32,
}

/// Backend-side run bookkeeping, attached to an assistant message at
/// finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    #[serde(default)]
    pub started_at_ms: Option<i64>,
    #[serde(default)]
    pub ended_at_ms: Option<i64>,
    /// Opaque debug payload forwarded from the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
}

/// A single chat turn.
///
/// A user message is created fully formed and never mutated afterwards. An
/// assistant message starts out as an empty placeholder and grows in place
/// while a response streams in; once a terminal event is folded it is frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable identifier for the lifetime of the turn.
    pub id: Uuid,
    pub role: Role,
    /// The text content of the message.
    pub content: String,
    /// Creation time, used as the logical order key.
    pub timestamp: DateTime<Utc>,
    /// Ordered source references, attached only at finalization.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    /// Run bookkeeping, populated only at finalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<RunMetadata>,
}

impl Message {
    /// Create a new builder for a user message
    pub fn user() -> MessageBuilder {
        MessageBuilder::new(Role::User)
    }

    /// Create a new builder for an assistant message
    pub fn assistant() -> MessageBuilder {
        MessageBuilder::new(Role::Assistant)
    }
}

/// Builder for [`Message`].
#[derive(Debug)]
pub struct MessageBuilder {
    role: Role,
    content: String,
}

impl MessageBuilder {
    /// Create a new MessageBuilder with the specified role
    pub fn new(role: Role) -> Self {
        Self {
            role,
            content: String::new(),
        }
    }

    /// Set the message content
    pub fn content<S: Into<String>>(mut self, content: S) -> Self {
        self.content = content.into();
        self
    }

    /// Build the message, assigning a fresh id and timestamp.
    pub fn build(self) -> Message {
        Message {
            id: Uuid::new_v4(),
            role: self.role,
            content: self.content,
            timestamp: Utc::now(),
            citations: Vec::new(),
            run: None,
        }
    }
}

/// Formats a failure so it is visible as assistant content instead of being
/// silently dropped.
pub(crate) fn error_text(message: &str) -> String {
    format!("Request failed: {}", message)
}
