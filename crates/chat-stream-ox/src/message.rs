use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique identifier for a message, assigned by the sender at creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh local id (uuid v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sending,
    Sent,
    Error,
}

/// A single conversation entry. Assistant messages grow monotonically while
/// streaming and freeze on the first terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    content: String,
    status: MessageStatus,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Completed user message, ready to send.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: content.into(),
            status: MessageStatus::Sent,
            timestamp: Utc::now(),
        }
    }

    /// Empty assistant placeholder in the `Sending` state.
    pub fn assistant_placeholder(id: MessageId) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: String::new(),
            status: MessageStatus::Sending,
            timestamp: Utc::now(),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn is_streaming(&self) -> bool {
        self.status == MessageStatus::Sending
    }

    /// Append a fragment. Content is append-only and only mutable while
    /// `Sending`; after a terminal transition the call has no effect.
    pub fn append_content(&mut self, fragment: &str) {
        if self.status != MessageStatus::Sending {
            debug_assert!(false, "append_content on a finalized message");
            return;
        }
        self.content.push_str(fragment);
    }

    /// Transition to `Sent`. No-op once the message left `Sending`.
    pub fn mark_sent(&mut self) {
        if self.status == MessageStatus::Sending {
            self.status = MessageStatus::Sent;
        }
    }

    /// Transition to `Error`, appending a short failure notice. No-op once
    /// the message left `Sending`.
    pub fn mark_error(&mut self, notice: &str) {
        if self.status == MessageStatus::Sending {
            if !self.content.is_empty() {
                self.content.push('\n');
            }
            self.content.push_str(notice);
            self.status = MessageStatus::Error;
        }
    }
}
