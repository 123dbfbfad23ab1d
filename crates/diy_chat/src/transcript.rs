//! Conversation entries shown in a chat view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Id given to the assistant greeting a view opens with.
pub const INITIAL_MESSAGE_ID: &str = "initial_message";

/// Who wrote an entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryOrigin {
    User,
    Assistant,
}

/// One line of chat history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationEntry {
    pub id: String,
    pub origin: EntryOrigin,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationEntry {
    /// Create a new user entry
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(EntryOrigin::User, content)
    }

    /// Create a new assistant entry
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(EntryOrigin::Assistant, content)
    }

    /// The greeting a view is seeded with
    pub fn initial(content: impl Into<String>) -> Self {
        Self {
            id: INITIAL_MESSAGE_ID.to_string(),
            ..Self::assistant(content)
        }
    }

    fn new(origin: EntryOrigin, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            origin,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// `HH:MM` in local time
    pub fn time_label(&self) -> String {
        self.timestamp.with_timezone(&chrono::Local).format("%H:%M").to_string()
    }
}

/// Append-only, ordered chat history.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<ConversationEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
