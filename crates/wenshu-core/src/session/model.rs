//! Session domain model.

use super::message::{Message, MessageRole};
use crate::transport::HistoryTurn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Interaction mode persisted with a session.
///
/// Sessions written before this field existed carry no mode; their mode is
/// reconstructed from the transcript instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionMode {
    Chat,
    Autofill {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        correlation_id: Option<String>,
    },
}

/// A conversational session: a titled, ordered transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Human-readable session title
    pub title: String,
    /// Ordered transcript
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SessionMode>,
}

impl Session {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            mode: Some(SessionMode::Chat),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn position(&self, message_id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Swaps in a new value for a message, keeping its transcript position.
    ///
    /// Returns `false` (and drops `next`) when the message no longer exists.
    pub fn replace_message(&mut self, message_id: &str, next: Message) -> bool {
        match self.position(message_id) {
            Some(index) => {
                self.messages[index] = next;
                true
            }
            None => false,
        }
    }

    pub fn remove_message(&mut self, message_id: &str) -> Option<Message> {
        self.position(message_id).map(|index| self.messages.remove(index))
    }

    /// Removes the first autofill control message, if any.
    pub fn remove_first_control(&mut self) -> Option<Message> {
        let index = self.messages.iter().position(Message::is_autofill_control)?;
        Some(self.messages.remove(index))
    }

    /// Role and content of every transcript entry, for sending as chat history.
    pub fn history(&self) -> Vec<HistoryTurn> {
        self.messages
            .iter()
            .map(|m| HistoryTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    pub fn count_by_role(&self, role: MessageRole) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }
}
