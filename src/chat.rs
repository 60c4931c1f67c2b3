//! Chat relay
//!
//! Stateless pass-through chat. Every message is broadcast as-is; the sender
//! name is resolved at send time from the registry (or "Teacher" for the
//! moderator) and nothing is retained.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A relayed chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub message: String,
    /// "Teacher" for moderator messages, otherwise the registered display
    /// name or "Anonymous".
    pub sender: String,
    pub is_teacher: bool,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(message: impl Into<String>, sender: impl Into<String>, is_teacher: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message: message.into(),
            sender: sender.into(),
            is_teacher,
            timestamp: Utc::now(),
        }
    }
}
