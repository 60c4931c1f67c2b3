//! Participant registry
//!
//! Tracks connected participants (students) and their display names, keyed by
//! connection id. Registry changes never close a running poll on their own;
//! the completion condition is only re-checked when an answer arrives or the
//! timer fires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A registered participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    /// Stable per-connection identifier.
    pub id: String,
    pub name: String,
    pub joined_at: DateTime<Utc>,
}

/// Connected-participant bookkeeping.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: HashMap<String, ParticipantRecord>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant. Idempotent per connection: registering again
    /// overwrites the previous record.
    pub fn register(&mut self, connection_id: &str, name: &str) -> ParticipantRecord {
        let record = ParticipantRecord {
            id: connection_id.to_string(),
            name: name.to_string(),
            joined_at: Utc::now(),
        };
        self.participants
            .insert(connection_id.to_string(), record.clone());
        record
    }

    /// Remove a participant. Safe no-op when absent; returns whether a
    /// record was actually removed.
    pub fn remove(&mut self, connection_id: &str) -> bool {
        self.participants.remove(connection_id).is_some()
    }

    pub fn contains(&self, connection_id: &str) -> bool {
        self.participants.contains_key(connection_id)
    }

    pub fn get(&self, connection_id: &str) -> Option<&ParticipantRecord> {
        self.participants.get(connection_id)
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }

    /// Snapshot of the current participants, oldest join first.
    pub fn list(&self) -> Vec<ParticipantRecord> {
        let mut all: Vec<_> = self.participants.values().cloned().collect();
        all.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
        all
    }
}
