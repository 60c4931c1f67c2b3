//! Poll session data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::PollError;

/// Unique identifier for a poll session.
///
/// Monotonic within one process: a later session always compares greater, so
/// a stale timer can never be confused with the session that replaced it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PollId(u64);

impl PollId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a poll session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStatus {
    /// Accepting answers.
    Active,
    /// Closed; results are frozen.
    Completed,
}

/// One question/options/time-limit unit being polled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollSession {
    pub id: PollId,
    pub question: String,
    /// Ordered, pairwise-distinct option labels.
    pub options: Vec<String>,
    /// Countdown length in seconds.
    #[serde(rename = "timeLimit")]
    pub time_limit_secs: u64,
    pub status: PollStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Per-option answer counts. Keys are exactly the option set.
    pub results: BTreeMap<String, u64>,
}

impl PollSession {
    pub(crate) fn new(
        id: PollId,
        question: String,
        options: Vec<String>,
        time_limit_secs: u64,
    ) -> Self {
        let results = options.iter().map(|o| (o.clone(), 0)).collect();
        Self {
            id,
            question,
            options,
            time_limit_secs,
            status: PollStatus::Active,
            created_at: Utc::now(),
            completed_at: None,
            results,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PollStatus::Active
    }
}

/// Immutable snapshot of a completed session, appended to the history list
/// at the moment of completion and never mutated afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollHistoryEntry {
    pub poll: PollSession,
    pub total_answers: u64,
}

/// Validate and normalize option labels: trims whitespace, requires at least
/// two options, rejects empty and duplicate labels.
pub fn normalize_options(raw: &[String]) -> Result<Vec<String>, PollError> {
    let mut seen = HashSet::new();
    let mut options = Vec::with_capacity(raw.len());
    for label in raw {
        let trimmed = label.trim();
        if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
            return Err(PollError::InvalidPollSpec);
        }
        options.push(trimmed.to_string());
    }
    if options.len() < 2 {
        return Err(PollError::InvalidPollSpec);
    }
    Ok(options)
}
