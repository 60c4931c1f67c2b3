//! Poll session lifecycle
//!
//! Owns the single active poll, its answer ledger, and the completed-poll
//! history. Completion races two triggers: full participation and the
//! countdown timer; whichever fires first wins and the other is a no-op.

pub mod coordinator;
pub mod session;

pub use coordinator::{AnswerOutcome, PollCoordinator, TallySnapshot};
pub use session::{PollHistoryEntry, PollId, PollSession, PollStatus};

use thiserror::Error;

/// Poll operation failures. All recoverable; each maps to one targeted event
/// for the originating connection and is never broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("students are still answering the current question")]
    PollInProgress,
    #[error("a poll needs at least two distinct options")]
    InvalidPollSpec,
    #[error("please register first")]
    NotRegistered,
    #[error("no poll is currently active")]
    NoActivePoll,
    #[error("poll not found or expired")]
    PollMismatch,
    #[error("you have already answered this poll")]
    AlreadyAnswered,
    #[error("that option is not part of this poll")]
    InvalidOption,
}

impl PollError {
    /// Stable wire code carried in error event payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PollInProgress => "poll_in_progress",
            Self::InvalidPollSpec => "invalid_poll_spec",
            Self::NotRegistered => "not_registered",
            Self::NoActivePoll => "no_active_poll",
            Self::PollMismatch => "poll_mismatch",
            Self::AlreadyAnswered => "already_answered",
            Self::InvalidOption => "invalid_option",
        }
    }

    /// Whether this failure belongs on the `poll_creation_error` event
    /// rather than the generic `error` event.
    pub fn is_creation_error(&self) -> bool {
        matches!(self, Self::PollInProgress | Self::InvalidPollSpec)
    }
}
