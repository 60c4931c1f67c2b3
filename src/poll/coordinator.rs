//! Poll Coordinator
//!
//! State machine for the single active poll: collects each participant's
//! answer exactly once, keeps tallies in lockstep with the ledger, and closes
//! the session when everyone has answered or the timer fires, whichever
//! comes first. The losing trigger is a guaranteed no-op.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};

use super::session::{self, PollHistoryEntry, PollId, PollSession, PollStatus};
use super::PollError;

/// The active session plus its append-only answer ledger.
#[derive(Debug)]
struct ActivePoll {
    session: PollSession,
    /// participant id -> chosen option. At most one entry per participant.
    ledger: HashMap<String, String>,
}

/// Point-in-time tally view of a session, shaped for broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallySnapshot {
    pub poll_id: PollId,
    pub results: BTreeMap<String, u64>,
    pub total_answers: usize,
    pub total_students: usize,
}

/// Result of a successfully recorded answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// More answers are still outstanding.
    Progress(TallySnapshot),
    /// This answer was the last one; the session just completed.
    Completed(TallySnapshot),
}

/// Owns the active-poll slot and the completed-poll history.
///
/// Purely synchronous: callers pass in the current participant count and are
/// responsible for arming/canceling the expiry timer and publishing the
/// events derived from each outcome.
#[derive(Debug, Default)]
pub struct PollCoordinator {
    next_id: u64,
    active: Option<ActivePoll>,
    history: Vec<PollHistoryEntry>,
}

impl PollCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new poll session.
    ///
    /// Rejected with `PollInProgress` while registered participants are still
    /// answering the current one. A fully-answered (or participant-free)
    /// active session may be superseded; its timer is the caller's to cancel.
    pub fn start_poll(
        &mut self,
        question: String,
        options: Vec<String>,
        time_limit_secs: u64,
        participant_count: usize,
    ) -> Result<PollSession, PollError> {
        if let Some(active) = &self.active {
            if active.ledger.len() < participant_count && participant_count > 0 {
                return Err(PollError::PollInProgress);
            }
        }
        let options = session::normalize_options(&options)?;
        self.next_id += 1;
        let session = PollSession::new(PollId::new(self.next_id), question, options, time_limit_secs);
        self.active = Some(ActivePoll {
            session: session.clone(),
            ledger: HashMap::new(),
        });
        Ok(session)
    }

    /// Record one participant's answer.
    ///
    /// On success the ledger entry and the matching tally move together, and
    /// the session completes iff the ledger now covers the current
    /// participant count.
    pub fn submit_answer(
        &mut self,
        session_id: PollId,
        participant_id: &str,
        option: &str,
        participant_count: usize,
    ) -> Result<AnswerOutcome, PollError> {
        let active = self.active.as_mut().ok_or(PollError::NoActivePoll)?;
        if active.session.id != session_id {
            return Err(PollError::PollMismatch);
        }
        if active.ledger.contains_key(participant_id) {
            return Err(PollError::AlreadyAnswered);
        }
        let tally = active
            .session
            .results
            .get_mut(option)
            .ok_or(PollError::InvalidOption)?;
        *tally += 1;
        active
            .ledger
            .insert(participant_id.to_string(), option.to_string());

        if active.ledger.len() >= participant_count {
            self.complete(participant_count)
                .map(AnswerOutcome::Completed)
                .ok_or(PollError::NoActivePoll)
        } else {
            Ok(AnswerOutcome::Progress(TallySnapshot {
                poll_id: session_id,
                results: active.session.results.clone(),
                total_answers: active.ledger.len(),
                total_students: participant_count,
            }))
        }
    }

    /// Timer trigger. Returns `None` (a no-op, not an error) when the active
    /// session's identity differs from the scheduled one: the session
    /// already completed or was superseded and the fire is stale.
    pub fn expire(
        &mut self,
        session_id: PollId,
        participant_count: usize,
    ) -> Option<TallySnapshot> {
        match &self.active {
            Some(active) if active.session.id == session_id => self.complete(participant_count),
            _ => None,
        }
    }

    /// Move the active session to Completed. Taking the slot makes every
    /// completion path idempotent: the second trigger finds nothing to do.
    fn complete(&mut self, participant_count: usize) -> Option<TallySnapshot> {
        let ActivePoll { mut session, ledger } = self.active.take()?;
        session.status = PollStatus::Completed;
        session.completed_at = Some(Utc::now());
        let snapshot = TallySnapshot {
            poll_id: session.id,
            results: session.results.clone(),
            total_answers: ledger.len(),
            total_students: participant_count,
        };
        self.history.push(PollHistoryEntry {
            total_answers: ledger.len() as u64,
            poll: session,
        });
        Some(snapshot)
    }

    /// The active session, if any.
    pub fn current_session(&self) -> Option<&PollSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// Completed sessions, oldest first.
    pub fn history(&self) -> &[PollHistoryEntry] {
        &self.history
    }

    /// Tally snapshot of the active session without mutating anything.
    pub fn results_snapshot(&self, participant_count: usize) -> Option<TallySnapshot> {
        self.active.as_ref().map(|active| TallySnapshot {
            poll_id: active.session.id,
            results: active.session.results.clone(),
            total_answers: active.ledger.len(),
            total_students: participant_count,
        })
    }
}
