//! Wire protocol
//!
//! Tagged JSON messages exchanged over the WebSocket: inbound client
//! commands and outbound server events, plus the delivery-target wrapper the
//! facade hands to the transport.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::chat::ChatMessage;
use crate::participants::ParticipantRecord;
use crate::poll::{PollError, PollId, PollSession, TallySnapshot};

/// Inbound client command.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Moderator starts a new poll.
    #[serde(rename_all = "camelCase")]
    CreatePoll {
        question: String,
        options: Vec<String>,
        /// Seconds; falls back to the configured default when absent.
        #[serde(default)]
        time_limit: Option<u64>,
    },
    /// Student registers a display name for this connection.
    RegisterStudent { name: String },
    /// Student answers the active poll.
    #[serde(rename_all = "camelCase")]
    SubmitAnswer { poll_id: PollId, answer: String },
    /// One-off tally snapshot of the active poll, sent back to the caller.
    GetPollResults,
    /// Moderator removes a student from the session.
    #[serde(rename_all = "camelCase")]
    KickStudent { student_id: String },
    /// Current participant list, sent back to the caller.
    GetStudents,
    /// Chat relay; no poll state involved.
    #[serde(rename_all = "camelCase")]
    SendMessage {
        message: String,
        #[serde(default)]
        is_teacher: bool,
    },
}

/// Outbound server event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    NewPoll {
        poll: PollSession,
    },
    #[serde(rename_all = "camelCase")]
    PollResults {
        poll_id: PollId,
        results: BTreeMap<String, u64>,
        total_answers: usize,
        total_students: usize,
    },
    #[serde(rename_all = "camelCase")]
    PollEnded {
        poll_id: PollId,
        results: BTreeMap<String, u64>,
        total_answers: usize,
        total_students: usize,
    },
    PollCreationError {
        code: &'static str,
        message: String,
    },
    Error {
        code: &'static str,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    RegistrationSuccess {
        student_id: String,
    },
    Kicked {
        message: String,
    },
    StudentList {
        students: Vec<ParticipantRecord>,
    },
    StudentListUpdated {
        students: Vec<ParticipantRecord>,
    },
    NewMessage {
        message: ChatMessage,
    },
}

impl ServerEvent {
    /// Live tally event for a still-running session.
    pub fn poll_results(snapshot: &TallySnapshot) -> Self {
        Self::PollResults {
            poll_id: snapshot.poll_id,
            results: snapshot.results.clone(),
            total_answers: snapshot.total_answers,
            total_students: snapshot.total_students,
        }
    }

    /// Final tally event, emitted exactly once per session.
    pub fn poll_ended(snapshot: &TallySnapshot) -> Self {
        Self::PollEnded {
            poll_id: snapshot.poll_id,
            results: snapshot.results.clone(),
            total_answers: snapshot.total_answers,
            total_students: snapshot.total_students,
        }
    }

    /// Targeted failure event for the originating connection.
    pub fn failure(err: PollError) -> Self {
        if err.is_creation_error() {
            Self::PollCreationError {
                code: err.code(),
                message: err.to_string(),
            }
        } else {
            Self::Error {
                code: err.code(),
                message: err.to_string(),
            }
        }
    }
}

/// Delivery target for an outbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Every connected client.
    Broadcast,
    /// A single connection.
    To(String),
}

/// An event paired with where it should go.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub target: Target,
    pub event: ServerEvent,
}

impl Outbound {
    pub fn broadcast(event: ServerEvent) -> Self {
        Self {
            target: Target::Broadcast,
            event,
        }
    }

    pub fn to(connection_id: impl Into<String>, event: ServerEvent) -> Self {
        Self {
            target: Target::To(connection_id.into()),
            event,
        }
    }
}

/// Where the facade publishes outbound events. The WebSocket gateway
/// implements this over its connection pool; tests collect into a vector.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, outbound: Outbound);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_command_tags() {
        let command: ClientCommand = serde_json::from_str(
            r#"{"type":"create_poll","question":"2+2?","options":["3","4"],"timeLimit":30}"#,
        )
        .unwrap();
        match command {
            ClientCommand::CreatePoll {
                question,
                options,
                time_limit,
            } => {
                assert_eq!(question, "2+2?");
                assert_eq!(options.len(), 2);
                assert_eq!(time_limit, Some(30));
            }
            _ => panic!("wrong variant"),
        }

        let command: ClientCommand =
            serde_json::from_str(r#"{"type":"submit_answer","pollId":7,"answer":"4"}"#).unwrap();
        assert!(matches!(command, ClientCommand::SubmitAnswer { .. }));

        let command: ClientCommand =
            serde_json::from_str(r#"{"type":"send_message","message":"hi"}"#).unwrap();
        match command {
            ClientCommand::SendMessage { is_teacher, .. } => assert!(!is_teacher),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_server_event_tags() {
        let event = ServerEvent::RegistrationSuccess {
            student_id: "c1".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "registration_success");
        assert_eq!(value["studentId"], "c1");
    }

    #[test]
    fn test_failure_event_routing() {
        let creation = ServerEvent::failure(PollError::PollInProgress);
        assert!(matches!(
            creation,
            ServerEvent::PollCreationError { code: "poll_in_progress", .. }
        ));

        let answer = ServerEvent::failure(PollError::AlreadyAnswered);
        assert!(matches!(
            answer,
            ServerEvent::Error { code: "already_answered", .. }
        ));
    }

    #[test]
    fn test_poll_results_event_shape() {
        let snapshot = TallySnapshot {
            poll_id: crate::poll::session::PollId::new(3),
            results: [("A".to_string(), 1), ("B".to_string(), 0)].into(),
            total_answers: 1,
            total_students: 2,
        };
        let value = serde_json::to_value(ServerEvent::poll_results(&snapshot)).unwrap();
        assert_eq!(value["type"], "poll_results");
        assert_eq!(value["pollId"], 3);
        assert_eq!(value["results"]["A"], 1);
        assert_eq!(value["totalAnswers"], 1);
        assert_eq!(value["totalStudents"], 2);
    }
}
