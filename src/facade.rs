//! Session facade
//!
//! The boundary between the transport and the poll core. Each inbound intent
//! becomes one serialized mutation of the combined registry + coordinator
//! state, and every outcome is published as targeted or broadcast events
//! through an [`EventSink`] while the state lock is still held, so
//! subscribers always observe events in mutation order. The sink contract is
//! non-blocking and must not call back into the facade. The timer callback
//! re-enters through [`SessionFacade::expire`] exactly like any other
//! intent.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::chat::ChatMessage;
use crate::events::{ClientCommand, EventSink, Outbound, ServerEvent};
use crate::participants::ParticipantRegistry;
use crate::poll::{AnswerOutcome, PollCoordinator, PollError, PollHistoryEntry, PollId, PollSession};
use crate::schedule::ExpirationScheduler;

/// Combined mutable session state. One lock guards both pieces so no intent
/// can observe a torn registry/ledger intermediate.
#[derive(Debug, Default)]
struct RoomState {
    registry: ParticipantRegistry,
    coordinator: PollCoordinator,
}

pub struct SessionFacade {
    state: Mutex<RoomState>,
    scheduler: ExpirationScheduler,
    sink: Arc<dyn EventSink>,
    default_time_limit_secs: u64,
    /// Handle to ourselves for the expiry callback; set by `new`.
    weak_self: Weak<SessionFacade>,
}

impl SessionFacade {
    pub fn new(default_time_limit_secs: u64, sink: Arc<dyn EventSink>) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            state: Mutex::new(RoomState::default()),
            scheduler: ExpirationScheduler::new(),
            sink,
            default_time_limit_secs,
            weak_self: weak_self.clone(),
        })
    }

    /// Hand events to the sink. Called with the state lock held so emission
    /// order matches mutation order; the sink must not block or re-enter.
    fn publish(&self, events: Vec<Outbound>) {
        for outbound in events {
            self.sink.publish(outbound);
        }
    }

    /// Route one decoded client command to the matching intent handler.
    pub fn handle_command(&self, connection_id: &str, command: ClientCommand) {
        match command {
            ClientCommand::CreatePoll {
                question,
                options,
                time_limit,
            } => self.create_poll(connection_id, question, options, time_limit),
            ClientCommand::RegisterStudent { name } => self.register(connection_id, &name),
            ClientCommand::SubmitAnswer { poll_id, answer } => {
                self.submit_answer(connection_id, poll_id, &answer)
            }
            ClientCommand::GetPollResults => self.get_poll_results(connection_id),
            ClientCommand::KickStudent { student_id } => self.kick(&student_id),
            ClientCommand::GetStudents => self.list_students(connection_id),
            ClientCommand::SendMessage {
                message,
                is_teacher,
            } => self.send_chat(connection_id, &message, is_teacher),
        }
    }

    /// Moderator intent: start a new poll and arm its expiry timer.
    pub fn create_poll(
        &self,
        connection_id: &str,
        question: String,
        options: Vec<String>,
        time_limit_secs: Option<u64>,
    ) {
        let time_limit = time_limit_secs.unwrap_or(self.default_time_limit_secs);
        let mut state = self.state.lock();
        let superseded = state.coordinator.current_session().map(|s| s.id);
        let count = state.registry.count();
        match state
            .coordinator
            .start_poll(question, options, time_limit, count)
        {
            Ok(session) => {
                info!(poll_id = %session.id, time_limit, "poll started");
                // a late timer from a replaced session must never act on this one
                if let Some(old) = superseded {
                    self.scheduler.cancel(old);
                }
                // armed before the lock is released: no other intent can see
                // the new session until its timer entry exists, so a
                // completing answer always finds the timer it must cancel
                let poll_id = session.id;
                if let Some(facade) = self.weak_self.upgrade() {
                    self.scheduler
                        .arm(poll_id, Duration::from_secs(time_limit), move || async move {
                            facade.expire(poll_id);
                        });
                }
                self.publish(vec![Outbound::broadcast(ServerEvent::NewPoll {
                    poll: session,
                })]);
            }
            Err(err) => {
                debug!(%err, "poll creation rejected");
                self.publish(vec![Outbound::to(connection_id, ServerEvent::failure(err))]);
            }
        }
    }

    /// Student intent: register a display name for this connection.
    pub fn register(&self, connection_id: &str, name: &str) {
        let mut state = self.state.lock();
        let record = state.registry.register(connection_id, name);
        info!(connection_id, name = %record.name, "student registered");
        let mut events = vec![Outbound::to(
            connection_id,
            ServerEvent::RegistrationSuccess {
                student_id: record.id,
            },
        )];
        // late joiners get the running poll immediately
        if let Some(session) = state.coordinator.current_session() {
            events.push(Outbound::to(
                connection_id,
                ServerEvent::NewPoll {
                    poll: session.clone(),
                },
            ));
        }
        self.publish(events);
    }

    /// Student intent: answer the active poll.
    pub fn submit_answer(&self, connection_id: &str, poll_id: PollId, answer: &str) {
        let mut state = self.state.lock();
        let events = if !state.registry.contains(connection_id) {
            vec![Outbound::to(
                connection_id,
                ServerEvent::failure(PollError::NotRegistered),
            )]
        } else {
            let count = state.registry.count();
            match state
                .coordinator
                .submit_answer(poll_id, connection_id, answer, count)
            {
                Ok(AnswerOutcome::Progress(snapshot)) => {
                    vec![Outbound::broadcast(ServerEvent::poll_results(&snapshot))]
                }
                Ok(AnswerOutcome::Completed(snapshot)) => {
                    info!(
                        %poll_id,
                        total_answers = snapshot.total_answers,
                        "poll completed: all students answered"
                    );
                    self.scheduler.cancel(poll_id);
                    vec![Outbound::broadcast(ServerEvent::poll_ended(&snapshot))]
                }
                Err(err) => {
                    debug!(connection_id, %poll_id, %err, "answer rejected");
                    vec![Outbound::to(connection_id, ServerEvent::failure(err))]
                }
            }
        };
        self.publish(events);
    }

    /// Timer callback: close the session if it is still the active one. A
    /// fire for a completed or superseded session is a no-op, not an error.
    pub fn expire(&self, poll_id: PollId) {
        let mut state = self.state.lock();
        let count = state.registry.count();
        match state.coordinator.expire(poll_id, count) {
            Some(snapshot) => {
                info!(
                    %poll_id,
                    total_answers = snapshot.total_answers,
                    "poll completed: time limit reached"
                );
                self.scheduler.cancel(poll_id);
                self.publish(vec![Outbound::broadcast(ServerEvent::poll_ended(&snapshot))]);
            }
            None => {
                debug!(%poll_id, "stale expiry fire ignored");
            }
        }
    }

    /// One-off tally snapshot of the active poll, sent back to the caller.
    pub fn get_poll_results(&self, connection_id: &str) {
        let state = self.state.lock();
        let count = state.registry.count();
        if let Some(snapshot) = state.coordinator.results_snapshot(count) {
            self.publish(vec![Outbound::to(
                connection_id,
                ServerEvent::poll_results(&snapshot),
            )]);
        }
    }

    /// Moderator intent: remove a student. The kicked notice goes to the
    /// target before the gateway severs its connection; everyone else gets
    /// the updated list.
    pub fn kick(&self, student_id: &str) {
        let mut state = self.state.lock();
        if state.registry.remove(student_id) {
            info!(student_id, "student kicked");
        }
        self.publish(vec![
            Outbound::to(
                student_id,
                ServerEvent::Kicked {
                    message: "You have been removed from the session".to_string(),
                },
            ),
            Outbound::broadcast(ServerEvent::StudentListUpdated {
                students: state.registry.list(),
            }),
        ]);
    }

    /// Current participant list, sent back to the caller.
    pub fn list_students(&self, connection_id: &str) {
        let state = self.state.lock();
        self.publish(vec![Outbound::to(
            connection_id,
            ServerEvent::StudentList {
                students: state.registry.list(),
            },
        )]);
    }

    /// Chat relay: resolve the sender name and broadcast.
    pub fn send_chat(&self, connection_id: &str, message: &str, is_teacher: bool) {
        let state = self.state.lock();
        let sender = if is_teacher {
            "Teacher".to_string()
        } else {
            state
                .registry
                .get(connection_id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "Anonymous".to_string())
        };
        let chat = ChatMessage::new(message, sender, is_teacher);
        self.publish(vec![Outbound::broadcast(ServerEvent::NewMessage {
            message: chat,
        })]);
    }

    /// Transport notification: a connection dropped. Removing an absent
    /// participant is a no-op on the set; the snapshot is re-broadcast
    /// either way.
    pub fn disconnect(&self, connection_id: &str) {
        let mut state = self.state.lock();
        state.registry.remove(connection_id);
        self.publish(vec![Outbound::broadcast(ServerEvent::StudentListUpdated {
            students: state.registry.list(),
        })]);
    }

    /// Read-only: the active session, if any.
    pub fn current_poll(&self) -> Option<PollSession> {
        self.state.lock().coordinator.current_session().cloned()
    }

    /// Read-only: completed sessions, oldest first.
    pub fn poll_history(&self) -> Vec<PollHistoryEntry> {
        self.state.lock().coordinator.history().to_vec()
    }
}
