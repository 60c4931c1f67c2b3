//! End-to-end session flows through the facade with a collecting sink.
//!
//! Timer behavior runs under paused tokio time so the countdown races are
//! deterministic.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pollroom::events::{EventSink, Outbound, ServerEvent, Target};
use pollroom::facade::SessionFacade;

#[derive(Default)]
struct Collector {
    events: Mutex<Vec<Outbound>>,
}

impl Collector {
    fn take(&self) -> Vec<Outbound> {
        std::mem::take(&mut self.events.lock())
    }

    fn ended_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|o| matches!(o.event, ServerEvent::PollEnded { .. }))
            .count()
    }
}

impl EventSink for Collector {
    fn publish(&self, outbound: Outbound) {
        self.events.lock().push(outbound);
    }
}

fn setup() -> (Arc<SessionFacade>, Arc<Collector>) {
    let sink = Arc::new(Collector::default());
    let facade = SessionFacade::new(60, sink.clone());
    (facade, sink)
}

async fn settle() {
    // let spawned timer tasks observe the advanced clock
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

#[tokio::test(start_paused = true)]
async fn alice_and_bob_drive_a_poll_to_completion() {
    let (facade, sink) = setup();
    facade.register("alice", "Alice");
    facade.register("bob", "Bob");
    facade.create_poll(
        "teacher",
        "A or B?".to_string(),
        vec!["A".into(), "B".into()],
        Some(60),
    );
    let poll_id = facade.current_poll().unwrap().id;
    sink.take();

    facade.submit_answer("alice", poll_id, "A");
    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].target, Target::Broadcast);
    match &events[0].event {
        ServerEvent::PollResults {
            results,
            total_answers,
            total_students,
            ..
        } => {
            assert_eq!(results.get("A"), Some(&1));
            assert_eq!(results.get("B"), Some(&0));
            assert_eq!(*total_answers, 1);
            assert_eq!(*total_students, 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    facade.submit_answer("bob", poll_id, "B");
    let events = sink.take();
    assert_eq!(events.len(), 1);
    match &events[0].event {
        ServerEvent::PollEnded {
            results,
            total_answers,
            ..
        } => {
            assert_eq!(results.get("A"), Some(&1));
            assert_eq!(results.get("B"), Some(&1));
            assert_eq!(*total_answers, 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert!(facade.current_poll().is_none());
    let history = facade.poll_history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].total_answers, 2);

    // the countdown fires later; completion already happened, so nothing more
    tokio::time::sleep(Duration::from_secs(61)).await;
    settle().await;
    assert!(sink.take().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unanswered_poll_ends_exactly_once_on_timeout() {
    let (facade, sink) = setup();
    facade.register("solo", "Solo");
    facade.create_poll(
        "teacher",
        "anyone?".to_string(),
        vec!["A".into(), "B".into()],
        Some(5),
    );
    sink.take();

    tokio::time::sleep(Duration::from_secs(4)).await;
    settle().await;
    assert_eq!(sink.ended_count(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle().await;

    let events = sink.take();
    assert_eq!(events.len(), 1);
    match &events[0].event {
        ServerEvent::PollEnded {
            results,
            total_answers,
            total_students,
            ..
        } => {
            assert_eq!(results.get("A"), Some(&0));
            assert_eq!(results.get("B"), Some(&0));
            assert_eq!(*total_answers, 0);
            assert_eq!(*total_students, 1);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    // well past the deadline nothing else arrives
    tokio::time::sleep(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(sink.ended_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn create_poll_blocked_until_previous_completes() {
    let (facade, sink) = setup();
    facade.register("alice", "Alice");
    facade.create_poll(
        "teacher",
        "first".to_string(),
        vec!["A".into(), "B".into()],
        Some(60),
    );
    let first_id = facade.current_poll().unwrap().id;
    sink.take();

    facade.create_poll(
        "teacher",
        "second".to_string(),
        vec!["X".into(), "Y".into()],
        Some(60),
    );
    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].target, Target::To("teacher".to_string()));
    assert!(matches!(
        events[0].event,
        ServerEvent::PollCreationError {
            code: "poll_in_progress",
            ..
        }
    ));

    facade.submit_answer("alice", first_id, "A");
    sink.take();

    facade.create_poll(
        "teacher",
        "second".to_string(),
        vec!["X".into(), "Y".into()],
        Some(60),
    );
    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0].event, ServerEvent::NewPoll { .. }));
}

#[tokio::test(start_paused = true)]
async fn kick_mid_poll_shrinks_the_required_count_for_the_next_answer() {
    let (facade, sink) = setup();
    facade.register("alice", "Alice");
    facade.register("bob", "Bob");
    facade.register("carol", "Carol");
    facade.create_poll(
        "teacher",
        "q?".to_string(),
        vec!["A".into(), "B".into()],
        Some(60),
    );
    let poll_id = facade.current_poll().unwrap().id;
    sink.take();

    facade.submit_answer("alice", poll_id, "A");
    // the partial result was evaluated against three students
    let events = sink.take();
    assert!(matches!(
        events[0].event,
        ServerEvent::PollResults {
            total_students: 3,
            ..
        }
    ));

    // carol never answers and is removed; nothing completes yet
    facade.kick("carol");
    sink.take();
    assert!(facade.current_poll().is_some());

    // the next answer re-checks against the current count of two
    facade.submit_answer("bob", poll_id, "B");
    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0].event,
        ServerEvent::PollEnded {
            total_answers: 2,
            total_students: 2,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn stale_timer_from_superseded_poll_is_ignored() {
    let (facade, sink) = setup();
    // with no students registered, an active poll may be superseded
    facade.create_poll(
        "teacher",
        "first".to_string(),
        vec!["A".into(), "B".into()],
        Some(5),
    );
    facade.create_poll(
        "teacher",
        "second".to_string(),
        vec!["X".into(), "Y".into()],
        Some(60),
    );
    let second_id = facade.current_poll().unwrap().id;
    sink.take();

    // past the first poll's deadline: its timer must not touch the second
    tokio::time::sleep(Duration::from_secs(10)).await;
    settle().await;
    assert_eq!(sink.ended_count(), 0);
    assert_eq!(facade.current_poll().map(|p| p.id), Some(second_id));

    // the second poll still expires on its own schedule
    tokio::time::sleep(Duration::from_secs(55)).await;
    settle().await;
    let events = sink.take();
    assert_eq!(
        events
            .iter()
            .filter(|o| matches!(o.event, ServerEvent::PollEnded { .. }))
            .count(),
        1
    );
}

/// Stalls the first live-tally publish, the way a preempted task would be.
#[derive(Default)]
struct SlowFirstResults {
    events: Mutex<Vec<Outbound>>,
    stalled: AtomicBool,
}

impl SlowFirstResults {
    fn take(&self) -> Vec<Outbound> {
        std::mem::take(&mut self.events.lock())
    }
}

impl EventSink for SlowFirstResults {
    fn publish(&self, outbound: Outbound) {
        if matches!(outbound.event, ServerEvent::PollResults { .. })
            && !self.stalled.swap(true, Ordering::SeqCst)
        {
            std::thread::sleep(Duration::from_millis(50));
        }
        self.events.lock().push(outbound);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_answers_never_reorder_results_after_ended() {
    let sink = Arc::new(SlowFirstResults::default());
    let facade = SessionFacade::new(60, sink.clone());
    facade.register("alice", "Alice");
    facade.register("bob", "Bob");
    facade.create_poll(
        "teacher",
        "A or B?".to_string(),
        vec!["A".into(), "B".into()],
        Some(60),
    );
    let poll_id = facade.current_poll().unwrap().id;
    sink.take();

    // alice's partial tally is stalled mid-publish while bob's final answer
    // waits on the session lock; the terminal event must still come last
    let first = facade.clone();
    let alice = tokio::spawn(async move {
        first.submit_answer("alice", poll_id, "A");
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = facade.clone();
    let bob = tokio::spawn(async move {
        second.submit_answer("bob", poll_id, "B");
    });
    alice.await.unwrap();
    bob.await.unwrap();

    let events = sink.take();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0].event, ServerEvent::PollResults { .. }));
    assert!(matches!(events[1].event, ServerEvent::PollEnded { .. }));
}

#[tokio::test(start_paused = true)]
async fn duplicate_answer_leaves_results_unchanged() {
    let (facade, sink) = setup();
    facade.register("alice", "Alice");
    facade.register("bob", "Bob");
    facade.create_poll(
        "teacher",
        "q?".to_string(),
        vec!["A".into(), "B".into()],
        Some(60),
    );
    let poll_id = facade.current_poll().unwrap().id;
    sink.take();

    facade.submit_answer("alice", poll_id, "A");
    sink.take();
    facade.submit_answer("alice", poll_id, "B");

    let events = sink.take();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].target, Target::To("alice".to_string()));
    assert!(matches!(
        events[0].event,
        ServerEvent::Error {
            code: "already_answered",
            ..
        }
    ));

    // unchanged tally, still waiting on bob
    facade.get_poll_results("teacher");
    let events = sink.take();
    match &events[0].event {
        ServerEvent::PollResults {
            results,
            total_answers,
            ..
        } => {
            assert_eq!(results.get("A"), Some(&1));
            assert_eq!(results.get("B"), Some(&0));
            assert_eq!(*total_answers, 1);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}
