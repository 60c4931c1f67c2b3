//! WebSocket gateway
//!
//! One outbound mpsc queue per connection. Broadcasts fan out with
//! `try_send` and drop on a full queue rather than block the publisher.
//! Kicked connections are severed after the kicked notice is queued.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AppState;
use crate::events::{ClientCommand, EventSink, Outbound, ServerEvent, Target};

/// Fan-out table of connected clients.
#[derive(Debug)]
pub struct ConnectionPool {
    connections: Mutex<HashMap<String, mpsc::Sender<String>>>,
    queue_size: usize,
}

impl ConnectionPool {
    pub fn new(queue_size: usize) -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            queue_size,
        }
    }

    fn insert(&self, connection_id: &str) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(self.queue_size);
        self.connections.lock().insert(connection_id.to_string(), tx);
        rx
    }

    /// Dropping the sender ends the connection's write task, which drains
    /// any queued events and then closes the socket.
    fn remove(&self, connection_id: &str) {
        self.connections.lock().remove(connection_id);
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    fn send_to(&self, connection_id: &str, payload: &str) {
        let sender = self.connections.lock().get(connection_id).cloned();
        let Some(sender) = sender else { return };
        if sender.try_send(payload.to_string()).is_err() {
            warn!(connection_id, "outbound queue full; dropping event");
        }
    }

    fn send_all(&self, payload: &str) {
        for sender in self.connections.lock().values() {
            let _ = sender.try_send(payload.to_string());
        }
    }
}

impl EventSink for ConnectionPool {
    fn publish(&self, outbound: Outbound) {
        let payload = match serde_json::to_string(&outbound.event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%err, "failed to encode outbound event");
                return;
            }
        };
        match &outbound.target {
            Target::Broadcast => self.send_all(&payload),
            Target::To(connection_id) => {
                self.send_to(connection_id, &payload);
                if matches!(outbound.event, ServerEvent::Kicked { .. }) {
                    self.remove(connection_id);
                }
            }
        }
    }
}

/// Upgrade handler for `GET /ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = format!("conn_{}", Uuid::new_v4().simple());
    let mut rx = state.pool.insert(&connection_id);
    info!(connection_id, "client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    while let Some(message) = ws_rx.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientCommand>(&text) {
                Ok(command) => state.facade.handle_command(&connection_id, command),
                Err(err) => {
                    debug!(connection_id, %err, "ignoring unrecognized message");
                }
            },
            Ok(Message::Close(_)) | Err(_) => break,
            // ping/pong and binary frames need no handling here
            Ok(_) => {}
        }
    }

    state.pool.remove(&connection_id);
    state.facade.disconnect(&connection_id);
    writer.abort();
    info!(connection_id, "client disconnected");
}
