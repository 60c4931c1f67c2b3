//! HTTP and WebSocket server
//!
//! Serves the read-only poll API and the `/ws` realtime endpoint.

pub mod ws;

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::ServerConfig;
use crate::facade::SessionFacade;
use crate::poll::{PollHistoryEntry, PollSession};
use ws::ConnectionPool;

/// Server startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address: {0}")]
    Bind(#[from] std::net::AddrParseError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared handles for all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<SessionFacade>,
    pub pool: Arc<ConnectionPool>,
}

impl AppState {
    /// Wire the facade and the connection pool together: the pool is both
    /// the transport registry and the facade's event sink.
    pub fn new(config: &ServerConfig) -> Self {
        let pool = Arc::new(ConnectionPool::new(config.queue_size));
        let facade = SessionFacade::new(config.default_time_limit_secs, pool.clone());
        Self { facade, pool }
    }
}

#[derive(Debug, Serialize)]
struct CurrentPollResponse {
    poll: Option<PollSession>,
}

#[derive(Debug, Serialize)]
struct PollHistoryResponse {
    history: Vec<PollHistoryEntry>,
}

/// Assemble the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/poll/current", get(current_poll_handler))
        .route("/api/poll/history", get(poll_history_handler))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn current_poll_handler(State(state): State<AppState>) -> Json<CurrentPollResponse> {
    Json(CurrentPollResponse {
        poll: state.facade.current_poll(),
    })
}

async fn poll_history_handler(State(state): State<AppState>) -> Json<PollHistoryResponse> {
    Json(PollHistoryResponse {
        history: state.facade.poll_history(),
    })
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    let state = AppState::new(&config);
    let app = router(state);

    info!(address = %addr, "starting pollroom server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
