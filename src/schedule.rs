//! Poll expiration scheduling
//!
//! A cancelable delayed trigger per poll session. Arming schedules exactly
//! one future invocation of the callback; canceling an already-fired or
//! already-canceled timer is a no-op. At most one timer is armed per
//! session.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::poll::PollId;

#[derive(Debug, Default)]
pub struct ExpirationScheduler {
    armed: Mutex<HashMap<PollId, CancellationToken>>,
}

impl ExpirationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer for `session_id`. Re-arming the same session replaces
    /// (and cancels) the previous timer.
    pub fn arm<F, Fut>(&self, session_id: PollId, delay: Duration, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.armed.lock().insert(session_id, token.clone()) {
            previous.cancel();
        }
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(%session_id, "expiry timer canceled");
                }
                _ = tokio::time::sleep(delay) => {
                    on_fire().await;
                }
            }
        });
    }

    /// Cancel the pending timer for `session_id`, if any.
    pub fn cancel(&self, session_id: PollId) {
        if let Some(token) = self.armed.lock().remove(&session_id) {
            token.cancel();
        }
    }

    #[cfg(test)]
    pub(crate) fn armed_count(&self) -> usize {
        self.armed.lock().len()
    }
}
