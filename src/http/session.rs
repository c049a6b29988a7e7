//! Open SSE sessions
//!
//! Each `/sse` stream owns one bounded channel; messages posted to
//! `/messages?sessionId=...` are answered through it.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;

/// Responses a session may hold before its client reads them.
pub const SESSION_BUFFER: usize = 64;

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Sender<Value>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session and returns its id together with the receiving
    /// half of its channel.
    pub fn open(&self) -> (String, Receiver<Value>) {
        let session_id = Uuid::new_v4().to_string();
        let (sender, receiver) = mpsc::channel(SESSION_BUFFER);
        self.sessions().insert(session_id.clone(), sender);
        debug!(session_id = %session_id, "sse session opened");
        (session_id, receiver)
    }

    /// Returns a sender for `session_id`, or `NotFound` for unknown or closed
    /// sessions.
    pub fn sender(&self, session_id: &str) -> Result<Sender<Value>, AppError> {
        self.sessions()
            .get(session_id)
            .filter(|sender| !sender.is_closed())
            .cloned()
            .ok_or_else(|| AppError::not_found("session_not_found", "unknown or closed session"))
    }

    /// Queues `message` on the session's stream without waiting. A client
    /// that has stopped reading gets `Unavailable` once its buffer is full.
    pub fn deliver(&self, session_id: &str, message: Value) -> Result<(), AppError> {
        self.sender(session_id)?
            .try_send(message)
            .map_err(|err| match err {
                TrySendError::Full(_) => AppError::unavailable(
                    "session_backlog_full",
                    "session is not reading responses",
                ),
                TrySendError::Closed(_) => AppError::not_found(
                    "session_not_found",
                    "session closed before the response was sent",
                ),
            })
    }

    pub fn close(&self, session_id: &str) {
        if self.sessions().remove(session_id).is_some() {
            debug!(session_id = %session_id, "sse session closed");
        }
    }

    /// Drops every sender so that all open streams end. Used on shutdown,
    /// where graceful shutdown would otherwise wait on idle SSE clients.
    pub fn close_all(&self) {
        let mut sessions = self.sessions();
        let count = sessions.len();
        sessions.clear();
        debug!(count, "all sse sessions closed");
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions().contains_key(session_id)
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Sender<Value>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its session from the store when dropped, which happens when the
/// client disconnects and axum drops the event stream.
pub struct SessionGuard {
    store: SessionStore,
    session_id: String,
}

impl SessionGuard {
    pub fn new(store: SessionStore, session_id: String) -> Self {
        Self { store, session_id }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.store.close(&self.session_id);
    }
}
