//! Backend session lifecycle.
//!
//! The session id lives in one shared cell. `SessionManager` is the only
//! writer; search, export and session-end read it through a
//! `SessionHandle` at the moment they send, so a rotation is visible to the
//! very next request.
//!
//! Transitions:
//! - NoSession -> Active (open)
//! - Active -> Active with a new id (rotate)
//! - Active -> NoSession (close)

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use invassist_client::AssistantBackend;

use crate::error::ChatError;
use crate::history::ChatHistory;

/// Read access to the live session id.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Option<String>>>,
}

impl SessionHandle {
    /// The most recently known session id.
    pub fn current(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Replace the id, returning the previous one.
    fn replace(&self, id: Option<String>) -> Option<String> {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, id)
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NoSession,
    Active(String),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NoSession => write!(f, "NoSession"),
            SessionState::Active(id) => write!(f, "Active({})", id),
        }
    }
}

/// Owns the backend-issued session id for one tenant.
pub struct SessionManager {
    backend: Arc<dyn AssistantBackend>,
    tenant_id: String,
    handle: SessionHandle,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn AssistantBackend>, tenant_id: impl Into<String>) -> Self {
        Self {
            backend,
            tenant_id: tenant_id.into(),
            handle: SessionHandle::default(),
        }
    }

    /// A read handle sharing this manager's session cell.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn state(&self) -> SessionState {
        match self.handle.current() {
            Some(id) => SessionState::Active(id),
            None => SessionState::NoSession,
        }
    }

    /// Start a backend session.
    ///
    /// If a session is already active its id is returned without a network
    /// call. On failure the state is left unchanged.
    pub async fn open(&self) -> Result<String, ChatError> {
        if let Some(id) = self.handle.current() {
            tracing::debug!(session_id = %id, "Session already active");
            return Ok(id);
        }
        self.start().await
    }

    /// Ask the backend for a new session and store it, replacing whatever
    /// the cell holds.
    async fn start(&self) -> Result<String, ChatError> {
        match self.backend.start_session(&self.tenant_id).await {
            Ok(id) => {
                self.handle.replace(Some(id.clone()));
                tracing::info!(session_id = %id, "Session started");
                Ok(id)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start session");
                Err(ChatError::SessionStart(e))
            }
        }
    }

    /// End the active session, if any.
    ///
    /// The local state becomes `NoSession` before the backend is told, and
    /// backend failures are only logged.
    pub async fn close(&self) {
        let Some(id) = self.handle.replace(None) else {
            tracing::debug!("No active session to close");
            return;
        };

        match self.backend.end_session(&self.tenant_id, &id).await {
            Ok(()) => tracing::info!(session_id = %id, "Session ended"),
            Err(e) => tracing::warn!(session_id = %id, error = %e, "Failed to end session"),
        }
    }

    /// Adopt a server-issued replacement id. Takes effect immediately.
    pub fn rotate(&self, new_id: &str) {
        let previous = self.handle.replace(Some(new_id.to_string()));
        match previous.as_deref() {
            Some(old) if old == new_id => {}
            Some(old) => tracing::info!(old = %old, new = %new_id, "Session rotated"),
            None => tracing::info!(new = %new_id, "Session adopted from response"),
        }
    }

    /// End the old session, clear `history`, then open a fresh session.
    ///
    /// A failed close does not abort the restart, and the new id always
    /// comes from the backend even if something wrote the cell meanwhile.
    pub async fn clear_and_restart(&self, history: &ChatHistory) -> Result<String, ChatError> {
        self.close().await;
        history.clear();
        self.start().await
    }
}
