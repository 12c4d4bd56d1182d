//! The assistant widget: ties session, history, normalizer and exports
//! together behind the actions a front end exposes.
//!
//! All methods take `&self`; wrap the widget in an `Arc` to let several
//! sends overlap. Their answers are appended in completion order.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use invassist_client::AssistantBackend;
use invassist_core::config::{AssistConfig, ChatConfig, ExportConfig};
use invassist_core::types::{ExportIndex, ExportKind};

use crate::error::ChatError;
use crate::export::{DirectorySink, DownloadSink, ExportDispatcher, SavedExport};
use crate::history::ChatHistory;
use crate::normalizer::ResponseNormalizer;
use crate::session::SessionManager;
use crate::types::ChatEntry;

/// Status lines cycled while a search is outstanding.
pub const LOADING_STATUSES: [&str; 3] = ["Fetching invoices", "Analyzing data", "Preparing response"];

/// Result of a completed send.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// The response was normalized and appended.
    Answered(Vec<ChatEntry>),
    /// The widget was closed or the history cleared while waiting, so the
    /// response was dropped.
    Discarded,
}

/// Decrements the in-flight counter when a send finishes, however it ends.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ChatWidget {
    backend: Arc<dyn AssistantBackend>,
    sessions: SessionManager,
    history: ChatHistory,
    normalizer: ResponseNormalizer,
    exporter: ExportDispatcher,
    config: ChatConfig,
    open: AtomicBool,
    in_flight: AtomicUsize,
    last_error: Mutex<Option<String>>,
}

impl ChatWidget {
    pub fn new(
        backend: Arc<dyn AssistantBackend>,
        tenant_id: impl Into<String>,
        chat: ChatConfig,
        export: ExportConfig,
        sink: Arc<dyn DownloadSink>,
    ) -> Self {
        let tenant_id = tenant_id.into();
        let sessions = SessionManager::new(backend.clone(), tenant_id.clone());
        let exporter =
            ExportDispatcher::new(backend.clone(), tenant_id, sessions.handle(), sink, export);
        Self {
            backend,
            sessions,
            history: ChatHistory::new(),
            normalizer: ResponseNormalizer::new(),
            exporter,
            config: chat,
            open: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    /// Build a widget from the loaded config, saving downloads into
    /// `export.download_dir`.
    pub fn from_config(backend: Arc<dyn AssistantBackend>, config: &AssistConfig) -> Self {
        let sink = Arc::new(DirectorySink::new(&config.export.download_dir));
        Self::new(
            backend,
            config.backend.tenant_id.clone(),
            config.chat.clone(),
            config.export.clone(),
            sink,
        )
    }

    /// Show the widget and start a session.
    pub async fn open(&self) -> Result<String, ChatError> {
        self.open.store(true, Ordering::SeqCst);
        self.sessions.open().await.map_err(|e| self.record(e))
    }

    /// Hide the widget and end the session.
    ///
    /// Pending responses are dropped when they arrive. Never fails.
    pub async fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.history.invalidate();
        self.sessions.close().await;
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Submit a query.
    ///
    /// The query is echoed into the history before the backend is called and
    /// stays there whatever happens next. A failed search appends nothing
    /// else and records an error notice.
    pub async fn send_message(&self, query: &str) -> Result<SendOutcome, ChatError> {
        if !self.is_open() {
            return Err(ChatError::WidgetClosed);
        }
        if query.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if query.chars().count() > self.config.max_query_length {
            return Err(ChatError::MessageTooLong(self.config.max_query_length));
        }

        self.history.append(vec![ChatEntry::user(query)]);
        let generation = self.history.generation();
        let _loading = InFlight::start(&self.in_flight);
        self.set_error(None);

        if !self.sessions.handle().is_active() {
            self.sessions.open().await.map_err(|e| self.record(e))?;
        }

        // Read at send time so a rotation from an earlier answer applies.
        let session_id = self.sessions.handle().current();
        tracing::info!(
            session_id = session_id.as_deref().unwrap_or(""),
            query_len = query.len(),
            "Sending search"
        );
        let response = self
            .backend
            .search(self.sessions.tenant_id(), session_id.as_deref(), query)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Search failed");
                self.record(ChatError::Search(e))
            })?;

        if !self.is_open() || self.history.generation() != generation {
            tracing::debug!(
                response_type = response.data.response_type(),
                "Dropping response for a closed or cleared conversation"
            );
            return Ok(SendOutcome::Discarded);
        }
        if !response.success {
            tracing::warn!(code = response.code, message = ?response.message, "Search reported failure");
        }

        tracing::info!(response_type = response.data.response_type(), "Search answered");
        let entries = self.normalizer.process(response, &self.sessions);
        if self.history.append_if_generation(generation, entries.clone()) {
            Ok(SendOutcome::Answered(entries))
        } else {
            Ok(SendOutcome::Discarded)
        }
    }

    /// Empty the conversation without touching the session.
    pub fn clear_history(&self) {
        self.history.clear();
        self.set_error(None);
    }

    /// End the session, clear the conversation and start a new session.
    pub async fn clear_and_restart(&self) -> Result<String, ChatError> {
        self.set_error(None);
        self.history.invalidate();
        self.sessions
            .clear_and_restart(&self.history)
            .await
            .map_err(|e| self.record(e))
    }

    /// Export one artifact with the configured options.
    pub async fn export(&self, kind: ExportKind, index: ExportIndex) -> Result<SavedExport, ChatError> {
        self.exporter.export(kind, index).await.map_err(|e| self.record(e))
    }

    /// True while any search is outstanding.
    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Status line for the `tick`-th refresh of the loading indicator.
    pub fn loading_status(&self, tick: usize) -> Option<&'static str> {
        self.is_loading()
            .then(|| LOADING_STATUSES[tick % LOADING_STATUSES.len()])
    }

    /// The most recent user-facing error notice.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn exporter(&self) -> &ExportDispatcher {
        &self.exporter
    }

    pub fn chat_config(&self) -> &ChatConfig {
        &self.config
    }

    fn set_error(&self, message: Option<String>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = message;
    }

    fn record(&self, err: ChatError) -> ChatError {
        self.set_error(Some(err.user_message()));
        err
    }
}
