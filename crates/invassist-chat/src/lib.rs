//! Conversation core of the invoice assistant.
//!
//! Owns the backend session lifecycle, normalizes search responses into an
//! append-only chat history, and dispatches per-message exports using the
//! session id that is live at call time.

pub mod error;
pub mod export;
pub mod format;
pub mod history;
pub mod normalizer;
pub mod session;
pub mod types;
pub mod widget;

pub use error::ChatError;
pub use export::{DirectorySink, DownloadSink, ExportDispatcher, SavedExport};
pub use history::{ChatHistory, HistoryEvent};
pub use normalizer::{ResponseNormalizer, FALLBACK_TEXT};
pub use session::{SessionHandle, SessionManager, SessionState};
pub use types::{AiBlock, ChatEntry, EntryMode, ExportAction, HybridBlock, Role, TableData};
pub use widget::{ChatWidget, SendOutcome};
