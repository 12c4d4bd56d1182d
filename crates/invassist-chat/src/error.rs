//! Error types for the conversation core.

use invassist_client::ClientError;
use invassist_core::error::AssistError;
use invassist_core::types::ExportKind;

/// Shown when an export fails without a backend explanation.
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Session expired. Please reopen the assistant and try again.";

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("assistant is closed")]
    WidgetClosed,
    #[error("could not start a session: {0}")]
    SessionStart(#[source] ClientError),
    #[error("no active session")]
    SessionExpired,
    #[error("search failed: {0}")]
    Search(#[source] ClientError),
    #[error("{} export failed: {source}", .kind.label())]
    Export {
        kind: ExportKind,
        #[source]
        source: ClientError,
    },
    #[error("could not save download: {0}")]
    Download(#[from] std::io::Error),
}

impl ChatError {
    /// A notice suitable for showing to the person using the assistant.
    pub fn user_message(&self) -> String {
        match self {
            ChatError::SessionExpired => SESSION_EXPIRED_MESSAGE.to_string(),
            ChatError::Export { source, .. } => source
                .detail()
                .map(str::to_string)
                .unwrap_or_else(|| SESSION_EXPIRED_MESSAGE.to_string()),
            ChatError::SessionStart(_) => {
                "The assistant is unavailable right now. Please try again.".to_string()
            }
            ChatError::Search(source) => match source.detail() {
                Some(detail) => format!("Request failed: {}", detail),
                None => "Request failed".to_string(),
            },
            other => other.to_string(),
        }
    }
}

impl From<ChatError> for AssistError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::SessionStart(_) | ChatError::SessionExpired => {
                AssistError::Session(err.to_string())
            }
            ChatError::Export { .. } | ChatError::Download(_) => {
                AssistError::Export(err.to_string())
            }
            other => AssistError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(detail: Option<&str>) -> ClientError {
        ClientError::Status {
            status: 410,
            message: detail.unwrap_or("Gone").to_string(),
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(2000).to_string(),
            "message exceeds maximum length of 2000 characters"
        );
        assert_eq!(ChatError::SessionExpired.to_string(), "no active session");

        let err = ChatError::Export {
            kind: ExportKind::Excel,
            source: status(None),
        };
        assert_eq!(err.to_string(), "Excel export failed: backend returned 410: Gone");
    }

    #[test]
    fn test_export_user_message_prefers_backend_detail() {
        let err = ChatError::Export {
            kind: ExportKind::Pdf,
            source: status(Some("Index 4 is not available")),
        };
        assert_eq!(err.user_message(), "Index 4 is not available");
    }

    #[test]
    fn test_export_user_message_falls_back_to_session_expired() {
        let err = ChatError::Export {
            kind: ExportKind::Png,
            source: ClientError::Transport("connection reset".to_string()),
        };
        assert_eq!(err.user_message(), SESSION_EXPIRED_MESSAGE);
        assert_eq!(ChatError::SessionExpired.user_message(), SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn test_search_user_message() {
        let err = ChatError::Search(ClientError::Timeout {
            endpoint: "/api/search".to_string(),
        });
        assert_eq!(err.user_message(), "Request failed");

        let err = ChatError::Search(status(Some("Query too vague")));
        assert_eq!(err.user_message(), "Request failed: Query too vague");
    }

    #[test]
    fn test_into_assist_error() {
        let err: AssistError = ChatError::SessionExpired.into();
        assert!(matches!(err, AssistError::Session(_)));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: AssistError = ChatError::from(io).into();
        assert!(matches!(err, AssistError::Export(_)));
    }
}
