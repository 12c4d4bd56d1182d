//! Error types for backend calls.

use invassist_core::error::AssistError;

/// Errors from a single backend request.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Backend-provided explanation parsed from the error body.
        detail: Option<String>,
    },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("backend did not return a session id")]
    MissingSessionId,
}

impl ClientError {
    /// Convert a reqwest failure for `endpoint` into a `ClientError`.
    pub(crate) fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }

    /// The backend's structured explanation, when it sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<ClientError> for AssistError {
    fn from(err: ClientError) -> Self {
        AssistError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::Timeout {
            endpoint: "/api/search".to_string(),
        };
        assert_eq!(err.to_string(), "request to /api/search timed out");

        let err = ClientError::Status {
            status: 404,
            message: "Index not found".to_string(),
            detail: Some("Index not found".to_string()),
        };
        assert_eq!(err.to_string(), "backend returned 404: Index not found");
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.detail(), Some("Index not found"));

        let err = ClientError::MissingSessionId;
        assert_eq!(err.to_string(), "backend did not return a session id");
        assert!(err.detail().is_none());
        assert!(err.status().is_none());
    }

    #[test]
    fn test_client_error_into_assist_error() {
        let err: AssistError = ClientError::Transport("connection refused".to_string()).into();
        assert!(matches!(err, AssistError::Backend(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
