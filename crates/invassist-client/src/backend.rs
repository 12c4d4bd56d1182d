//! The backend contract the conversation core depends on.

use async_trait::async_trait;

use invassist_core::types::{ExportKind, ExportRequest, SearchResponse};

use crate::error::ClientError;

/// A binary file returned by an export or download endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Request/response contract with the search/AI service.
///
/// Implementations perform exactly one network call per method and never
/// retry.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// `POST /api/session/start`. Returns the new session id.
    async fn start_session(&self, tenant_id: &str) -> Result<String, ClientError>;

    /// `POST /api/session/end`.
    async fn end_session(&self, tenant_id: &str, session_id: &str) -> Result<(), ClientError>;

    /// `POST /api/search`. An absent session is sent as an empty header.
    async fn search(
        &self,
        tenant_id: &str,
        session_id: Option<&str>,
        query: &str,
    ) -> Result<SearchResponse, ClientError>;

    /// `POST /api/export/{kind}`.
    async fn export(
        &self,
        kind: ExportKind,
        request: &ExportRequest,
    ) -> Result<ExportPayload, ClientError>;
}
