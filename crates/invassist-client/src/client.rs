//! reqwest implementation of the assistant backend.
//!
//! Each endpoint carries its own timeout: searches wait for AI generation,
//! exports and session calls fail fast.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use invassist_core::config::{normalize_base_url, BackendConfig};
use invassist_core::types::{
    backend_error_detail, ComparisonRequest, ComparisonResponse, ExportKind, ExportRequest,
    InvoiceResponse, SearchResponse, SessionStartResponse,
};

use crate::backend::{AssistantBackend, ExportPayload};
use crate::error::ClientError;

const SESSION_START_PATH: &str = "/api/session/start";
const SESSION_END_PATH: &str = "/api/session/end";
const SEARCH_PATH: &str = "/api/search";
const INVOICES_PATH: &str = "/api/invoices/fetch";
const COMPARISON_PATH: &str = "/api/comparison/comparison";
const COMPARISON_DOWNLOAD_PATH: &str = "/api/comparison/download";

const TENANT_HEADER: &str = "TenantId";
const SESSION_HEADER: &str = "SessionId";

/// Per-endpoint request timeouts.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub session: Duration,
    pub search: Duration,
    pub export: Duration,
    pub invoices: Duration,
    pub comparison: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from(&BackendConfig::default())
    }
}

impl From<&BackendConfig> for Timeouts {
    fn from(config: &BackendConfig) -> Self {
        Self {
            session: config.session_timeout(),
            search: config.search_timeout(),
            export: config.export_timeout(),
            invoices: config.invoice_timeout(),
            comparison: config.comparison_timeout(),
        }
    }
}

/// HTTP client for the search/AI service.
#[derive(Clone)]
pub struct AssistantClient {
    http: Client,
    base_url: String,
    timeouts: Timeouts,
}

impl AssistantClient {
    /// Creates a client for `base_url` with default timeouts.
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            http: Client::new(),
            base_url: normalize_base_url(base_url.as_ref()),
            timeouts: Timeouts::default(),
        }
    }

    /// Creates a client from the `[backend]` config section.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(&config.base_url).with_timeouts(Timeouts::from(config))
    }

    /// Overrides the per-endpoint timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// List invoices between two `YYYY-MM-DD` dates.
    pub async fn fetch_invoices(
        &self,
        tenant_id: &str,
        from_date: &str,
        to_date: &str,
    ) -> Result<InvoiceResponse, ClientError> {
        tracing::debug!(from_date, to_date, "Fetching invoices");
        let request = self
            .http
            .get(self.url(INVOICES_PATH))
            .header(TENANT_HEADER, tenant_id)
            .query(&[("FromDate", from_date), ("ToDate", to_date)])
            .timeout(self.timeouts.invoices);
        let response = send(request, INVOICES_PATH).await?;
        decode_json(response, INVOICES_PATH).await
    }

    /// Request an invoice comparison report.
    ///
    /// Never fails: transport errors and unstructured HTTP errors are folded
    /// into a `success = false` envelope.
    pub async fn compare_invoice(
        &self,
        tenant_id: &str,
        request: &ComparisonRequest,
    ) -> ComparisonResponse {
        tracing::debug!(
            account = %request.account_number,
            date = %request.current_date,
            "Requesting comparison"
        );
        let builder = self
            .http
            .post(self.url(COMPARISON_PATH))
            .header(TENANT_HEADER, tenant_id)
            .json(request)
            .timeout(self.timeouts.comparison);

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "Comparison request failed");
                let tag = if e.is_timeout() || e.is_connect() {
                    "NETWORK_ERROR"
                } else {
                    "UNKNOWN_ERROR"
                };
                return ComparisonResponse::failure(500, e.to_string(), tag);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                return ComparisonResponse::failure(
                    status.as_u16().into(),
                    e.to_string(),
                    "NETWORK_ERROR",
                )
            }
        };

        match serde_json::from_str::<ComparisonResponse>(&body) {
            Ok(parsed) => parsed,
            Err(_) if status.is_success() => ComparisonResponse::failure(
                status.as_u16().into(),
                "Unreadable comparison response",
                "UNKNOWN_ERROR",
            ),
            Err(_) => {
                let message = backend_error_detail(&body)
                    .unwrap_or_else(|| status_message(status));
                ComparisonResponse::failure(status.as_u16().into(), message, "NETWORK_ERROR")
            }
        }
    }

    /// Download a generated comparison report by its file id.
    pub async fn download_comparison(
        &self,
        tenant_id: &str,
        file_id: i64,
    ) -> Result<ExportPayload, ClientError> {
        let path = format!("{}/{}", COMPARISON_DOWNLOAD_PATH, file_id);
        let request = self
            .http
            .get(self.url(&path))
            .header(TENANT_HEADER, tenant_id)
            .timeout(self.timeouts.comparison);
        let response = send(request, COMPARISON_DOWNLOAD_PATH).await?;
        read_payload(response, COMPARISON_DOWNLOAD_PATH).await
    }
}

#[async_trait]
impl AssistantBackend for AssistantClient {
    async fn start_session(&self, tenant_id: &str) -> Result<String, ClientError> {
        tracing::info!(tenant_id, "Starting session");
        let request = self
            .http
            .post(self.url(SESSION_START_PATH))
            .header(TENANT_HEADER, tenant_id)
            .json(&serde_json::json!({}))
            .timeout(self.timeouts.session);
        let response = send(request, SESSION_START_PATH).await?;
        let body: SessionStartResponse = decode_json(response, SESSION_START_PATH).await?;
        body.into_session_id().ok_or(ClientError::MissingSessionId)
    }

    async fn end_session(&self, tenant_id: &str, session_id: &str) -> Result<(), ClientError> {
        let request = self
            .http
            .post(self.url(SESSION_END_PATH))
            .header(TENANT_HEADER, tenant_id)
            .header(SESSION_HEADER, session_id)
            .json(&serde_json::json!({}))
            .timeout(self.timeouts.session);
        send(request, SESSION_END_PATH).await?;
        Ok(())
    }

    async fn search(
        &self,
        tenant_id: &str,
        session_id: Option<&str>,
        query: &str,
    ) -> Result<SearchResponse, ClientError> {
        let request = self
            .http
            .post(self.url(SEARCH_PATH))
            .header(TENANT_HEADER, tenant_id)
            .header(SESSION_HEADER, session_id.unwrap_or(""))
            .json(&serde_json::json!({ "query": query }))
            .timeout(self.timeouts.search);
        let response = send(request, SEARCH_PATH).await?;
        decode_json(response, SEARCH_PATH).await
    }

    async fn export(
        &self,
        kind: ExportKind,
        request: &ExportRequest,
    ) -> Result<ExportPayload, ClientError> {
        let endpoint = kind.endpoint();
        let builder = self
            .http
            .post(self.url(endpoint))
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .json(request)
            .timeout(self.timeouts.export);
        let response = send(builder, endpoint).await?;
        read_payload(response, endpoint).await
    }
}

// -- Private helpers --

/// Send a request and turn non-2xx responses into `ClientError::Status`.
async fn send(request: RequestBuilder, endpoint: &str) -> Result<Response, ClientError> {
    let response = request
        .send()
        .await
        .map_err(|e| ClientError::from_reqwest(endpoint, e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = backend_error_detail(&body);
    let message = detail.clone().unwrap_or_else(|| status_message(status));
    tracing::warn!(endpoint, status = status.as_u16(), message = %message, "Backend request failed");
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
        detail,
    })
}

async fn decode_json<T: DeserializeOwned>(
    response: Response,
    endpoint: &str,
) -> Result<T, ClientError> {
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::from_reqwest(endpoint, e))?;
    serde_json::from_str(&body).map_err(|e| ClientError::Decode(format!("{}: {}", endpoint, e)))
}

async fn read_payload(response: Response, endpoint: &str) -> Result<ExportPayload, ClientError> {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::from_reqwest(endpoint, e))?;
    Ok(ExportPayload {
        bytes: bytes.to_vec(),
        content_type,
    })
}

fn status_message(status: reqwest::StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
