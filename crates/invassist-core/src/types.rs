use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AssistError;

/// A table row as returned by the backend: column name to cell value.
pub type Row = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Export index
// =============================================================================

/// Backend-assigned identifier of an exportable artifact within a session.
///
/// Opaque: it is read off a search response and sent back verbatim on export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportIndex(pub i64);

impl fmt::Display for ExportIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExportIndex {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().trim_start_matches('#');
        raw.parse::<i64>()
            .map(ExportIndex)
            .map_err(|_| AssistError::Export(format!("invalid export index: {}", s)))
    }
}

// =============================================================================
// Search response
// =============================================================================

/// Envelope of every `/api/search` response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<ResponseMetadata>,
    pub data: SearchData,
}

impl SearchResponse {
    /// The replacement session id the backend issued, if any.
    pub fn rotation_hint(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.new_session_id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }
}

/// Out-of-band response metadata.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub new_session_id: Option<String>,
}

/// Search payload, discriminated by `response_type`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "response_type", rename_all = "lowercase")]
pub enum SearchData {
    /// Plain conversational reply.
    Message(MessageData),
    /// AI-generated analysis text and/or chart.
    Ai(AiData),
    /// Tabular database result.
    Database(TableResult),
    /// Table plus AI commentary in one turn.
    Hybrid(HybridData),
}

impl SearchData {
    /// The wire discriminant of this payload.
    pub fn response_type(&self) -> &'static str {
        match self {
            SearchData::Message(_) => "message",
            SearchData::Ai(_) => "ai",
            SearchData::Database(_) => "database",
            SearchData::Hybrid(_) => "hybrid",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageData {
    pub response_message: String,
}

/// Tabular result carrying the index of its full server-side dataset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub count: u64,
    pub index: ExportIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiSummary {
    pub text: String,
    pub index: ExportIndex,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AiChart {
    pub svg: String,
    pub index: ExportIndex,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AiData {
    #[serde(default)]
    pub analysis_text: Option<AiSummary>,
    #[serde(default)]
    pub chart: Option<AiChart>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HybridAiPart {
    #[serde(default)]
    pub ok: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub analysis_text: Option<AiSummary>,
    #[serde(default)]
    pub chart: Option<AiChart>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HybridData {
    pub database: TableResult,
    #[serde(default)]
    pub ai: HybridAiPart,
}

// =============================================================================
// Session
// =============================================================================

/// Body of a `/api/session/start` response.
///
/// The id is accepted at the top level or nested under `data`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionStartResponse {
    #[serde(rename = "SessionId", alias = "session_id", alias = "sessionId", default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub data: Option<SessionStartData>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionStartData {
    #[serde(rename = "SessionId", alias = "session_id", alias = "sessionId", default)]
    pub session_id: Option<String>,
}

impl SessionStartResponse {
    pub fn into_session_id(self) -> Option<String> {
        self.session_id
            .or_else(|| self.data.and_then(|d| d.session_id))
            .filter(|id| !id.trim().is_empty())
    }
}

// =============================================================================
// Export
// =============================================================================

/// Kind of file the backend renders for an export index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Pdf,
    Word,
    Excel,
    Png,
}

impl ExportKind {
    pub const ALL: [ExportKind; 4] = [
        ExportKind::Pdf,
        ExportKind::Word,
        ExportKind::Excel,
        ExportKind::Png,
    ];

    /// Request path relative to the backend base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            ExportKind::Pdf => "/api/export/pdf",
            ExportKind::Word => "/api/export/word",
            ExportKind::Excel => "/api/export/excel",
            ExportKind::Png => "/api/export/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportKind::Pdf => "pdf",
            ExportKind::Word => "docx",
            ExportKind::Excel => "xlsx",
            ExportKind::Png => "png",
        }
    }

    /// Deterministic download name for an export of `index`.
    pub fn file_name(&self, index: ExportIndex) -> String {
        let stem = match self {
            ExportKind::Pdf | ExportKind::Word => "report",
            ExportKind::Excel => "data",
            ExportKind::Png => "chart",
        };
        format!("{}_{}.{}", stem, index, self.extension())
    }

    /// Human-readable label, e.g. for "Failed to export PDF".
    pub fn label(&self) -> &'static str {
        match self {
            ExportKind::Pdf => "PDF",
            ExportKind::Word => "Word",
            ExportKind::Excel => "Excel",
            ExportKind::Png => "PNG",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportKind::Pdf => "pdf",
            ExportKind::Word => "word",
            ExportKind::Excel => "excel",
            ExportKind::Png => "png",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ExportKind {
    type Err = AssistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportKind::Pdf),
            "word" | "docx" => Ok(ExportKind::Word),
            "excel" | "xlsx" => Ok(ExportKind::Excel),
            "png" | "chart" => Ok(ExportKind::Png),
            other => Err(AssistError::Export(format!("unknown export kind: {}", other))),
        }
    }
}

/// Per-format export options. Only the fields relevant to a kind are sent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExportOptions {
    pub title: Option<String>,
    pub sheet_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Body of an export request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ExportRequest {
    #[serde(rename = "TenantId")]
    pub tenant_id: String,
    #[serde(rename = "SessionId")]
    pub session_id: String,
    pub index: ExportIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ExportRequest {
    pub fn new(
        kind: ExportKind,
        tenant_id: impl Into<String>,
        session_id: impl Into<String>,
        index: ExportIndex,
        options: &ExportOptions,
    ) -> Self {
        let mut request = Self {
            tenant_id: tenant_id.into(),
            session_id: session_id.into(),
            index,
            title: None,
            sheet_name: None,
            width: None,
            height: None,
        };
        match kind {
            ExportKind::Pdf | ExportKind::Word => request.title = options.title.clone(),
            ExportKind::Excel => request.sheet_name = options.sheet_name.clone(),
            ExportKind::Png => {
                request.width = options.width;
                request.height = options.height;
            }
        }
        request
    }
}

/// Extract a human-readable message from a backend error body.
///
/// Understands `{"detail": "..."}`, `{"detail": {"message": "..."}}` and
/// `{"message": "..."}`. Returns `None` for anything else.
pub fn backend_error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = value.get("detail");
    let text = match detail {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(obj @ serde_json::Value::Object(_)) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    };
    text.or_else(|| {
        value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
    })
    .filter(|s| !s.trim().is_empty())
}

// =============================================================================
// Invoices and comparison
// =============================================================================

/// `/api/invoices/fetch` response. `data` is either a bare list or `{rows}`.
#[derive(Clone, Debug, Deserialize)]
pub struct InvoiceResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub data: Option<InvoicePayload>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum InvoicePayload {
    List(Vec<Row>),
    Rows { rows: Vec<Row> },
}

impl InvoiceResponse {
    /// Flatten either payload shape into a list of invoice rows.
    pub fn into_invoices(self) -> Vec<Row> {
        match self.data {
            Some(InvoicePayload::List(rows)) => rows,
            Some(InvoicePayload::Rows { rows }) => rows,
            None => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonRequest {
    #[serde(rename = "AccountNumber")]
    pub account_number: String,
    /// Invoice date as `YYYY-MM-DD`.
    #[serde(rename = "CurrentDate")]
    pub current_date: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub file_id: i64,
    pub file_name: String,
    pub file_size: u64,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComparisonResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub data: Option<ComparisonResult>,
}

impl ComparisonResult {
    /// Local file name for the downloaded report. Derived from the id only;
    /// the backend-supplied `file_name` is never used as a path.
    pub fn download_file_name(&self) -> String {
        format!("comparison-{}.pdf", self.file_id)
    }
}

impl ComparisonResponse {
    /// A synthesized failure envelope for transport-level errors.
    pub fn failure(code: i64, message: impl Into<String>, tag: &str) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
            errors: Some(vec![tag.to_string()]),
            metadata: None,
            data: None,
        }
    }
}
