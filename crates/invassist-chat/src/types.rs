//! Chat history entry types.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use invassist_core::types::{ExportIndex, ExportKind, Row, TableResult};

/// Who produced an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// How an assistant entry is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    /// Plain conversational text.
    Message,
    /// Tabular database result.
    Database,
    /// AI analysis text or chart markup.
    Model,
    /// Table plus AI block.
    Hybrid,
}

/// Table contents as returned by the backend. `row_count` is the size of the
/// full server-side result, which may exceed `rows.len()`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: u64,
}

impl From<TableResult> for TableData {
    fn from(result: TableResult) -> Self {
        Self {
            columns: result.columns,
            rows: result.rows,
            row_count: result.count,
        }
    }
}

/// AI half of a hybrid entry. Each artifact keeps its own export index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AiBlock {
    pub analysis_text: Option<String>,
    pub analysis_index: Option<ExportIndex>,
    pub chart_markup: Option<String>,
    pub chart_index: Option<ExportIndex>,
}

/// Payload of a hybrid entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HybridBlock {
    pub table: TableData,
    /// Index of the table for Excel export.
    pub table_index: ExportIndex,
    pub ai: AiBlock,
}

/// An export a renderer can offer for an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExportAction {
    pub kind: ExportKind,
    pub index: ExportIndex,
}

impl ExportAction {
    fn new(kind: ExportKind, index: ExportIndex) -> Self {
        Self { kind, index }
    }
}

/// One conversation entry. Immutable once appended to the history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: Uuid,
    pub role: Role,
    pub timestamp: DateTime<Local>,
    pub mode: Option<EntryMode>,
    /// Text, or raw SVG markup for chart entries.
    pub content: Option<String>,
    /// Backend index of this entry's exportable content.
    pub export_index: Option<ExportIndex>,
    pub table: Option<TableData>,
    pub hybrid: Option<HybridBlock>,
}

impl ChatEntry {
    /// Echo of the raw user query.
    pub fn user(query: &str) -> Self {
        Self {
            content: Some(query.to_string()),
            ..Self::blank(Role::User, None)
        }
    }

    /// Plain assistant message with no export affordance.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::blank(Role::Assistant, Some(EntryMode::Message))
        }
    }

    /// AI text or chart entry.
    pub fn model(content: impl Into<String>, export_index: Option<ExportIndex>) -> Self {
        Self {
            content: Some(content.into()),
            export_index,
            ..Self::blank(Role::Assistant, Some(EntryMode::Model))
        }
    }

    /// Database table entry; `export_index` refers to the full dataset.
    pub fn database(table: TableData, export_index: ExportIndex) -> Self {
        Self {
            export_index: Some(export_index),
            table: Some(table),
            ..Self::blank(Role::Assistant, Some(EntryMode::Database))
        }
    }

    /// Hybrid entry. The top-level index is the analysis index, else the
    /// chart index.
    pub fn hybrid(block: HybridBlock) -> Self {
        Self {
            export_index: block.ai.analysis_index.or(block.ai.chart_index),
            hybrid: Some(block),
            ..Self::blank(Role::Assistant, Some(EntryMode::Hybrid))
        }
    }

    fn blank(role: Role, mode: Option<EntryMode>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            timestamp: Local::now(),
            mode,
            content: None,
            export_index: None,
            table: None,
            hybrid: None,
        }
    }

    /// Whether `content` is chart markup rather than text.
    pub fn is_chart(&self) -> bool {
        self.content
            .as_deref()
            .map(|c| c.trim_start().starts_with("<svg"))
            .unwrap_or(false)
    }

    /// Exports a renderer should offer for this entry, in display order.
    pub fn export_actions(&self) -> Vec<ExportAction> {
        let mut actions = Vec::new();
        match self.mode {
            Some(EntryMode::Database) => {
                if let Some(index) = self.export_index {
                    actions.push(ExportAction::new(ExportKind::Excel, index));
                }
            }
            Some(EntryMode::Hybrid) => {
                if let Some(block) = &self.hybrid {
                    actions.push(ExportAction::new(ExportKind::Excel, block.table_index));
                    if let Some(index) = block.ai.analysis_index {
                        actions.push(ExportAction::new(ExportKind::Pdf, index));
                        actions.push(ExportAction::new(ExportKind::Word, index));
                    }
                    if let Some(index) = block.ai.chart_index {
                        actions.push(ExportAction::new(ExportKind::Png, index));
                    }
                }
            }
            Some(EntryMode::Model) => {
                if let Some(index) = self.export_index {
                    if self.is_chart() {
                        actions.push(ExportAction::new(ExportKind::Png, index));
                    } else {
                        actions.push(ExportAction::new(ExportKind::Pdf, index));
                        actions.push(ExportAction::new(ExportKind::Word, index));
                    }
                }
            }
            Some(EntryMode::Message) | None => {}
        }
        actions
    }
}
