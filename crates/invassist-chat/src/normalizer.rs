//! Search response normalization.
//!
//! Each `response_type` maps to a fixed set of assistant entries:
//!
//! | type       | entries                                             |
//! |------------|-----------------------------------------------------|
//! | `message`  | one plain message                                   |
//! | `ai`       | analysis text, then chart; fallback if both missing |
//! | `database` | one table entry carrying the Excel index            |
//! | `hybrid`   | one table + AI entry with per-artifact indices      |

use invassist_core::types::{AiChart, AiSummary, HybridData, SearchData, SearchResponse};

use crate::session::SessionManager;
use crate::types::{AiBlock, ChatEntry, HybridBlock, TableData};

/// Shown when an `ai` response carries neither text nor chart.
pub const FALLBACK_TEXT: &str = "I couldn't generate a response.";

/// Converts backend search responses into chat entries.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Apply any session rotation hint, then build the entries.
    ///
    /// Rotation happens first so exports on the returned entries use the new
    /// id.
    pub fn process(&self, response: SearchResponse, sessions: &SessionManager) -> Vec<ChatEntry> {
        if let Some(new_id) = response.rotation_hint() {
            sessions.rotate(new_id);
        }
        self.normalize(response.data)
    }

    /// Build the entries for one response payload.
    pub fn normalize(&self, data: SearchData) -> Vec<ChatEntry> {
        tracing::debug!(response_type = data.response_type(), "Normalizing response");
        match data {
            SearchData::Message(message) => vec![ChatEntry::message(message.response_message)],
            SearchData::Ai(ai) => {
                let mut entries = Vec::with_capacity(2);
                if let Some(AiSummary { text, index }) = ai.analysis_text {
                    entries.push(ChatEntry::model(text, Some(index)));
                }
                if let Some(AiChart { svg, index }) = ai.chart {
                    entries.push(ChatEntry::model(svg, Some(index)));
                }
                if entries.is_empty() {
                    entries.push(ChatEntry::model(FALLBACK_TEXT, None));
                }
                entries
            }
            SearchData::Database(result) => {
                let index = result.index;
                vec![ChatEntry::database(TableData::from(result), index)]
            }
            SearchData::Hybrid(hybrid) => vec![ChatEntry::hybrid(hybrid_block(hybrid))],
        }
    }
}

fn hybrid_block(data: HybridData) -> HybridBlock {
    let HybridData { database, ai } = data;
    if let Some(error) = ai.error.as_deref() {
        tracing::warn!(error, "Hybrid response carried an AI error");
    }
    let table_index = database.index;
    let (analysis_text, analysis_index) = match ai.analysis_text {
        Some(summary) => (Some(summary.text), Some(summary.index)),
        None => (None, None),
    };
    let (chart_markup, chart_index) = match ai.chart {
        Some(chart) => (Some(chart.svg), Some(chart.index)),
        None => (None, None),
    };
    HybridBlock {
        table: TableData::from(database),
        table_index,
        ai: AiBlock {
            analysis_text,
            analysis_index,
            chart_markup,
            chart_index,
        },
    }
}
