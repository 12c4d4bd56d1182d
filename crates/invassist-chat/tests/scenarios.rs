//! End-to-end conversation flows against an in-memory backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use invassist_chat::format::display_rows;
use invassist_chat::{
    ChatError, ChatWidget, DirectorySink, EntryMode, ExportAction, SendOutcome, FALLBACK_TEXT,
};
use invassist_client::{AssistantBackend, ClientError, ExportPayload};
use invassist_core::config::{ChatConfig, ExportConfig};
use invassist_core::types::{ExportIndex, ExportKind, ExportRequest, SearchResponse};

/// Records every call. Sessions are issued as S1, S2, ...
#[derive(Default)]
struct RecordingBackend {
    responses: Mutex<VecDeque<serde_json::Value>>,
    started: Mutex<u32>,
    ended: Mutex<Vec<String>>,
    exports: Mutex<Vec<(ExportKind, ExportRequest)>>,
    fail_end: bool,
}

impl RecordingBackend {
    fn with_responses(bodies: Vec<serde_json::Value>) -> Self {
        Self {
            responses: Mutex::new(bodies.into()),
            ..Self::default()
        }
    }

    fn export_sessions(&self) -> Vec<String> {
        self.exports
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.session_id.clone())
            .collect()
    }
}

#[async_trait]
impl AssistantBackend for RecordingBackend {
    async fn start_session(&self, _tenant_id: &str) -> Result<String, ClientError> {
        let mut n = self.started.lock().unwrap();
        *n += 1;
        Ok(format!("S{}", n))
    }

    async fn end_session(&self, _tenant_id: &str, session_id: &str) -> Result<(), ClientError> {
        self.ended.lock().unwrap().push(session_id.to_string());
        if self.fail_end {
            return Err(ClientError::Status {
                status: 500,
                message: "Internal Server Error".to_string(),
                detail: None,
            });
        }
        Ok(())
    }

    async fn search(
        &self,
        _tenant_id: &str,
        _session_id: Option<&str>,
        _query: &str,
    ) -> Result<SearchResponse, ClientError> {
        let body = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::Transport("no response queued".to_string()))?;
        serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn export(
        &self,
        kind: ExportKind,
        request: &ExportRequest,
    ) -> Result<ExportPayload, ClientError> {
        self.exports.lock().unwrap().push((kind, request.clone()));
        Ok(ExportPayload {
            bytes: format!("{}-{}", kind, request.index).into_bytes(),
            content_type: Some("application/octet-stream".to_string()),
        })
    }
}

struct Harness {
    widget: ChatWidget,
    backend: Arc<RecordingBackend>,
    downloads: tempfile::TempDir,
}

fn harness(backend: RecordingBackend) -> Harness {
    let backend = Arc::new(backend);
    let downloads = tempfile::tempdir().unwrap();
    let widget = ChatWidget::new(
        backend.clone(),
        "tenant-1",
        ChatConfig::default(),
        ExportConfig::default(),
        Arc::new(DirectorySink::new(downloads.path().to_string_lossy())),
    );
    Harness {
        widget,
        backend,
        downloads,
    }
}

fn envelope(data: serde_json::Value) -> serde_json::Value {
    json!({"success": true, "code": 200, "message": "OK", "errors": null, "data": data})
}

fn invoice_rows(n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| json!({"Id": i + 1, "NetTotal": 1000.0 + i as f64}))
        .collect()
}

fn answered(outcome: SendOutcome) -> Vec<invassist_chat::ChatEntry> {
    match outcome {
        SendOutcome::Answered(entries) => entries,
        SendOutcome::Discarded => panic!("response was discarded"),
    }
}

#[tokio::test]
async fn database_answer_is_truncated_for_display_but_exports_full_dataset() {
    let h = harness(RecordingBackend::with_responses(vec![envelope(json!({
        "response_type": "database",
        "columns": ["Id", "NetTotal"],
        "rows": invoice_rows(12),
        "count": 12,
        "index": 3
    }))]));
    h.widget.open().await.unwrap();

    let entries = answered(h.widget.send_message("show invoices for October").await.unwrap());
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.mode, Some(EntryMode::Database));
    assert_eq!(entry.export_index, Some(ExportIndex(3)));

    let table = entry.table.as_ref().unwrap();
    let limit = h.widget.chat_config().display_row_limit;
    assert_eq!(display_rows(table, limit).len(), 5);
    assert_eq!(table.row_count, 12);

    let actions = entry.export_actions();
    assert_eq!(
        actions,
        vec![ExportAction {
            kind: ExportKind::Excel,
            index: ExportIndex(3)
        }]
    );
    let saved = h.widget.export(actions[0].kind, actions[0].index).await.unwrap();
    assert_eq!(saved.file_name, "data_3.xlsx");
    assert!(h.downloads.path().join("data_3.xlsx").exists());

    let exports = h.backend.exports.lock().unwrap();
    assert_eq!(exports[0].1.index, ExportIndex(3));
}

#[tokio::test]
async fn hybrid_answer_exports_each_artifact_by_its_own_index() {
    let h = harness(RecordingBackend::with_responses(vec![envelope(json!({
        "response_type": "hybrid",
        "database": {"columns": ["Id"], "rows": invoice_rows(2), "count": 2, "index": 1},
        "ai": {
            "ok": true,
            "analysis_text": {"text": "Totals are stable.", "index": 2},
            "chart": {"svg": "<svg>...</svg>", "index": 5}
        }
    }))]));
    h.widget.open().await.unwrap();

    let entries = answered(h.widget.send_message("compare totals").await.unwrap());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].mode, Some(EntryMode::Hybrid));

    for action in entries[0].export_actions() {
        h.widget.export(action.kind, action.index).await.unwrap();
    }

    let exports = h.backend.exports.lock().unwrap();
    let sent: Vec<(ExportKind, i64)> = exports.iter().map(|(k, r)| (*k, r.index.0)).collect();
    assert_eq!(
        sent,
        vec![
            (ExportKind::Excel, 1),
            (ExportKind::Pdf, 2),
            (ExportKind::Word, 2),
            (ExportKind::Png, 5),
        ]
    );
}

#[tokio::test]
async fn rotation_hint_applies_to_exports_of_that_answer() {
    let mut body = envelope(json!({
        "response_type": "ai",
        "analysis_text": {"text": "Summary", "index": 4},
        "chart": null
    }));
    body["metadata"] = json!({"new_session_id": "S2-rotated"});
    let h = harness(RecordingBackend::with_responses(vec![body]));
    assert_eq!(h.widget.open().await.unwrap(), "S1");

    let entries = answered(h.widget.send_message("summarize").await.unwrap());
    let index = entries[0].export_index.unwrap();
    h.widget.export(ExportKind::Pdf, index).await.unwrap();

    assert_eq!(h.backend.export_sessions(), vec!["S2-rotated".to_string()]);
}

#[tokio::test]
async fn export_without_session_is_rejected_locally() {
    let h = harness(RecordingBackend::default());

    let err = h
        .widget
        .export(ExportKind::Excel, ExportIndex(3))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::SessionExpired));
    assert!(h.backend.exports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_ai_answer_yields_single_fallback_entry() {
    let h = harness(RecordingBackend::with_responses(vec![envelope(json!({
        "response_type": "ai",
        "analysis_text": null,
        "chart": null
    }))]));
    h.widget.open().await.unwrap();

    let entries = answered(h.widget.send_message("why?").await.unwrap());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content.as_deref(), Some(FALLBACK_TEXT));
    assert!(entries[0].export_index.is_none());
    assert!(entries[0].export_actions().is_empty());
}

#[tokio::test]
async fn latest_rotation_wins() {
    let h = harness(RecordingBackend::default());
    h.widget.open().await.unwrap();
    h.widget.sessions().rotate("X");
    h.widget.sessions().rotate("Y");

    h.widget.export(ExportKind::Png, ExportIndex(8)).await.unwrap();
    assert_eq!(h.backend.export_sessions(), vec!["Y".to_string()]);
}

#[tokio::test]
async fn older_message_exports_with_current_session() {
    let mut second = envelope(json!({"response_type": "message", "response_message": "ok"}));
    second["metadata"] = json!({"new_session_id": "S9"});
    let h = harness(RecordingBackend::with_responses(vec![
        envelope(json!({
            "response_type": "database",
            "columns": ["Id"],
            "rows": invoice_rows(1),
            "count": 1,
            "index": 11
        })),
        second,
    ]));
    h.widget.open().await.unwrap();

    let first = answered(h.widget.send_message("list").await.unwrap());
    h.widget.send_message("thanks").await.unwrap();

    let index = first[0].export_index.unwrap();
    h.widget.export(ExportKind::Excel, index).await.unwrap();
    let exports = h.backend.exports.lock().unwrap();
    assert_eq!(exports[0].1.session_id, "S9");
    assert_eq!(exports[0].1.index, ExportIndex(11));
}

#[tokio::test]
async fn restart_yields_new_session_even_when_close_fails() {
    let h = harness(RecordingBackend {
        fail_end: true,
        ..RecordingBackend::with_responses(vec![envelope(
            json!({"response_type": "message", "response_message": "hi"}),
        )])
    });
    h.widget.open().await.unwrap();
    h.widget.send_message("hello").await.unwrap();
    assert_eq!(h.widget.history().len(), 2);

    let id = h.widget.clear_and_restart().await.unwrap();
    assert_eq!(id, "S2");
    assert!(h.widget.history().is_empty());
    assert_eq!(*h.backend.ended.lock().unwrap(), vec!["S1".to_string()]);
}

#[tokio::test]
async fn unparseable_answer_keeps_only_the_question() {
    let h = harness(RecordingBackend::with_responses(vec![envelope(json!({
        "response_type": "spreadsheet"
    }))]));
    h.widget.open().await.unwrap();

    let err = h.widget.send_message("odd").await.unwrap_err();
    assert!(matches!(err, ChatError::Search(ClientError::Decode(_))));
    assert_eq!(h.widget.history().len(), 1);
    assert!(h.widget.last_error().is_some());
    assert!(!h.widget.is_loading());
}

#[tokio::test]
async fn closing_ends_session_and_blocks_sends() {
    let h = harness(RecordingBackend::default());
    h.widget.open().await.unwrap();
    h.widget.close().await;

    assert_eq!(*h.backend.ended.lock().unwrap(), vec!["S1".to_string()]);
    assert!(matches!(
        h.widget.send_message("hello").await.unwrap_err(),
        ChatError::WidgetClosed
    ));
}
