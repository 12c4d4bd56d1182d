//! Per-message file exports.
//!
//! The dispatcher reads the session id through a [`SessionHandle`] when the
//! request is built, so exports of older messages still work after the
//! backend rotated the session.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use invassist_client::AssistantBackend;
use invassist_core::config::ExportConfig;
use invassist_core::types::{ExportIndex, ExportKind, ExportOptions, ExportRequest};

use crate::error::ChatError;
use crate::session::SessionHandle;

/// Destination for downloaded export files.
pub trait DownloadSink: Send + Sync {
    /// Persist `bytes` under `file_name` and return where they went.
    fn save(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

/// Writes downloads into a directory, creating it on first use.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    /// A leading `~` is replaced by the home directory.
    pub fn new(dir: impl AsRef<str>) -> Self {
        let dir = dir.as_ref();
        let expanded = if dir.starts_with('~') {
            let home = std::env::var("USERPROFILE")
                .or_else(|_| std::env::var("HOME"))
                .unwrap_or_else(|_| ".".to_string());
            dir.replacen('~', &home, 1)
        } else {
            dir.to_string()
        };
        Self {
            dir: PathBuf::from(expanded),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    fn save(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// A completed export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedExport {
    pub kind: ExportKind,
    pub index: ExportIndex,
    pub file_name: String,
    pub path: PathBuf,
    pub size: usize,
}

/// Issues export requests and saves the returned files.
pub struct ExportDispatcher {
    backend: Arc<dyn AssistantBackend>,
    tenant_id: String,
    session: SessionHandle,
    sink: Arc<dyn DownloadSink>,
    config: ExportConfig,
}

impl ExportDispatcher {
    pub fn new(
        backend: Arc<dyn AssistantBackend>,
        tenant_id: impl Into<String>,
        session: SessionHandle,
        sink: Arc<dyn DownloadSink>,
        config: ExportConfig,
    ) -> Self {
        Self {
            backend,
            tenant_id: tenant_id.into(),
            session,
            sink,
            config,
        }
    }

    /// Format options from the `[export]` config section.
    pub fn default_options(&self, kind: ExportKind) -> ExportOptions {
        ExportOptions {
            title: match kind {
                ExportKind::Pdf => self.config.pdf_title.clone(),
                ExportKind::Word => self.config.word_title.clone(),
                _ => None,
            },
            sheet_name: self.config.sheet_name.clone(),
            width: self.config.png_width,
            height: self.config.png_height,
        }
    }

    /// Export with the configured format options.
    pub async fn export(&self, kind: ExportKind, index: ExportIndex) -> Result<SavedExport, ChatError> {
        let options = self.default_options(kind);
        self.export_with(kind, index, &options).await
    }

    /// Export `index` as `kind` and save it as `report_<index>.pdf`,
    /// `data_<index>.xlsx` and so on.
    ///
    /// Fails with [`ChatError::SessionExpired`] before any network call when
    /// no session is active.
    pub async fn export_with(
        &self,
        kind: ExportKind,
        index: ExportIndex,
        options: &ExportOptions,
    ) -> Result<SavedExport, ChatError> {
        let Some(session_id) = self.session.current() else {
            tracing::warn!(kind = %kind, index = index.0, "Export requested without a session");
            return Err(ChatError::SessionExpired);
        };

        tracing::info!(kind = %kind, index = index.0, session_id = %session_id, "Requesting export");
        let request = ExportRequest::new(kind, self.tenant_id.as_str(), session_id, index, options);
        let payload = self
            .backend
            .export(kind, &request)
            .await
            .map_err(|source| {
                tracing::error!(kind = %kind, index = index.0, error = %source, "Export failed");
                ChatError::Export { kind, source }
            })?;

        let file_name = kind.file_name(index);
        let path = self.sink.save(&file_name, &payload.bytes)?;
        tracing::info!(path = %path.display(), size = payload.bytes.len(), "Export saved");

        Ok(SavedExport {
            kind,
            index,
            file_name,
            path,
            size: payload.bytes.len(),
        })
    }
}
