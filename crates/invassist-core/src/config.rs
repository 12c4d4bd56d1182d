use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AssistError, Result};

/// Tenant the widget is embedded for when no other tenant is configured.
pub const DEFAULT_TENANT_ID: &str = "a5fbcb69-eda8-20bd-4c29-3a1a8969d9e4";

/// Environment variable overriding `backend.base_url`.
pub const BASE_URL_ENV: &str = "INVASSIST_API_BASE_URL";

/// Top-level configuration for the assistant.
///
/// Loaded from `~/.invassist/config.toml` by default. Every section is
/// optional in the file and falls back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl AssistConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AssistConfig = toml::from_str(&content)?;
        config.backend.base_url = normalize_base_url(&config.backend.base_url);
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AssistError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Apply the `INVASSIST_API_BASE_URL` override, if set and non-empty.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.backend.base_url = normalize_base_url(&url);
            }
        }
    }
}

/// Strip surrounding whitespace and any trailing slashes from a base URL.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the search/AI service, without trailing slash.
    pub base_url: String,
    /// Tenant identifier sent on every request.
    pub tenant_id: String,
    /// Timeout for session start/end calls.
    pub session_timeout_secs: u64,
    /// Timeout for search calls. Long, to tolerate AI generation latency.
    pub search_timeout_secs: u64,
    /// Timeout for export calls.
    pub export_timeout_secs: u64,
    /// Timeout for invoice listing calls.
    pub invoice_timeout_secs: u64,
    /// Timeout for invoice comparison calls.
    pub comparison_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            session_timeout_secs: 10,
            search_timeout_secs: 300,
            export_timeout_secs: 30,
            invoice_timeout_secs: 30,
            comparison_timeout_secs: 60,
        }
    }
}

impl BackendConfig {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.export_timeout_secs)
    }

    pub fn invoice_timeout(&self) -> Duration {
        Duration::from_secs(self.invoice_timeout_secs)
    }

    pub fn comparison_timeout(&self) -> Duration {
        Duration::from_secs(self.comparison_timeout_secs)
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum number of table rows rendered per entry.
    pub display_row_limit: usize,
    /// Maximum query length in characters.
    pub max_query_length: usize,
    /// Cell text longer than this is truncated with an ellipsis.
    pub cell_max_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            display_row_limit: 5,
            max_query_length: 2000,
            cell_max_chars: 120,
        }
    }
}

/// Export settings. Optional fields are omitted from export requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory exported files are written into.
    pub download_dir: String,
    pub pdf_title: Option<String>,
    pub word_title: Option<String>,
    pub sheet_name: Option<String>,
    pub png_width: Option<u32>,
    pub png_height: Option<u32>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            download_dir: "~/Downloads".to_string(),
            pdf_title: None,
            word_title: None,
            sheet_name: None,
            png_width: None,
            png_height: None,
        }
    }
}
