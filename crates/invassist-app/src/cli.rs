//! CLI argument definitions for the invoice assistant.
//!
//! Uses `clap` with derive macros.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use chrono::NaiveDate;
use invassist_core::config::AssistConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "INVASSIST_CONFIG";

/// Invoice and inventory assistant for the terminal.
#[derive(Parser, Debug)]
#[command(name = "invassist", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:8000.
    #[arg(short = 'u', long = "base-url")]
    pub base_url: Option<String>,

    /// Tenant identifier sent with every request.
    #[arg(short = 't', long = "tenant")]
    pub tenant: Option<String>,

    /// Directory exported files are saved into.
    #[arg(short = 'd', long = "download-dir")]
    pub download_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive chat with the assistant (default).
    Chat,
    /// List invoices between two dates.
    Invoices {
        /// First day, YYYY-MM-DD.
        #[arg(long = "from", value_parser = parse_date)]
        from: NaiveDate,
        /// Last day, YYYY-MM-DD.
        #[arg(long = "to", value_parser = parse_date)]
        to: NaiveDate,
    },
    /// Generate a comparison report for one account's invoice.
    Compare {
        /// Account number.
        #[arg(long = "account")]
        account: String,
        /// Invoice date, YYYY-MM-DD.
        #[arg(long = "date", value_parser = parse_date)]
        date: NaiveDate,
        /// Download the generated report into the download directory.
        #[arg(long = "download")]
        download: bool,
    },
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {}", e))
}

impl CliArgs {
    /// The subcommand to run, `chat` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > INVASSIST_CONFIG env var > ~/.invassist/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            if !p.trim().is_empty() {
                return PathBuf::from(p);
            }
        }
        default_config_path()
    }

    /// Load the config file and layer env and CLI overrides on top.
    pub fn load_config(&self) -> AssistConfig {
        let mut config = AssistConfig::load_or_default(&self.resolve_config_path());
        config.apply_env_overrides();
        self.apply_overrides(&mut config);
        config
    }

    /// Apply flags that were given on the command line.
    pub fn apply_overrides(&self, config: &mut AssistConfig) {
        if let Some(ref url) = self.base_url {
            config.backend.base_url = invassist_core::config::normalize_base_url(url);
        }
        if let Some(ref tenant) = self.tenant {
            config.backend.tenant_id = tenant.clone();
        }
        if let Some(ref dir) = self.download_dir {
            config.export.download_dir = dir.to_string_lossy().to_string();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".invassist").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".invassist").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_chat() {
        let args = CliArgs::parse_from(["invassist"]);
        assert_eq!(args.command(), Command::Chat);
    }

    #[test]
    fn test_explicit_config_path_wins() {
        let args = CliArgs::parse_from(["invassist", "--config", "/tmp/assist.toml"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/assist.toml"));
    }

    #[test]
    fn test_invoices_dates_are_parsed() {
        let args = CliArgs::parse_from([
            "invassist",
            "invoices",
            "--from",
            "2024-10-01",
            "--to",
            "2024-10-31",
        ]);
        let Command::Invoices { from, to } = args.command() else {
            panic!("expected invoices");
        };
        assert_eq!(from.to_string(), "2024-10-01");
        assert_eq!(to.to_string(), "2024-10-31");
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let result = CliArgs::try_parse_from([
            "invassist",
            "compare",
            "--account",
            "123",
            "--date",
            "10/03/2024",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = CliArgs::parse_from([
            "invassist",
            "--base-url",
            "http://assist.local:9000/",
            "--tenant",
            "tenant-x",
            "--download-dir",
            "/tmp/exports",
            "--log-level",
            "debug",
        ]);
        let mut config = AssistConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.backend.base_url, "http://assist.local:9000");
        assert_eq!(config.backend.tenant_id, "tenant-x");
        assert_eq!(config.export.download_dir, "/tmp/exports");
        assert_eq!(config.general.log_level, "debug");
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let args = CliArgs::parse_from(["invassist"]);
        let mut config = AssistConfig::default();
        let before = config.backend.tenant_id.clone();
        args.apply_overrides(&mut config);
        assert_eq!(config.backend.tenant_id, before);
        assert_eq!(config.general.log_level, "info");
    }
}
