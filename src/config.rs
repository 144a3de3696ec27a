use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::theme::Theme;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            token: None,
            timeout_secs: default_timeout_secs(),
            list_limit: default_list_limit(),
            endpoints: EndpointsConfig::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:1865".to_string()
}
fn default_api_prefix() -> String {
    "/custom/documents/api".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_list_limit() -> u32 {
    1000
}

/// Endpoint path segments below `api_prefix`.
///
/// Deployments disagree on singular vs plural route names, so every path is
/// overridable.
#[derive(Debug, Deserialize, Clone)]
pub struct EndpointsConfig {
    #[serde(default = "default_documents_path")]
    pub documents: String,
    #[serde(default = "default_remove_path")]
    pub remove: String,
    #[serde(default = "default_clear_path")]
    pub clear: String,
    #[serde(default = "default_stats_path")]
    pub stats: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            documents: default_documents_path(),
            remove: default_remove_path(),
            clear: default_clear_path(),
            stats: default_stats_path(),
        }
    }
}

fn default_documents_path() -> String {
    "documents".to_string()
}
fn default_remove_path() -> String {
    "remove".to_string()
}
fn default_clear_path() -> String {
    "clear".to_string()
}
fn default_stats_path() -> String {
    "stats".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_notification_ttl_secs")]
    pub notification_ttl_secs: u64,
    #[serde(default = "default_panel_preview_limit")]
    pub panel_preview_limit: usize,
    #[serde(default)]
    pub theme: Option<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            notification_ttl_secs: default_notification_ttl_secs(),
            panel_preview_limit: default_panel_preview_limit(),
            theme: None,
        }
    }
}

fn default_debounce_ms() -> u64 {
    300
}
fn default_notification_ttl_secs() -> u64 {
    5
}
fn default_panel_preview_limit() -> usize {
    5
}

impl UiConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_ttl_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Absolute path on the base URL (the ingestion boundary lives outside
    /// `api_prefix`).
    #[serde(default = "default_upload_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
    #[serde(default = "default_refetch_delay_ms")]
    pub refetch_delay_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: default_upload_endpoint(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            refetch_delay_ms: default_refetch_delay_ms(),
        }
    }
}

fn default_upload_endpoint() -> String {
    "/rabbithole/batch".to_string()
}
fn default_chunk_size() -> u32 {
    512
}
fn default_chunk_overlap() -> u32 {
    128
}
fn default_refetch_delay_ms() -> u64 {
    1500
}

impl UploadConfig {
    pub fn refetch_delay(&self) -> Duration {
        Duration::from_millis(self.refetch_delay_ms)
    }
}

impl Config {
    /// Defaults for every section; used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            server: ServerConfig::default(),
            ui: UiConfig::default(),
            upload: UploadConfig::default(),
        }
    }

    /// Bearer token: `RDOCS_TOKEN` wins over the config value.
    pub fn token(&self) -> Option<String> {
        std::env::var("RDOCS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.server.token.clone())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate server
    let base = url::Url::parse(&config.server.base_url).with_context(|| {
        format!(
            "server.base_url is not a valid URL: {}",
            config.server.base_url
        )
    })?;
    match base.scheme() {
        "http" | "https" => {}
        other => anyhow::bail!("server.base_url must use http or https, got '{}'", other),
    }
    if config.server.timeout_secs == 0 {
        anyhow::bail!("server.timeout_secs must be > 0");
    }
    if !(1..=1000).contains(&config.server.list_limit) {
        anyhow::bail!("server.list_limit must be in [1, 1000]");
    }

    // Validate ui
    if config.ui.panel_preview_limit == 0 {
        anyhow::bail!("ui.panel_preview_limit must be > 0");
    }
    if let Some(theme) = &config.ui.theme {
        if theme.parse::<Theme>().is_err() {
            anyhow::bail!("ui.theme must be 'light' or 'dark', got '{}'", theme);
        }
    }

    // Validate upload
    if config.upload.chunk_size == 0 {
        anyhow::bail!("upload.chunk_size must be > 0");
    }
    if config.upload.chunk_overlap >= config.upload.chunk_size {
        anyhow::bail!("upload.chunk_overlap must be smaller than upload.chunk_size");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.server.base_url, "http://localhost:1865");
        assert_eq!(config.server.api_prefix, "/custom/documents/api");
        assert_eq!(config.server.endpoints.documents, "documents");
        assert_eq!(config.ui.debounce(), Duration::from_millis(300));
        assert_eq!(config.ui.notification_ttl(), Duration::from_secs(5));
        assert_eq!(config.upload.endpoint, "/rabbithole/batch");
    }

    #[test]
    fn endpoint_overrides() {
        let config = parse(
            r#"
[server]
base_url = "https://cat.example.com"

[server.endpoints]
documents = "document"
"#,
        )
        .unwrap();
        assert_eq!(config.server.endpoints.documents, "document");
        assert_eq!(config.server.endpoints.remove, "remove");
    }

    #[test]
    fn rejects_bad_scheme() {
        let err = parse("[server]\nbase_url = \"ftp://x\"\n").unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn rejects_bad_theme() {
        assert!(parse("[ui]\ntheme = \"sepia\"\n").is_err());
        assert!(parse("[ui]\ntheme = \"light\"\n").is_ok());
    }

    #[test]
    fn rejects_overlap_not_below_size() {
        assert!(parse("[upload]\nchunk_size = 100\nchunk_overlap = 100\n").is_err());
    }

    #[test]
    fn rejects_out_of_range_limit() {
        assert!(parse("[server]\nlist_limit = 0\n").is_err());
        assert!(parse("[server]\nlist_limit = 5000\n").is_err());
    }

    #[test]
    fn load_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.timeout_secs, 30);
        assert!(load_config(&dir.path().join("absent.toml")).is_err());
    }
}
