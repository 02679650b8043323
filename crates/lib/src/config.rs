//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.unichat/config.json`) and environment.
//! Kept minimal: backend address and chat session override.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Backend service address and timeouts.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Chat defaults (session id override).
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Backend base URL and request timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Base URL of the retrieval/chat service (default "http://127.0.0.1:8000").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (default 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Chat defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Fixed session id. When unset, a fresh `sess-<uuid>` is generated per run.
    pub session_id: Option<String>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Resolve the backend base URL: env UNICHAT_BASE_URL overrides config.
/// A trailing slash is trimmed so paths can be appended with `format!`.
pub fn resolve_base_url(config: &Config) -> String {
    std::env::var("UNICHAT_BASE_URL")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.backend.base_url.trim().to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve the chat session id: config override, otherwise a generated id.
pub fn resolve_session_id(config: &Config) -> String {
    config
        .chat
        .session_id
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("sess-{}", uuid::Uuid::new_v4()))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("UNICHAT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".unichat").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or UNICHAT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Create the config directory and a default `{}` config file if they do not exist.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, b"{}")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backend_url_and_timeout() {
        let b = BackendConfig::default();
        assert_eq!(b.base_url, "http://127.0.0.1:8000");
        assert_eq!(b.request_timeout_secs, 30);
    }

    #[test]
    fn resolve_base_url_trims_trailing_slash() {
        let mut config = Config::default();
        config.backend.base_url = "http://backend:9000/".to_string();
        std::env::remove_var("UNICHAT_BASE_URL");
        assert_eq!(resolve_base_url(&config), "http://backend:9000");
    }

    #[test]
    fn resolve_session_id_uses_config_override() {
        let mut config = Config::default();
        config.chat.session_id = Some("uid".to_string());
        assert_eq!(resolve_session_id(&config), "uid");
    }

    #[test]
    fn resolve_session_id_generates_when_unset() {
        let config = Config::default();
        let id = resolve_session_id(&config);
        assert!(id.starts_with("sess-"));
    }
}
