//! Client configuration.
//!
//! Settings are layered, lowest precedence first:
//! 1. Built-in defaults (a backend on `localhost:8000`)
//! 2. `.diybot/settings.toml` in the working directory
//! 3. `DIYBOT_API_URL`, `DIYBOT_WS_URL`, `DIYBOT_TIMEOUT_SECS`
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Default HTTP base address of the backend.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Default WebSocket endpoint of the backend.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the HTTP base address.
pub const ENV_API_URL: &str = "DIYBOT_API_URL";
/// Environment variable overriding the WebSocket endpoint.
pub const ENV_WS_URL: &str = "DIYBOT_WS_URL";
/// Environment variable overriding the request timeout.
pub const ENV_TIMEOUT_SECS: &str = "DIYBOT_TIMEOUT_SECS";

/// Where the backend lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base address for `/api/...` requests, without trailing slash
    pub api_base_url: String,
    /// Address of the realtime chat endpoint
    pub ws_url: String,
    /// Per-request timeout in seconds (0 = no timeout)
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = normalize_base(url.into());
        self
    }

    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Request timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Path of the settings file under a working directory.
    pub fn settings_path(root: &Path) -> PathBuf {
        root.join(".diybot").join("settings.toml")
    }

    /// Load defaults, then the settings file under `root` if one exists.
    pub fn from_settings(root: &Path) -> ApiResult<Self> {
        let path = Self::settings_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| ApiError::Config(format!("{}: {}", path.display(), e)))?;
        config.api_base_url = normalize_base(config.api_base_url);
        debug!("Loaded client settings from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// clobber a configured address.
    pub fn apply_env_with<F>(mut self, lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_API_URL) {
            self.api_base_url = normalize_base(url);
        }
        if let Some(url) = non_empty(ENV_WS_URL) {
            self.ws_url = url;
        }
        if let Some(secs) = non_empty(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = secs.trim().parse().map_err(|_| {
                ApiError::Config(format!("{} must be a number of seconds, got {:?}", ENV_TIMEOUT_SECS, secs))
            })?;
        }
        Ok(self)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> ApiResult<Self> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Settings file followed by environment overrides.
    pub fn load(root: &Path) -> ApiResult<Self> {
        Self::from_settings(root)?.apply_env()
    }
}

fn normalize_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_point_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert_eq!(config.ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_builder_strips_trailing_slash() {
        let config = ClientConfig::new().api_base_url("http://example.test:9000/");
        assert_eq!(config.api_base_url, "http://example.test:9000");
    }

    #[test]
    fn test_zero_timeout_disables_timeout() {
        let config = ClientConfig::new().request_timeout_secs(0);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_missing_settings_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let config = ClientConfig::from_settings(temp.path()).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_settings_file_overrides_defaults() {
        let temp = tempdir().unwrap();
        let path = ClientConfig::settings_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            "api_base_url = \"http://diy.local:8080/\"\nrequest_timeout_secs = 5\n",
        )
        .unwrap();

        let config = ClientConfig::from_settings(temp.path()).unwrap();
        assert_eq!(config.api_base_url, "http://diy.local:8080");
        assert_eq!(config.ws_url, DEFAULT_WS_URL);
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_malformed_settings_file_is_config_error() {
        let temp = tempdir().unwrap();
        let path = ClientConfig::settings_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "api_base_url = [").unwrap();

        let err = ClientConfig::from_settings(temp.path()).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn test_env_overrides_win_over_settings() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "http://override:1234/"),
            (ENV_WS_URL, "ws://override:1234/ws"),
            (ENV_TIMEOUT_SECS, "12"),
        ]);

        let config = ClientConfig::default()
            .apply_env_with(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_base_url, "http://override:1234");
        assert_eq!(config.ws_url, "ws://override:1234/ws");
        assert_eq!(config.request_timeout_secs, 12);
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let config = ClientConfig::default()
            .apply_env_with(|_| Some("  ".to_string()))
            .unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_non_numeric_timeout_is_rejected() {
        let err = ClientConfig::default()
            .apply_env_with(|k| (k == ENV_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
