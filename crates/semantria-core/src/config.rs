//! Client configuration management.
//!
//! This module handles loading and saving the client configuration, which
//! holds the auth and API endpoints, the application identity reported to
//! the server, and the TLS trust policy.
//!
//! Configuration is stored at `~/.config/semantria/config.json`. The auth
//! URL, API host, application name and API version can be overridden from
//! the environment (see [`Config::apply_env`]); the remaining fields come
//! from the file only. `SEMANTRIA_SESSION_DIR` is read by the session cache
//! as one of its candidate directories, not as an override of `session_dir`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::TlsPolicy;

/// Application name used for the config directory path
const APP_NAME: &str = "semantria";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default base URL for session endpoints
pub const DEFAULT_AUTH_URL: &str = "https://semantria.com/auth";

/// Default base URL for API endpoints
pub const DEFAULT_API_HOST: &str = "https://api.semantria.com";

pub const ENV_AUTH_URL: &str = "SEMANTRIA_AUTH_URL";
pub const ENV_API_HOST: &str = "SEMANTRIA_API_HOST";
pub const ENV_APP_NAME: &str = "SEMANTRIA_APP_NAME";
pub const ENV_API_VERSION: &str = "SEMANTRIA_API_VERSION";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth_url: String,
    pub api_host: String,
    /// Name of the calling application, prefixed to `x-app-name`
    pub app_name: Option<String>,
    pub api_version: Option<String>,
    pub use_compression: bool,
    /// Explicit directory for the cached session record
    pub session_dir: Option<PathBuf>,
    pub tls: TlsPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            api_host: DEFAULT_API_HOST.to_string(),
            app_name: None,
            api_version: None,
            use_compression: false,
            session_dir: None,
            tls: TlsPolicy::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override `auth_url`, `api_host`, `app_name` and `api_version` from
    /// `SEMANTRIA_*` environment variables. Empty values are ignored.
    pub fn apply_env(mut self) -> Self {
        if let Some(value) = env_value(ENV_AUTH_URL) {
            self.auth_url = value;
        }
        if let Some(value) = env_value(ENV_API_HOST) {
            self.api_host = value;
        }
        if let Some(value) = env_value(ENV_APP_NAME) {
            self.app_name = Some(value);
        }
        if let Some(value) = env_value(ENV_API_VERSION) {
            self.api_version = Some(value);
        }
        self
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_strict() {
        let config = Config::default();
        assert_eq!(config.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.api_host, DEFAULT_API_HOST);
        assert_eq!(config.tls, TlsPolicy::Strict);
        assert!(!config.use_compression);
    }

    #[test]
    fn test_env_overrides_endpoints_only() {
        // No other test calls apply_env, so setting these does not race
        std::env::set_var(ENV_AUTH_URL, "https://auth.test/auth");
        std::env::set_var(ENV_APP_NAME, "demo");
        std::env::set_var(ENV_API_VERSION, " ");

        let file = Config {
            use_compression: true,
            session_dir: Some(PathBuf::from("/sessions")),
            tls: TlsPolicy::AcceptInvalidCerts,
            ..Config::default()
        };
        let config = file.apply_env();

        std::env::remove_var(ENV_AUTH_URL);
        std::env::remove_var(ENV_APP_NAME);
        std::env::remove_var(ENV_API_VERSION);

        assert_eq!(config.auth_url, "https://auth.test/auth");
        assert_eq!(config.app_name.as_deref(), Some("demo"));
        assert_eq!(config.api_host, DEFAULT_API_HOST);
        assert!(config.api_version.is_none());
        assert!(config.use_compression);
        assert_eq!(config.session_dir, Some(PathBuf::from("/sessions")));
        assert_eq!(config.tls, TlsPolicy::AcceptInvalidCerts);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"auth_url": "https://api.test/auth", "tls": "accept_invalid_certs"}"#)
                .unwrap();
        assert_eq!(config.auth_url, "https://api.test/auth");
        assert_eq!(config.api_host, DEFAULT_API_HOST);
        assert_eq!(config.tls, TlsPolicy::AcceptInvalidCerts);
        assert!(config.session_dir.is_none());
    }
}
