//! Application configuration management.
//!
//! Configuration is stored at `~/.config/fintrack/config.json`. A missing file
//! means defaults. `FINTRACK_API_URL` and `FINTRACK_AUTH_SCHEME` override the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::{AuthScheme, CredentialBackend};

/// Application name used for config/data directory paths
const APP_NAME: &str = "fintrack";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Backend paths, relative to `api_url`. `{username}` is substituted in `basic_login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub register: String,
    pub login: String,
    pub basic_login: String,
    pub current_user: String,
    pub profile: String,
    pub password: String,
    pub transactions: String,
    pub budgets: String,
    pub dashboard: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            register: "/auth/register".to_string(),
            login: "/auth/login".to_string(),
            basic_login: "/users/username/{username}".to_string(),
            current_user: "/auth/me".to_string(),
            profile: "/auth/profile".to_string(),
            password: "/auth/password".to_string(),
            transactions: "/transactions".to_string(),
            budgets: "/budgets".to_string(),
            dashboard: "/dashboard".to_string(),
        }
    }
}

impl Endpoints {
    /// Path of the Basic-scheme profile lookup for `username`.
    pub fn basic_login_path(&self, username: &str) -> String {
        self.basic_login
            .replace("{username}", &urlencoding::encode(username))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub auth_scheme: AuthScheme,
    pub endpoints: Endpoints,
    pub request_timeout_secs: u64,
    pub credential_backend: CredentialBackend,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            auth_scheme: AuthScheme::default(),
            endpoints: Endpoints::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            credential_backend: CredentialBackend::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Config pointing at `api_url` with everything else defaulted.
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
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

    /// Apply `FINTRACK_API_URL` and `FINTRACK_AUTH_SCHEME` overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("FINTRACK_API_URL").ok(),
            std::env::var("FINTRACK_AUTH_SCHEME").ok(),
        );
    }

    fn apply_overrides(&mut self, api_url: Option<String>, scheme: Option<String>) {
        if let Some(url) = api_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            self.api_url = url.to_string();
        }
        if let Some(scheme) = scheme {
            match scheme.parse() {
                Ok(scheme) => self.auth_scheme = scheme,
                Err(e) => warn!(error = %e, "Ignoring FINTRACK_AUTH_SCHEME"),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the file credential store.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
