//! Transport configuration.
//!
//! Read from the environment or a TOML file and handed to
//! [`HttpTransport::new`](crate::HttpTransport::new). Nothing here is
//! global; callers decide which source wins.

use std::path::Path;

use serde::{Deserialize, Serialize};

pub const ENV_BASE_URL: &str = "FORMGATE_API_BASE_URL";
pub const ENV_TOKEN: &str = "FORMGATE_API_TOKEN";
pub const ENV_TIMEOUT: &str = "FORMGATE_HTTP_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no API base URL configured (set FORMGATE_API_BASE_URL or base_url)")]
    MissingBaseUrl,

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// API root, e.g. `https://forms.example.com/api`. Endpoint paths are
    /// appended to it.
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        TransportConfig {
            base_url: base_url.into(),
            auth_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Read `FORMGATE_API_BASE_URL` (required), `FORMGATE_API_TOKEN` and
    /// `FORMGATE_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(ENV_BASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?;
        let auth_token = lookup(ENV_TOKEN).filter(|v| !v.is_empty());
        let timeout_secs = match lookup(ENV_TIMEOUT) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TIMEOUT.to_string(),
                value: raw,
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(TransportConfig {
            base_url,
            auth_token,
            timeout_secs,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: TransportConfig = toml::from_str(text)?;
        if config.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
