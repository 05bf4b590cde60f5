//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api/v1";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const STORAGE_FILE_NAME: &str = "storage.json";
const APP_DIR_NAME: &str = "expense-desk";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("base URL must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Timeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root including the version prefix, without a trailing slash.
    pub base_url: String,
    pub timeouts: Timeouts,
    /// JSON file holding the durable session token.
    pub storage_path: PathBuf,
}

impl ClientConfig {
    /// Build config from explicit values, normalizing the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] for non-HTTP base URLs.
    pub fn new(base_url: &str, timeouts: Timeouts, storage_path: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self { base_url: normalize_base_url(base_url)?, timeouts, storage_path })
    }

    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `EXPENSE_API_BASE_URL`: default `http://127.0.0.1:8000/api/v1`
    /// - `EXPENSE_API_TIMEOUT_SECS`: default 10
    /// - `EXPENSE_API_CONNECT_TIMEOUT_SECS`: default 5
    /// - `EXPENSE_STORAGE_PATH`: default `<data dir>/expense-desk/storage.json`
    ///
    /// # Errors
    ///
    /// Returns an error when a numeric variable does not parse or the base
    /// URL is not HTTP(S).
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("EXPENSE_API_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let timeouts = Timeouts {
            request_secs: env_parse_secs("EXPENSE_API_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: env_parse_secs("EXPENSE_API_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };
        let storage_path = std::env::var_os("EXPENSE_STORAGE_PATH").map_or_else(default_storage_path, PathBuf::from);
        Self::new(&base_url, timeouts, storage_path)
    }
}

/// `<data dir>/expense-desk/storage.json`, falling back to the working
/// directory on platforms without a data dir.
#[must_use]
pub fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join(STORAGE_FILE_NAME)
}

pub(crate) fn parse_secs(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidNumber { var, value: raw.to_owned() }),
    }
}

fn env_parse_secs(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => parse_secs(var, &raw),
        Err(_) => Ok(default),
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}
