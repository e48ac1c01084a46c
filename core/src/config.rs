//! Client configuration, read once per process.

use std::path::PathBuf;

use thiserror::Error;

use crate::http::CredentialsMode;
use crate::session::{FileStore, MemoryStore, SessionStore};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnvValue { var: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub credentials: CredentialsMode,
    /// Directory for a `FileStore`; `None` keeps the session in memory.
    pub session_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: CredentialsMode::Include,
            session_dir: None,
        }
    }

    pub fn with_credentials(mut self, credentials: CredentialsMode) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.session_dir = Some(dir.into());
        self
    }

    /// A `FileStore` under `session_dir`, or an empty `MemoryStore` when no
    /// directory is configured.
    pub fn session_store(&self) -> Box<dyn SessionStore> {
        match &self.session_dir {
            Some(dir) => Box::new(FileStore::new(dir.clone())),
            None => Box::new(MemoryStore::new()),
        }
    }

    /// Reads `LABADMIN_API_BASE_URL`, `LABADMIN_CREDENTIALS` and
    /// `LABADMIN_SESSION_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("LABADMIN_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url);

        if let Some(raw) = lookup("LABADMIN_CREDENTIALS") {
            config.credentials = match raw.trim().to_ascii_lowercase().as_str() {
                "include" => CredentialsMode::Include,
                "omit" => CredentialsMode::Omit,
                other => {
                    return Err(ConfigError::InvalidEnvValue {
                        var: "LABADMIN_CREDENTIALS".to_string(),
                        reason: format!("expected `include` or `omit`, got `{other}`"),
                    })
                }
            };
        }

        config.session_dir = lookup("LABADMIN_SESSION_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        Ok(config)
    }
}
