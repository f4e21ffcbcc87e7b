use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::io::{DirectoryStorage, JsonFileBackend};
use crate::io::backend::BackendError;
use crate::state::debounce::DEFAULT_EDIT_DEBOUNCE;

pub const ENV_EDIT_DEBOUNCE_MS: &str = "PORTAL_EDIT_DEBOUNCE_MS";
pub const ENV_DATA_PATH: &str = "PORTAL_DATA_PATH";
pub const ENV_STORAGE_DIR: &str = "PORTAL_STORAGE_DIR";
pub const ENV_STORAGE_BASE_URL: &str = "PORTAL_STORAGE_BASE_URL";
pub const ENV_LOG: &str = "PORTAL_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a whole number of milliseconds, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
}

/// Portal settings
#[derive(Debug, Clone, PartialEq)]
pub struct PortalConfig {
    /// Quiet period before a cell edit is committed
    pub edit_debounce: Duration,
    /// JSON snapshot file of the local backend
    pub data_path: PathBuf,
    /// Directory for uploaded files
    pub storage_dir: PathBuf,
    /// URL prefix returned for uploaded files
    pub storage_base_url: String,
    /// Log filter passed to `telemetry::init_tracing`
    pub log_level: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            edit_debounce: DEFAULT_EDIT_DEBOUNCE,
            data_path: PathBuf::from("./data/portal.json"),
            storage_dir: PathBuf::from("./data/uploads"),
            storage_base_url: "file://./data/uploads".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl PortalConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any name-to-value lookup. Unset names keep
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_EDIT_DEBOUNCE_MS) {
            let millis = value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: ENV_EDIT_DEBOUNCE_MS,
                    value: value.clone(),
                })?;
            config.edit_debounce = Duration::from_millis(millis);
        }
        if let Some(value) = lookup(ENV_DATA_PATH) {
            config.data_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_STORAGE_DIR) {
            config.storage_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_STORAGE_BASE_URL) {
            config.storage_base_url = value;
        }
        if let Some(value) = lookup(ENV_LOG) {
            config.log_level = value;
        }

        Ok(config)
    }

    pub fn open_backend(&self) -> Result<JsonFileBackend, BackendError> {
        JsonFileBackend::open(&self.data_path)
    }

    pub fn object_storage(&self) -> DirectoryStorage {
        DirectoryStorage::new(&self.storage_dir, &self.storage_base_url)
    }
}
