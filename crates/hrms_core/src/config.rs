//! Environment-driven core configuration.
//!
//! # Invariants
//! - Blank variables count as unset.
//! - A configured log directory is absolute.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "HRMS_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "HRMS_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "HRMS_LOG_DIR";

const DEFAULT_DB_PATH: &str = "hrms.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(String),
    RelativeLogDir(PathBuf),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(value) => write!(
                f,
                "{LOG_LEVEL_VAR}=`{value}` is not one of trace|debug|info|warn|error"
            ),
            Self::RelativeLogDir(path) => write!(
                f,
                "{LOG_DIR_VAR} must be an absolute path, got `{}`",
                path.display()
            ),
        }
    }
}

impl Error for ConfigError {}

/// Runtime settings for opening the store and starting logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads `HRMS_DB_PATH`, `HRMS_LOG_LEVEL` and `HRMS_LOG_DIR`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();

        if let Some(path) = read(DB_PATH_VAR) {
            config.db_path = PathBuf::from(path);
        }

        if let Some(level) = read(LOG_LEVEL_VAR) {
            config.log_level =
                normalize_level(&level).map_err(|_| ConfigError::InvalidLogLevel(level))?;
        }

        if let Some(dir) = read(LOG_DIR_VAR) {
            let dir = PathBuf::from(dir);
            if !dir.is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir));
            }
            config.log_dir = Some(dir);
        }

        Ok(config)
    }
}
