//! Runtime configuration for hosts embedding the pet store.
//!
//! # Responsibility
//! - Load `PetsConfig` from a JSON file, falling back to defaults.
//! - Turn the configured database location into a ready storage engine.
//!
//! # Invariants
//! - A missing config file is not an error; defaults apply.
//! - Fields absent from the file keep their default values.
//! - A loaded config always carries a non-empty authority without `/`.

use crate::logging::default_log_level;
use crate::model::pet::CONTENT_AUTHORITY;
use crate::repo::storage::{SqliteStorage, StorageResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

/// Where pet rows live.
///
/// JSON forms: `"memory"` or `{ "file": "/path/to/pets.db" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl Default for DatabaseLocation {
    fn default() -> Self {
        Self::File(PathBuf::from("pets.db"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetsConfig {
    pub authority: String,
    pub database: DatabaseLocation,
    pub log_level: String,
    /// Rolling log directory; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for PetsConfig {
    fn default() -> Self {
        Self {
            authority: CONTENT_AUTHORITY.to_string(),
            database: DatabaseLocation::default(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl PetsConfig {
    /// Reads `path` as JSON. A missing file yields `PetsConfig::default()`.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "event=config_load module=config status=default reason=missing_file path={}",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = Self::from_json(&raw).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        info!(
            "event=config_load module=config status=ok path={}",
            path.display()
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        let authority = self.authority.trim();
        if authority.is_empty() {
            return Err(ConfigError::Invalid("authority cannot be empty".to_string()));
        }
        if authority.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "authority `{authority}` must not contain `/`"
            )));
        }
        if let DatabaseLocation::File(path) = &self.database {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "database file path cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Opens the configured database with migrations applied.
    pub fn open_storage(&self) -> StorageResult<SqliteStorage> {
        match &self.database {
            DatabaseLocation::Memory => SqliteStorage::open_in_memory(),
            DatabaseLocation::File(path) => SqliteStorage::open(path),
        }
    }
}
