//! # Configuration
//!
//! Settings for the `sanbill` binary.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Command-line flags (`--db`)
//! 2. Environment variables (`SANBILL_DB_PATH`, `SANBILL_CURRENCY`, `SANBILL_LOG`)
//! 3. Config file (`config.toml`, or the file given with `--config`)
//! 4. Defaults (this file)
//!
//! ## Example `config.toml`
//! ```toml
//! database_path = "/srv/sanbill/sanbill.db"
//! currency = "INR"
//! log_filter = "info,sqlx=warn"
//! list_limit = 100
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use sanbill_core::DEFAULT_CURRENCY;

/// Overrides the database file.
pub const ENV_DB_PATH: &str = "SANBILL_DB_PATH";

/// Overrides the currency label printed next to totals.
pub const ENV_CURRENCY: &str = "SANBILL_CURRENCY";

/// Overrides the log filter. `RUST_LOG` still wins over everything.
pub const ENV_LOG: &str = "SANBILL_LOG";

/// Filter used when neither `RUST_LOG` nor any setting names one.
pub const DEFAULT_LOG_FILTER: &str = "info,sanbill=debug,sqlx=warn";

const DEFAULT_LIST_LIMIT: u32 = 50;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite database file.
    pub database_path: PathBuf,

    /// Currency label shown next to document totals.
    pub currency: String,

    /// `tracing` filter directives.
    pub log_filter: String,

    /// Maximum rows printed by `list`.
    pub list_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: default_database_path(),
            currency: DEFAULT_CURRENCY.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "sanbill", "sanbill")
}

/// Platform data directory file, or `./sanbill.db` when there is no home.
///
/// - **Linux**: `~/.local/share/sanbill/sanbill.db`
/// - **macOS**: `~/Library/Application Support/com.sanbill.sanbill/sanbill.db`
/// - **Windows**: `%APPDATA%\sanbill\sanbill\data\sanbill.db`
pub fn default_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("sanbill.db"))
        .unwrap_or_else(|| PathBuf::from("sanbill.db"))
}

/// Platform config file location, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

impl AppConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(path, &text)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_DB_PATH) {
            self.database_path = PathBuf::from(path.trim());
        }
        if let Some(currency) = get(ENV_CURRENCY) {
            self.currency = currency;
        }
        if let Some(filter) = get(ENV_LOG) {
            self.log_filter = filter;
        }
    }

    /// Trims and upper-cases the currency and checks the limits.
    pub fn normalize(mut self) -> Result<Self, ConfigError> {
        self.currency = self.currency.trim().to_uppercase();
        if self.currency.is_empty() {
            self.currency = DEFAULT_CURRENCY.to_string();
        }

        if self.list_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "list_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database_path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(self)
    }

    /// Loads the configuration from every source.
    ///
    /// An explicit `config_path` must exist; the default config file is
    /// optional.
    pub fn load(config_path: Option<&Path>, db_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => AppConfig::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok());

        if let Some(path) = db_override {
            config.database_path = path;
        }

        config.normalize()
    }
}
