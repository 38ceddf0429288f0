//! Layered configuration: built-in defaults, then a TOML file, then the
//! environment, then command-line flags.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use services::{ServiceSettings, SessionConfig};
use thiserror::Error;
use vocab_core::scheduler::SchedulerConfig;
use vocab_core::stats::StatisticsConfig;

pub const DEFAULT_CONFIG_FILE: &str = "vocab.toml";
pub const DEFAULT_STORAGE_URL: &str = "sqlite://vocab.sqlite3";
pub const CONFIG_ENV: &str = "VOCAB_CONFIG";
pub const DB_URL_ENV: &str = "VOCAB_DB_URL";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// `sqlite://<path>`, `json://<path>` or `memory`.
    pub url: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_STORAGE_URL.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageSection,
    pub scheduler: SchedulerConfig,
    pub statistics: StatisticsConfig,
    pub session: SessionConfig,
}

impl AppConfig {
    #[must_use]
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            scheduler: self.scheduler.clone(),
            statistics: self.statistics.clone(),
            session: self.session.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the text is not a valid config document.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read a config file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) {
        if let Some(url) = env(DB_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.storage.url = url;
        }
    }
}

/// Which config file applies: the explicit path, else `$VOCAB_CONFIG`, else
/// `./vocab.toml` when it exists.
fn config_path(explicit: Option<&Path>, env: &impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env(CONFIG_ENV).filter(|v| !v.trim().is_empty()) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.exists().then_some(local)
}

/// Resolve the effective configuration.
///
/// An explicitly named file (flag or environment) must exist; the implicit
/// `./vocab.toml` is optional.
///
/// # Errors
///
/// Returns `ConfigError` if a named file cannot be read or any file fails to parse.
pub fn load(
    explicit: Option<&Path>,
    db_override: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<AppConfig, ConfigError> {
    let mut config = match config_path(explicit, &env) {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::default(),
    };
    config.apply_env(&env);
    if let Some(url) = db_override {
        config.storage.url = url.to_owned();
    }
    Ok(config)
}
