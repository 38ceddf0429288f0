//! Storage URL handling for the binary.

use std::path::{Path, PathBuf};

use storage::Storage;
use storage::sqlite::SqliteInitError;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("invalid storage url: {raw}")]
    InvalidUrl { raw: String },
    #[error("failed to prepare {path}: {source}")]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

/// Where items and the study log live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTarget {
    /// Normalized `sqlite://<absolute path>` url.
    Sqlite(String),
    JsonFile(PathBuf),
    Memory,
}

impl StorageTarget {
    /// Accepts `memory`, `sqlite::memory:`, `sqlite:<path>`, `sqlite://<path>`,
    /// `json:<path>`, `json://<path>`, or a bare path. Bare paths ending in
    /// `.json` select the JSON file store, anything else `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` for an empty value or path.
    pub fn parse(raw: &str) -> Result<Self, BackendError> {
        let trimmed = raw.trim();
        let invalid = || BackendError::InvalidUrl {
            raw: raw.to_owned(),
        };
        if trimmed.is_empty() {
            return Err(invalid());
        }
        if trimmed.eq_ignore_ascii_case("memory") || trimmed == "sqlite::memory:" {
            return Ok(Self::Memory);
        }

        if let Some(rest) = trimmed.strip_prefix("json:") {
            let path = rest.strip_prefix("//").unwrap_or(rest);
            if path.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::JsonFile(absolute(Path::new(path))));
        }

        if trimmed.starts_with("sqlite:") {
            let url = normalize_sqlite_url(trimmed);
            if sqlite_path(&url).is_none() {
                return Err(invalid());
            }
            return Ok(Self::Sqlite(url));
        }

        let is_json = Path::new(trimmed)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(Self::JsonFile(absolute(Path::new(trimmed))))
        } else {
            Ok(Self::Sqlite(normalize_sqlite_url(trimmed)))
        }
    }

    /// Open the store, creating the backing file and its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the file cannot be created or `SQLite` fails
    /// to connect or migrate.
    pub async fn open(&self) -> Result<Storage, BackendError> {
        match self {
            StorageTarget::Memory => {
                debug!("using in-memory storage");
                Ok(Storage::in_memory())
            }
            StorageTarget::JsonFile(path) => {
                create_parent(path)?;
                debug!(path = %path.display(), "using json file storage");
                Ok(Storage::json_file(path.clone()))
            }
            StorageTarget::Sqlite(url) => {
                prepare_sqlite_file(url)?;
                Ok(Storage::sqlite(url).await?)
            }
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    }
}

/// Turn `sqlite:<path>` or a bare path into `sqlite://<absolute path>`.
/// Urls already in `sqlite://` form pass through.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }
    let path = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    format!("sqlite://{}", absolute(Path::new(path)).display())
}

fn sqlite_path(db_url: &str) -> Option<&Path> {
    let path = db_url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    (!path.is_empty()).then(|| Path::new(path))
}

fn create_parent(path: &Path) -> Result<(), BackendError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| BackendError::Prepare {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// `SQLite` only opens existing files unless told otherwise; create an empty
/// one so a first run works.
///
/// # Errors
///
/// Returns `BackendError` for a url without a path or when the file cannot
/// be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), BackendError> {
    let path = sqlite_path(db_url).ok_or_else(|| BackendError::InvalidUrl {
        raw: db_url.to_owned(),
    })?;
    create_parent(path)?;
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|source| BackendError::Prepare {
                path: path.to_path_buf(),
                source,
            })?;
    }
    Ok(())
}
