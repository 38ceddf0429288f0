//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use vocab_core::model::{ItemId, ItemIdError, StudySessionError};
use vocab_core::scheduler::SchedulerError;

/// Errors emitted by `ReviewService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewServiceError {
    #[error("review item not found: {0}")]
    NotFound(ItemId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `VocabularyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VocabularyServiceError {
    #[error("review item not found: {0}")]
    NotFound(ItemId),
    #[error("review item already exists: {0}")]
    AlreadyExists(ItemId),
    #[error("term must not be empty")]
    EmptyTerm,
    #[error(transparent)]
    InvalidId(#[from] ItemIdError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by drill sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no items due for review")]
    Empty,
    #[error("session already completed")]
    Completed,
    #[error("session is not complete yet")]
    InProgress,
    #[error(transparent)]
    Log(#[from] StudySessionError),
    #[error(transparent)]
    Review(#[from] ReviewServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StatisticsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatisticsServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
