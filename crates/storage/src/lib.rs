//! Persistence port for review items and the study log, plus its adapters.

pub mod json_file;
pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, ReviewItemRecord, ReviewItemRepository, Storage, StorageError,
    StudyHistoryRepository, StudySessionRecord,
};
