use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use vocab_core::model::StudyMode;

use crate::repository::{ReviewItemRecord, StorageError, StudySessionRecord};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

/// Reads a nullable column, treating values of the wrong type as absent.
fn lenient<'r, T>(row: &'r SqliteRow, column: &str) -> Option<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get::<Option<T>, _>(column).ok().flatten()
}

pub(crate) const REVIEW_ITEM_COLUMNS: &str = "id, term, definition, ease_factor, interval_days, \
     repetitions, lapses, created_at, last_reviewed";

/// Map a `review_items` row into its lenient record; defaults are applied by
/// `ReviewItemRecord::into_item`.
pub(crate) fn map_review_item_row(row: &SqliteRow) -> ReviewItemRecord {
    ReviewItemRecord {
        id: lenient(row, "id"),
        term: lenient(row, "term").unwrap_or_default(),
        definition: lenient(row, "definition").unwrap_or_default(),
        ease_factor: lenient(row, "ease_factor"),
        interval_days: lenient(row, "interval_days"),
        repetitions: lenient(row, "repetitions"),
        lapses: lenient(row, "lapses"),
        created_at: lenient(row, "created_at"),
        last_reviewed: lenient(row, "last_reviewed"),
        next_review: None,
    }
}

pub(crate) fn map_study_session_row(row: &SqliteRow) -> Result<StudySessionRecord, StorageError> {
    Ok(StudySessionRecord {
        date: row.try_get("date").map_err(ser)?,
        items_studied: u32_from_i64(
            "items_studied",
            row.try_get::<i64, _>("items_studied").map_err(ser)?,
        )?,
        correct_answers: u32_from_i64(
            "correct_answers",
            row.try_get::<i64, _>("correct_answers").map_err(ser)?,
        )?,
        average_quality: row.try_get("average_quality").map_err(ser)?,
        mode: StudyMode::from(row.try_get::<String, _>("mode").map_err(ser)?),
    })
}
