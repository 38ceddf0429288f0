use tracing::warn;
use vocab_core::model::StudySession;

use super::SqliteRepository;
use super::mapping::{conn, map_study_session_row};
use crate::repository::{StorageError, StudyHistoryRepository};

#[async_trait::async_trait]
impl StudyHistoryRepository for SqliteRepository {
    async fn get_study_history(&self) -> Result<Vec<StudySession>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, date, items_studied, correct_answers, average_quality, mode
                FROM study_sessions
                ORDER BY date ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            match map_study_session_row(row).and_then(|record| record.into_session()) {
                Ok(session) => sessions.push(session),
                Err(err) => warn!(error = %err, "skipping unreadable study session row"),
            }
        }
        Ok(sessions)
    }

    async fn add_study_session(&self, session: &StudySession) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO study_sessions (
                    date, items_studied, correct_answers, average_quality, mode
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(session.date())
        .bind(i64::from(session.items_studied()))
        .bind(i64::from(session.correct_answers()))
        .bind(session.average_quality())
        .bind(session.mode().as_str().to_owned())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }
}
