use sqlx::{Executor, Sqlite};
use tracing::{debug, warn};
use vocab_core::model::{ItemId, ReviewItem};

use super::SqliteRepository;
use super::mapping::{REVIEW_ITEM_COLUMNS, conn, map_review_item_row};
use crate::repository::{ReviewItemRepository, StorageError};

async fn write_item<'e, E>(executor: E, item: &ReviewItem) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r"
        INSERT INTO review_items (
            id, term, definition, ease_factor, interval_days,
            repetitions, lapses, created_at, last_reviewed
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            term = excluded.term,
            definition = excluded.definition,
            ease_factor = excluded.ease_factor,
            interval_days = excluded.interval_days,
            repetitions = excluded.repetitions,
            lapses = excluded.lapses,
            created_at = excluded.created_at,
            last_reviewed = excluded.last_reviewed
        ",
    )
    .bind(item.id().as_str().to_owned())
    .bind(item.term().to_owned())
    .bind(item.definition().to_owned())
    .bind(item.ease_factor())
    .bind(i64::from(item.interval_days()))
    .bind(i64::from(item.repetitions()))
    .bind(i64::from(item.lapses()))
    .bind(item.created_at())
    .bind(item.last_reviewed())
    .execute(executor)
    .await
    .map_err(conn)?;
    Ok(())
}

#[async_trait::async_trait]
impl ReviewItemRepository for SqliteRepository {
    async fn load_review_items(&self) -> Result<Vec<ReviewItem>, StorageError> {
        let sql = format!(
            "SELECT {REVIEW_ITEM_COLUMNS} FROM review_items ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            match map_review_item_row(row).into_item() {
                Ok(item) => items.push(item),
                Err(err) => warn!(error = %err, "skipping unreadable review item row"),
            }
        }
        debug!(count = items.len(), "loaded review items");
        Ok(items)
    }

    async fn save_review_items(&self, items: &[ReviewItem]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        sqlx::query("DELETE FROM review_items")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        for item in items {
            write_item(&mut *tx, item).await?;
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<ReviewItem>, StorageError> {
        let sql = format!("SELECT {REVIEW_ITEM_COLUMNS} FROM review_items WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.as_str().to_owned())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.map(|row| map_review_item_row(&row).into_item())
            .transpose()
    }

    async fn upsert_item(&self, item: &ReviewItem) -> Result<(), StorageError> {
        write_item(&self.pool, item).await
    }

    async fn delete_item(&self, id: &ItemId) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM review_items WHERE id = ?1")
            .bind(id.as_str().to_owned())
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }
}
