use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};

use staffbot_core::audit::{ActivityEntry, ActivityLog};
use staffbot_core::domain::UserId;
use staffbot_core::stores::StoreError;

use super::{parse_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlActivityLogRepository {
    pool: DbPool,
}

impl SqlActivityLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Most recent entries first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<ActivityEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT user_id, callback, message, update_query, created_at
             FROM activity_log
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }
}

#[async_trait]
impl ActivityLog for SqlActivityLogRepository {
    async fn append(&self, entry: ActivityEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO activity_log (
                user_id,
                callback,
                message,
                update_query,
                created_at
             ) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id.map(|user_id| user_id.0))
        .bind(&entry.callback)
        .bind(&entry.message)
        .bind(&entry.raw_update)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }
}

fn entry_from_row(row: SqliteRow) -> Result<ActivityEntry, RepositoryError> {
    Ok(ActivityEntry {
        user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId),
        callback: row.try_get("callback")?,
        message: row.try_get("message")?,
        raw_update: row.try_get("update_query")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
