use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use staffbot_core::domain::{Identity, UserId};
use staffbot_core::stores::{IdentityStore, StoreError};

use super::{parse_optional_timestamp, RepositoryError};
use crate::DbPool;

pub struct SqlIdentityRepository {
    pool: DbPool,
}

impl SqlIdentityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM users").fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>("count")?)
    }

    async fn find_one(
        &self,
        clause: &str,
        binds: &[&str],
    ) -> Result<Option<Identity>, RepositoryError> {
        let sql = format!(
            "SELECT user_id, phone_number, first_name, last_name, authorized_at
             FROM users
             WHERE {clause}
             ORDER BY user_id ASC
             LIMIT 1"
        );
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(*value);
        }

        let row = query.fetch_optional(&self.pool).await?;
        row.map(identity_from_row).transpose()
    }
}

#[async_trait]
impl IdentityStore for SqlIdentityRepository {
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, phone_number, first_name, last_name, authorized_at
             FROM users
             WHERE user_id = ?",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(identity_from_row).transpose()?)
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Identity>, StoreError> {
        Ok(self.find_one("phone_number = ?", &[phone_number]).await?)
    }

    async fn find_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Identity>, StoreError> {
        Ok(self.find_one("first_name = ? AND last_name = ?", &[first_name, last_name]).await?)
    }

    async fn upsert_authorization(&self, identity: Identity) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO users (
                user_id,
                phone_number,
                first_name,
                last_name,
                authorized_at,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                phone_number = excluded.phone_number,
                authorized_at = excluded.authorized_at",
        )
        .bind(identity.user_id.0)
        .bind(&identity.phone_number)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(identity.authorized_at.map(|value| value.to_rfc3339()))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(())
    }
}

fn identity_from_row(row: SqliteRow) -> Result<Identity, RepositoryError> {
    Ok(Identity {
        user_id: UserId(row.try_get("user_id")?),
        phone_number: row.try_get("phone_number")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        authorized_at: parse_optional_timestamp("authorized_at", row.try_get("authorized_at")?)?,
    })
}
