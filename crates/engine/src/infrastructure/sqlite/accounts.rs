//! Engine-side account registry.

use archipelago_domain::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::{format_time, parse_key, SqliteStore};
use crate::infrastructure::ports::{AccountRepo, RepoError};

#[async_trait]
impl AccountRepo for SqliteStore {
    async fn register(
        &self,
        user_id: &UserId,
        registered_at: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO accounts (user_id, active, registered_at)
            VALUES (?, 1, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(format_time(registered_at))
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::database("register_account", e))?
        .rows_affected()
            > 0;

        if !inserted {
            // Re-registration reactivates
            sqlx::query("UPDATE accounts SET active = 1 WHERE user_id = ?")
                .bind(user_id.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| RepoError::database("register_account", e))?;
        }

        Ok(inserted)
    }

    async fn deactivate(&self, user_id: &UserId) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE accounts SET active = 0 WHERE user_id = ?")
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::database("deactivate_account", e))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::not_found("Account", user_id));
        }
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<UserId>, RepoError> {
        let rows = sqlx::query(
            "SELECT user_id FROM accounts WHERE active = 1 ORDER BY registered_at, rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("list_active_accounts", e))?;

        rows.into_iter()
            .map(|row| parse_key(row.get("user_id")))
            .collect()
    }
}
