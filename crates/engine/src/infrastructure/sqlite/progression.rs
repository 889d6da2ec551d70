//! Unlock records, clearances and balances.

use archipelago_domain::{
    CrewMemberId, CrewUnlock, Currency, IslandClearance, IslandId, IslandUnlock, UserId,
    CURRENCY_CAP,
};
use async_trait::async_trait;
use sqlx::{Row, Sqlite};

use super::{format_time, from_sql_amount, parse_key, parse_time, to_sql_amount, SqliteStore};
use crate::infrastructure::ports::{ProgressionRepo, RepoError};

// Shared by the plain port methods and the collection transaction.

pub(super) async fn insert_island_unlock<'e, E>(
    executor: E,
    unlock: &IslandUnlock,
) -> Result<bool, RepoError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO island_unlocks (user_id, island_id, unlocked_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id, island_id) DO NOTHING
        "#,
    )
    .bind(unlock.user_id.as_str())
    .bind(unlock.island_id.as_str())
    .bind(format_time(unlock.unlocked_at))
    .execute(executor)
    .await
    .map_err(|e| RepoError::database("insert_island_unlock", e))?;

    Ok(result.rows_affected() > 0)
}

pub(super) async fn insert_crew_unlock<'e, E>(
    executor: E,
    unlock: &CrewUnlock,
) -> Result<bool, RepoError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO crew_unlocks (user_id, crew_id, unlocked_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id, crew_id) DO NOTHING
        "#,
    )
    .bind(unlock.user_id.as_str())
    .bind(unlock.crew_member_id.as_str())
    .bind(format_time(unlock.unlocked_at))
    .execute(executor)
    .await
    .map_err(|e| RepoError::database("insert_crew_unlock", e))?;

    Ok(result.rows_affected() > 0)
}

pub(super) async fn insert_clearance<'e, E>(
    executor: E,
    clearance: &IslandClearance,
) -> Result<bool, RepoError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO island_clearances (user_id, island_id, cleared_at)
        VALUES (?, ?, ?)
        ON CONFLICT(user_id, island_id) DO NOTHING
        "#,
    )
    .bind(clearance.user_id.as_str())
    .bind(clearance.island_id.as_str())
    .bind(format_time(clearance.cleared_at))
    .execute(executor)
    .await
    .map_err(|e| RepoError::database("insert_clearance", e))?;

    Ok(result.rows_affected() > 0)
}

/// Saturating add in a single statement. Returns the new balance.
pub(super) async fn add_currency<'e, E>(
    executor: E,
    user_id: &UserId,
    amount: Currency,
) -> Result<Currency, RepoError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let cap = to_sql_amount(CURRENCY_CAP);
    let row = sqlx::query(
        r#"
        INSERT INTO balances (user_id, amount)
        VALUES (?, MIN(?, ?))
        ON CONFLICT(user_id) DO UPDATE SET
            amount = MIN(balances.amount + excluded.amount, ?)
        RETURNING amount
        "#,
    )
    .bind(user_id.as_str())
    .bind(to_sql_amount(amount.amount()))
    .bind(cap)
    .bind(cap)
    .fetch_one(executor)
    .await
    .map_err(|e| RepoError::database("add_currency", e))?;

    Ok(Currency::new(from_sql_amount(row.get("amount"))))
}

#[async_trait]
impl ProgressionRepo for SqliteStore {
    async fn insert_island_unlock(&self, unlock: &IslandUnlock) -> Result<bool, RepoError> {
        insert_island_unlock(&self.pool, unlock).await
    }

    async fn insert_crew_unlock(&self, unlock: &CrewUnlock) -> Result<bool, RepoError> {
        insert_crew_unlock(&self.pool, unlock).await
    }

    async fn is_island_unlocked(
        &self,
        user_id: &UserId,
        island_id: &IslandId,
    ) -> Result<bool, RepoError> {
        let row = sqlx::query("SELECT 1 FROM island_unlocks WHERE user_id = ? AND island_id = ?")
            .bind(user_id.as_str())
            .bind(island_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("is_island_unlocked", e))?;
        Ok(row.is_some())
    }

    async fn is_crew_unlocked(
        &self,
        user_id: &UserId,
        crew_member_id: &CrewMemberId,
    ) -> Result<bool, RepoError> {
        let row = sqlx::query("SELECT 1 FROM crew_unlocks WHERE user_id = ? AND crew_id = ?")
            .bind(user_id.as_str())
            .bind(crew_member_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("is_crew_unlocked", e))?;
        Ok(row.is_some())
    }

    async fn island_unlocks(&self, user_id: &UserId) -> Result<Vec<IslandUnlock>, RepoError> {
        let rows = sqlx::query(
            "SELECT island_id, unlocked_at FROM island_unlocks WHERE user_id = ? ORDER BY unlocked_at, rowid",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("island_unlocks", e))?;

        rows.into_iter()
            .map(|row| -> Result<IslandUnlock, RepoError> {
                let unlocked_at: String = row.get("unlocked_at");
                Ok(IslandUnlock {
                    user_id: user_id.clone(),
                    island_id: parse_key(row.get("island_id"))?,
                    unlocked_at: parse_time(&unlocked_at)?,
                })
            })
            .collect()
    }

    async fn crew_unlocks(&self, user_id: &UserId) -> Result<Vec<CrewUnlock>, RepoError> {
        let rows = sqlx::query(
            "SELECT crew_id, unlocked_at FROM crew_unlocks WHERE user_id = ? ORDER BY unlocked_at, rowid",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("crew_unlocks", e))?;

        rows.into_iter()
            .map(|row| -> Result<CrewUnlock, RepoError> {
                let unlocked_at: String = row.get("unlocked_at");
                Ok(CrewUnlock {
                    user_id: user_id.clone(),
                    crew_member_id: parse_key(row.get("crew_id"))?,
                    unlocked_at: parse_time(&unlocked_at)?,
                })
            })
            .collect()
    }

    async fn clearances(&self, user_id: &UserId) -> Result<Vec<IslandClearance>, RepoError> {
        let rows = sqlx::query(
            "SELECT island_id, cleared_at FROM island_clearances WHERE user_id = ? ORDER BY cleared_at, rowid",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("clearances", e))?;

        rows.into_iter()
            .map(|row| -> Result<IslandClearance, RepoError> {
                let cleared_at: String = row.get("cleared_at");
                Ok(IslandClearance {
                    user_id: user_id.clone(),
                    island_id: parse_key(row.get("island_id"))?,
                    cleared_at: parse_time(&cleared_at)?,
                })
            })
            .collect()
    }

    async fn add_currency(
        &self,
        user_id: &UserId,
        amount: Currency,
    ) -> Result<Currency, RepoError> {
        add_currency(&self.pool, user_id, amount).await
    }

    async fn balance(&self, user_id: &UserId) -> Result<Currency, RepoError> {
        let row = sqlx::query("SELECT amount FROM balances WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("balance", e))?;

        Ok(row
            .map(|row| Currency::new(from_sql_amount(row.get("amount"))))
            .unwrap_or_default())
    }
}
