//! SQLite storage adapter.
//!
//! One [`SqliteStore`] implements every storage port over a shared pool.
//! Timestamps are stored as fixed-width RFC 3339 text so lexical order is
//! chronological order.

mod accounts;
mod catalog;
mod progression;
mod quests;

#[cfg(test)]
mod integration_tests;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

use crate::infrastructure::ports::RepoError;

/// Table definitions, applied idempotently on every start.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS catalog_meta (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        version INTEGER NOT NULL,
        checksum TEXT NOT NULL,
        loaded_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog_islands (
        id TEXT PRIMARY KEY,
        position INTEGER NOT NULL,
        data_json TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog_crew (
        id TEXT PRIMARY KEY,
        position INTEGER NOT NULL,
        data_json TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS catalog_quests (
        id TEXT PRIMARY KEY,
        island_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        data_json TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        user_id TEXT PRIMARY KEY,
        active INTEGER NOT NULL DEFAULT 1,
        registered_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS island_unlocks (
        user_id TEXT NOT NULL,
        island_id TEXT NOT NULL,
        unlocked_at TEXT NOT NULL,
        PRIMARY KEY (user_id, island_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS crew_unlocks (
        user_id TEXT NOT NULL,
        crew_id TEXT NOT NULL,
        unlocked_at TEXT NOT NULL,
        PRIMARY KEY (user_id, crew_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS island_clearances (
        user_id TEXT NOT NULL,
        island_id TEXT NOT NULL,
        cleared_at TEXT NOT NULL,
        PRIMARY KEY (user_id, island_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS balances (
        user_id TEXT PRIMARY KEY,
        amount INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quest_instances (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        template_id TEXT NOT NULL,
        crew_json TEXT NOT NULL,
        started_at TEXT NOT NULL,
        UNIQUE (user_id, template_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quest_instance_crew (
        user_id TEXT NOT NULL,
        crew_id TEXT NOT NULL,
        instance_id TEXT NOT NULL,
        PRIMARY KEY (user_id, crew_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS quest_history (
        instance_id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        template_id TEXT NOT NULL,
        crew_json TEXT NOT NULL,
        started_at TEXT NOT NULL,
        completed_at TEXT NOT NULL,
        collected_at TEXT NOT NULL,
        reward INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_quest_history_user_template
    ON quest_history(user_id, template_id)
    "#,
];

/// SQLite implementation of the catalog, account, progression and quest ports.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and ensure the schema.
    pub async fn new(db_path: &str) -> Result<Self, RepoError> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .map_err(|e| RepoError::database("connect", e))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| RepoError::database("ensure_schema", e))?;
        }

        tracing::info!(path = %db_path, "SQLite store ready");
        Ok(Self { pool })
    }
}

pub(crate) fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_time(raw: &str) -> Result<DateTime<Utc>, RepoError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepoError::serialization(format!("invalid timestamp {raw:?}: {e}")))
}

/// Parse a stored key column back into its typed identifier.
pub(crate) fn parse_key<K>(raw: String) -> Result<K, RepoError>
where
    K: TryFrom<String>,
    K::Error: std::fmt::Display,
{
    K::try_from(raw).map_err(RepoError::serialization)
}

/// SQLite stores integers as i64; balances and rewards never exceed the cap.
pub(crate) fn to_sql_amount(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

pub(crate) fn from_sql_amount(amount: i64) -> u64 {
    u64::try_from(amount).unwrap_or(0)
}

/// Whether a write failed on a primary key or UNIQUE constraint.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
