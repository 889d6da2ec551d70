//! Catalog tables and the sync marker.

use archipelago_domain::{CatalogDocument, CrewMember, Island, QuestTemplate};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::Row;

use super::{format_time, parse_time, SqliteStore};
use crate::infrastructure::ports::{CatalogMarker, CatalogRepo, RepoError};

fn decode_rows<T: DeserializeOwned>(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<T>, RepoError> {
    rows.iter()
        .map(|row| {
            let json: String = row.get("data_json");
            serde_json::from_str(&json).map_err(RepoError::serialization)
        })
        .collect()
}

#[async_trait]
impl CatalogRepo for SqliteStore {
    async fn marker(&self) -> Result<Option<CatalogMarker>, RepoError> {
        let row = sqlx::query("SELECT version, checksum, loaded_at FROM catalog_meta WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::database("catalog_marker", e))?;

        match row {
            Some(row) => {
                let version: i64 = row.get("version");
                let loaded_at: String = row.get("loaded_at");
                Ok(Some(CatalogMarker {
                    version: u32::try_from(version).map_err(RepoError::serialization)?,
                    checksum: row.get("checksum"),
                    loaded_at: parse_time(&loaded_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn load(&self) -> Result<Option<CatalogDocument>, RepoError> {
        let Some(marker) = self.marker().await? else {
            return Ok(None);
        };

        let islands = sqlx::query("SELECT data_json FROM catalog_islands ORDER BY position")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("catalog_load", e))?;
        let crew = sqlx::query("SELECT data_json FROM catalog_crew ORDER BY position")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("catalog_load", e))?;
        let quests = sqlx::query("SELECT data_json FROM catalog_quests ORDER BY position")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::database("catalog_load", e))?;

        Ok(Some(CatalogDocument {
            version: marker.version,
            islands: decode_rows::<Island>(&islands)?,
            crew_members: decode_rows::<CrewMember>(&crew)?,
            quests: decode_rows::<QuestTemplate>(&quests)?,
        }))
    }

    async fn replace(
        &self,
        document: &CatalogDocument,
        marker: &CatalogMarker,
    ) -> Result<(), RepoError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("catalog_replace", e))?;

        for table in ["catalog_islands", "catalog_crew", "catalog_quests", "catalog_meta"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("catalog_replace", e))?;
        }

        for (position, island) in document.islands.iter().enumerate() {
            let json = serde_json::to_string(island).map_err(RepoError::serialization)?;
            sqlx::query("INSERT INTO catalog_islands (id, position, data_json) VALUES (?, ?, ?)")
                .bind(island.id.as_str())
                .bind(position as i64)
                .bind(json)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("catalog_replace", e))?;
        }

        for (position, member) in document.crew_members.iter().enumerate() {
            let json = serde_json::to_string(member).map_err(RepoError::serialization)?;
            sqlx::query("INSERT INTO catalog_crew (id, position, data_json) VALUES (?, ?, ?)")
                .bind(member.id.as_str())
                .bind(position as i64)
                .bind(json)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepoError::database("catalog_replace", e))?;
        }

        for (position, quest) in document.quests.iter().enumerate() {
            let json = serde_json::to_string(quest).map_err(RepoError::serialization)?;
            sqlx::query(
                "INSERT INTO catalog_quests (id, island_id, position, data_json) VALUES (?, ?, ?, ?)",
            )
            .bind(quest.id.as_str())
            .bind(quest.island_id.as_str())
            .bind(position as i64)
            .bind(json)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("catalog_replace", e))?;
        }

        sqlx::query(
            "INSERT INTO catalog_meta (id, version, checksum, loaded_at) VALUES (1, ?, ?, ?)",
        )
        .bind(i64::from(marker.version))
        .bind(&marker.checksum)
        .bind(format_time(marker.loaded_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepoError::database("catalog_replace", e))?;

        tx.commit()
            .await
            .map_err(|e| RepoError::database("catalog_replace", e))?;

        tracing::info!(
            version = marker.version,
            islands = document.islands.len(),
            crew_members = document.crew_members.len(),
            quests = document.quests.len(),
            "Catalog tables replaced"
        );
        Ok(())
    }
}
