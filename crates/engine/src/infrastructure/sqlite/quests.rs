//! Active quest instances and quest history.

use archipelago_domain::{
    ActiveQuest, CrewMemberId, CrewUnlock, Currency, IslandClearance, IslandUnlock,
    QuestHistoryRecord, QuestInstanceId, QuestTemplateId, Reward, UserId,
};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::progression::{add_currency, insert_clearance, insert_crew_unlock, insert_island_unlock};
use super::{
    format_time, from_sql_amount, is_unique_violation, parse_key, parse_time, to_sql_amount,
    SqliteStore,
};
use crate::infrastructure::ports::{
    CollectionApplied, CollectionCommit, QuestRepo, RepoError,
};

fn parse_instance_id(raw: &str) -> Result<QuestInstanceId, RepoError> {
    Uuid::parse_str(raw)
        .map(QuestInstanceId::from_uuid)
        .map_err(|e| RepoError::serialization(format!("invalid quest instance id {raw:?}: {e}")))
}

fn encode_crew(crew: &[CrewMemberId]) -> Result<String, RepoError> {
    serde_json::to_string(crew).map_err(RepoError::serialization)
}

fn decode_crew(json: &str) -> Result<Vec<CrewMemberId>, RepoError> {
    serde_json::from_str(json).map_err(RepoError::serialization)
}

fn row_to_active(row: &SqliteRow) -> Result<ActiveQuest, RepoError> {
    let id: String = row.get("id");
    let crew_json: String = row.get("crew_json");
    let started_at: String = row.get("started_at");

    Ok(ActiveQuest {
        id: parse_instance_id(&id)?,
        user_id: parse_key(row.get("user_id"))?,
        template_id: parse_key(row.get("template_id"))?,
        crew: decode_crew(&crew_json)?,
        started_at: parse_time(&started_at)?,
    })
}

fn row_to_history(row: &SqliteRow) -> Result<QuestHistoryRecord, RepoError> {
    let instance_id: String = row.get("instance_id");
    let crew_json: String = row.get("crew_json");
    let started_at: String = row.get("started_at");
    let completed_at: String = row.get("completed_at");
    let collected_at: String = row.get("collected_at");

    Ok(QuestHistoryRecord {
        instance_id: parse_instance_id(&instance_id)?,
        user_id: parse_key(row.get("user_id"))?,
        template_id: parse_key(row.get("template_id"))?,
        crew: decode_crew(&crew_json)?,
        started_at: parse_time(&started_at)?,
        completed_at: parse_time(&completed_at)?,
        collected_at: parse_time(&collected_at)?,
        reward: Currency::new(from_sql_amount(row.get("reward"))),
    })
}

#[async_trait]
impl QuestRepo for SqliteStore {
    async fn active_for_user(&self, user_id: &UserId) -> Result<Vec<ActiveQuest>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, template_id, crew_json, started_at
            FROM quest_instances
            WHERE user_id = ?
            ORDER BY started_at, rowid
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("active_quests", e))?;

        rows.iter().map(row_to_active).collect()
    }

    async fn get_active(
        &self,
        user_id: &UserId,
        instance_id: QuestInstanceId,
    ) -> Result<Option<ActiveQuest>, RepoError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, template_id, crew_json, started_at
            FROM quest_instances
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(instance_id.to_string())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("get_active_quest", e))?;

        row.as_ref().map(row_to_active).transpose()
    }

    async fn active_template_ids(&self) -> Result<Vec<QuestTemplateId>, RepoError> {
        let rows = sqlx::query(
            "SELECT DISTINCT template_id FROM quest_instances ORDER BY template_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("active_template_ids", e))?;

        rows.iter().map(|row| parse_key(row.get("template_id"))).collect()
    }

    async fn insert_active(&self, quest: &ActiveQuest) -> Result<(), RepoError> {
        let conflict = |e: sqlx::Error| {
            if is_unique_violation(&e) {
                RepoError::constraint(format!(
                    "Quest {} or one of its crew is already active for user {}",
                    quest.template_id, quest.user_id
                ))
            } else {
                RepoError::database("insert_active_quest", e)
            }
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("insert_active_quest", e))?;

        sqlx::query(
            r#"
            INSERT INTO quest_instances (id, user_id, template_id, crew_json, started_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(quest.id.to_string())
        .bind(quest.user_id.as_str())
        .bind(quest.template_id.as_str())
        .bind(encode_crew(&quest.crew)?)
        .bind(format_time(quest.started_at))
        .execute(&mut *tx)
        .await
        .map_err(conflict)?;

        for crew_member in &quest.crew {
            sqlx::query(
                "INSERT INTO quest_instance_crew (user_id, crew_id, instance_id) VALUES (?, ?, ?)",
            )
            .bind(quest.user_id.as_str())
            .bind(crew_member.as_str())
            .bind(quest.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(conflict)?;
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("insert_active_quest", e))
    }

    async fn has_history(
        &self,
        user_id: &UserId,
        template_id: &QuestTemplateId,
    ) -> Result<bool, RepoError> {
        let row = sqlx::query(
            "SELECT 1 FROM quest_history WHERE user_id = ? AND template_id = ? LIMIT 1",
        )
        .bind(user_id.as_str())
        .bind(template_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::database("has_quest_history", e))?;
        Ok(row.is_some())
    }

    async fn history_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<QuestHistoryRecord>, RepoError> {
        let rows = sqlx::query(
            r#"
            SELECT instance_id, user_id, template_id, crew_json,
                   started_at, completed_at, collected_at, reward
            FROM quest_history
            WHERE user_id = ?
            ORDER BY collected_at DESC, rowid DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::database("quest_history", e))?;

        rows.iter().map(row_to_history).collect()
    }

    async fn commit_collection(
        &self,
        commit: &CollectionCommit,
    ) -> Result<CollectionApplied, RepoError> {
        let history = &commit.history;
        let user_id = &history.user_id;
        let instance_id = history.instance_id.to_string();

        // Dropping `tx` without commit rolls back
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::database("commit_collection", e))?;

        let retired = sqlx::query("DELETE FROM quest_instances WHERE id = ? AND user_id = ?")
            .bind(&instance_id)
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("commit_collection", e))?
            .rows_affected();
        if retired == 0 {
            return Err(RepoError::not_found("QuestInstance", &instance_id));
        }

        sqlx::query("DELETE FROM quest_instance_crew WHERE instance_id = ?")
            .bind(&instance_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::database("commit_collection", e))?;

        sqlx::query(
            r#"
            INSERT INTO quest_history (
                instance_id, user_id, template_id, crew_json,
                started_at, completed_at, collected_at, reward
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&instance_id)
        .bind(user_id.as_str())
        .bind(history.template_id.as_str())
        .bind(encode_crew(&history.crew)?)
        .bind(format_time(history.started_at))
        .bind(format_time(history.completed_at))
        .bind(format_time(history.collected_at))
        .bind(to_sql_amount(history.reward.amount()))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepoError::constraint(format!("History for instance {instance_id} already exists"))
            } else {
                RepoError::database("commit_collection", e)
            }
        })?;

        let mut applied = CollectionApplied {
            balance: add_currency(&mut *tx, user_id, history.reward).await?,
            ..Default::default()
        };

        if let Some(grant) = &commit.clearance {
            let at = history.collected_at;
            let clearance = IslandClearance {
                user_id: user_id.clone(),
                island_id: grant.island_id.clone(),
                cleared_at: at,
            };
            applied.island_cleared = insert_clearance(&mut *tx, &clearance).await?;

            if applied.island_cleared {
                match &grant.reward {
                    Reward::Currency { amount } => {
                        applied.balance = add_currency(&mut *tx, user_id, *amount).await?;
                    }
                    Reward::CrewMember { crew_member_id } => {
                        let unlock = CrewUnlock {
                            user_id: user_id.clone(),
                            crew_member_id: crew_member_id.clone(),
                            unlocked_at: at,
                        };
                        if insert_crew_unlock(&mut *tx, &unlock).await? {
                            applied.unlocked_crew.push(crew_member_id.clone());
                        }
                    }
                }

                if let Some(next) = &grant.next_island {
                    let unlock = IslandUnlock {
                        user_id: user_id.clone(),
                        island_id: next.clone(),
                        unlocked_at: at,
                    };
                    if insert_island_unlock(&mut *tx, &unlock).await? {
                        applied.unlocked_islands.push(next.clone());
                    }
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepoError::database("commit_collection", e))?;

        Ok(applied)
    }
}
