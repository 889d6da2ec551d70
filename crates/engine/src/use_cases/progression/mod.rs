//! Read models for the presentation layer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use archipelago_domain::{
    Catalog, CrewMemberId, Currency, IslandId, MapCoordinates, QuestHistoryRecord,
    QuestTemplateId, UserId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entities::ProgressionLedger;
use crate::infrastructure::ports::{QuestRepo, RepoError};
use crate::use_cases::quests::{ActiveQuestView, QuestStatusQuery};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IslandProgress {
    pub island_id: IslandId,
    pub name: String,
    pub order_index: u32,
    pub coordinates: MapCoordinates,
    pub unlocked_at: Option<DateTime<Utc>>,
    pub cleared_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrewProgress {
    pub crew_member_id: CrewMemberId,
    pub name: String,
    pub unlocked_at: Option<DateTime<Utc>>,
    /// Assigned to an active quest
    pub busy: bool,
}

/// Everything a client needs to render one user's world map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressionSnapshot {
    pub user_id: UserId,
    pub balance: Currency,
    /// Chain order, root first
    pub islands: Vec<IslandProgress>,
    /// The island the user would unlock next, if any
    pub next_island: Option<IslandId>,
    pub crew: Vec<CrewProgress>,
    pub active_quests: Vec<ActiveQuestView>,
    /// Templates the user could start now, ignoring crew availability
    pub available_quests: Vec<QuestTemplateId>,
}

pub struct GetProgression {
    catalog: Arc<Catalog>,
    ledger: Arc<ProgressionLedger>,
    quests: Arc<dyn QuestRepo>,
    status: Arc<QuestStatusQuery>,
}

impl GetProgression {
    pub fn new(
        catalog: Arc<Catalog>,
        ledger: Arc<ProgressionLedger>,
        quests: Arc<dyn QuestRepo>,
        status: Arc<QuestStatusQuery>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            quests,
            status,
        }
    }

    pub async fn execute(&self, user_id: &UserId) -> Result<ProgressionSnapshot, RepoError> {
        let island_unlocks: HashMap<IslandId, DateTime<Utc>> = self
            .ledger
            .island_unlocks(user_id)
            .await?
            .into_iter()
            .map(|u| (u.island_id, u.unlocked_at))
            .collect();
        let clearances: HashMap<IslandId, DateTime<Utc>> = self
            .ledger
            .clearances(user_id)
            .await?
            .into_iter()
            .map(|c| (c.island_id, c.cleared_at))
            .collect();
        let crew_unlocks: HashMap<CrewMemberId, DateTime<Utc>> = self
            .ledger
            .crew_unlocks(user_id)
            .await?
            .into_iter()
            .map(|u| (u.crew_member_id, u.unlocked_at))
            .collect();
        let active_quests = self.status.list(user_id).await?;
        let completed: HashSet<QuestTemplateId> = self
            .quests
            .history_for_user(user_id)
            .await?
            .into_iter()
            .map(|h| h.template_id)
            .collect();

        let islands = self
            .catalog
            .islands_in_order()
            .map(|island| IslandProgress {
                island_id: island.id.clone(),
                name: island.name.to_string(),
                order_index: island.order_index,
                coordinates: island.coordinates,
                unlocked_at: island_unlocks.get(&island.id).copied(),
                cleared_at: clearances.get(&island.id).copied(),
            })
            .collect();

        let unlocked: HashSet<IslandId> = island_unlocks.keys().cloned().collect();
        let next_island = self
            .catalog
            .eligible_next_island(&unlocked)
            .map(|island| island.id.clone());

        let crew = self
            .catalog
            .crew_members()
            .map(|member| CrewProgress {
                crew_member_id: member.id.clone(),
                name: member.name.to_string(),
                unlocked_at: crew_unlocks.get(&member.id).copied(),
                busy: active_quests
                    .iter()
                    .any(|view| view.quest.uses_crew_member(&member.id)),
            })
            .collect();

        let available_quests = self
            .catalog
            .quests()
            .filter(|q| unlocked.contains(&q.island_id))
            .filter(|q| !active_quests.iter().any(|v| v.quest.template_id == q.id))
            .filter(|q| q.repeatable || !completed.contains(&q.id))
            .map(|q| q.id.clone())
            .collect();

        Ok(ProgressionSnapshot {
            user_id: user_id.clone(),
            balance: self.ledger.balance(user_id).await?,
            islands,
            next_island,
            crew,
            active_quests,
            available_quests,
        })
    }
}

/// A user's collected quests, newest first.
pub struct QuestHistory {
    quests: Arc<dyn QuestRepo>,
}

impl QuestHistory {
    pub fn new(quests: Arc<dyn QuestRepo>) -> Self {
        Self { quests }
    }

    pub async fn list(&self, user_id: &UserId) -> Result<Vec<QuestHistoryRecord>, RepoError> {
        self.quests.history_for_user(user_id).await
    }
}

/// Container for progression read models.
pub struct ProgressionUseCases {
    pub snapshot: Arc<GetProgression>,
    pub history: Arc<QuestHistory>,
}

impl ProgressionUseCases {
    pub fn new(snapshot: Arc<GetProgression>, history: Arc<QuestHistory>) -> Self {
        Self { snapshot, history }
    }
}
