//! Collect quest use case.

use std::collections::HashSet;
use std::sync::Arc;

use archipelago_domain::{
    Catalog, CrewMemberId, Currency, IslandId, QuestHistoryRecord, QuestInstanceId, QuestTemplate,
    Reward, UserId,
};
use serde::Serialize;

use super::clearance::IslandClearancePolicy;
use super::error::{PreconditionViolation, QuestError};
use crate::entities::ProgressionLedger;
use crate::infrastructure::ports::{ClearanceGrant, ClockPort, CollectionCommit, QuestRepo, RepoError};
use crate::infrastructure::user_locks::UserLocks;

/// Result of a successful collect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectedQuest {
    pub history: QuestHistoryRecord,
    /// Balance after the quest reward and any clearance reward
    pub balance: Currency,
    /// Set when this collect cleared the quest's island
    pub cleared_island: Option<IslandId>,
    pub unlocked_islands: Vec<IslandId>,
    pub unlocked_crew: Vec<CrewMemberId>,
}

/// Collect a due quest instance.
///
/// Retiring the instance, writing history, the currency reward and any
/// island clearance effects are committed together. Concurrent collects of
/// the same instance produce one history record and one reward.
pub struct CollectQuest {
    catalog: Arc<Catalog>,
    ledger: Arc<ProgressionLedger>,
    quests: Arc<dyn QuestRepo>,
    policy: Arc<dyn IslandClearancePolicy>,
    locks: Arc<UserLocks>,
    clock: Arc<dyn ClockPort>,
}

impl CollectQuest {
    pub fn new(
        catalog: Arc<Catalog>,
        ledger: Arc<ProgressionLedger>,
        quests: Arc<dyn QuestRepo>,
        policy: Arc<dyn IslandClearancePolicy>,
        locks: Arc<UserLocks>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            quests,
            policy,
            locks,
            clock,
        }
    }

    pub async fn execute(
        &self,
        user_id: &UserId,
        instance_id: QuestInstanceId,
    ) -> Result<CollectedQuest, QuestError> {
        let _guard = self.locks.acquire(user_id).await;

        let quest = self
            .quests
            .get_active(user_id, instance_id)
            .await?
            .ok_or(PreconditionViolation::InstanceNotActive(instance_id))?;
        let template = self
            .catalog
            .quest(&quest.template_id)
            .ok_or_else(|| PreconditionViolation::UnknownQuest(quest.template_id.clone()))?;

        let now = self.clock.now();
        let status = quest.status_at(template, now);
        if !status.is_ready() {
            return Err(PreconditionViolation::NotYetDue {
                instance: instance_id,
                ready_at: status.ready_at(),
            }
            .into());
        }

        let history = quest
            .into_history(template, now)
            .map_err(|e| RepoError::constraint(e.to_string()))?;
        let clearance = self.clearance_grant(user_id, template).await?;
        let clearing = clearance.as_ref().map(|grant| grant.island_id.clone());

        let applied = self
            .quests
            .commit_collection(&CollectionCommit {
                history: history.clone(),
                clearance,
            })
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    QuestError::from(PreconditionViolation::InstanceNotActive(instance_id))
                } else {
                    QuestError::from(e)
                }
            })?;

        tracing::info!(
            user_id = %user_id,
            quest_id = %history.template_id,
            instance_id = %instance_id,
            reward = %history.reward,
            balance = %applied.balance,
            "Quest collected"
        );

        let cleared_island = if applied.island_cleared { clearing } else { None };
        if let Some(island_id) = &cleared_island {
            tracing::info!(
                user_id = %user_id,
                island_id = %island_id,
                unlocked_islands = ?applied.unlocked_islands,
                unlocked_crew = ?applied.unlocked_crew,
                "Island cleared"
            );
        }

        Ok(CollectedQuest {
            history,
            balance: applied.balance,
            cleared_island,
            unlocked_islands: applied.unlocked_islands,
            unlocked_crew: applied.unlocked_crew,
        })
    }

    /// Work out whether collecting `template` clears its island, and what that grants.
    async fn clearance_grant(
        &self,
        user_id: &UserId,
        template: &QuestTemplate,
    ) -> Result<Option<ClearanceGrant>, RepoError> {
        let Some(island) = self.catalog.island(&template.island_id) else {
            return Ok(None);
        };
        if self.ledger.is_island_cleared(user_id, &island.id).await? {
            return Ok(None);
        }

        let mut collected: HashSet<_> = self
            .quests
            .history_for_user(user_id)
            .await?
            .into_iter()
            .map(|h| h.template_id)
            .filter(|id| {
                self.catalog
                    .quest(id)
                    .is_some_and(|q| q.island_id == island.id)
            })
            .collect();
        collected.insert(template.id.clone());

        if !self
            .policy
            .is_island_cleared(user_id, island, &self.catalog, &collected)
        {
            return Ok(None);
        }

        let reward = match self.catalog.eligible_crew_on_island_unlock(island) {
            Some(member) => Reward::crew_member(member.id.clone()),
            None => island.completion_reward.clone(),
        };

        Ok(Some(ClearanceGrant {
            island_id: island.id.clone(),
            reward,
            next_island: self.catalog.successor_of(&island.id).map(|i| i.id.clone()),
        }))
    }
}
