//! Quest status queries.

use std::sync::Arc;

use archipelago_domain::{Catalog, QuestInstanceId, UserId};

use super::error::{PreconditionViolation, QuestError};
use super::ActiveQuestView;
use crate::infrastructure::ports::{ClockPort, QuestRepo, RepoError};

/// Recompute instance status from the clock. Read-only; never writes.
pub struct QuestStatusQuery {
    catalog: Arc<Catalog>,
    quests: Arc<dyn QuestRepo>,
    clock: Arc<dyn ClockPort>,
}

impl QuestStatusQuery {
    pub fn new(catalog: Arc<Catalog>, quests: Arc<dyn QuestRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            catalog,
            quests,
            clock,
        }
    }

    pub async fn get(
        &self,
        user_id: &UserId,
        instance_id: QuestInstanceId,
    ) -> Result<ActiveQuestView, QuestError> {
        let quest = self
            .quests
            .get_active(user_id, instance_id)
            .await?
            .ok_or(PreconditionViolation::InstanceNotActive(instance_id))?;
        let template = self
            .catalog
            .quest(&quest.template_id)
            .ok_or_else(|| PreconditionViolation::UnknownQuest(quest.template_id.clone()))?;

        let status = quest.status_at(template, self.clock.now());
        Ok(ActiveQuestView { quest, status })
    }

    /// Every active instance of the user, oldest first. Instances whose
    /// template is no longer in the catalog are skipped.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<ActiveQuestView>, RepoError> {
        let now = self.clock.now();
        let quests = self.quests.active_for_user(user_id).await?;

        Ok(quests
            .into_iter()
            .filter_map(|quest| {
                let Some(template) = self.catalog.quest(&quest.template_id) else {
                    tracing::warn!(
                        user_id = %user_id,
                        instance_id = %quest.id,
                        quest_id = %quest.template_id,
                        "Active quest references a template missing from the catalog"
                    );
                    return None;
                };
                let status = quest.status_at(template, now);
                Some(ActiveQuestView { quest, status })
            })
            .collect())
    }
}
