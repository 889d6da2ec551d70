//! Start quest use case.

use std::collections::HashSet;
use std::sync::Arc;

use archipelago_domain::{ActiveQuest, Catalog, CrewMemberId, QuestTemplate, QuestTemplateId, UserId};

use super::error::{PreconditionViolation, QuestError};
use super::ActiveQuestView;
use crate::entities::ProgressionLedger;
use crate::infrastructure::ports::{ClockPort, QuestRepo};
use crate::infrastructure::user_locks::UserLocks;

/// Start a quest with a set of crew members.
///
/// All preconditions are checked while holding the user's lock, and the
/// instance with its crew assignments is written in one storage call, so a
/// rejected start leaves no trace.
pub struct StartQuest {
    catalog: Arc<Catalog>,
    ledger: Arc<ProgressionLedger>,
    quests: Arc<dyn QuestRepo>,
    locks: Arc<UserLocks>,
    clock: Arc<dyn ClockPort>,
}

impl StartQuest {
    pub fn new(
        catalog: Arc<Catalog>,
        ledger: Arc<ProgressionLedger>,
        quests: Arc<dyn QuestRepo>,
        locks: Arc<UserLocks>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            quests,
            locks,
            clock,
        }
    }

    pub async fn execute(
        &self,
        user_id: &UserId,
        template_id: &QuestTemplateId,
        crew: Vec<CrewMemberId>,
    ) -> Result<ActiveQuestView, QuestError> {
        let template = self
            .catalog
            .quest(template_id)
            .ok_or_else(|| PreconditionViolation::UnknownQuest(template_id.clone()))?;
        check_crew_shape(template, &crew)?;

        let _guard = self.locks.acquire(user_id).await;

        if !self
            .ledger
            .is_island_unlocked(user_id, &template.island_id)
            .await?
        {
            return Err(PreconditionViolation::IslandLocked {
                quest: template.id.clone(),
                island: template.island_id.clone(),
            }
            .into());
        }

        for member in &crew {
            if !self.ledger.is_crew_unlocked(user_id, member).await? {
                return Err(PreconditionViolation::CompanionLocked(member.clone()).into());
            }
        }

        let active = self.quests.active_for_user(user_id).await?;
        if active.iter().any(|q| &q.template_id == template_id) {
            return Err(PreconditionViolation::QuestAlreadyActive(template_id.clone()).into());
        }
        if let Some(busy) = crew
            .iter()
            .find(|member| active.iter().any(|q| q.uses_crew_member(member)))
        {
            return Err(PreconditionViolation::CompanionBusy(busy.clone()).into());
        }

        if !template.repeatable && self.quests.has_history(user_id, template_id).await? {
            return Err(
                PreconditionViolation::NonRepeatableAlreadyCompleted(template_id.clone()).into(),
            );
        }

        let now = self.clock.now();
        let quest = ActiveQuest::new(user_id.clone(), template_id.clone(), crew, now);
        let status = quest.status_at(template, now);
        self.quests.insert_active(&quest).await.map_err(|e| {
            if e.is_constraint_violation() {
                QuestError::from(PreconditionViolation::AssignmentConflict(e.to_string()))
            } else {
                QuestError::from(e)
            }
        })?;

        tracing::info!(
            user_id = %user_id,
            quest_id = %template_id,
            instance_id = %quest.id,
            crew = ?quest.crew,
            "Quest started"
        );

        Ok(ActiveQuestView { quest, status })
    }
}

/// Checks that need only the request and the template.
fn check_crew_shape(
    template: &QuestTemplate,
    crew: &[CrewMemberId],
) -> Result<(), PreconditionViolation> {
    let mut seen = HashSet::with_capacity(crew.len());
    if let Some(duplicate) = crew.iter().find(|member| !seen.insert(*member)) {
        return Err(PreconditionViolation::DuplicateCompanion(duplicate.clone()));
    }

    if crew.len() != template.required_crew_count as usize {
        return Err(PreconditionViolation::WrongCompanionCount {
            quest: template.id.clone(),
            required: template.required_crew_count,
            supplied: crew.len(),
        });
    }

    if let Some(required) = &template.required_crew_member {
        if !crew.contains(required) {
            return Err(PreconditionViolation::RequiredCompanionMissing {
                quest: template.id.clone(),
                crew_member: required.clone(),
            });
        }
    }

    Ok(())
}
