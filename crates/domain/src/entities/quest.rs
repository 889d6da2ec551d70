//! Quest instances and history
//!
//! # Lifecycle
//!
//! ```text
//! Available --start--> Active --(now >= ready_at)--> ReadyToCollect --collect--> history
//! ```
//!
//! There is no timer behind `Active -> ReadyToCollect`: the status is a pure
//! function of the start time, the template duration and the clock reading
//! supplied by the caller. An instance is retired exactly once, when it is
//! collected, and its data moves into a [`QuestHistoryRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    CrewMemberId, Currency, DomainError, QuestInstanceId, QuestTemplate, QuestTemplateId, UserId,
};

/// Status of an active instance at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuestStatus {
    /// Still running
    Active {
        ready_at: DateTime<Utc>,
        /// Whole seconds until collectable, rounded up
        remaining_seconds: i64,
    },
    /// Duration elapsed; waiting for the user to collect
    ReadyToCollect { ready_at: DateTime<Utc> },
}

impl QuestStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::ReadyToCollect { .. })
    }

    pub fn ready_at(&self) -> DateTime<Utc> {
        match self {
            Self::Active { ready_at, .. } | Self::ReadyToCollect { ready_at } => *ready_at,
        }
    }
}

/// A user's in-progress attempt at a quest template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveQuest {
    pub id: QuestInstanceId,
    pub user_id: UserId,
    pub template_id: QuestTemplateId,
    /// Companions assigned for the whole duration
    pub crew: Vec<CrewMemberId>,
    /// Authoritative clock anchor for status computation
    pub started_at: DateTime<Utc>,
}

impl ActiveQuest {
    pub fn new(
        user_id: UserId,
        template_id: QuestTemplateId,
        crew: Vec<CrewMemberId>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: QuestInstanceId::new(),
            user_id,
            template_id,
            crew,
            started_at,
        }
    }

    pub fn with_id(mut self, id: QuestInstanceId) -> Self {
        self.id = id;
        self
    }

    pub fn uses_crew_member(&self, crew_member: &CrewMemberId) -> bool {
        self.crew.iter().any(|c| c == crew_member)
    }

    /// Compute the status of this instance at `now`.
    ///
    /// At exactly `started_at + duration` the quest is ready.
    pub fn status_at(&self, template: &QuestTemplate, now: DateTime<Utc>) -> QuestStatus {
        let ready_at = template.ready_at(self.started_at);
        if now >= ready_at {
            QuestStatus::ReadyToCollect { ready_at }
        } else {
            let remaining_ms = (ready_at - now).num_milliseconds();
            QuestStatus::Active {
                ready_at,
                remaining_seconds: (remaining_ms + 999) / 1000,
            }
        }
    }

    /// Convert a due instance into its history record.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidStateTransition` if the instance is not
    /// yet due at `collected_at`, and `DomainError::Constraint` if `template`
    /// is not the instance's template.
    pub fn into_history(
        self,
        template: &QuestTemplate,
        collected_at: DateTime<Utc>,
    ) -> Result<QuestHistoryRecord, DomainError> {
        if template.id != self.template_id {
            return Err(DomainError::constraint(format!(
                "Quest instance {} belongs to template {}, not {}",
                self.id, self.template_id, template.id
            )));
        }
        let status = self.status_at(template, collected_at);
        if !status.is_ready() {
            return Err(DomainError::invalid_state_transition(format!(
                "Quest instance {} is not ready until {}",
                self.id,
                status.ready_at()
            )));
        }

        Ok(QuestHistoryRecord {
            instance_id: self.id,
            user_id: self.user_id,
            template_id: self.template_id,
            crew: self.crew,
            started_at: self.started_at,
            completed_at: status.ready_at(),
            collected_at,
            reward: template.currency_reward,
        })
    }
}

/// Write-once record of a collected quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestHistoryRecord {
    /// The retired instance this record was converted from
    pub instance_id: QuestInstanceId,
    pub user_id: UserId,
    pub template_id: QuestTemplateId,
    pub crew: Vec<CrewMemberId>,
    pub started_at: DateTime<Utc>,
    /// When the duration elapsed
    pub completed_at: DateTime<Utc>,
    /// When the user collected
    pub collected_at: DateTime<Utc>,
    pub reward: Currency,
}
