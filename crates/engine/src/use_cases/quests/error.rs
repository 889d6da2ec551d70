//! Quest scheduler errors.

use archipelago_domain::{CrewMemberId, IslandId, QuestInstanceId, QuestTemplateId};
use chrono::{DateTime, Utc};

use crate::infrastructure::ports::RepoError;

/// A start or collect request the user's current state does not allow.
///
/// Always reported before any write; nothing was changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionViolation {
    #[error("Unknown quest: {0}")]
    UnknownQuest(QuestTemplateId),

    #[error("Quest {quest} is on island {island}, which is not unlocked")]
    IslandLocked {
        quest: QuestTemplateId,
        island: IslandId,
    },

    #[error("Quest {quest} needs exactly {required} crew members, got {supplied}")]
    WrongCompanionCount {
        quest: QuestTemplateId,
        required: u32,
        supplied: usize,
    },

    #[error("Crew member {0} was supplied more than once")]
    DuplicateCompanion(CrewMemberId),

    #[error("Quest {quest} requires crew member {crew_member}")]
    RequiredCompanionMissing {
        quest: QuestTemplateId,
        crew_member: CrewMemberId,
    },

    #[error("Crew member {0} is not unlocked")]
    CompanionLocked(CrewMemberId),

    #[error("Crew member {0} is already on another quest")]
    CompanionBusy(CrewMemberId),

    #[error("Quest {0} is already active")]
    QuestAlreadyActive(QuestTemplateId),

    #[error("Quest {0} is not repeatable and was already completed")]
    NonRepeatableAlreadyCompleted(QuestTemplateId),

    /// Storage rejected the assignment; another writer got there first.
    #[error("Quest assignment conflicts with an active quest: {0}")]
    AssignmentConflict(String),

    #[error("Quest instance {instance} is not ready until {ready_at}")]
    NotYetDue {
        instance: QuestInstanceId,
        ready_at: DateTime<Utc>,
    },

    #[error("Quest instance {0} is not active")]
    InstanceNotActive(QuestInstanceId),
}

#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    #[error(transparent)]
    Precondition(#[from] PreconditionViolation),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl QuestError {
    /// Whether the caller can correct the input and retry.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    pub fn precondition(&self) -> Option<&PreconditionViolation> {
        match self {
            Self::Precondition(violation) => Some(violation),
            Self::Repo(_) => None,
        }
    }
}
