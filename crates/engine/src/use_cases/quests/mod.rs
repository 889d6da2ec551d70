//! Quest scheduler use cases.
//!
//! Quest instances move `Active -> ReadyToCollect -> collected` with no
//! background timer: status is recomputed from the clock on every read.

mod clearance;
mod collect_quest;
mod error;
mod quest_status;
mod start_quest;

#[cfg(test)]
mod tests;

pub use clearance::{
    policy_for, AllNonRepeatableCollected, AllQuestsCollected, IslandClearancePolicy,
    NeverCleared,
};
pub use collect_quest::{CollectQuest, CollectedQuest};
pub use error::{PreconditionViolation, QuestError};
pub use quest_status::QuestStatusQuery;
pub use start_quest::StartQuest;

use std::sync::Arc;

use archipelago_domain::{ActiveQuest, QuestStatus};
use serde::Serialize;

/// An active instance together with its status at read time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveQuestView {
    #[serde(flatten)]
    pub quest: ActiveQuest,
    pub status: QuestStatus,
}

/// Container for quest use cases.
pub struct QuestUseCases {
    pub start: Arc<StartQuest>,
    pub collect: Arc<CollectQuest>,
    pub status: Arc<QuestStatusQuery>,
}

impl QuestUseCases {
    pub fn new(
        start: Arc<StartQuest>,
        collect: Arc<CollectQuest>,
        status: Arc<QuestStatusQuery>,
    ) -> Self {
        Self {
            start,
            collect,
            status,
        }
    }
}
