//! Catalog integrity errors.

use crate::{CrewMemberId, IslandId, QuestTemplateId};

/// A catalog that cannot be used. Always fatal at load time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Duplicate island id: {0}")]
    DuplicateIsland(IslandId),

    #[error("Duplicate crew member id: {0}")]
    DuplicateCrewMember(CrewMemberId),

    #[error("Duplicate quest template id: {0}")]
    DuplicateQuest(QuestTemplateId),

    #[error("Catalog has no root island")]
    NoRootIsland,

    #[error("Catalog has more than one root island: {0:?}")]
    MultipleRootIslands(Vec<IslandId>),

    #[error("Island {island} names unknown predecessor {predecessor}")]
    DanglingPredecessor {
        island: IslandId,
        predecessor: IslandId,
    },

    #[error("Island chain contains a cycle through {0}")]
    Cycle(IslandId),

    #[error("Island {predecessor} has more than one successor: {successors:?}")]
    BranchingChain {
        predecessor: IslandId,
        successors: Vec<IslandId>,
    },

    #[error("Island {island} rewards unknown crew member {crew_member}")]
    DanglingRewardCrewMember {
        island: IslandId,
        crew_member: CrewMemberId,
    },

    #[error("Crew member {crew_member} is rewarded by more than one island")]
    DuplicateCrewReward { crew_member: CrewMemberId },

    #[error("Crew member {crew_member} names unknown unlock island {island}")]
    DanglingCrewIsland {
        crew_member: CrewMemberId,
        island: IslandId,
    },

    #[error(
        "Crew member {crew_member} unlock island is {found:?} but the rewarding island is {expected:?}"
    )]
    CrewBackReferenceMismatch {
        crew_member: CrewMemberId,
        expected: Option<IslandId>,
        found: Option<IslandId>,
    },

    #[error("Catalog must have exactly one root crew member, found {0:?}")]
    RootCrewMemberCount(Vec<CrewMemberId>),

    #[error("Quest {quest} belongs to unknown island {island}")]
    QuestUnknownIsland {
        quest: QuestTemplateId,
        island: IslandId,
    },

    #[error("Quest {0} must require at least one crew member")]
    QuestRequiresNoCrew(QuestTemplateId),

    #[error("Quest {quest} lasts {hours} hours, more than the maximum of {max}")]
    QuestDurationOutOfRange {
        quest: QuestTemplateId,
        hours: u32,
        max: u32,
    },

    #[error("Quest {quest} requires unknown crew member {crew_member}")]
    QuestUnknownCrewMember {
        quest: QuestTemplateId,
        crew_member: CrewMemberId,
    },
}
