//! Domain entities - catalog definitions and per-user progression records

mod crew_member;
mod island;
mod quest;
mod quest_template;
mod reward;
mod unlocks;

pub use crew_member::CrewMember;
pub use island::{Island, MapCoordinates};
pub use quest::{ActiveQuest, QuestHistoryRecord, QuestStatus};
pub use quest_template::{QuestTemplate, MAX_QUEST_DURATION_HOURS};
pub use reward::Reward;
pub use unlocks::{CrewUnlock, IslandClearance, IslandUnlock};
