//! Quest template entity - Catalog definition of a timed task

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{CrewMemberId, Currency, Description, DisplayName, IslandId, QuestTemplateId};

/// Longest duration a catalog may give a quest (366 days).
pub const MAX_QUEST_DURATION_HOURS: u32 = 24 * 366;

/// A completable task on an island.
///
/// `required_crew_count` is the exact number of companions a start must
/// supply; a `required_crew_member`, when present, is one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestTemplate {
    pub id: QuestTemplateId,
    pub island_id: IslandId,
    pub name: DisplayName,
    #[serde(default)]
    pub description: Description,
    pub duration_hours: u32,
    pub currency_reward: Currency,
    pub required_crew_count: u32,
    #[serde(default)]
    pub required_crew_member: Option<CrewMemberId>,
    #[serde(default)]
    pub repeatable: bool,
}

impl QuestTemplate {
    pub fn new(
        id: QuestTemplateId,
        island_id: IslandId,
        name: DisplayName,
        duration_hours: u32,
        currency_reward: Currency,
    ) -> Self {
        Self {
            id,
            island_id,
            name,
            description: Description::empty(),
            duration_hours,
            currency_reward,
            required_crew_count: 1,
            required_crew_member: None,
            repeatable: false,
        }
    }

    pub fn with_required_crew_count(mut self, count: u32) -> Self {
        self.required_crew_count = count;
        self
    }

    pub fn with_required_crew_member(mut self, crew: CrewMemberId) -> Self {
        self.required_crew_member = Some(crew);
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::hours(i64::from(self.duration_hours))
    }

    /// The instant a quest started at `started_at` becomes collectable.
    ///
    /// Saturates at the largest representable instant.
    pub fn ready_at(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        started_at
            .checked_add_signed(self.duration())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
