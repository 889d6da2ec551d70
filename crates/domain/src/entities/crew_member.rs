//! Crew member entity - Companions that staff quests

use serde::{Deserialize, Serialize};

use crate::{CrewMemberId, Description, DisplayName, IslandId};

/// A recruitable companion.
///
/// `unlock_island` names the island whose completion reward grants this
/// crew member. The root crew member has none and is granted from account
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: CrewMemberId,
    pub name: DisplayName,
    #[serde(default)]
    pub description: Description,
    /// Asset key for the portrait (client-side lookup)
    #[serde(default)]
    pub portrait: Option<String>,
    #[serde(default)]
    pub unlock_island: Option<IslandId>,
}

impl CrewMember {
    pub fn new(id: CrewMemberId, name: DisplayName) -> Self {
        Self {
            id,
            name,
            description: Description::empty(),
            portrait: None,
            unlock_island: None,
        }
    }

    pub fn with_unlock_island(mut self, island: IslandId) -> Self {
        self.unlock_island = Some(island);
        self
    }

    pub fn with_description(mut self, description: Description) -> Self {
        self.description = description;
        self
    }

    pub fn with_portrait(mut self, portrait: impl Into<String>) -> Self {
        self.portrait = Some(portrait.into());
        self
    }
}
