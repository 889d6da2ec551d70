//! Archipelago domain: catalog definitions, per-user progression records
//! and the invariants that bind them. No I/O lives here.

extern crate self as archipelago_domain;

pub mod catalog;
pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

pub use catalog::{Catalog, CatalogDocument, ConfigurationError, UnlockGraph};

pub use entities::{
    ActiveQuest, CrewMember, CrewUnlock, Island, IslandClearance, IslandUnlock, MapCoordinates,
    QuestHistoryRecord, QuestStatus, QuestTemplate, Reward, MAX_QUEST_DURATION_HOURS,
};

pub use error::DomainError;

// Re-export ID types
pub use ids::{CrewMemberId, IslandId, QuestInstanceId, QuestTemplateId, UserId};

// Re-export value objects
pub use value_objects::{Currency, Description, DisplayName, CURRENCY_CAP};
