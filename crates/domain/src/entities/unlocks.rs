//! Per-user unlock records
//!
//! Existence of a record is the sole source of truth: an island is
//! accessible iff an [`IslandUnlock`] exists for (user, island). Records are
//! created once and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CrewMemberId, IslandId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IslandUnlock {
    pub user_id: UserId,
    pub island_id: IslandId,
    pub unlocked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewUnlock {
    pub user_id: UserId,
    pub crew_member_id: CrewMemberId,
    pub unlocked_at: DateTime<Utc>,
}

/// Marks that a user cleared an island and received its completion reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IslandClearance {
    pub user_id: UserId,
    pub island_id: IslandId,
    pub cleared_at: DateTime<Utc>,
}
