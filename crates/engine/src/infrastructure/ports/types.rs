//! Helper types for port operations.

use archipelago_domain::{CrewMemberId, Currency, IslandId, QuestHistoryRecord, Reward};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Catalog Storage Types
// =============================================================================

/// Identifies the catalog content currently held by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMarker {
    /// Content version declared by the document
    pub version: u32,
    /// Hex SHA-256 of the canonical JSON document
    pub checksum: String,
    pub loaded_at: DateTime<Utc>,
}

// =============================================================================
// Quest Collection Types
// =============================================================================

/// Everything a single collect writes, applied in one storage transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionCommit {
    /// History row for the retired instance; also identifies the instance to delete
    pub history: QuestHistoryRecord,
    /// Present when this collect clears the quest's island
    pub clearance: Option<ClearanceGrant>,
}

/// Island clearance effects. Applied only if the clearance record is new.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearanceGrant {
    pub island_id: IslandId,
    pub reward: Reward,
    pub next_island: Option<IslandId>,
}

/// What a committed collection actually changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionApplied {
    /// Balance after all currency grants
    pub balance: Currency,
    /// True if this commit created the island clearance record
    pub island_cleared: bool,
    pub unlocked_islands: Vec<IslandId>,
    pub unlocked_crew: Vec<CrewMemberId>,
}
