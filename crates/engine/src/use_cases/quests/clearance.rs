//! Island clearance policies.
//!
//! Whether a user has "cleared" an island is a content decision. The
//! scheduler asks the configured [`IslandClearancePolicy`] after every
//! collect on that island.

use std::collections::HashSet;
use std::sync::Arc;

use archipelago_domain::{Catalog, Island, QuestTemplateId, UserId};

use crate::infrastructure::config::ClearancePolicyKind;

pub trait IslandClearancePolicy: Send + Sync {
    /// `collected` holds every template on `island` the user has collected,
    /// including the one being collected right now.
    fn is_island_cleared(
        &self,
        user_id: &UserId,
        island: &Island,
        catalog: &Catalog,
        collected: &HashSet<QuestTemplateId>,
    ) -> bool;
}

/// Cleared once every non-repeatable quest on the island was collected.
///
/// An island with only repeatable quests clears on its first collect.
pub struct AllNonRepeatableCollected;

impl IslandClearancePolicy for AllNonRepeatableCollected {
    fn is_island_cleared(
        &self,
        _user_id: &UserId,
        island: &Island,
        catalog: &Catalog,
        collected: &HashSet<QuestTemplateId>,
    ) -> bool {
        catalog
            .quests_on_island(&island.id)
            .into_iter()
            .filter(|q| !q.repeatable)
            .all(|q| collected.contains(&q.id))
    }
}

/// Cleared once every quest on the island was collected at least once.
pub struct AllQuestsCollected;

impl IslandClearancePolicy for AllQuestsCollected {
    fn is_island_cleared(
        &self,
        _user_id: &UserId,
        island: &Island,
        catalog: &Catalog,
        collected: &HashSet<QuestTemplateId>,
    ) -> bool {
        catalog
            .quests_on_island(&island.id)
            .into_iter()
            .all(|q| collected.contains(&q.id))
    }
}

/// Islands never clear; progression past the root is driven elsewhere.
pub struct NeverCleared;

impl IslandClearancePolicy for NeverCleared {
    fn is_island_cleared(
        &self,
        _user_id: &UserId,
        _island: &Island,
        _catalog: &Catalog,
        _collected: &HashSet<QuestTemplateId>,
    ) -> bool {
        false
    }
}

pub fn policy_for(kind: ClearancePolicyKind) -> Arc<dyn IslandClearancePolicy> {
    match kind {
        ClearancePolicyKind::AllNonRepeatable => Arc::new(AllNonRepeatableCollected),
        ClearancePolicyKind::AllQuests => Arc::new(AllQuestsCollected),
        ClearancePolicyKind::Never => Arc::new(NeverCleared),
    }
}
