//! World catalog - the static definition of islands, crew members and quests.
//!
//! A [`CatalogDocument`] is the serialized, unvalidated form produced by the
//! content seed. Islands and crew members reference each other (island
//! rewards name crew members; crew members name their unlock island), so
//! both tables are deserialized in full, cross-validated, and only then
//! turned into a [`Catalog`]. A `Catalog` value is always internally
//! consistent and is shared read-only at runtime.

mod error;
mod unlock_graph;

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

pub use error::ConfigurationError;
pub use unlock_graph::UnlockGraph;

use crate::{
    CrewMember, CrewMemberId, Island, IslandId, QuestTemplate, QuestTemplateId,
    MAX_QUEST_DURATION_HOURS,
};

/// Serialized catalog as shipped by the content seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Content schema/version marker, bumped by content authors
    pub version: u32,
    pub islands: Vec<Island>,
    pub crew_members: Vec<CrewMember>,
    pub quests: Vec<QuestTemplate>,
}

/// A validated, immutable catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    version: u32,
    islands: HashMap<IslandId, Island>,
    crew: HashMap<CrewMemberId, CrewMember>,
    quests: HashMap<QuestTemplateId, QuestTemplate>,
    /// Quest ids per island, in document order
    quests_by_island: HashMap<IslandId, Vec<QuestTemplateId>>,
    crew_order: Vec<CrewMemberId>,
    quest_order: Vec<QuestTemplateId>,
    root_crew_member: CrewMemberId,
    graph: UnlockGraph,
}

impl Catalog {
    /// Validate a document and build the catalog.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found: duplicate ids, a
    /// predecessor relation that is not a single rooted chain, dangling
    /// island/crew references, a crew back-reference that disagrees with
    /// the island reward, a root crew member count other than one, or an
    /// invalid quest template.
    pub fn from_document(document: CatalogDocument) -> Result<Self, ConfigurationError> {
        let CatalogDocument {
            version,
            islands,
            crew_members,
            quests,
        } = document;

        let mut seen_islands = HashSet::new();
        for island in &islands {
            if !seen_islands.insert(&island.id) {
                return Err(ConfigurationError::DuplicateIsland(island.id.clone()));
            }
        }
        let graph = UnlockGraph::build(&islands)?;

        let mut crew = HashMap::with_capacity(crew_members.len());
        let mut crew_order = Vec::with_capacity(crew_members.len());
        for member in crew_members {
            if crew.contains_key(&member.id) {
                return Err(ConfigurationError::DuplicateCrewMember(member.id));
            }
            crew_order.push(member.id.clone());
            crew.insert(member.id.clone(), member);
        }

        let rewarded_by = validate_island_rewards(&islands, &crew)?;
        let root_crew_member = validate_crew_references(&crew_order, &crew, &rewarded_by, &graph)?;

        let islands: HashMap<IslandId, Island> =
            islands.into_iter().map(|i| (i.id.clone(), i)).collect();

        let mut quest_map = HashMap::with_capacity(quests.len());
        let mut quest_order = Vec::with_capacity(quests.len());
        let mut quests_by_island: HashMap<IslandId, Vec<QuestTemplateId>> = HashMap::new();
        for quest in quests {
            if quest_map.contains_key(&quest.id) {
                return Err(ConfigurationError::DuplicateQuest(quest.id));
            }
            if !islands.contains_key(&quest.island_id) {
                return Err(ConfigurationError::QuestUnknownIsland {
                    quest: quest.id,
                    island: quest.island_id,
                });
            }
            if quest.required_crew_count == 0 {
                return Err(ConfigurationError::QuestRequiresNoCrew(quest.id));
            }
            if quest.duration_hours > MAX_QUEST_DURATION_HOURS {
                return Err(ConfigurationError::QuestDurationOutOfRange {
                    quest: quest.id,
                    hours: quest.duration_hours,
                    max: MAX_QUEST_DURATION_HOURS,
                });
            }
            if let Some(required) = &quest.required_crew_member {
                if !crew.contains_key(required) {
                    return Err(ConfigurationError::QuestUnknownCrewMember {
                        quest: quest.id.clone(),
                        crew_member: required.clone(),
                    });
                }
            }
            quests_by_island
                .entry(quest.island_id.clone())
                .or_default()
                .push(quest.id.clone());
            quest_order.push(quest.id.clone());
            quest_map.insert(quest.id.clone(), quest);
        }

        Ok(Self {
            version,
            islands,
            crew,
            quests: quest_map,
            quests_by_island,
            crew_order,
            quest_order,
            root_crew_member,
            graph,
        })
    }

    /// Serialize back to the document form (islands in chain order).
    pub fn to_document(&self) -> CatalogDocument {
        CatalogDocument {
            version: self.version,
            islands: self.islands_in_order().cloned().collect(),
            crew_members: self
                .crew_order
                .iter()
                .filter_map(|id| self.crew.get(id))
                .cloned()
                .collect(),
            quests: self
                .quest_order
                .iter()
                .filter_map(|id| self.quests.get(id))
                .cloned()
                .collect(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn graph(&self) -> &UnlockGraph {
        &self.graph
    }

    pub fn island(&self, id: &IslandId) -> Option<&Island> {
        self.islands.get(id)
    }

    pub fn crew_member(&self, id: &CrewMemberId) -> Option<&CrewMember> {
        self.crew.get(id)
    }

    pub fn quest(&self, id: &QuestTemplateId) -> Option<&QuestTemplate> {
        self.quests.get(id)
    }

    pub fn root_island(&self) -> &Island {
        self.chain_island(self.graph.root())
    }

    pub fn root_crew_member(&self) -> &CrewMember {
        // Validated in from_document
        &self.crew[&self.root_crew_member]
    }

    /// Islands in unlock order, root first.
    pub fn islands_in_order(&self) -> impl Iterator<Item = &Island> + '_ {
        self.graph.chain().iter().map(|id| self.chain_island(id))
    }

    pub fn crew_members(&self) -> impl Iterator<Item = &CrewMember> + '_ {
        self.crew_order.iter().filter_map(|id| self.crew.get(id))
    }

    pub fn quests(&self) -> impl Iterator<Item = &QuestTemplate> + '_ {
        self.quest_order.iter().filter_map(|id| self.quests.get(id))
    }

    /// Quest templates owned by `island`, in document order.
    pub fn quests_on_island(&self, island: &IslandId) -> Vec<&QuestTemplate> {
        self.quests_by_island
            .get(island)
            .map(|ids| ids.iter().filter_map(|id| self.quests.get(id)).collect())
            .unwrap_or_default()
    }

    /// Resolver: the unique island a user holding `unlocked` may unlock next.
    pub fn eligible_next_island(&self, unlocked: &HashSet<IslandId>) -> Option<&Island> {
        self.graph
            .eligible_next_island(unlocked)
            .map(|id| self.chain_island(id))
    }

    /// Resolver: the crew member named by `island`'s completion reward.
    pub fn eligible_crew_on_island_unlock(&self, island: &Island) -> Option<&CrewMember> {
        island
            .completion_reward
            .crew_member_id()
            .and_then(|id| self.crew.get(id))
    }

    /// The island that follows `island` in the chain.
    pub fn successor_of(&self, island: &IslandId) -> Option<&Island> {
        self.graph
            .successor_of(island)
            .map(|id| self.chain_island(id))
    }

    fn chain_island(&self, id: &IslandId) -> &Island {
        // Every chain id was built from the island list
        &self.islands[id]
    }
}

/// Check island rewards that name crew members; returns crew -> rewarding island.
fn validate_island_rewards(
    islands: &[Island],
    crew: &HashMap<CrewMemberId, CrewMember>,
) -> Result<HashMap<CrewMemberId, IslandId>, ConfigurationError> {
    let mut rewarded_by = HashMap::new();
    for island in islands {
        let Some(crew_member) = island.completion_reward.crew_member_id() else {
            continue;
        };
        if !crew.contains_key(crew_member) {
            return Err(ConfigurationError::DanglingRewardCrewMember {
                island: island.id.clone(),
                crew_member: crew_member.clone(),
            });
        }
        if rewarded_by
            .insert(crew_member.clone(), island.id.clone())
            .is_some()
        {
            return Err(ConfigurationError::DuplicateCrewReward {
                crew_member: crew_member.clone(),
            });
        }
    }
    Ok(rewarded_by)
}

/// Check every crew back-reference against the island rewards; returns the root crew member.
fn validate_crew_references(
    crew_order: &[CrewMemberId],
    crew: &HashMap<CrewMemberId, CrewMember>,
    rewarded_by: &HashMap<CrewMemberId, IslandId>,
    graph: &UnlockGraph,
) -> Result<CrewMemberId, ConfigurationError> {
    let mut roots = Vec::new();
    for id in crew_order {
        let member = &crew[id];
        if let Some(island) = &member.unlock_island {
            if !graph.contains(island) {
                return Err(ConfigurationError::DanglingCrewIsland {
                    crew_member: id.clone(),
                    island: island.clone(),
                });
            }
        }
        let expected = rewarded_by.get(id);
        if member.unlock_island.as_ref() != expected {
            return Err(ConfigurationError::CrewBackReferenceMismatch {
                crew_member: id.clone(),
                expected: expected.cloned(),
                found: member.unlock_island.clone(),
            });
        }
        if member.unlock_island.is_none() {
            roots.push(id.clone());
        }
    }

    if roots.len() == 1 {
        Ok(roots.remove(0))
    } else {
        Err(ConfigurationError::RootCrewMemberCount(roots))
    }
}
