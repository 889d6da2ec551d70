//! Unlock graph resolver.
//!
//! The predecessor relation between islands must form a single chain with
//! exactly one root. [`UnlockGraph::build`] checks that shape once, at
//! catalog load, and precomputes a successor index so that every lookup
//! afterwards is O(1) or O(depth).

use std::collections::{HashMap, HashSet};

use super::error::ConfigurationError;
use crate::{Island, IslandId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockGraph {
    /// Islands in chain order, root first
    chain: Vec<IslandId>,
    position: HashMap<IslandId, usize>,
}

impl UnlockGraph {
    /// Validate the predecessor relation and build the chain.
    ///
    /// `islands` must already be free of duplicate ids.
    pub fn build(islands: &[Island]) -> Result<Self, ConfigurationError> {
        let by_id: HashMap<&IslandId, &Island> = islands.iter().map(|i| (&i.id, i)).collect();

        for island in islands {
            if let Some(predecessor) = &island.predecessor {
                if !by_id.contains_key(predecessor) {
                    return Err(ConfigurationError::DanglingPredecessor {
                        island: island.id.clone(),
                        predecessor: predecessor.clone(),
                    });
                }
            }
        }

        for island in islands {
            detect_cycle(island, &by_id)?;
        }

        let roots: Vec<IslandId> = islands
            .iter()
            .filter(|i| i.is_root())
            .map(|i| i.id.clone())
            .collect();
        let root = match roots.len() {
            0 => return Err(ConfigurationError::NoRootIsland),
            1 => roots[0].clone(),
            _ => return Err(ConfigurationError::MultipleRootIslands(roots)),
        };

        let mut successors: HashMap<&IslandId, Vec<IslandId>> = HashMap::new();
        for island in islands {
            if let Some(predecessor) = &island.predecessor {
                successors
                    .entry(predecessor)
                    .or_default()
                    .push(island.id.clone());
            }
        }
        if let Some((predecessor, successors)) = successors.iter().find(|(_, s)| s.len() > 1) {
            let mut successors = successors.clone();
            successors.sort();
            return Err(ConfigurationError::BranchingChain {
                predecessor: (*predecessor).clone(),
                successors,
            });
        }

        // Every island now lies on the chain walked from the root
        let mut chain = Vec::with_capacity(islands.len());
        let mut current = Some(root);
        while let Some(id) = current {
            current = successors.get(&id).and_then(|s| s.first().cloned());
            chain.push(id);
        }

        let position = chain
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();

        Ok(Self { chain, position })
    }

    pub fn root(&self) -> &IslandId {
        // build() never produces an empty chain
        &self.chain[0]
    }

    /// Islands in unlock order, root first.
    pub fn chain(&self) -> &[IslandId] {
        &self.chain
    }

    pub fn contains(&self, island: &IslandId) -> bool {
        self.position.contains_key(island)
    }

    pub fn successor_of(&self, island: &IslandId) -> Option<&IslandId> {
        let idx = *self.position.get(island)?;
        self.chain.get(idx + 1)
    }

    pub fn predecessor_of(&self, island: &IslandId) -> Option<&IslandId> {
        let idx = *self.position.get(island)?;
        idx.checked_sub(1).and_then(|prev| self.chain.get(prev))
    }

    /// The unique island a user holding `unlocked` may unlock next.
    ///
    /// Walks the chain from the root and returns the first island missing
    /// from `unlocked`; its predecessor is necessarily unlocked (or it is
    /// the root). Returns `None` once the whole chain is unlocked.
    pub fn eligible_next_island(&self, unlocked: &HashSet<IslandId>) -> Option<&IslandId> {
        self.chain.iter().find(|id| !unlocked.contains(*id))
    }
}

fn detect_cycle(
    start: &Island,
    by_id: &HashMap<&IslandId, &Island>,
) -> Result<(), ConfigurationError> {
    let mut seen: HashSet<&IslandId> = HashSet::new();
    let mut current = Some(start);
    while let Some(island) = current {
        if !seen.insert(&island.id) {
            return Err(ConfigurationError::Cycle(island.id.clone()));
        }
        current = island
            .predecessor
            .as_ref()
            .and_then(|p| by_id.get(p).copied());
    }
    Ok(())
}
