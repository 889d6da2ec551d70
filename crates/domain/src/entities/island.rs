//! Island entity - A node in the progression chain
//!
//! Islands form a single chain through their `predecessor` reference:
//!
//! ```text
//! harbor (root) <- reef <- volcano <- ...
//! ```
//!
//! Unlocking an island exposes its quests. Clearing it grants its
//! `completion_reward` and unlocks the next island in the chain.

use serde::{Deserialize, Serialize};

use crate::{DisplayName, IslandId, Reward};

/// Position on the world map. Opaque to the engine; rendered by clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MapCoordinates {
    pub x: f64,
    pub y: f64,
}

/// An island in the catalog.
///
/// Simple data struct: catalog-level invariants (single chain, no cycles,
/// resolvable references) are enforced when a [`crate::Catalog`] is built,
/// not per island.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Island {
    pub id: IslandId,
    pub name: DisplayName,
    /// Display ordering on the map
    pub order_index: u32,
    #[serde(default)]
    pub coordinates: MapCoordinates,
    /// The island that must be unlocked before this one. `None` for the root.
    #[serde(default)]
    pub predecessor: Option<IslandId>,
    pub completion_reward: Reward,
}

impl Island {
    pub fn new(id: IslandId, name: DisplayName, completion_reward: Reward) -> Self {
        Self {
            id,
            name,
            order_index: 0,
            coordinates: MapCoordinates::default(),
            predecessor: None,
            completion_reward,
        }
    }

    pub fn with_predecessor(mut self, predecessor: IslandId) -> Self {
        self.predecessor = Some(predecessor);
        self
    }

    pub fn with_order_index(mut self, order_index: u32) -> Self {
        self.order_index = order_index;
        self
    }

    pub fn with_coordinates(mut self, x: f64, y: f64) -> Self {
        self.coordinates = MapCoordinates { x, y };
        self
    }

    pub fn is_root(&self) -> bool {
        self.predecessor.is_none()
    }
}
