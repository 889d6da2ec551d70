//! Shared test fixtures.
//!
//! The fixture world is a three-island chain:
//!
//! ```text
//! harbor (root) --> reef --> volcano
//!   reward: navigator   reward: 250   reward: diver
//! ```
//!
//! `captain` is the root crew member. Quests:
//!
//! | quest         | island  | hours | reward | crew | notes                    |
//! |---------------|---------|-------|--------|------|--------------------------|
//! | dock_cleanup  | harbor  | 2     | 100    | 1    | non-repeatable           |
//! | net_fishing   | harbor  | 1     | 10     | 1    | repeatable               |
//! | chart_reef    | reef    | 4     | 300    | 2    | requires navigator       |
//! | pearl_diving  | reef    | 1     | 20     | 1    | repeatable               |
//! | ember_watch   | volcano | 3     | 500    | 1    | non-repeatable           |

use std::sync::{Arc, Mutex};

use archipelago_domain::{
    Catalog, CatalogDocument, CrewMember, CrewMemberId, Currency, DisplayName, Island, IslandId,
    QuestTemplate, QuestTemplateId, Reward, UserId,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::infrastructure::ports::ClockPort;

pub fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

pub fn island(id: &str) -> IslandId {
    IslandId::new(id).unwrap()
}

pub fn crew(id: &str) -> CrewMemberId {
    CrewMemberId::new(id).unwrap()
}

pub fn quest(id: &str) -> QuestTemplateId {
    QuestTemplateId::new(id).unwrap()
}

fn name(s: &str) -> DisplayName {
    DisplayName::new(s).unwrap()
}

/// The serialized fixture catalog.
pub fn archipelago_document() -> CatalogDocument {
    CatalogDocument {
        version: 1,
        islands: vec![
            Island::new(
                island("harbor"),
                name("Harbor Town"),
                Reward::crew_member(crew("navigator")),
            )
            .with_order_index(0)
            .with_coordinates(120.0, 340.0),
            Island::new(island("reef"), name("Coral Reef"), Reward::currency(250))
                .with_predecessor(island("harbor"))
                .with_order_index(1)
                .with_coordinates(260.0, 300.0),
            Island::new(
                island("volcano"),
                name("Volcano Isle"),
                Reward::crew_member(crew("diver")),
            )
            .with_predecessor(island("reef"))
            .with_order_index(2)
            .with_coordinates(410.0, 180.0),
        ],
        crew_members: vec![
            CrewMember::new(crew("captain"), name("Captain")),
            CrewMember::new(crew("navigator"), name("Navigator"))
                .with_unlock_island(island("harbor")),
            CrewMember::new(crew("diver"), name("Diver")).with_unlock_island(island("volcano")),
        ],
        quests: vec![
            QuestTemplate::new(
                quest("dock_cleanup"),
                island("harbor"),
                name("Dock Cleanup"),
                2,
                Currency::new(100),
            ),
            QuestTemplate::new(
                quest("net_fishing"),
                island("harbor"),
                name("Net Fishing"),
                1,
                Currency::new(10),
            )
            .repeatable(),
            QuestTemplate::new(
                quest("chart_reef"),
                island("reef"),
                name("Chart the Reef"),
                4,
                Currency::new(300),
            )
            .with_required_crew_count(2)
            .with_required_crew_member(crew("navigator")),
            QuestTemplate::new(
                quest("pearl_diving"),
                island("reef"),
                name("Pearl Diving"),
                1,
                Currency::new(20),
            )
            .repeatable(),
            QuestTemplate::new(
                quest("ember_watch"),
                island("volcano"),
                name("Ember Watch"),
                3,
                Currency::new(500),
            ),
        ],
    }
}

/// The validated fixture catalog.
pub fn archipelago_catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_document(archipelago_document()).unwrap())
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

/// A clock tests move by hand.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// An engine over the in-memory store with a hand-driven clock.
pub struct TestEngine {
    pub app: Arc<crate::App>,
    pub store: Arc<crate::infrastructure::memory::InMemoryStore>,
    pub clock: Arc<ManualClock>,
}

impl TestEngine {
    /// Fixture catalog, default clearance policy, clock at [`epoch`].
    pub fn new() -> Self {
        Self::with_policy(crate::use_cases::quests::policy_for(
            crate::infrastructure::config::ClearancePolicyKind::AllNonRepeatable,
        ))
    }

    pub fn with_policy(
        policy: Arc<dyn crate::use_cases::quests::IslandClearancePolicy>,
    ) -> Self {
        let store = Arc::new(crate::infrastructure::memory::InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(epoch()));
        let app = Arc::new(crate::App::new(
            archipelago_catalog(),
            crate::app::Repositories::from_store(store.clone()),
            policy,
            clock.clone(),
        ));
        Self { app, store, clock }
    }

    /// Register `id` through the account hook so it holds harbor and captain.
    pub async fn new_user(&self, id: &str) -> UserId {
        let user_id = user(id);
        self.app
            .use_cases
            .accounts
            .on_account_created(&user_id)
            .await
            .unwrap();
        user_id
    }
}

impl Default for TestEngine {
    fn default() -> Self {
        Self::new()
    }
}
