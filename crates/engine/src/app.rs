//! Application state and composition.

use std::sync::Arc;

use archipelago_domain::Catalog;

use crate::entities::ProgressionLedger;
use crate::infrastructure::ports::{AccountRepo, CatalogRepo, ClockPort, ProgressionRepo, QuestRepo};
use crate::infrastructure::user_locks::UserLocks;
use crate::use_cases::{
    self,
    quests::{CollectQuest, IslandClearancePolicy, QuestStatusQuery, StartQuest},
    AccountHooks, GetProgression, QuestHistory, ReconcileAll, ReconcileUser,
};

/// Main application state.
///
/// Holds the loaded catalog, the storage ports and all use cases.
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub catalog: Arc<Catalog>,
    pub repositories: Repositories,
    pub use_cases: UseCases,
    pub locks: Arc<UserLocks>,
}

/// Container for the storage ports.
pub struct Repositories {
    pub catalog: Arc<dyn CatalogRepo>,
    pub accounts: Arc<dyn AccountRepo>,
    pub progression: Arc<dyn ProgressionRepo>,
    pub quests: Arc<dyn QuestRepo>,
}

impl Repositories {
    /// All ports served by one store.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CatalogRepo + AccountRepo + ProgressionRepo + QuestRepo + 'static,
    {
        Self {
            catalog: store.clone(),
            accounts: store.clone(),
            progression: store.clone(),
            quests: store,
        }
    }
}

/// Container for all use cases.
pub struct UseCases {
    pub quests: use_cases::QuestUseCases,
    pub reconciliation: use_cases::ReconciliationUseCases,
    pub accounts: Arc<AccountHooks>,
    pub progression: use_cases::ProgressionUseCases,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        catalog: Arc<Catalog>,
        repositories: Repositories,
        clearance_policy: Arc<dyn IslandClearancePolicy>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        let locks = Arc::new(UserLocks::new());
        let ledger = Arc::new(ProgressionLedger::new(
            repositories.progression.clone(),
            clock.clone(),
        ));

        let status = Arc::new(QuestStatusQuery::new(
            catalog.clone(),
            repositories.quests.clone(),
            clock.clone(),
        ));
        let quests = use_cases::QuestUseCases::new(
            Arc::new(StartQuest::new(
                catalog.clone(),
                ledger.clone(),
                repositories.quests.clone(),
                locks.clone(),
                clock.clone(),
            )),
            Arc::new(CollectQuest::new(
                catalog.clone(),
                ledger.clone(),
                repositories.quests.clone(),
                clearance_policy,
                locks.clone(),
                clock.clone(),
            )),
            status.clone(),
        );

        let reconcile_user = Arc::new(ReconcileUser::new(catalog.clone(), ledger.clone()));
        let reconciliation = use_cases::ReconciliationUseCases::new(
            reconcile_user.clone(),
            Arc::new(ReconcileAll::new(
                repositories.accounts.clone(),
                reconcile_user.clone(),
            )),
        );

        let accounts = Arc::new(AccountHooks::new(
            repositories.accounts.clone(),
            reconcile_user,
            clock,
        ));

        let progression = use_cases::ProgressionUseCases::new(
            Arc::new(GetProgression::new(
                catalog.clone(),
                ledger,
                repositories.quests.clone(),
                status,
            )),
            Arc::new(QuestHistory::new(repositories.quests.clone())),
        );

        Self {
            catalog,
            repositories,
            use_cases: UseCases {
                quests,
                reconciliation,
                accounts,
                progression,
            },
            locks,
        }
    }
}
