//! Reconciliation - repair of per-user baseline progression.
//!
//! Every account must hold the root island and the root crew member. Both
//! are plain idempotent ledger unlocks, so a pass can run at any time,
//! concurrently with live traffic, as often as needed.

use std::sync::Arc;

use archipelago_domain::{Catalog, CrewMemberId, IslandId, UserId};
use serde::Serialize;

use crate::entities::ProgressionLedger;
use crate::infrastructure::ports::{AccountRepo, RepoError};

/// What a single-user reconciliation had to create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BaselineRepair {
    pub islands: Vec<IslandId>,
    pub crew: Vec<CrewMemberId>,
}

impl BaselineRepair {
    pub fn is_empty(&self) -> bool {
        self.islands.is_empty() && self.crew.is_empty()
    }
}

/// Ensure one user holds the baseline unlocks. Touches nothing else.
pub struct ReconcileUser {
    catalog: Arc<Catalog>,
    ledger: Arc<ProgressionLedger>,
}

impl ReconcileUser {
    pub fn new(catalog: Arc<Catalog>, ledger: Arc<ProgressionLedger>) -> Self {
        Self { catalog, ledger }
    }

    pub async fn execute(&self, user_id: &UserId) -> Result<BaselineRepair, RepoError> {
        let mut repair = BaselineRepair::default();

        let root_island = &self.catalog.root_island().id;
        if self.ledger.unlock_island(user_id, root_island).await? {
            repair.islands.push(root_island.clone());
        }

        let root_crew = &self.catalog.root_crew_member().id;
        if self.ledger.unlock_crew_member(user_id, root_crew).await? {
            repair.crew.push(root_crew.clone());
        }

        if !repair.is_empty() {
            tracing::info!(
                user_id = %user_id,
                islands = ?repair.islands,
                crew = ?repair.crew,
                "Baseline progression repaired"
            );
        }
        Ok(repair)
    }
}

/// Per-user result of a bulk pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Repaired {
        islands: Vec<IslandId>,
        crew: Vec<CrewMemberId>,
    },
    AlreadyConsistent,
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReconciliation {
    pub user_id: UserId,
    #[serde(flatten)]
    pub outcome: ReconcileOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub users: Vec<UserReconciliation>,
    pub repaired: usize,
    pub already_consistent: usize,
    pub failed: usize,
}

impl ReconciliationReport {
    fn record(&mut self, user_id: UserId, outcome: ReconcileOutcome) {
        match &outcome {
            ReconcileOutcome::Repaired { .. } => self.repaired += 1,
            ReconcileOutcome::AlreadyConsistent => self.already_consistent += 1,
            ReconcileOutcome::Failed { .. } => self.failed += 1,
        }
        self.users.push(UserReconciliation { user_id, outcome });
    }
}

/// Reconcile every active account. One user's failure never stops the pass.
pub struct ReconcileAll {
    accounts: Arc<dyn AccountRepo>,
    reconcile_user: Arc<ReconcileUser>,
}

impl ReconcileAll {
    pub fn new(accounts: Arc<dyn AccountRepo>, reconcile_user: Arc<ReconcileUser>) -> Self {
        Self {
            accounts,
            reconcile_user,
        }
    }

    /// Fails only if the account list itself cannot be read.
    pub async fn execute(&self) -> Result<ReconciliationReport, RepoError> {
        let users = self.accounts.list_active().await?;
        let mut report = ReconciliationReport::default();

        for user_id in users {
            let outcome = match self.reconcile_user.execute(&user_id).await {
                Ok(repair) if repair.is_empty() => ReconcileOutcome::AlreadyConsistent,
                Ok(BaselineRepair { islands, crew }) => ReconcileOutcome::Repaired { islands, crew },
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Reconciliation failed for user");
                    ReconcileOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            report.record(user_id, outcome);
        }

        tracing::info!(
            repaired = report.repaired,
            already_consistent = report.already_consistent,
            failed = report.failed,
            "Reconciliation pass finished"
        );
        Ok(report)
    }
}

/// Container for reconciliation use cases.
pub struct ReconciliationUseCases {
    pub user: Arc<ReconcileUser>,
    pub all: Arc<ReconcileAll>,
}

impl ReconciliationUseCases {
    pub fn new(user: Arc<ReconcileUser>, all: Arc<ReconcileAll>) -> Self {
        Self { user, all }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::memory::InMemoryStore;
    use crate::infrastructure::ports::{MockAccountRepo, MockProgressionRepo, ProgressionRepo};
    use crate::test_fixtures::{archipelago_catalog, crew, epoch, island, user};

    fn reconcilers(
        accounts: Arc<dyn AccountRepo>,
        progression: Arc<dyn ProgressionRepo>,
    ) -> (Arc<ReconcileUser>, ReconcileAll) {
        let ledger = Arc::new(ProgressionLedger::new(progression, Arc::new(FixedClock(epoch()))));
        let user_rec = Arc::new(ReconcileUser::new(archipelago_catalog(), ledger));
        let all = ReconcileAll::new(accounts, user_rec.clone());
        (user_rec, all)
    }

    #[tokio::test]
    async fn reconcile_user_grants_root_island_and_crew() {
        let store = Arc::new(InMemoryStore::new());
        let (reconcile_user, _) = reconcilers(store.clone(), store.clone());

        let repair = reconcile_user.execute(&user("u1")).await.unwrap();
        assert_eq!(repair.islands, vec![island("harbor")]);
        assert_eq!(repair.crew, vec![crew("captain")]);
        assert!(store
            .is_island_unlocked(&user("u1"), &island("harbor"))
            .await
            .unwrap());

        let again = reconcile_user.execute(&user("u1")).await.unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn reconcile_user_leaves_other_progress_alone() {
        let store = Arc::new(InMemoryStore::new());
        let (reconcile_user, _) = reconcilers(store.clone(), store.clone());
        store.add_currency(&user("u1"), 75u64.into()).await.unwrap();
        store
            .insert_crew_unlock(&archipelago_domain::CrewUnlock {
                user_id: user("u1"),
                crew_member_id: crew("navigator"),
                unlocked_at: epoch(),
            })
            .await
            .unwrap();

        reconcile_user.execute(&user("u1")).await.unwrap();

        assert_eq!(store.balance(&user("u1")).await.unwrap().amount(), 75);
        assert_eq!(store.crew_unlocks(&user("u1")).await.unwrap().len(), 2);
        assert_eq!(store.island_unlocks(&user("u1")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_pass_reports_zero_repairs() {
        let store = Arc::new(InMemoryStore::new());
        for id in ["a", "b", "c"] {
            store.register(&user(id), epoch()).await.unwrap();
        }
        let (reconcile_user, all) = reconcilers(store.clone(), store.clone());
        reconcile_user.execute(&user("b")).await.unwrap();

        let first = all.execute().await.unwrap();
        assert_eq!(first.repaired, 2);
        assert_eq!(first.already_consistent, 1);
        assert_eq!(first.failed, 0);

        let second = all.execute().await.unwrap();
        assert_eq!(second.repaired, 0);
        assert_eq!(second.already_consistent, 3);
    }

    #[tokio::test]
    async fn one_failing_user_does_not_stop_the_pass() {
        let mut accounts = MockAccountRepo::new();
        accounts
            .expect_list_active()
            .returning(|| Ok(vec![user("ok-1"), user("broken"), user("ok-2")]));

        let mut progression = MockProgressionRepo::new();
        progression
            .expect_insert_island_unlock()
            .withf(|unlock| unlock.user_id.as_str() == "broken")
            .returning(|_| Err(RepoError::database("insert_island_unlock", "locked")));
        progression
            .expect_insert_island_unlock()
            .returning(|_| Ok(true));
        progression
            .expect_insert_crew_unlock()
            .returning(|_| Ok(true));

        let (_, all) = reconcilers(Arc::new(accounts), Arc::new(progression));
        let report = all.execute().await.unwrap();

        assert_eq!(report.repaired, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.users.len(), 3);
        assert_eq!(report.users[1].user_id, user("broken"));
        assert!(matches!(report.users[1].outcome, ReconcileOutcome::Failed { .. }));
        assert!(matches!(report.users[2].outcome, ReconcileOutcome::Repaired { .. }));
    }

    #[tokio::test]
    async fn account_listing_failure_is_an_error() {
        let mut accounts = MockAccountRepo::new();
        accounts
            .expect_list_active()
            .returning(|| Err(RepoError::database("list_active_accounts", "gone")));

        let (_, all) = reconcilers(Arc::new(accounts), Arc::new(MockProgressionRepo::new()));
        assert!(all.execute().await.is_err());
    }
}
