//! Progression ledger.
//!
//! Every mutation is an "ensure this fact holds" operation: applying it a
//! second time changes nothing and reports that nothing changed. Login
//! paths and the reconciliation sweep rely on this.

use std::collections::HashSet;
use std::sync::Arc;

use archipelago_domain::{
    CrewMemberId, CrewUnlock, Currency, IslandClearance, IslandId, IslandUnlock, Reward, UserId,
};
use serde::Serialize;

use crate::infrastructure::ports::{ClockPort, ProgressionRepo, RepoError};

/// Outcome of [`ProgressionLedger::grant_reward`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardGrant {
    Currency { balance: Currency },
    CrewMember {
        crew_member_id: CrewMemberId,
        newly_unlocked: bool,
    },
}

/// Per-user unlock records and balance.
pub struct ProgressionLedger {
    repo: Arc<dyn ProgressionRepo>,
    clock: Arc<dyn ClockPort>,
}

impl ProgressionLedger {
    pub fn new(repo: Arc<dyn ProgressionRepo>, clock: Arc<dyn ClockPort>) -> Self {
        Self { repo, clock }
    }

    /// Ensure `island_id` is unlocked. Returns `true` if this call unlocked it.
    pub async fn unlock_island(
        &self,
        user_id: &UserId,
        island_id: &IslandId,
    ) -> Result<bool, RepoError> {
        let unlock = IslandUnlock {
            user_id: user_id.clone(),
            island_id: island_id.clone(),
            unlocked_at: self.clock.now(),
        };
        let created = self.repo.insert_island_unlock(&unlock).await?;
        if created {
            tracing::info!(user_id = %user_id, island_id = %island_id, "Island unlocked");
        } else {
            tracing::debug!(user_id = %user_id, island_id = %island_id, "Island already unlocked");
        }
        Ok(created)
    }

    /// Ensure `crew_member_id` is unlocked. Returns `true` if this call unlocked it.
    pub async fn unlock_crew_member(
        &self,
        user_id: &UserId,
        crew_member_id: &CrewMemberId,
    ) -> Result<bool, RepoError> {
        let unlock = CrewUnlock {
            user_id: user_id.clone(),
            crew_member_id: crew_member_id.clone(),
            unlocked_at: self.clock.now(),
        };
        let created = self.repo.insert_crew_unlock(&unlock).await?;
        if created {
            tracing::info!(user_id = %user_id, crew_member_id = %crew_member_id, "Crew member unlocked");
        } else {
            tracing::debug!(
                user_id = %user_id,
                crew_member_id = %crew_member_id,
                "Crew member already unlocked"
            );
        }
        Ok(created)
    }

    /// Apply a reward. Currency saturates at the cap; crew rewards unlock.
    pub async fn grant_reward(
        &self,
        user_id: &UserId,
        reward: &Reward,
    ) -> Result<RewardGrant, RepoError> {
        match reward {
            Reward::Currency { amount } => {
                let balance = self.repo.add_currency(user_id, *amount).await?;
                if balance.is_capped() {
                    tracing::debug!(user_id = %user_id, "Balance at currency cap");
                }
                Ok(RewardGrant::Currency { balance })
            }
            Reward::CrewMember { crew_member_id } => {
                let newly_unlocked = self.unlock_crew_member(user_id, crew_member_id).await?;
                Ok(RewardGrant::CrewMember {
                    crew_member_id: crew_member_id.clone(),
                    newly_unlocked,
                })
            }
        }
    }

    pub async fn is_island_unlocked(
        &self,
        user_id: &UserId,
        island_id: &IslandId,
    ) -> Result<bool, RepoError> {
        self.repo.is_island_unlocked(user_id, island_id).await
    }

    pub async fn is_crew_unlocked(
        &self,
        user_id: &UserId,
        crew_member_id: &CrewMemberId,
    ) -> Result<bool, RepoError> {
        self.repo.is_crew_unlocked(user_id, crew_member_id).await
    }

    pub async fn balance(&self, user_id: &UserId) -> Result<Currency, RepoError> {
        self.repo.balance(user_id).await
    }

    pub async fn island_unlocks(&self, user_id: &UserId) -> Result<Vec<IslandUnlock>, RepoError> {
        self.repo.island_unlocks(user_id).await
    }

    pub async fn crew_unlocks(&self, user_id: &UserId) -> Result<Vec<CrewUnlock>, RepoError> {
        self.repo.crew_unlocks(user_id).await
    }

    pub async fn unlocked_island_ids(
        &self,
        user_id: &UserId,
    ) -> Result<HashSet<IslandId>, RepoError> {
        Ok(self
            .repo
            .island_unlocks(user_id)
            .await?
            .into_iter()
            .map(|u| u.island_id)
            .collect())
    }

    pub async fn clearances(&self, user_id: &UserId) -> Result<Vec<IslandClearance>, RepoError> {
        self.repo.clearances(user_id).await
    }

    pub async fn is_island_cleared(
        &self,
        user_id: &UserId,
        island_id: &IslandId,
    ) -> Result<bool, RepoError> {
        Ok(self
            .repo
            .clearances(user_id)
            .await?
            .iter()
            .any(|c| &c.island_id == island_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::memory::InMemoryStore;
    use crate::infrastructure::ports::MockProgressionRepo;
    use archipelago_domain::CURRENCY_CAP;
    use chrono::{TimeZone, Utc};

    fn ledger_over(repo: Arc<dyn ProgressionRepo>) -> ProgressionLedger {
        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        ));
        ProgressionLedger::new(repo, clock)
    }

    fn user() -> UserId {
        UserId::new("sailor-1").unwrap()
    }

    #[tokio::test]
    async fn unlock_island_twice_equals_once() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = ledger_over(store.clone());
        let harbor = IslandId::new("harbor").unwrap();

        assert!(ledger.unlock_island(&user(), &harbor).await.unwrap());
        let after_first = store.island_unlocks(&user()).await.unwrap();

        assert!(!ledger.unlock_island(&user(), &harbor).await.unwrap());
        assert_eq!(store.island_unlocks(&user()).await.unwrap(), after_first);
        assert!(ledger.is_island_unlocked(&user(), &harbor).await.unwrap());
    }

    #[tokio::test]
    async fn unlock_crew_twice_equals_once() {
        let store = Arc::new(InMemoryStore::new());
        let ledger = ledger_over(store.clone());
        let captain = CrewMemberId::new("captain").unwrap();

        assert!(ledger.unlock_crew_member(&user(), &captain).await.unwrap());
        assert!(!ledger.unlock_crew_member(&user(), &captain).await.unwrap());
        assert_eq!(store.crew_unlocks(&user()).await.unwrap().len(), 1);
        assert!(ledger.is_crew_unlocked(&user(), &captain).await.unwrap());
    }

    #[tokio::test]
    async fn currency_grants_saturate_at_cap() {
        let ledger = ledger_over(Arc::new(InMemoryStore::new()));
        let big = Reward::currency(400_000_000);

        for _ in 0..2 {
            ledger.grant_reward(&user(), &big).await.unwrap();
        }
        let grant = ledger.grant_reward(&user(), &big).await.unwrap();
        assert_eq!(
            grant,
            RewardGrant::Currency {
                balance: Currency::new(CURRENCY_CAP)
            }
        );

        ledger
            .grant_reward(&user(), &Reward::currency(u64::MAX))
            .await
            .unwrap();
        assert_eq!(ledger.balance(&user()).await.unwrap().amount(), CURRENCY_CAP);
    }

    #[tokio::test]
    async fn crew_reward_unlocks_once() {
        let ledger = ledger_over(Arc::new(InMemoryStore::new()));
        let reward = Reward::crew_member(CrewMemberId::new("navigator").unwrap());

        let first = ledger.grant_reward(&user(), &reward).await.unwrap();
        let second = ledger.grant_reward(&user(), &reward).await.unwrap();

        assert!(matches!(first, RewardGrant::CrewMember { newly_unlocked: true, .. }));
        assert!(matches!(second, RewardGrant::CrewMember { newly_unlocked: false, .. }));
    }

    #[tokio::test]
    async fn storage_errors_propagate() {
        let mut repo = MockProgressionRepo::new();
        repo.expect_insert_island_unlock()
            .returning(|_| Err(RepoError::database("insert_island_unlock", "disk full")));

        let ledger = ledger_over(Arc::new(repo));
        let err = ledger
            .unlock_island(&user(), &IslandId::new("harbor").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Database { .. }));
    }
}
