//! In-memory storage adapter.
//!
//! Implements every storage port over a single `tokio::sync::RwLock`. Each
//! port method takes the lock once, so multi-row writes such as a quest
//! collection are applied atomically just like the SQLite transactions.
//! Used by tests and by `STORE_BACKEND=memory`.

use std::collections::{HashMap, HashSet};

use archipelago_domain::{
    ActiveQuest, CatalogDocument, CrewMemberId, CrewUnlock, Currency, IslandClearance, IslandId,
    IslandUnlock, QuestHistoryRecord, QuestInstanceId, QuestTemplateId, Reward, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::infrastructure::ports::{
    AccountRepo, CatalogMarker, CatalogRepo, CollectionApplied, CollectionCommit, ProgressionRepo,
    QuestRepo, RepoError,
};

#[derive(Default)]
struct State {
    catalog: Option<(CatalogDocument, CatalogMarker)>,
    /// Registration order is preserved
    accounts: Vec<AccountEntry>,
    island_unlocks: HashMap<UserId, Vec<IslandUnlock>>,
    crew_unlocks: HashMap<UserId, Vec<CrewUnlock>>,
    clearances: HashMap<UserId, Vec<IslandClearance>>,
    balances: HashMap<UserId, Currency>,
    active: HashMap<QuestInstanceId, ActiveQuest>,
    history: Vec<QuestHistoryRecord>,
}

struct AccountEntry {
    user_id: UserId,
    active: bool,
}

impl State {
    fn unlock_island(&mut self, unlock: &IslandUnlock) -> bool {
        let unlocks = self.island_unlocks.entry(unlock.user_id.clone()).or_default();
        if unlocks.iter().any(|u| u.island_id == unlock.island_id) {
            return false;
        }
        unlocks.push(unlock.clone());
        true
    }

    fn unlock_crew(&mut self, unlock: &CrewUnlock) -> bool {
        let unlocks = self.crew_unlocks.entry(unlock.user_id.clone()).or_default();
        if unlocks
            .iter()
            .any(|u| u.crew_member_id == unlock.crew_member_id)
        {
            return false;
        }
        unlocks.push(unlock.clone());
        true
    }

    fn clear_island(&mut self, clearance: IslandClearance) -> bool {
        let cleared = self.clearances.entry(clearance.user_id.clone()).or_default();
        if cleared.iter().any(|c| c.island_id == clearance.island_id) {
            return false;
        }
        cleared.push(clearance);
        true
    }

    fn add_currency(&mut self, user_id: &UserId, amount: Currency) -> Currency {
        let balance = self.balances.entry(user_id.clone()).or_default();
        *balance = balance.saturating_add(amount);
        *balance
    }

    fn balance(&self, user_id: &UserId) -> Currency {
        self.balances.get(user_id).copied().unwrap_or_default()
    }
}

/// Process-local store implementing every storage port.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepo for InMemoryStore {
    async fn marker(&self) -> Result<Option<CatalogMarker>, RepoError> {
        let state = self.state.read().await;
        Ok(state.catalog.as_ref().map(|(_, marker)| marker.clone()))
    }

    async fn load(&self) -> Result<Option<CatalogDocument>, RepoError> {
        let state = self.state.read().await;
        Ok(state.catalog.as_ref().map(|(document, _)| document.clone()))
    }

    async fn replace(
        &self,
        document: &CatalogDocument,
        marker: &CatalogMarker,
    ) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        state.catalog = Some((document.clone(), marker.clone()));
        Ok(())
    }
}

#[async_trait]
impl AccountRepo for InMemoryStore {
    async fn register(
        &self,
        user_id: &UserId,
        _registered_at: DateTime<Utc>,
    ) -> Result<bool, RepoError> {
        let mut state = self.state.write().await;
        match state.accounts.iter_mut().find(|a| &a.user_id == user_id) {
            Some(entry) => {
                entry.active = true;
                Ok(false)
            }
            None => {
                state.accounts.push(AccountEntry {
                    user_id: user_id.clone(),
                    active: true,
                });
                Ok(true)
            }
        }
    }

    async fn deactivate(&self, user_id: &UserId) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        let entry = state
            .accounts
            .iter_mut()
            .find(|a| &a.user_id == user_id)
            .ok_or_else(|| RepoError::not_found("Account", user_id))?;
        entry.active = false;
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<UserId>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .iter()
            .filter(|a| a.active)
            .map(|a| a.user_id.clone())
            .collect())
    }
}

#[async_trait]
impl ProgressionRepo for InMemoryStore {
    async fn insert_island_unlock(&self, unlock: &IslandUnlock) -> Result<bool, RepoError> {
        Ok(self.state.write().await.unlock_island(unlock))
    }

    async fn insert_crew_unlock(&self, unlock: &CrewUnlock) -> Result<bool, RepoError> {
        Ok(self.state.write().await.unlock_crew(unlock))
    }

    async fn is_island_unlocked(
        &self,
        user_id: &UserId,
        island_id: &IslandId,
    ) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .island_unlocks
            .get(user_id)
            .is_some_and(|unlocks| unlocks.iter().any(|u| &u.island_id == island_id)))
    }

    async fn is_crew_unlocked(
        &self,
        user_id: &UserId,
        crew_member_id: &CrewMemberId,
    ) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .crew_unlocks
            .get(user_id)
            .is_some_and(|unlocks| unlocks.iter().any(|u| &u.crew_member_id == crew_member_id)))
    }

    async fn island_unlocks(&self, user_id: &UserId) -> Result<Vec<IslandUnlock>, RepoError> {
        let state = self.state.read().await;
        Ok(state.island_unlocks.get(user_id).cloned().unwrap_or_default())
    }

    async fn crew_unlocks(&self, user_id: &UserId) -> Result<Vec<CrewUnlock>, RepoError> {
        let state = self.state.read().await;
        Ok(state.crew_unlocks.get(user_id).cloned().unwrap_or_default())
    }

    async fn clearances(&self, user_id: &UserId) -> Result<Vec<IslandClearance>, RepoError> {
        let state = self.state.read().await;
        Ok(state.clearances.get(user_id).cloned().unwrap_or_default())
    }

    async fn add_currency(
        &self,
        user_id: &UserId,
        amount: Currency,
    ) -> Result<Currency, RepoError> {
        Ok(self.state.write().await.add_currency(user_id, amount))
    }

    async fn balance(&self, user_id: &UserId) -> Result<Currency, RepoError> {
        Ok(self.state.read().await.balance(user_id))
    }
}

#[async_trait]
impl QuestRepo for InMemoryStore {
    async fn active_for_user(&self, user_id: &UserId) -> Result<Vec<ActiveQuest>, RepoError> {
        let state = self.state.read().await;
        let mut quests: Vec<ActiveQuest> = state
            .active
            .values()
            .filter(|q| &q.user_id == user_id)
            .cloned()
            .collect();
        quests.sort_by_key(|q| q.started_at);
        Ok(quests)
    }

    async fn get_active(
        &self,
        user_id: &UserId,
        instance_id: QuestInstanceId,
    ) -> Result<Option<ActiveQuest>, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .active
            .get(&instance_id)
            .filter(|q| &q.user_id == user_id)
            .cloned())
    }

    async fn active_template_ids(&self) -> Result<Vec<QuestTemplateId>, RepoError> {
        let state = self.state.read().await;
        let mut ids: Vec<QuestTemplateId> = state
            .active
            .values()
            .map(|q| q.template_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn insert_active(&self, quest: &ActiveQuest) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.active.contains_key(&quest.id) {
            return Err(RepoError::constraint(format!(
                "Quest instance {} already exists",
                quest.id
            )));
        }

        let mut busy: HashSet<&CrewMemberId> = HashSet::new();
        for other in state.active.values().filter(|q| q.user_id == quest.user_id) {
            if other.template_id == quest.template_id {
                return Err(RepoError::constraint(format!(
                    "Quest {} already active for user {}",
                    quest.template_id, quest.user_id
                )));
            }
            busy.extend(other.crew.iter());
        }
        if let Some(crew) = quest.crew.iter().find(|c| busy.contains(c)) {
            return Err(RepoError::constraint(format!(
                "Crew member {} already assigned for user {}",
                crew, quest.user_id
            )));
        }

        state.active.insert(quest.id, quest.clone());
        Ok(())
    }

    async fn has_history(
        &self,
        user_id: &UserId,
        template_id: &QuestTemplateId,
    ) -> Result<bool, RepoError> {
        let state = self.state.read().await;
        Ok(state
            .history
            .iter()
            .any(|h| &h.user_id == user_id && &h.template_id == template_id))
    }

    async fn history_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<QuestHistoryRecord>, RepoError> {
        let state = self.state.read().await;
        let mut records: Vec<QuestHistoryRecord> = state
            .history
            .iter()
            .rev()
            .filter(|h| &h.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.collected_at.cmp(&a.collected_at));
        Ok(records)
    }

    async fn commit_collection(
        &self,
        commit: &CollectionCommit,
    ) -> Result<CollectionApplied, RepoError> {
        let mut state = self.state.write().await;
        let history = &commit.history;

        let owned = state
            .active
            .get(&history.instance_id)
            .is_some_and(|q| q.user_id == history.user_id);
        if !owned {
            return Err(RepoError::not_found("QuestInstance", history.instance_id));
        }
        state.active.remove(&history.instance_id);
        state.history.push(history.clone());

        let user_id = &history.user_id;
        let at = history.collected_at;
        let mut applied = CollectionApplied {
            balance: state.add_currency(user_id, history.reward),
            ..Default::default()
        };

        if let Some(grant) = &commit.clearance {
            applied.island_cleared = state.clear_island(IslandClearance {
                user_id: user_id.clone(),
                island_id: grant.island_id.clone(),
                cleared_at: at,
            });

            if applied.island_cleared {
                match &grant.reward {
                    Reward::Currency { amount } => {
                        applied.balance = state.add_currency(user_id, *amount);
                    }
                    Reward::CrewMember { crew_member_id } => {
                        let unlock = CrewUnlock {
                            user_id: user_id.clone(),
                            crew_member_id: crew_member_id.clone(),
                            unlocked_at: at,
                        };
                        if state.unlock_crew(&unlock) {
                            applied.unlocked_crew.push(crew_member_id.clone());
                        }
                    }
                }

                if let Some(next) = &grant.next_island {
                    let unlock = IslandUnlock {
                        user_id: user_id.clone(),
                        island_id: next.clone(),
                        unlocked_at: at,
                    };
                    if state.unlock_island(&unlock) {
                        applied.unlocked_islands.push(next.clone());
                    }
                }
            }
        }

        Ok(applied)
    }
}
