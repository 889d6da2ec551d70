//! Repository port traits for database access.

use archipelago_domain::{
    ActiveQuest, CatalogDocument, CrewMemberId, CrewUnlock, Currency, IslandClearance, IslandId,
    IslandUnlock, QuestHistoryRecord, QuestInstanceId, QuestTemplateId, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepoError;
use super::types::{CatalogMarker, CollectionApplied, CollectionCommit};

// =============================================================================
// Catalog Storage
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// Marker for the catalog currently stored, if any.
    async fn marker(&self) -> Result<Option<CatalogMarker>, RepoError>;

    /// The stored catalog document, if any.
    async fn load(&self) -> Result<Option<CatalogDocument>, RepoError>;

    /// Replace every catalog table and the marker in one transaction.
    ///
    /// Destructive; intended for offline/initialization use.
    async fn replace(
        &self,
        document: &CatalogDocument,
        marker: &CatalogMarker,
    ) -> Result<(), RepoError>;
}

// =============================================================================
// Accounts (engine-side view of externally created accounts)
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// Register an account. Returns `true` if it was not known before.
    async fn register(
        &self,
        user_id: &UserId,
        registered_at: DateTime<Utc>,
    ) -> Result<bool, RepoError>;

    async fn deactivate(&self, user_id: &UserId) -> Result<(), RepoError>;

    /// Every active account, in registration order.
    async fn list_active(&self) -> Result<Vec<UserId>, RepoError>;
}

// =============================================================================
// Progression Ledger Storage
// =============================================================================

/// Per-user unlock records, clearances and currency balance.
///
/// Every insert is idempotent and reports whether a row was created.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressionRepo: Send + Sync {
    async fn insert_island_unlock(&self, unlock: &IslandUnlock) -> Result<bool, RepoError>;

    async fn insert_crew_unlock(&self, unlock: &CrewUnlock) -> Result<bool, RepoError>;

    async fn is_island_unlocked(
        &self,
        user_id: &UserId,
        island_id: &IslandId,
    ) -> Result<bool, RepoError>;

    async fn is_crew_unlocked(
        &self,
        user_id: &UserId,
        crew_member_id: &CrewMemberId,
    ) -> Result<bool, RepoError>;

    /// Island unlocks ordered by unlock time.
    async fn island_unlocks(&self, user_id: &UserId) -> Result<Vec<IslandUnlock>, RepoError>;

    /// Crew unlocks ordered by unlock time.
    async fn crew_unlocks(&self, user_id: &UserId) -> Result<Vec<CrewUnlock>, RepoError>;

    async fn clearances(&self, user_id: &UserId) -> Result<Vec<IslandClearance>, RepoError>;

    /// Add to the balance, saturating at the currency cap. Returns the new balance.
    async fn add_currency(&self, user_id: &UserId, amount: Currency)
        -> Result<Currency, RepoError>;

    async fn balance(&self, user_id: &UserId) -> Result<Currency, RepoError>;
}

// =============================================================================
// Quest Storage
// =============================================================================

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestRepo: Send + Sync {
    async fn active_for_user(&self, user_id: &UserId) -> Result<Vec<ActiveQuest>, RepoError>;

    async fn get_active(
        &self,
        user_id: &UserId,
        instance_id: QuestInstanceId,
    ) -> Result<Option<ActiveQuest>, RepoError>;

    /// Distinct templates with at least one active instance, for any user.
    async fn active_template_ids(&self) -> Result<Vec<QuestTemplateId>, RepoError>;

    /// Persist a new active instance with its crew assignments.
    ///
    /// Fails with `RepoError::ConstraintViolation` if any crew member is
    /// already assigned to another active instance of the same user.
    async fn insert_active(&self, quest: &ActiveQuest) -> Result<(), RepoError>;

    async fn has_history(
        &self,
        user_id: &UserId,
        template_id: &QuestTemplateId,
    ) -> Result<bool, RepoError>;

    /// History records, newest collection first.
    async fn history_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<QuestHistoryRecord>, RepoError>;

    /// Retire the instance and apply its rewards atomically.
    ///
    /// Fails with `RepoError::NotFound` (and writes nothing) if the
    /// instance is no longer active.
    async fn commit_collection(
        &self,
        commit: &CollectionCommit,
    ) -> Result<CollectionApplied, RepoError>;
}
