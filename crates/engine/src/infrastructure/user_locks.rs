//! Per-user lock registry.
//!
//! Quest start and collect read the user's state, check preconditions and
//! then write. Holding the user's guard across that sequence makes it
//! serializable per user while different users proceed in parallel.

use std::sync::Arc;

use archipelago_domain::UserId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s progression state.
    pub async fn acquire(&self, user_id: &UserId) -> OwnedMutexGuard<()> {
        // Clone the Arc so no map shard stays locked across the await
        let lock = self.locks.entry(user_id.clone()).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop entries nobody holds or waits on. Returns how many were removed.
    pub fn prune_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
