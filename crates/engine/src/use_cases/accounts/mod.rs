//! Account lifecycle hooks called by the external account service.
//!
//! Account creation and baseline progression are two phases. Registering
//! the account must succeed; the baseline grant is attempted right after
//! and, if it fails, is left to the next reconciliation pass.

use std::sync::Arc;

use archipelago_domain::UserId;
use serde::Serialize;

use crate::infrastructure::ports::{AccountRepo, ClockPort, RepoError};
use crate::use_cases::reconciliation::ReconcileUser;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BaselineStatus {
    /// Root island and crew member were granted now
    Granted,
    /// The account already held its baseline
    AlreadyPresent,
    /// Grant failed; reconciliation will heal it
    Deferred { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountCreated {
    pub user_id: UserId,
    pub newly_registered: bool,
    pub baseline: BaselineStatus,
}

pub struct AccountHooks {
    accounts: Arc<dyn AccountRepo>,
    reconcile_user: Arc<ReconcileUser>,
    clock: Arc<dyn ClockPort>,
}

impl AccountHooks {
    pub fn new(
        accounts: Arc<dyn AccountRepo>,
        reconcile_user: Arc<ReconcileUser>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            accounts,
            reconcile_user,
            clock,
        }
    }

    /// Register the account, then try to grant its baseline progression.
    ///
    /// Only a registration failure is an error.
    pub async fn on_account_created(&self, user_id: &UserId) -> Result<AccountCreated, RepoError> {
        let newly_registered = self.accounts.register(user_id, self.clock.now()).await?;

        let baseline = match self.reconcile_user.execute(user_id).await {
            Ok(repair) if repair.is_empty() => BaselineStatus::AlreadyPresent,
            Ok(_) => BaselineStatus::Granted,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Baseline progression grant failed, deferring to reconciliation"
                );
                BaselineStatus::Deferred {
                    reason: e.to_string(),
                }
            }
        };

        tracing::info!(user_id = %user_id, newly_registered, baseline = ?baseline, "Account registered");
        Ok(AccountCreated {
            user_id: user_id.clone(),
            newly_registered,
            baseline,
        })
    }

    /// Stop including the account in reconciliation passes.
    pub async fn deactivate(&self, user_id: &UserId) -> Result<(), RepoError> {
        self.accounts.deactivate(user_id).await?;
        tracing::info!(user_id = %user_id, "Account deactivated");
        Ok(())
    }
}
