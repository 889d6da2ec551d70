//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific domain area.
//! Use cases orchestrate across entity modules to fulfill user stories.

pub mod accounts;
pub mod catalog;
pub mod progression;
pub mod quests;
pub mod reconciliation;

// Re-export main types
pub use accounts::AccountHooks;
pub use catalog::{CatalogSyncError, LoadCatalog, SyncCatalog, SyncOutcome};
pub use progression::{GetProgression, ProgressionSnapshot, ProgressionUseCases, QuestHistory};
pub use quests::{PreconditionViolation, QuestError, QuestUseCases};
pub use reconciliation::{ReconcileAll, ReconcileUser, ReconciliationReport, ReconciliationUseCases};
