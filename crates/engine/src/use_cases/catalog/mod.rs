//! Catalog sync and load.
//!
//! The catalog is seeded from a JSON document before first use. Each stored
//! catalog carries a marker (document version, checksum, load time) so a
//! restart can tell whether the file on disk matches what is stored.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use archipelago_domain::{Catalog, CatalogDocument, ConfigurationError, QuestTemplateId};
use serde::Serialize;

use crate::infrastructure::catalog_source::{self, CatalogSourceError};
use crate::infrastructure::config::CatalogSyncMode;
use crate::infrastructure::ports::{CatalogMarker, CatalogRepo, ClockPort, QuestRepo, RepoError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogSyncError {
    #[error("Invalid catalog: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Source(#[from] CatalogSourceError),

    #[error("Catalog storage error: {0}")]
    Repo(#[from] RepoError),

    #[error("No catalog is stored and no catalog file was configured")]
    Missing,

    #[error("Replacement catalog drops quests that are still active: {0:?}")]
    TemplatesInUse(Vec<QuestTemplateId>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Store was empty; document written
    Loaded { version: u32 },
    /// Existing catalog rewritten
    Replaced { previous_version: u32, version: u32 },
    /// Existing catalog kept
    Skipped {
        stored_version: u32,
        /// Document on disk differs from what is stored
        drift: bool,
    },
}

/// Write a catalog document into storage.
///
/// A replacement may not remove a quest template that any user still has
/// an active instance of.
pub struct SyncCatalog {
    repo: Arc<dyn CatalogRepo>,
    quests: Arc<dyn QuestRepo>,
    clock: Arc<dyn ClockPort>,
}

impl SyncCatalog {
    pub fn new(
        repo: Arc<dyn CatalogRepo>,
        quests: Arc<dyn QuestRepo>,
        clock: Arc<dyn ClockPort>,
    ) -> Self {
        Self {
            repo,
            quests,
            clock,
        }
    }

    /// Read `path`, validate it, then sync it according to `mode`.
    pub async fn from_file(
        &self,
        path: &Path,
        mode: CatalogSyncMode,
    ) -> Result<SyncOutcome, CatalogSyncError> {
        let document = catalog_source::read_catalog_file(path).await?;
        self.execute(document, mode).await
    }

    /// Validate the document fully before touching storage.
    pub async fn execute(
        &self,
        document: CatalogDocument,
        mode: CatalogSyncMode,
    ) -> Result<SyncOutcome, CatalogSyncError> {
        let document = Catalog::from_document(document)?.to_document();
        let checksum = catalog_source::checksum(&document)?;

        let existing = self.repo.marker().await?;
        if let (Some(stored), CatalogSyncMode::SkipIfPresent) = (&existing, mode) {
            let drift = stored.checksum != checksum;
            if drift {
                tracing::warn!(
                    stored_version = stored.version,
                    file_version = document.version,
                    "Catalog file differs from stored catalog; keeping stored catalog"
                );
            } else {
                tracing::debug!(version = stored.version, "Stored catalog is up to date");
            }
            return Ok(SyncOutcome::Skipped {
                stored_version: stored.version,
                drift,
            });
        }

        if existing.is_some() {
            self.ensure_active_templates_kept(&document).await?;
        }

        let marker = CatalogMarker {
            version: document.version,
            checksum,
            loaded_at: self.clock.now(),
        };
        self.repo.replace(&document, &marker).await?;

        let outcome = match existing {
            Some(previous) => SyncOutcome::Replaced {
                previous_version: previous.version,
                version: marker.version,
            },
            None => SyncOutcome::Loaded {
                version: marker.version,
            },
        };
        tracing::info!(outcome = ?outcome, "Catalog synced");
        Ok(outcome)
    }

    async fn ensure_active_templates_kept(
        &self,
        document: &CatalogDocument,
    ) -> Result<(), CatalogSyncError> {
        let kept: HashSet<&QuestTemplateId> = document.quests.iter().map(|q| &q.id).collect();
        let dropped: Vec<QuestTemplateId> = self
            .quests
            .active_template_ids()
            .await?
            .into_iter()
            .filter(|id| !kept.contains(id))
            .collect();
        if dropped.is_empty() {
            return Ok(());
        }
        tracing::error!(dropped = ?dropped, "Catalog replacement would orphan active quests");
        Err(CatalogSyncError::TemplatesInUse(dropped))
    }
}

/// Build the runtime catalog from storage.
pub struct LoadCatalog {
    repo: Arc<dyn CatalogRepo>,
}

impl LoadCatalog {
    pub fn new(repo: Arc<dyn CatalogRepo>) -> Self {
        Self { repo }
    }

    /// Any integrity problem is a [`ConfigurationError`]; startup must abort.
    pub async fn execute(&self) -> Result<Arc<Catalog>, CatalogSyncError> {
        let document = self.repo.load().await?.ok_or(CatalogSyncError::Missing)?;
        let catalog = Catalog::from_document(document)?;
        tracing::info!(
            version = catalog.version(),
            islands = catalog.graph().chain().len(),
            root_island = %catalog.root_island().id,
            "Catalog loaded"
        );
        Ok(Arc::new(catalog))
    }
}
