//! Reading catalog documents from disk.

use std::path::Path;

use archipelago_domain::CatalogDocument;
use sha2::{Digest, Sha256};

/// Failure to obtain a catalog document.
#[derive(Debug, thiserror::Error)]
pub enum CatalogSourceError {
    #[error("Failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize catalog: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read and deserialize a JSON catalog document.
///
/// Only deserialization happens here; cross-reference validation is done by
/// `Catalog::from_document`.
pub async fn read_catalog_file(path: &Path) -> Result<CatalogDocument, CatalogSourceError> {
    let display = path.display().to_string();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| CatalogSourceError::Io {
            path: display.clone(),
            source,
        })?;

    serde_json::from_slice(&bytes).map_err(|source| CatalogSourceError::Parse {
        path: display,
        source,
    })
}

/// Hex SHA-256 of the document's canonical JSON form. Whitespace and key
/// order of the source file do not affect it.
pub fn checksum(document: &CatalogDocument) -> Result<String, CatalogSourceError> {
    let canonical = serde_json::to_vec(document)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}
