use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::catalog::models::{CardCatalog, CardsDocument};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid cards document: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct CardsStatus {
    pub count: usize,
    pub last_updated: Option<String>,
    pub has_data: bool,
}

/// Holds the live card catalog loaded from `cards.json`.
///
/// Readers get an `Arc` snapshot and never hold the lock while ranking. `reload` swaps the
/// snapshot only after the new document parsed successfully.
pub struct CardStore {
    path: PathBuf,
    snapshot: RwLock<Arc<CardCatalog>>,
}

impl CardStore {
    /// Loads the catalog at `path`. A missing or malformed file is logged and leaves the
    /// store empty so the API can still serve categories and chat.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let catalog = match read_document(&path).await {
            Ok(doc) => {
                info!("Loaded {} cards from {}", doc.cards.len(), path.display());
                CardCatalog::from(doc)
            }
            Err(e) => {
                warn!("{e}; starting with an empty card catalog");
                CardCatalog::default()
            }
        };

        Self::with_catalog(path, catalog)
    }

    pub fn with_catalog(path: impl Into<PathBuf>, catalog: CardCatalog) -> Self {
        Self {
            path: path.into(),
            snapshot: RwLock::new(Arc::new(catalog)),
        }
    }

    pub async fn current(&self) -> Arc<CardCatalog> {
        self.snapshot.read().await.clone()
    }

    /// Re-reads the cards document. On error the previous snapshot stays live.
    pub async fn reload(&self) -> Result<Arc<CardCatalog>, StoreError> {
        let doc = read_document(&self.path).await?;
        let catalog = Arc::new(CardCatalog::from(doc));

        *self.snapshot.write().await = catalog.clone();
        info!(
            "Reloaded {} cards from {}",
            catalog.len(),
            self.path.display()
        );

        Ok(catalog)
    }

    pub async fn status(&self) -> CardsStatus {
        let catalog = self.current().await;
        CardsStatus {
            count: catalog.len(),
            last_updated: catalog.last_updated().map(str::to_string),
            has_data: !catalog.is_empty(),
        }
    }
}

async fn read_document(path: &Path) -> Result<CardsDocument, StoreError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_str(&raw).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}
