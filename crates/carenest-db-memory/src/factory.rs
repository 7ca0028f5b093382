use std::sync::Arc;

use carenest_storage::{DynStore, EntityStore, StorageResult};
use serde::{Deserialize, Serialize};

use crate::InMemoryStore;

/// Supported storage backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps; contents are lost on exit.
    #[default]
    Memory,
}

/// Factory configuration to construct a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

/// Creates and opens a store for the configured backend.
///
/// The returned store is ready to serve; callers own the matching
/// [`EntityStore::close`] on shutdown.
pub async fn create_store(config: &StorageConfig) -> StorageResult<DynStore> {
    let store: DynStore = match config.backend {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
    };
    store.open().await?;
    tracing::info!(backend = store.backend_name(), "entity store opened");
    Ok(store)
}
