//! The contract every entity store backend implements.

use std::collections::BTreeMap;

use async_trait::async_trait;
use carenest_core::EntityKind;
use serde_json::Value;

use crate::error::StorageError;
use crate::query::{Filter, Query};

/// A document store holding one collection per [`EntityKind`].
///
/// Documents are JSON objects carrying a string `id`. Backends stamp
/// `createdAt` on insert and `updatedAt` on every write. Implementations must
/// be thread-safe (`Send + Sync`).
///
/// A store is opened once before serving and closed once on shutdown. It is
/// never reopened; calls made while it is not open fail with
/// [`StorageError::ConnectionError`].
///
/// # Example
///
/// ```ignore
/// use carenest_storage::{EntityStore, StorageError};
///
/// async fn load(store: &dyn EntityStore, id: &str) -> Result<Value, StorageError> {
///     store
///         .get(EntityKind::Appointment, id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("appointments", id))
/// }
/// ```
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ==================== Lifecycle ====================

    /// Opens the store. Fails if it has already been closed.
    async fn open(&self) -> Result<(), StorageError>;

    /// Closes the store. Later calls fail.
    async fn close(&self) -> Result<(), StorageError>;

    // ==================== CRUD Operations ====================

    /// Inserts a new document, generating an `id` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the id is taken.
    /// Returns `StorageError::UniqueViolation` if a value of one of
    /// [`EntityKind::unique_fields`] is held by another document. The check
    /// and the write are atomic.
    /// Returns `StorageError::InvalidDocument` if the document is not an object.
    async fn insert(&self, kind: EntityKind, document: Value) -> Result<Value, StorageError>;

    /// Reads a document by id. Returns `None` if it does not exist.
    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, StorageError>;

    /// Replaces an existing document wholesale. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document does not exist.
    /// Returns `StorageError::UniqueViolation` if the new document takes a
    /// unique value held by another document.
    async fn replace(
        &self,
        kind: EntityKind,
        id: &str,
        document: Value,
    ) -> Result<Value, StorageError>;

    /// Removes a document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the document does not exist.
    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), StorageError>;

    // ==================== Queries ====================

    /// Returns matching documents, sorted and capped as requested.
    async fn find(&self, kind: EntityKind, query: &Query) -> Result<Vec<Value>, StorageError>;

    /// Counts matching documents.
    async fn count(&self, kind: EntityKind, filter: &Filter) -> Result<u64, StorageError>;

    /// Counts matching documents grouped by the string value of `field`.
    /// Documents without the field are not counted.
    async fn count_by(
        &self,
        kind: EntityKind,
        filter: &Filter,
        field: &str,
    ) -> Result<BTreeMap<String, u64>, StorageError>;

    /// Short backend identifier for logs.
    fn backend_name(&self) -> &'static str;
}
