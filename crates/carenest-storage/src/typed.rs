//! Typed access on top of the JSON document contract.
//!
//! These helpers convert between an [`Entity`] and its stored document so
//! services never handle raw `Value`s.

use carenest_core::Entity;
use serde_json::Value;

use crate::error::StorageError;
use crate::query::{Filter, Query};
use crate::traits::EntityStore;

fn to_document<T: Entity>(entity: &T) -> Result<Value, StorageError> {
    Ok(serde_json::to_value(entity)?)
}

fn from_document<T: Entity>(document: Value) -> Result<T, StorageError> {
    serde_json::from_value(document).map_err(|e| {
        StorageError::invalid_document(format!(
            "stored {} document does not decode: {e}",
            T::KIND.collection()
        ))
    })
}

pub async fn insert<T: Entity>(store: &dyn EntityStore, entity: &T) -> Result<T, StorageError> {
    let stored = store.insert(T::KIND, to_document(entity)?).await?;
    from_document(stored)
}

pub async fn get<T: Entity>(store: &dyn EntityStore, id: &str) -> Result<Option<T>, StorageError> {
    store
        .get(T::KIND, id)
        .await?
        .map(from_document)
        .transpose()
}

pub async fn replace<T: Entity>(store: &dyn EntityStore, entity: &T) -> Result<T, StorageError> {
    let stored = store
        .replace(T::KIND, entity.id(), to_document(entity)?)
        .await?;
    from_document(stored)
}

pub async fn find<T: Entity>(store: &dyn EntityStore, query: &Query) -> Result<Vec<T>, StorageError> {
    store
        .find(T::KIND, query)
        .await?
        .into_iter()
        .map(from_document)
        .collect()
}

/// First document matching `filter`, in storage order.
pub async fn find_one<T: Entity>(
    store: &dyn EntityStore,
    filter: Filter,
) -> Result<Option<T>, StorageError> {
    let mut found = find::<T>(store, &Query::new(filter).limit(1)).await?;
    Ok(found.pop())
}
