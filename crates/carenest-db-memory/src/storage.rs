use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use async_trait::async_trait;
use carenest_core::{EntityKind, Timestamp, generate_id};
use carenest_storage::{EntityStore, Filter, Query, StorageError};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

use crate::matcher::{Matcher, compare_by, lookup};

const STATE_NEW: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_CLOSED: u8 = 2;

#[derive(Debug, Clone)]
struct Stored {
    /// Insertion sequence; the baseline order for queries.
    seq: u64,
    document: Value,
}

#[derive(Debug, Default)]
struct Collections {
    users: DashMap<String, Stored>,
    patients: DashMap<String, Stored>,
    appointments: DashMap<String, Stored>,
    health_records: DashMap<String, Stored>,
    preventive_care: DashMap<String, Stored>,
}

impl Collections {
    fn of(&self, kind: EntityKind) -> &DashMap<String, Stored> {
        match kind {
            EntityKind::User => &self.users,
            EntityKind::Patient => &self.patients,
            EntityKind::Appointment => &self.appointments,
            EntityKind::HealthRecord => &self.health_records,
            EntityKind::PreventiveCare => &self.preventive_care,
        }
    }
}

/// `(collection, field, value)` of a unique field.
type UniqueKey = (EntityKind, &'static str, String);

/// Process-local document store.
///
/// Values of [`EntityKind::unique_fields`] are claimed in a shared index
/// before a document becomes visible. A collection shard is always locked
/// before the index, never the reverse.
#[derive(Debug)]
pub struct InMemoryStore {
    collections: Collections,
    /// Unique value -> id of the document holding it.
    unique: DashMap<UniqueKey, String>,
    next_seq: AtomicU64,
    state: AtomicU8,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an unopened store.
    pub fn new() -> Self {
        Self {
            collections: Collections::default(),
            unique: DashMap::new(),
            next_seq: AtomicU64::new(0),
            state: AtomicU8::new(STATE_NEW),
        }
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        match self.state.load(Ordering::Acquire) {
            STATE_OPEN => Ok(()),
            STATE_CLOSED => Err(StorageError::connection_error("store is closed")),
            _ => Err(StorageError::connection_error("store is not open")),
        }
    }

    /// Claims `values` for document `id`, all or nothing.
    fn claim(
        &self,
        kind: EntityKind,
        id: &str,
        values: &[(&'static str, String)],
    ) -> Result<(), StorageError> {
        for (i, (field, value)) in values.iter().enumerate() {
            let taken = match self.unique.entry((kind, *field, value.clone())) {
                Entry::Occupied(owner) => owner.get() != id,
                Entry::Vacant(slot) => {
                    slot.insert(id.to_string());
                    false
                }
            };
            if taken {
                self.release(kind, id, &values[..i]);
                return Err(StorageError::unique_violation(
                    kind.collection(),
                    *field,
                    value.clone(),
                ));
            }
        }
        Ok(())
    }

    fn release(&self, kind: EntityKind, id: &str, values: &[(&'static str, String)]) {
        for (field, value) in values {
            self.unique
                .remove_if(&(kind, *field, value.clone()), |_, owner| owner == id);
        }
    }

    /// Snapshot of matching documents in insertion order.
    fn matching(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Stored>, StorageError> {
        self.ensure_open()?;
        let matcher = Matcher::compile(filter)?;
        let mut rows: Vec<Stored> = self
            .collections
            .of(kind)
            .iter()
            .filter(|entry| matcher.matches(&entry.value().document))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|row| row.seq);
        Ok(rows)
    }
}

fn unique_values(kind: EntityKind, document: &Value) -> Vec<(&'static str, String)> {
    kind.unique_fields()
        .iter()
        .filter_map(|field| {
            document
                .get(*field)
                .and_then(Value::as_str)
                .map(|value| (*field, value.to_string()))
        })
        .collect()
}

fn as_object(
    document: &mut Value,
) -> Result<&mut serde_json::Map<String, Value>, StorageError> {
    document
        .as_object_mut()
        .ok_or_else(|| StorageError::invalid_document("document must be a JSON object"))
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn open(&self) -> Result<(), StorageError> {
        self.state
            .compare_exchange(STATE_NEW, STATE_OPEN, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .or_else(|state| match state {
                STATE_OPEN => Ok(()),
                _ => Err(StorageError::connection_error(
                    "store was closed and cannot be reopened",
                )),
            })
    }

    async fn close(&self) -> Result<(), StorageError> {
        let previous = self.state.swap(STATE_CLOSED, Ordering::AcqRel);
        if previous == STATE_OPEN {
            tracing::info!("in-memory store closed");
        }
        Ok(())
    }

    async fn insert(&self, kind: EntityKind, mut document: Value) -> Result<Value, StorageError> {
        self.ensure_open()?;
        let now = Value::String(Timestamp::now().to_string());
        let object = as_object(&mut document)?;

        let id = match object.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_id(),
        };
        object.insert("id".into(), Value::String(id.clone()));
        if !object.contains_key("createdAt") {
            object.insert("createdAt".into(), now.clone());
        }
        object.insert("updatedAt".into(), now);

        let collection = self.collections.of(kind);
        match collection.entry(id.clone()) {
            Entry::Occupied(_) => {
                Err(StorageError::already_exists(kind.collection(), id))
            }
            Entry::Vacant(slot) => {
                self.claim(kind, &id, &unique_values(kind, &document))?;
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Stored {
                    seq,
                    document: document.clone(),
                });
                Ok(document)
            }
        }
    }

    async fn get(&self, kind: EntityKind, id: &str) -> Result<Option<Value>, StorageError> {
        self.ensure_open()?;
        Ok(self
            .collections
            .of(kind)
            .get(id)
            .map(|entry| entry.document.clone()))
    }

    async fn replace(
        &self,
        kind: EntityKind,
        id: &str,
        mut document: Value,
    ) -> Result<Value, StorageError> {
        self.ensure_open()?;
        let collection = self.collections.of(kind);
        let mut entry = collection
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(kind.collection(), id))?;

        let object = as_object(&mut document)?;
        object.insert("id".into(), Value::String(id.to_string()));
        if let Some(created) = entry.document.get("createdAt") {
            object.insert("createdAt".into(), created.clone());
        }
        object.insert(
            "updatedAt".into(),
            Value::String(Timestamp::now().to_string()),
        );

        let held = unique_values(kind, &entry.document);
        let wanted = unique_values(kind, &document);
        let fresh: Vec<_> = wanted.iter().filter(|v| !held.contains(v)).cloned().collect();
        let stale: Vec<_> = held.into_iter().filter(|v| !wanted.contains(v)).collect();
        self.claim(kind, id, &fresh)?;
        self.release(kind, id, &stale);

        entry.document = document.clone();
        Ok(document)
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), StorageError> {
        self.ensure_open()?;
        let (_, removed) = self
            .collections
            .of(kind)
            .remove(id)
            .ok_or_else(|| StorageError::not_found(kind.collection(), id))?;
        self.release(kind, id, &unique_values(kind, &removed.document));
        Ok(())
    }

    async fn find(&self, kind: EntityKind, query: &Query) -> Result<Vec<Value>, StorageError> {
        let mut documents: Vec<Value> = self
            .matching(kind, &query.filter)?
            .into_iter()
            .map(|row| row.document)
            .collect();
        if !query.sort.is_empty() {
            // Stable sort keeps insertion order among ties.
            documents.sort_by(|a, b| compare_by(&query.sort, a, b));
        }
        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }
        Ok(documents)
    }

    async fn count(&self, kind: EntityKind, filter: &Filter) -> Result<u64, StorageError> {
        Ok(self.matching(kind, filter)?.len() as u64)
    }

    async fn count_by(
        &self,
        kind: EntityKind,
        filter: &Filter,
        field: &str,
    ) -> Result<BTreeMap<String, u64>, StorageError> {
        let mut groups = BTreeMap::new();
        for row in self.matching(kind, filter)? {
            let key = match lookup(&row.document, field) {
                Some(Value::String(s)) => s.clone(),
                Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
                _ => continue,
            };
            *groups.entry(key).or_insert(0) += 1;
        }
        Ok(groups)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carenest_storage::Constraint;
    use serde_json::json;

    async fn open_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.open().await.unwrap();
        store
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let store = open_store().await;
        let doc = store
            .insert(EntityKind::User, json!({ "name": "Dana" }))
            .await
            .unwrap();
        let id = doc["id"].as_str().unwrap();
        assert!(!id.is_empty());
        assert!(doc["createdAt"].is_string());
        assert!(doc["updatedAt"].is_string());

        let fetched = store.get(EntityKind::User, id).await.unwrap().unwrap();
        assert_eq!(fetched, doc);
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id_and_non_objects() {
        let store = open_store().await;
        store
            .insert(EntityKind::User, json!({ "id": "u1" }))
            .await
            .unwrap();
        let err = store
            .insert(EntityKind::User, json!({ "id": "u1" }))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));

        let err = store
            .insert(EntityKind::User, json!(["not", "an", "object"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidDocument { .. }));
    }

    #[tokio::test]
    async fn unique_fields_hold_one_value_per_collection() {
        let store = open_store().await;
        store
            .insert(EntityKind::User, json!({ "id": "u1", "email": "pat@example.com" }))
            .await
            .unwrap();
        let err = store
            .insert(EntityKind::User, json!({ "id": "u2", "email": "pat@example.com" }))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UniqueViolation { ref field, .. } if field == "email"));
        assert!(store.get(EntityKind::User, "u2").await.unwrap().is_none());

        // The same value in a collection without the rule is fine.
        store
            .insert(EntityKind::Appointment, json!({ "email": "pat@example.com" }))
            .await
            .unwrap();

        // Deleting frees the value.
        store.delete(EntityKind::User, "u1").await.unwrap();
        store
            .insert(EntityKind::User, json!({ "id": "u3", "email": "pat@example.com" }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn replace_moves_unique_claims() {
        let store = open_store().await;
        for (id, email) in [("u1", "a@example.com"), ("u2", "b@example.com")] {
            store
                .insert(EntityKind::User, json!({ "id": id, "email": email }))
                .await
                .unwrap();
        }

        // Keeping its own value is not a conflict.
        store
            .replace(EntityKind::User, "u1", json!({ "email": "a@example.com", "name": "A" }))
            .await
            .unwrap();

        let err = store
            .replace(EntityKind::User, "u1", json!({ "email": "b@example.com" }))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        let kept = store.get(EntityKind::User, "u1").await.unwrap().unwrap();
        assert_eq!(kept["email"], "a@example.com");

        store
            .replace(EntityKind::User, "u1", json!({ "email": "c@example.com" }))
            .await
            .unwrap();
        store
            .insert(EntityKind::User, json!({ "id": "u4", "email": "a@example.com" }))
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_claim_a_unique_value_once() {
        let store = std::sync::Arc::new(open_store().await);
        let attempts: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert(EntityKind::Patient, json!({ "userId": "u1" }))
                        .await
                })
            })
            .collect();

        let mut stored = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => stored += 1,
                Err(err) => assert!(err.is_conflict()),
            }
        }
        assert_eq!(stored, 1);
        assert_eq!(
            store
                .count(EntityKind::Patient, &Filter::from(Constraint::eq("userId", "u1")))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = open_store().await;
        store
            .insert(EntityKind::Appointment, json!({ "id": "x" }))
            .await
            .unwrap();
        assert!(store.get(EntityKind::HealthRecord, "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_keeps_created_at_and_id() {
        let store = open_store().await;
        let created = store
            .insert(
                EntityKind::Appointment,
                json!({ "id": "a1", "status": "scheduled", "createdAt": "2024-01-01T00:00:00Z" }),
            )
            .await
            .unwrap();
        let replaced = store
            .replace(
                EntityKind::Appointment,
                "a1",
                json!({ "id": "other", "status": "cancelled" }),
            )
            .await
            .unwrap();
        assert_eq!(replaced["id"], "a1");
        assert_eq!(replaced["status"], "cancelled");
        assert_eq!(replaced["createdAt"], created["createdAt"]);

        let err = store
            .replace(EntityKind::Appointment, "missing", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_removes_and_reports_missing() {
        let store = open_store().await;
        store
            .insert(EntityKind::HealthRecord, json!({ "id": "h1" }))
            .await
            .unwrap();
        store.delete(EntityKind::HealthRecord, "h1").await.unwrap();
        assert!(store.get(EntityKind::HealthRecord, "h1").await.unwrap().is_none());
        assert!(matches!(
            store.delete(EntityKind::HealthRecord, "h1").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn find_filters_sorts_and_limits() {
        let store = open_store().await;
        for (id, patient, date) in [
            ("1", "p1", "2024-03-01T00:00:00Z"),
            ("2", "p2", "2024-01-01T00:00:00Z"),
            ("3", "p1", "2024-02-01T00:00:00Z"),
            ("4", "p1", "2024-04-01T00:00:00Z"),
        ] {
            store
                .insert(
                    EntityKind::HealthRecord,
                    json!({ "id": id, "patient": patient, "date": date }),
                )
                .await
                .unwrap();
        }

        let query = Query::new(Filter::from(Constraint::eq("patient", "p1")))
            .sort_asc("date")
            .limit(2);
        let ids: Vec<_> = store
            .find(EntityKind::HealthRecord, &query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["3", "1"]);
    }

    #[tokio::test]
    async fn unsorted_find_keeps_insertion_order() {
        let store = open_store().await;
        for id in ["c", "a", "b"] {
            store
                .insert(EntityKind::User, json!({ "id": id }))
                .await
                .unwrap();
        }
        let ids: Vec<_> = store
            .find(EntityKind::User, &Query::default())
            .await
            .unwrap()
            .into_iter()
            .map(|d| d["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn count_and_group_counts() {
        let store = open_store().await;
        for (status, kind) in [
            ("scheduled", "checkup"),
            ("scheduled", "consultation"),
            ("completed", "checkup"),
        ] {
            store
                .insert(
                    EntityKind::Appointment,
                    json!({ "patient": "p1", "status": status, "type": kind }),
                )
                .await
                .unwrap();
        }
        let scope = Filter::from(Constraint::eq("patient", "p1"));
        assert_eq!(store.count(EntityKind::Appointment, &scope).await.unwrap(), 3);

        let by_status = store
            .count_by(EntityKind::Appointment, &scope, "status")
            .await
            .unwrap();
        assert_eq!(by_status.get("scheduled"), Some(&2));
        assert_eq!(by_status.get("completed"), Some(&1));

        let by_type = store
            .count_by(EntityKind::Appointment, &Filter::new(), "type")
            .await
            .unwrap();
        assert_eq!(by_type.get("checkup"), Some(&2));
    }

    #[tokio::test]
    async fn lifecycle_is_open_once_close_once() {
        let store = InMemoryStore::new();
        let err = store.get(EntityKind::User, "u").await.unwrap_err();
        assert!(matches!(err, StorageError::ConnectionError { .. }));

        store.open().await.unwrap();
        store.open().await.unwrap();
        store.close().await.unwrap();

        assert!(store.get(EntityKind::User, "u").await.is_err());
        assert!(store.open().await.is_err());
    }
}
