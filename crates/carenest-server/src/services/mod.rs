//! Entity services: one module per collection.
//!
//! Each module exposes a `router()` plus the `list_filter` its list endpoint
//! uses, so aggregation and search can reuse the exact same scoping.

pub mod accounts;
pub mod appointments;
pub mod health_records;
pub mod patients;
pub mod preventive_care;
pub mod users;

use carenest_api::ApiError;
use carenest_auth::{Caller, Guarded, Operation};
use carenest_core::{Entity, EntityKind, Timestamp};
use carenest_storage::{Constraint, typed};

use crate::state::AppState;

fn not_found_message(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => "User not found",
        EntityKind::Patient => "Patient not found",
        EntityKind::Appointment => "Appointment not found",
        EntityKind::HealthRecord => "Health record not found",
        EntityKind::PreventiveCare => "Preventive care record not found",
    }
}

/// Loads a record by id, or 404.
pub(crate) async fn load<T: Entity>(state: &AppState, id: &str) -> Result<T, ApiError> {
    typed::get::<T>(state.store.as_ref(), id)
        .await?
        .ok_or_else(|| ApiError::not_found(not_found_message(T::KIND)))
}

/// Loads a record and checks the caller may perform `operation` on it.
/// A missing record is a 404 regardless of who asks.
pub(crate) async fn load_authorized<T: Entity + Guarded>(
    state: &AppState,
    caller: &Caller,
    operation: Operation,
    id: &str,
) -> Result<T, ApiError> {
    let record = load::<T>(state, id).await?;
    state
        .policy
        .authorize(caller, operation, &record)
        .into_result()?;
    Ok(record)
}

/// Inclusive `[start, end]` window on `field`, when either end is given.
pub(crate) fn date_range(
    field: &str,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
) -> Option<Constraint> {
    (start.is_some() || end.is_some()).then(|| Constraint::between(field, start, end))
}

/// Replaces `target` when `value` is present.
pub(crate) fn set_if<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}
