//! Preventive care plans assigned by staff.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use carenest_api::{ApiError, ApiResponse, Envelope, Validator};
use carenest_auth::{AccessPolicy, BearerAuth, Caller, Operation, OwnerFilters};
use carenest_core::{
    CareStatus, CareType, EntityKind, Frequency, PreventiveCare, Priority, Timestamp, generate_id,
};
use carenest_storage::{Constraint, Filter, Query, typed};
use serde::Deserialize;

use super::{load_authorized, set_if};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;
use crate::validation;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(read).put(update).delete(remove))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreventiveCareQuery {
    pub care_type: Option<CareType>,
    pub status: Option<CareStatus>,
    pub priority: Option<Priority>,
    pub patient: Option<String>,
    pub doctor: Option<String>,
}

pub fn list_filter(
    policy: &AccessPolicy,
    caller: &Caller,
    query: &PreventiveCareQuery,
) -> Result<Filter, ApiError> {
    let owners = OwnerFilters {
        patient: query.patient.clone(),
        doctor: query.doctor.clone(),
    };
    let scope = policy.list_scope(caller, EntityKind::PreventiveCare, &owners)?;
    Ok(scope
        .and_maybe(query.care_type.map(|t| Constraint::eq("careType", t.as_str())))
        .and_maybe(query.status.map(|s| Constraint::eq("status", s.as_str())))
        .and_maybe(query.priority.map(|p| Constraint::eq("priority", p.as_str()))))
}

async fn list(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    ApiQuery(query): ApiQuery<PreventiveCareQuery>,
) -> Result<ApiResponse<Envelope<Vec<PreventiveCare>>>, ApiError> {
    let filter = list_filter(&state.policy, &auth.caller(), &query)?;
    let items = typed::find::<PreventiveCare>(
        state.store.as_ref(),
        &Query::new(filter).sort_desc("scheduledDate"),
    )
    .await?;
    Ok(ApiResponse::list(items))
}

async fn read(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
) -> Result<ApiResponse<Envelope<PreventiveCare>>, ApiError> {
    let item =
        load_authorized::<PreventiveCare>(&state, &auth.caller(), Operation::Read, &id).await?;
    Ok(ApiResponse::data(item))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePreventiveCare {
    pub patient: Option<String>,
    pub care_type: Option<CareType>,
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: Option<Timestamp>,
    pub priority: Option<Priority>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    pub notes: Option<String>,
    pub next_due_date: Option<Timestamp>,
    pub frequency: Option<Frequency>,
}

async fn create(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    ApiJson(body): ApiJson<CreatePreventiveCare>,
) -> Result<ApiResponse<Envelope<PreventiveCare>>, ApiError> {
    let caller = auth.caller();
    state
        .policy
        .authorize_create(&caller, EntityKind::PreventiveCare)
        .into_result()?;

    let mut v = Validator::new();
    validation::required_id(&mut v, "patient", "Patient", body.patient.as_deref());
    v.check(body.care_type.is_some(), "careType", "Invalid care type");
    validation::title(&mut v, &body.title);
    v.check(
        body.scheduled_date.is_some(),
        "scheduledDate",
        "Scheduled date is required",
    );
    v.finish()?;

    let now = Timestamp::now();
    let item = PreventiveCare {
        id: generate_id(),
        patient: body.patient.unwrap_or_default(),
        care_type: body.care_type.unwrap_or(CareType::HealthCheck),
        title: body.title.trim().to_string(),
        description: body.description,
        scheduled_date: body.scheduled_date.unwrap_or(now),
        completed_date: None,
        status: CareStatus::Scheduled,
        priority: body.priority.unwrap_or_default(),
        recommendations: body.recommendations,
        notes: body.notes,
        next_due_date: body.next_due_date,
        frequency: body.frequency.unwrap_or_default(),
        assigned_by: caller.id,
        created_at: now,
        updated_at: now,
    };
    let created = typed::insert(state.store.as_ref(), &item).await?;
    tracing::info!(
        item = %created.id,
        patient = %created.patient,
        care_type = %created.care_type,
        "preventive care assigned"
    );
    Ok(ApiResponse::created(created))
}

/// Mutable preventive care fields. `completedDate` is derived from `status`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreventiveCare {
    pub care_type: Option<CareType>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_date: Option<Timestamp>,
    pub status: Option<CareStatus>,
    pub priority: Option<Priority>,
    pub recommendations: Option<Vec<String>>,
    pub notes: Option<String>,
    pub next_due_date: Option<Timestamp>,
    pub frequency: Option<Frequency>,
}

impl UpdatePreventiveCare {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        if let Some(title) = &self.title {
            validation::title(&mut v, title);
        }
        v.finish()
    }

    fn apply(self, item: &mut PreventiveCare, now: Timestamp) {
        set_if(&mut item.care_type, self.care_type);
        set_if(&mut item.title, self.title.map(|t| t.trim().to_string()));
        if self.description.is_some() {
            item.description = self.description;
        }
        set_if(&mut item.scheduled_date, self.scheduled_date);
        if let Some(status) = self.status {
            item.set_status(status, now);
        }
        set_if(&mut item.priority, self.priority);
        set_if(&mut item.recommendations, self.recommendations);
        if self.notes.is_some() {
            item.notes = self.notes;
        }
        if self.next_due_date.is_some() {
            item.next_due_date = self.next_due_date;
        }
        set_if(&mut item.frequency, self.frequency);
    }
}

async fn update(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdatePreventiveCare>,
) -> Result<ApiResponse<Envelope<PreventiveCare>>, ApiError> {
    body.validate()?;
    let mut item =
        load_authorized::<PreventiveCare>(&state, &auth.caller(), Operation::Update, &id).await?;
    body.apply(&mut item, Timestamp::now());
    let updated = typed::replace(state.store.as_ref(), &item).await?;
    Ok(ApiResponse::data(updated))
}

async fn remove(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
) -> Result<ApiResponse<Envelope<()>>, ApiError> {
    load_authorized::<PreventiveCare>(&state, &auth.caller(), Operation::Delete, &id).await?;
    state.store.delete(EntityKind::PreventiveCare, &id).await?;
    tracing::info!(item = %id, by = %auth.user.id, "preventive care deleted");
    Ok(ApiResponse::message(
        "Preventive care record deleted successfully",
    ))
}
