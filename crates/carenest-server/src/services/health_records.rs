//! Health records: clinical observations written by staff.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use carenest_api::{ApiError, ApiResponse, Envelope, Validator};
use carenest_auth::{AccessPolicy, BearerAuth, Caller, Operation, OwnerFilters};
use carenest_core::{
    Attachment, EntityKind, HealthRecord, LabResults, RecordType, Timestamp, VitalSigns,
    generate_id,
};
use carenest_storage::{Constraint, Filter, Query, typed};
use serde::Deserialize;

use super::{date_range, load_authorized, set_if};
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
pub struct HealthRecordQuery {
    pub record_type: Option<RecordType>,
    pub patient: Option<String>,
    pub doctor: Option<String>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}

pub fn list_filter(
    policy: &AccessPolicy,
    caller: &Caller,
    query: &HealthRecordQuery,
) -> Result<Filter, ApiError> {
    let owners = OwnerFilters {
        patient: query.patient.clone(),
        doctor: query.doctor.clone(),
    };
    let scope = policy.list_scope(caller, EntityKind::HealthRecord, &owners)?;
    Ok(scope
        .and_maybe(
            query
                .record_type
                .map(|t| Constraint::eq("recordType", t.as_str())),
        )
        .and_maybe(date_range("date", query.start_date, query.end_date)))
}

async fn list(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    ApiQuery(query): ApiQuery<HealthRecordQuery>,
) -> Result<ApiResponse<Envelope<Vec<HealthRecord>>>, ApiError> {
    let filter = list_filter(&state.policy, &auth.caller(), &query)?;
    let records = typed::find::<HealthRecord>(
        state.store.as_ref(),
        &Query::new(filter).sort_desc("date"),
    )
    .await?;
    Ok(ApiResponse::list(records))
}

async fn read(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
) -> Result<ApiResponse<Envelope<HealthRecord>>, ApiError> {
    let record =
        load_authorized::<HealthRecord>(&state, &auth.caller(), Operation::Read, &id).await?;
    Ok(ApiResponse::data(record))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHealthRecord {
    pub patient: Option<String>,
    pub record_type: Option<RecordType>,
    #[serde(default)]
    pub title: String,
    pub date: Option<Timestamp>,
    pub vital_signs: Option<VitalSigns>,
    pub lab_results: Option<LabResults>,
    pub notes: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

async fn create(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    ApiJson(body): ApiJson<CreateHealthRecord>,
) -> Result<ApiResponse<Envelope<HealthRecord>>, ApiError> {
    let caller = auth.caller();
    state
        .policy
        .authorize_create(&caller, EntityKind::HealthRecord)
        .into_result()?;

    let mut v = Validator::new();
    validation::required_id(&mut v, "patient", "Patient", body.patient.as_deref());
    v.check(body.record_type.is_some(), "recordType", "Invalid record type");
    validation::title(&mut v, &body.title);
    validation::vital_signs(&mut v, body.vital_signs.as_ref());
    v.finish()?;

    let now = Timestamp::now();
    let record = HealthRecord {
        id: generate_id(),
        patient: body.patient.unwrap_or_default(),
        record_type: body.record_type.unwrap_or(RecordType::Other),
        title: body.title.trim().to_string(),
        date: body.date.unwrap_or(now),
        vital_signs: body.vital_signs,
        lab_results: body.lab_results,
        notes: body.notes,
        recorded_by: caller.id,
        attachments: body.attachments,
        created_at: now,
        updated_at: now,
    };
    let created = typed::insert(state.store.as_ref(), &record).await?;
    tracing::info!(
        record = %created.id,
        patient = %created.patient,
        record_type = %created.record_type,
        "health record created"
    );
    Ok(ApiResponse::created(created))
}

/// Mutable health record fields. Patient and recorder are fixed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHealthRecord {
    pub record_type: Option<RecordType>,
    pub title: Option<String>,
    pub date: Option<Timestamp>,
    pub vital_signs: Option<VitalSigns>,
    pub lab_results: Option<LabResults>,
    pub notes: Option<String>,
    pub attachments: Option<Vec<Attachment>>,
}

impl UpdateHealthRecord {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        if let Some(title) = &self.title {
            validation::title(&mut v, title);
        }
        validation::vital_signs(&mut v, self.vital_signs.as_ref());
        v.finish()
    }

    fn apply(self, record: &mut HealthRecord) {
        set_if(&mut record.record_type, self.record_type);
        set_if(&mut record.title, self.title.map(|t| t.trim().to_string()));
        set_if(&mut record.date, self.date);
        if self.vital_signs.is_some() {
            record.vital_signs = self.vital_signs;
        }
        if self.lab_results.is_some() {
            record.lab_results = self.lab_results;
        }
        if self.notes.is_some() {
            record.notes = self.notes;
        }
        set_if(&mut record.attachments, self.attachments);
    }
}

async fn update(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateHealthRecord>,
) -> Result<ApiResponse<Envelope<HealthRecord>>, ApiError> {
    body.validate()?;
    let mut record =
        load_authorized::<HealthRecord>(&state, &auth.caller(), Operation::Update, &id).await?;
    body.apply(&mut record);
    let updated = typed::replace(state.store.as_ref(), &record).await?;
    Ok(ApiResponse::data(updated))
}

async fn remove(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
) -> Result<ApiResponse<Envelope<()>>, ApiError> {
    load_authorized::<HealthRecord>(&state, &auth.caller(), Operation::Delete, &id).await?;
    state.store.delete(EntityKind::HealthRecord, &id).await?;
    tracing::info!(record = %id, by = %auth.user.id, "health record deleted");
    Ok(ApiResponse::message("Health record deleted successfully"))
}
