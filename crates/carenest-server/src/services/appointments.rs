//! Appointments: booking, scoped listing, updates and soft cancellation.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use carenest_api::{ApiError, ApiResponse, Envelope, Validator};
use carenest_auth::{AccessPolicy, BearerAuth, Caller, Operation, OwnerFilters};
use carenest_core::{
    Appointment, AppointmentStatus, AppointmentType, EntityKind, Prescription, Role, Timestamp,
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
        .route("/{id}", get(read).put(update).delete(cancel))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentQuery {
    pub status: Option<AppointmentStatus>,
    #[serde(rename = "type")]
    pub kind: Option<AppointmentType>,
    pub patient: Option<String>,
    pub doctor: Option<String>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}

/// The filter `GET /appointments` runs for `caller`.
pub fn list_filter(
    policy: &AccessPolicy,
    caller: &Caller,
    query: &AppointmentQuery,
) -> Result<Filter, ApiError> {
    let owners = OwnerFilters {
        patient: query.patient.clone(),
        doctor: query.doctor.clone(),
    };
    let scope = policy.list_scope(caller, EntityKind::Appointment, &owners)?;
    Ok(scope
        .and_maybe(query.status.map(|s| Constraint::eq("status", s.as_str())))
        .and_maybe(query.kind.map(|t| Constraint::eq("type", t.as_str())))
        .and_maybe(date_range(
            "appointmentDate",
            query.start_date,
            query.end_date,
        )))
}

async fn list(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    ApiQuery(query): ApiQuery<AppointmentQuery>,
) -> Result<ApiResponse<Envelope<Vec<Appointment>>>, ApiError> {
    let filter = list_filter(&state.policy, &auth.caller(), &query)?;
    let appointments = typed::find::<Appointment>(
        state.store.as_ref(),
        &Query::new(filter)
            .sort_desc("appointmentDate")
            .sort_desc("appointmentTime"),
    )
    .await?;
    Ok(ApiResponse::list(appointments))
}

async fn read(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
) -> Result<ApiResponse<Envelope<Appointment>>, ApiError> {
    let appointment =
        load_authorized::<Appointment>(&state, &auth.caller(), Operation::Read, &id).await?;
    Ok(ApiResponse::data(appointment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointment {
    pub patient: Option<String>,
    pub doctor: Option<String>,
    pub appointment_date: Option<Timestamp>,
    #[serde(default)]
    pub appointment_time: String,
    pub duration: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<AppointmentType>,
    #[serde(default)]
    pub reason: String,
    pub notes: Option<String>,
}

async fn create(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    ApiJson(body): ApiJson<CreateAppointment>,
) -> Result<ApiResponse<Envelope<Appointment>>, ApiError> {
    let caller = auth.caller();
    state
        .policy
        .authorize_create(&caller, EntityKind::Appointment)
        .into_result()?;

    let now = Timestamp::now();
    let mut v = Validator::new();
    validation::required_id(&mut v, "doctor", "Doctor", body.doctor.as_deref());
    match body.appointment_date {
        None => {
            v.fail("appointmentDate", "Appointment date is required");
        }
        Some(date) => {
            v.check(
                date >= now,
                "appointmentDate",
                "Appointment date cannot be in the past",
            );
        }
    }
    validation::appointment_time(&mut v, &body.appointment_time);
    validation::reason(&mut v, &body.reason);
    validation::duration(&mut v, body.duration);
    v.finish()?;

    // Patients always book for themselves.
    let patient = match caller.role {
        Role::Patient => caller.id.clone(),
        Role::Doctor | Role::Admin => body.patient.unwrap_or_else(|| caller.id.clone()),
    };

    let appointment = Appointment {
        id: generate_id(),
        patient,
        doctor: body.doctor.unwrap_or_default(),
        appointment_date: body.appointment_date.unwrap_or(now),
        appointment_time: body.appointment_time.trim().to_string(),
        duration: body.duration.unwrap_or(30),
        kind: body.kind.unwrap_or_default(),
        status: AppointmentStatus::Scheduled,
        reason: body.reason.trim().to_string(),
        notes: body.notes,
        diagnosis: None,
        prescription: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    let created = typed::insert(state.store.as_ref(), &appointment).await?;
    tracing::info!(
        appointment = %created.id,
        patient = %created.patient,
        doctor = %created.doctor,
        "appointment booked"
    );
    Ok(ApiResponse::created(created))
}

/// Mutable appointment fields. Participants cannot be reassigned.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointment {
    pub appointment_date: Option<Timestamp>,
    pub appointment_time: Option<String>,
    pub duration: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<AppointmentType>,
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<Vec<Prescription>>,
}

impl UpdateAppointment {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        if let Some(time) = &self.appointment_time {
            validation::appointment_time(&mut v, time);
        }
        if let Some(reason) = &self.reason {
            validation::reason(&mut v, reason);
        }
        validation::duration(&mut v, self.duration);
        v.finish()
    }

    fn apply(self, appointment: &mut Appointment) {
        set_if(&mut appointment.appointment_date, self.appointment_date);
        set_if(
            &mut appointment.appointment_time,
            self.appointment_time.map(|t| t.trim().to_string()),
        );
        set_if(&mut appointment.duration, self.duration);
        set_if(&mut appointment.kind, self.kind);
        set_if(&mut appointment.status, self.status);
        set_if(&mut appointment.reason, self.reason.map(|r| r.trim().to_string()));
        if self.notes.is_some() {
            appointment.notes = self.notes;
        }
        if self.diagnosis.is_some() {
            appointment.diagnosis = self.diagnosis;
        }
        set_if(&mut appointment.prescription, self.prescription);
    }
}

async fn update(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateAppointment>,
) -> Result<ApiResponse<Envelope<Appointment>>, ApiError> {
    body.validate()?;
    let mut appointment =
        load_authorized::<Appointment>(&state, &auth.caller(), Operation::Update, &id).await?;
    body.apply(&mut appointment);
    let updated = typed::replace(state.store.as_ref(), &appointment).await?;
    Ok(ApiResponse::data(updated))
}

/// `DELETE` cancels; the appointment stays in the collection.
async fn cancel(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
) -> Result<ApiResponse<Envelope<()>>, ApiError> {
    let mut appointment =
        load_authorized::<Appointment>(&state, &auth.caller(), Operation::Cancel, &id).await?;
    appointment.cancel();
    typed::replace(state.store.as_ref(), &appointment).await?;
    tracing::info!(appointment = %id, by = %auth.user.id, "appointment cancelled");
    Ok(ApiResponse::message("Appointment cancelled successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_are_anded_onto_the_scope() {
        let policy = AccessPolicy::default();
        let caller = Caller::new("p1", Role::Patient);
        let query = AppointmentQuery {
            status: Some(AppointmentStatus::Confirmed),
            doctor: Some("d9".into()),
            ..AppointmentQuery::default()
        };
        let filter = list_filter(&policy, &caller, &query).unwrap();
        assert_eq!(
            filter,
            Filter::new()
                .and(Constraint::eq("patient", "p1"))
                .and(Constraint::eq("status", "confirmed"))
        );
    }

    #[test]
    fn update_keeps_participants() {
        let body: UpdateAppointment = serde_json::from_value(serde_json::json!({
            "status": "confirmed",
            "patient": "someone-else",
            "notes": "Bring previous results"
        }))
        .unwrap();
        let mut appointment: Appointment = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "patient": "p1",
            "doctor": "d1",
            "appointmentDate": "2030-01-01",
            "appointmentTime": "10:00",
            "reason": "Regular checkup visit",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        body.apply(&mut appointment);
        assert_eq!(appointment.patient, "p1");
        assert_eq!(appointment.status, AppointmentStatus::Confirmed);
        assert_eq!(appointment.notes.as_deref(), Some("Bring previous results"));
    }
}
