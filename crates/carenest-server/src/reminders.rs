//! Upcoming appointments and preventive care for the next seven days.

use std::collections::{BTreeSet, HashMap};

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use carenest_api::{ApiError, ApiResponse, Envelope};
use carenest_auth::{AccessPolicy, BearerAuth, Caller};
use carenest_core::{
    Appointment, AppointmentStatus, CareStatus, PreventiveCare, Priority, Role, Timestamp, User,
};
use carenest_storage::{Constraint, EntityStore, Query, StorageError, typed};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::analytics::DashboardScopes;
use crate::state::AppState;

pub const REMINDER_WINDOW: Duration = Duration::days(7);
pub const REMINDER_LIMIT: usize = 10;

const UNKNOWN_NAME: &str = "Unknown";

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(reminders))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderKind {
    Appointment,
    PreventiveCare,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reminder {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    pub title: String,
    pub date: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue: Option<bool>,
}

impl Reminder {
    fn for_care(care: PreventiveCare, overdue: bool) -> Self {
        Self {
            id: care.id,
            kind: ReminderKind::PreventiveCare,
            title: care.title,
            date: care.scheduled_date,
            time: None,
            description: care.description,
            priority: Some(care.priority),
            overdue: overdue.then_some(true),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub appointments: Vec<Reminder>,
    pub preventive_care: Vec<Reminder>,
    pub overdue: Vec<Reminder>,
}

/// The three reminder queries for a caller at `now`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderQueries {
    pub appointments: Query,
    pub preventive_care: Query,
    pub overdue: Query,
}

impl ReminderQueries {
    pub fn new(scopes: DashboardScopes, now: Timestamp) -> Self {
        let horizon = now + REMINDER_WINDOW;
        let scheduled = Constraint::eq("status", CareStatus::Scheduled.as_str());

        let appointments = scopes
            .appointments
            .and(Constraint::between("appointmentDate", Some(now), Some(horizon)))
            .and(Constraint::any_of(
                "status",
                AppointmentStatus::PENDING.map(|s| s.as_str()),
            ));
        let upcoming_care = scopes
            .preventive_care
            .clone()
            .and(Constraint::between("scheduledDate", Some(now), Some(horizon)))
            .and(scheduled.clone());
        let overdue = scopes
            .preventive_care
            .and(Constraint::before("scheduledDate", now))
            .and(scheduled);

        Self {
            appointments: Query::new(appointments)
                .sort_asc("appointmentDate")
                .sort_asc("appointmentTime")
                .limit(REMINDER_LIMIT),
            preventive_care: Query::new(upcoming_care)
                .sort_asc("scheduledDate")
                .limit(REMINDER_LIMIT),
            overdue: Query::new(overdue)
                .sort_asc("scheduledDate")
                .limit(REMINDER_LIMIT),
        }
    }
}

/// Patients are reminded of their doctor; staff of their patient.
fn counterpart(role: Role, appointment: &Appointment) -> &str {
    match role {
        Role::Patient => &appointment.doctor,
        Role::Doctor | Role::Admin => &appointment.patient,
    }
}

async fn names_of(
    store: &dyn EntityStore,
    ids: BTreeSet<&str>,
) -> Result<HashMap<String, String>, StorageError> {
    let mut names = HashMap::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = typed::get::<User>(store, id).await? {
            names.insert(user.id, user.name);
        }
    }
    Ok(names)
}

/// Builds the reminder lists for `caller` at a fixed instant.
pub async fn reminders_at(
    store: &dyn EntityStore,
    policy: &AccessPolicy,
    caller: &Caller,
    now: Timestamp,
) -> Result<Reminders, ApiError> {
    let queries = ReminderQueries::new(DashboardScopes::for_caller(policy, caller)?, now);

    let (appointments, upcoming_care, overdue_care) = futures_util::try_join!(
        typed::find::<Appointment>(store, &queries.appointments),
        typed::find::<PreventiveCare>(store, &queries.preventive_care),
        typed::find::<PreventiveCare>(store, &queries.overdue),
    )?;

    let names = names_of(
        store,
        appointments
            .iter()
            .map(|a| counterpart(caller.role, a))
            .collect(),
    )
    .await?;

    let appointments = appointments
        .into_iter()
        .map(|a| {
            let name = names
                .get(counterpart(caller.role, &a))
                .map_or(UNKNOWN_NAME, String::as_str);
            Reminder {
                title: format!("Appointment with {name}"),
                id: a.id,
                kind: ReminderKind::Appointment,
                date: a.appointment_date,
                time: Some(a.appointment_time),
                description: Some(a.reason),
                priority: None,
                overdue: None,
            }
        })
        .collect();

    Ok(Reminders {
        appointments,
        preventive_care: upcoming_care
            .into_iter()
            .map(|c| Reminder::for_care(c, false))
            .collect(),
        overdue: overdue_care
            .into_iter()
            .map(|c| Reminder::for_care(c, true))
            .collect(),
    })
}

async fn reminders(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
) -> Result<ApiResponse<Envelope<Reminders>>, ApiError> {
    let reminders = reminders_at(
        state.store.as_ref(),
        &state.policy,
        &auth.caller(),
        Timestamp::now(),
    )
    .await?;
    Ok(ApiResponse::data(reminders))
}
