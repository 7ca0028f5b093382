//! Dashboard counts and vital-sign trends.
//!
//! Every figure is computed over the caller's list scope, so a dashboard
//! total always equals the length of the matching unfiltered list.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use carenest_api::{ApiError, ApiResponse, Envelope};
use carenest_auth::{AccessPolicy, BearerAuth, Caller};
use carenest_core::{
    AppointmentStatus, BloodPressure, CareStatus, EntityKind, HealthRecord, RecordType,
    Temperature, Timestamp,
};
use carenest_storage::{Constraint, EntityStore, Filter, Query, StorageError, typed};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::extract::ApiQuery;
use crate::services::{appointments, health_records, preventive_care};
use crate::state::AppState;

/// Health trends never return more samples than this.
pub const TREND_SAMPLE_CAP: usize = 100;

const RECENT_WINDOW: Duration = Duration::days(30);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/health-trends", get(health_trends))
}

/// The list scopes a dashboard counts over, one per collection.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardScopes {
    pub appointments: Filter,
    pub health_records: Filter,
    pub preventive_care: Filter,
}

impl DashboardScopes {
    /// Same filters the list endpoints run when given no query parameters.
    pub fn for_caller(policy: &AccessPolicy, caller: &Caller) -> Result<Self, ApiError> {
        Ok(Self {
            appointments: appointments::list_filter(policy, caller, &Default::default())?,
            health_records: health_records::list_filter(policy, caller, &Default::default())?,
            preventive_care: preventive_care::list_filter(policy, caller, &Default::default())?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentStats {
    pub total: u64,
    pub upcoming: u64,
    pub completed: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecordStats {
    pub total: u64,
    pub recent: u64,
    pub by_type: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreventiveCareStats {
    pub total: u64,
    pub overdue: u64,
    pub completed: u64,
    pub by_type: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub appointments: AppointmentStats,
    pub health_records: HealthRecordStats,
    pub preventive_care: PreventiveCareStats,
}

async fn appointment_stats(
    store: &dyn EntityStore,
    scope: &Filter,
    now: Timestamp,
) -> Result<AppointmentStats, StorageError> {
    let kind = EntityKind::Appointment;
    let upcoming = scope
        .clone()
        .and(Constraint::since("appointmentDate", now))
        .and(Constraint::any_of(
            "status",
            AppointmentStatus::PENDING.map(|s| s.as_str()),
        ));
    let completed = scope
        .clone()
        .and(Constraint::eq("status", AppointmentStatus::Completed.as_str()));

    let (total, upcoming, completed, by_status, by_type) = futures_util::try_join!(
        store.count(kind, scope),
        store.count(kind, &upcoming),
        store.count(kind, &completed),
        store.count_by(kind, scope, "status"),
        store.count_by(kind, scope, "type"),
    )?;
    Ok(AppointmentStats {
        total,
        upcoming,
        completed,
        by_status,
        by_type,
    })
}

async fn health_record_stats(
    store: &dyn EntityStore,
    scope: &Filter,
    now: Timestamp,
) -> Result<HealthRecordStats, StorageError> {
    let kind = EntityKind::HealthRecord;
    let recent = scope
        .clone()
        .and(Constraint::since("date", now - RECENT_WINDOW));

    let (total, recent, by_type) = futures_util::try_join!(
        store.count(kind, scope),
        store.count(kind, &recent),
        store.count_by(kind, scope, "recordType"),
    )?;
    Ok(HealthRecordStats {
        total,
        recent,
        by_type,
    })
}

async fn preventive_care_stats(
    store: &dyn EntityStore,
    scope: &Filter,
    now: Timestamp,
) -> Result<PreventiveCareStats, StorageError> {
    let kind = EntityKind::PreventiveCare;
    let overdue = scope
        .clone()
        .and(Constraint::before("scheduledDate", now))
        .and(Constraint::eq("status", CareStatus::Scheduled.as_str()));
    let completed = scope
        .clone()
        .and(Constraint::eq("status", CareStatus::Completed.as_str()));

    let (total, overdue, completed, by_type) = futures_util::try_join!(
        store.count(kind, scope),
        store.count(kind, &overdue),
        store.count(kind, &completed),
        store.count_by(kind, scope, "careType"),
    )?;
    Ok(PreventiveCareStats {
        total,
        overdue,
        completed,
        by_type,
    })
}

/// Computes the dashboard at a fixed instant.
///
/// The per-collection queries run concurrently without a shared snapshot.
pub async fn dashboard_at(
    store: &dyn EntityStore,
    scopes: &DashboardScopes,
    now: Timestamp,
) -> Result<Dashboard, StorageError> {
    let (appointments, health_records, preventive_care) = futures_util::try_join!(
        appointment_stats(store, &scopes.appointments, now),
        health_record_stats(store, &scopes.health_records, now),
        preventive_care_stats(store, &scopes.preventive_care, now),
    )?;
    Ok(Dashboard {
        appointments,
        health_records,
        preventive_care,
    })
}

async fn dashboard(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
) -> Result<ApiResponse<Envelope<Dashboard>>, ApiError> {
    let scopes = DashboardScopes::for_caller(&state.policy, &auth.caller())?;
    let dashboard = dashboard_at(state.store.as_ref(), &scopes, Timestamp::now()).await?;
    Ok(ApiResponse::data(dashboard))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsQuery {
    pub patient: Option<String>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}

/// One vital-signs sample. Absent measurements are omitted.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<BloodPressure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Temperature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

impl From<HealthRecord> for TrendPoint {
    fn from(record: HealthRecord) -> Self {
        let vitals = record.vital_signs.unwrap_or_default();
        Self {
            date: record.date,
            blood_pressure: vitals.blood_pressure,
            heart_rate: vitals.heart_rate,
            temperature: vitals.temperature,
            weight: vitals.weight,
        }
    }
}

/// Vital-signs samples in the caller's health-record scope, oldest first.
pub fn trends_query(
    policy: &AccessPolicy,
    caller: &Caller,
    params: TrendsQuery,
) -> Result<Query, ApiError> {
    let filter = health_records::list_filter(
        policy,
        caller,
        &health_records::HealthRecordQuery {
            record_type: Some(RecordType::VitalSigns),
            patient: params.patient,
            doctor: None,
            start_date: params.start_date,
            end_date: params.end_date,
        },
    )?;
    Ok(Query::new(filter).sort_asc("date").limit(TREND_SAMPLE_CAP))
}

async fn health_trends(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    ApiQuery(params): ApiQuery<TrendsQuery>,
) -> Result<ApiResponse<Envelope<Vec<TrendPoint>>>, ApiError> {
    let query = trends_query(&state.policy, &auth.caller(), params)?;
    let records = typed::find::<HealthRecord>(state.store.as_ref(), &query).await?;
    Ok(ApiResponse::data(
        records.into_iter().map(TrendPoint::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use carenest_auth::{OwnerFilters, PolicyConfig};
    use carenest_core::Role;

    fn callers() -> [Caller; 3] {
        [
            Caller::new("p1", Role::Patient),
            Caller::new("d1", Role::Doctor),
            Caller::new("a1", Role::Admin),
        ]
    }

    #[test]
    fn dashboard_scope_matches_list_scope_for_every_role() {
        for broad in [true, false] {
            let policy = AccessPolicy::new(PolicyConfig {
                doctor_broad_read: broad,
            });
            for caller in callers() {
                let scopes = DashboardScopes::for_caller(&policy, &caller).unwrap();
                let none = OwnerFilters::none();
                assert_eq!(
                    scopes.appointments,
                    policy
                        .list_scope(&caller, EntityKind::Appointment, &none)
                        .unwrap()
                );
                assert_eq!(
                    scopes.health_records,
                    policy
                        .list_scope(&caller, EntityKind::HealthRecord, &none)
                        .unwrap()
                );
                assert_eq!(
                    scopes.preventive_care,
                    policy
                        .list_scope(&caller, EntityKind::PreventiveCare, &none)
                        .unwrap()
                );
            }
        }
    }

    #[test]
    fn trends_are_vital_signs_oldest_first_and_capped() {
        let policy = AccessPolicy::default();
        let caller = Caller::new("p1", Role::Patient);
        let query = trends_query(&policy, &caller, TrendsQuery::default()).unwrap();
        assert!(query.filter.constraints().contains(&Constraint::eq("recordType", "vital-signs")));
        assert!(query.filter.constraints().contains(&Constraint::eq("patient", "p1")));
        assert_eq!(query.limit, Some(TREND_SAMPLE_CAP));
        assert_eq!(query.sort, Query::new(Filter::new()).sort_asc("date").sort);
    }

    #[test]
    fn trend_point_omits_missing_measurements() {
        let record: HealthRecord = serde_json::from_value(serde_json::json!({
            "id": "h1",
            "patient": "p1",
            "recordType": "vital-signs",
            "title": "Morning vitals",
            "date": "2024-06-01T08:00:00Z",
            "vitalSigns": { "heartRate": 72 },
            "recordedBy": "d1",
            "createdAt": "2024-06-01T08:00:00Z",
            "updatedAt": "2024-06-01T08:00:00Z"
        }))
        .unwrap();
        let json = serde_json::to_value(TrendPoint::from(record)).unwrap();
        assert_eq!(json["heartRate"], 72);
        assert!(json.get("bloodPressure").is_none());
        assert!(json.get("weight").is_none());
    }
}
