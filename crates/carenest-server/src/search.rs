//! Free-text search fanned out over the caller's visible collections.

use std::str::FromStr;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use carenest_api::{ApiError, ApiResponse};
use carenest_auth::{BearerAuth, Caller, OwnerFilters};
use carenest_core::{
    Appointment, Entity, EntityKind, HealthRecord, PreventiveCare, User, UserProfile,
};
use carenest_storage::{Constraint, EntityStore, Filter, Query, StorageError, typed};
use serde::{Deserialize, Serialize};

use crate::analytics::DashboardScopes;
use crate::extract::ApiQuery;
use crate::state::AppState;

pub const MIN_QUERY_CHARS: usize = 2;
pub const RESULTS_PER_KIND: usize = 10;

const USER_FIELDS: &[&str] = &["name", "email"];
const APPOINTMENT_FIELDS: &[&str] = &["reason", "notes", "diagnosis"];
const HEALTH_RECORD_FIELDS: &[&str] = &["title", "notes", "labResults.testName"];
const PREVENTIVE_CARE_FIELDS: &[&str] = &["title", "description", "notes"];

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(search))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub text: String,
    pub only: Option<EntityKind>,
}

impl SearchRequest {
    /// Checks the text first so a short query never touches the store.
    pub fn parse(params: SearchParams) -> Result<Self, ApiError> {
        let text = params.q.as_deref().map(str::trim).unwrap_or_default();
        if text.chars().count() < MIN_QUERY_CHARS {
            return Err(ApiError::bad_request(
                "Search query must be at least 2 characters",
            ));
        }
        let only = match params.kind.as_deref() {
            None | Some("") => None,
            Some(raw) => match EntityKind::from_str(raw) {
                Ok(EntityKind::Patient) | Err(_) => {
                    return Err(ApiError::bad_request(format!(
                        "Unknown search type '{raw}'"
                    )));
                }
                Ok(kind) => Some(kind),
            },
        };
        Ok(Self {
            text: text.to_string(),
            only,
        })
    }

    fn includes(&self, kind: EntityKind) -> bool {
        self.only.is_none_or(|only| only == kind)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub users: Vec<UserProfile>,
    pub appointments: Vec<Appointment>,
    pub health_records: Vec<HealthRecord>,
    pub preventive_care: Vec<PreventiveCare>,
}

impl SearchResults {
    pub fn total(&self) -> usize {
        self.users.len()
            + self.appointments.len()
            + self.health_records.len()
            + self.preventive_care.len()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub success: bool,
    pub query: String,
    pub total_results: usize,
    pub results: SearchResults,
}

/// Runs `scope AND text` when `scope` is present; otherwise nothing.
async fn matching<T: Entity>(
    store: &dyn EntityStore,
    scope: Option<Filter>,
    fields: &[&str],
    text: &str,
) -> Result<Vec<T>, StorageError> {
    let Some(scope) = scope else {
        return Ok(Vec::new());
    };
    let filter = scope.and(Constraint::text(fields.iter().copied(), text));
    typed::find::<T>(store, &Query::new(filter).limit(RESULTS_PER_KIND)).await
}

/// Searches every collection `request` names, within `caller`'s scopes.
pub async fn search_in(
    store: &dyn EntityStore,
    policy: &carenest_auth::AccessPolicy,
    caller: &Caller,
    request: &SearchRequest,
) -> Result<SearchResults, ApiError> {
    let scopes = DashboardScopes::for_caller(policy, caller)?;
    // Patients are not offered account search; that is not an error here.
    let users_scope = policy
        .list_scope(caller, EntityKind::User, &OwnerFilters::none())
        .ok();
    let pick = |kind: EntityKind, scope: Filter| request.includes(kind).then_some(scope);

    let (users, appointments, health_records, preventive_care) = futures_util::try_join!(
        matching::<User>(
            store,
            users_scope.and_then(|s| pick(EntityKind::User, s)),
            USER_FIELDS,
            &request.text,
        ),
        matching::<Appointment>(
            store,
            pick(EntityKind::Appointment, scopes.appointments),
            APPOINTMENT_FIELDS,
            &request.text,
        ),
        matching::<HealthRecord>(
            store,
            pick(EntityKind::HealthRecord, scopes.health_records),
            HEALTH_RECORD_FIELDS,
            &request.text,
        ),
        matching::<PreventiveCare>(
            store,
            pick(EntityKind::PreventiveCare, scopes.preventive_care),
            PREVENTIVE_CARE_FIELDS,
            &request.text,
        ),
    )?;

    Ok(SearchResults {
        users: users.iter().map(UserProfile::from).collect(),
        appointments,
        health_records,
        preventive_care,
    })
}

async fn search(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<ApiResponse<SearchResponse>, ApiError> {
    let request = SearchRequest::parse(params)?;
    let results = search_in(state.store.as_ref(), &state.policy, &auth.caller(), &request).await?;
    tracing::debug!(
        query = %request.text,
        total = results.total(),
        "search completed"
    );
    Ok(ApiResponse::ok(SearchResponse {
        success: true,
        query: request.text,
        total_results: results.total(),
        results,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use carenest_auth::AccessPolicy;
    use carenest_core::Role;
    use carenest_db_memory::{StorageConfig, create_store};

    fn params(q: &str, kind: Option<&str>) -> SearchParams {
        SearchParams {
            q: Some(q.to_string()),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn short_or_missing_query_is_rejected() {
        for q in ["", " a ", "x"] {
            let err = SearchRequest::parse(params(q, None)).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
        assert!(SearchRequest::parse(SearchParams::default()).is_err());
        assert_eq!(SearchRequest::parse(params(" bp ", None)).unwrap().text, "bp");
    }

    #[test]
    fn type_must_be_a_searchable_collection() {
        let req = SearchRequest::parse(params("flu", Some("healthRecords"))).unwrap();
        assert_eq!(req.only, Some(EntityKind::HealthRecord));
        assert!(SearchRequest::parse(params("flu", Some("patients"))).is_err());
        assert!(SearchRequest::parse(params("flu", Some("documents"))).is_err());
    }

    #[tokio::test]
    async fn validation_runs_before_the_store_is_touched() {
        let store = create_store(&StorageConfig::default()).await.unwrap();
        store.close().await.unwrap();
        let policy = AccessPolicy::default();
        let caller = Caller::new("p1", Role::Patient);

        let run = |q: &'static str| {
            let store = store.clone();
            let policy = policy.clone();
            let caller = caller.clone();
            async move {
                let request = SearchRequest::parse(params(q, None))?;
                search_in(store.as_ref(), &policy, &caller, &request).await
            }
        };

        let err = run("a").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        // Two characters pass validation and reach the closed store.
        let err = run("ab").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn patients_never_see_accounts() {
        let store = create_store(&StorageConfig::default()).await.unwrap();
        let request = SearchRequest::parse(params("example", None)).unwrap();
        let results = search_in(
            store.as_ref(),
            &AccessPolicy::default(),
            &Caller::new("p1", Role::Patient),
            &request,
        )
        .await
        .unwrap();
        assert_eq!(results.total(), 0);
    }
}
