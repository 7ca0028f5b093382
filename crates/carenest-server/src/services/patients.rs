//! Patient profiles, one per user account.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use carenest_api::{ApiError, ApiResponse, Envelope, Validator};
use carenest_auth::{BearerAuth, Caller, Operation, OwnerFilters};
use carenest_core::{
    Allergy, BloodGroup, EmergencyContact, EntityKind, Insurance, Measurement, MedicalCondition,
    Medication, PatientProfile, Timestamp, generate_id,
};
use carenest_storage::{Constraint, EntityStore, Filter, Query, typed};
use serde::Deserialize;

use super::{load_authorized, set_if};
use crate::extract::ApiJson;
use crate::state::AppState;
use crate::validation;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/me", get(me))
        .route("/{id}", get(read).put(update))
}

const DUPLICATE_PROFILE: &str = "Patient profile already exists";

async fn find_for_user(
    store: &dyn EntityStore,
    user_id: &str,
) -> Result<Option<PatientProfile>, ApiError> {
    Ok(typed::find_one::<PatientProfile>(store, Filter::from(Constraint::eq("userId", user_id))).await?)
}

async fn list(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
) -> Result<ApiResponse<Envelope<Vec<PatientProfile>>>, ApiError> {
    let scope = state
        .policy
        .list_scope(&auth.caller(), EntityKind::Patient, &OwnerFilters::none())?;
    let profiles = typed::find::<PatientProfile>(
        state.store.as_ref(),
        &Query::new(scope).sort_desc("createdAt"),
    )
    .await?;
    Ok(ApiResponse::list(profiles))
}

/// Returns the profile of `user_id`, creating an empty one if none exists.
///
/// Concurrent first calls converge on the single stored profile.
pub async fn own_profile(
    store: &dyn EntityStore,
    user_id: &str,
) -> Result<PatientProfile, ApiError> {
    if let Some(profile) = find_for_user(store, user_id).await? {
        return Ok(profile);
    }
    let profile = PatientProfile::empty(generate_id(), user_id, Timestamp::now());
    match typed::insert(store, &profile).await {
        Ok(created) => {
            tracing::info!(user = %user_id, profile = %created.id, "patient profile created on first access");
            Ok(created)
        }
        Err(err) if err.is_conflict() => find_for_user(store, user_id)
            .await?
            .ok_or_else(|| ApiError::internal("patient profile vanished after conflict")),
        Err(err) => Err(err.into()),
    }
}

/// The caller's own profile, created empty on first access.
async fn me(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
) -> Result<ApiResponse<Envelope<PatientProfile>>, ApiError> {
    let profile = own_profile(state.store.as_ref(), &auth.user.id).await?;
    Ok(ApiResponse::data(profile))
}

async fn read(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
) -> Result<ApiResponse<Envelope<PatientProfile>>, ApiError> {
    let profile =
        load_authorized::<PatientProfile>(&state, &auth.caller(), Operation::Read, &id).await?;
    Ok(ApiResponse::data(profile))
}

/// Medical profile fields; every one is optional on create and update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub medical_history: Option<Vec<MedicalCondition>>,
    pub allergies: Option<Vec<Allergy>>,
    pub medications: Option<Vec<Medication>>,
    pub emergency_contact: Option<EmergencyContact>,
    pub insurance: Option<Insurance>,
    pub blood_group: Option<BloodGroup>,
    pub height: Option<Measurement>,
    pub weight: Option<Measurement>,
}

impl ProfileFields {
    fn validate(&self) -> Result<(), ApiError> {
        let mut v = Validator::new();
        validation::measurement(&mut v, "height", self.height.as_ref(), &["cm", "inches"]);
        validation::measurement(&mut v, "weight", self.weight.as_ref(), &["kg", "lbs"]);
        v.finish()
    }

    fn apply(self, profile: &mut PatientProfile) {
        set_if(&mut profile.medical_history, self.medical_history);
        set_if(&mut profile.allergies, self.allergies);
        set_if(&mut profile.medications, self.medications);
        if self.emergency_contact.is_some() {
            profile.emergency_contact = self.emergency_contact;
        }
        if self.insurance.is_some() {
            profile.insurance = self.insurance;
        }
        if self.blood_group.is_some() {
            profile.blood_group = self.blood_group;
        }
        if self.height.is_some() {
            profile.height = self.height;
        }
        if self.weight.is_some() {
            profile.weight = self.weight;
        }
    }
}

async fn create(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    ApiJson(body): ApiJson<ProfileFields>,
) -> Result<ApiResponse<Envelope<PatientProfile>>, ApiError> {
    let caller: Caller = auth.caller();
    state
        .policy
        .authorize_create(&caller, EntityKind::Patient)
        .into_result()?;
    body.validate()?;

    if find_for_user(state.store.as_ref(), &caller.id).await?.is_some() {
        return Err(ApiError::bad_request(DUPLICATE_PROFILE));
    }

    let mut profile = PatientProfile::empty(generate_id(), caller.id, Timestamp::now());
    body.apply(&mut profile);
    match typed::insert(state.store.as_ref(), &profile).await {
        Ok(created) => Ok(ApiResponse::created(created)),
        Err(err) if err.is_conflict() => Err(ApiError::bad_request(DUPLICATE_PROFILE)),
        Err(err) => Err(err.into()),
    }
}

async fn update(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProfileFields>,
) -> Result<ApiResponse<Envelope<PatientProfile>>, ApiError> {
    body.validate()?;
    let mut profile =
        load_authorized::<PatientProfile>(&state, &auth.caller(), Operation::Update, &id).await?;
    body.apply(&mut profile);
    let updated = typed::replace(state.store.as_ref(), &profile).await?;
    Ok(ApiResponse::data(updated))
}
