//! Account administration: listing, reading and updating user records.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use carenest_api::{ApiError, ApiResponse, Envelope, Validator};
use carenest_auth::{BearerAuth, Caller, DenyReason, Operation};
use carenest_core::{Role, User, UserProfile};
use carenest_storage::{Filter, Query, typed};
use serde::Deserialize;

use super::{load_authorized, set_if};
use crate::extract::ApiJson;
use crate::state::AppState;
use crate::validation;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(read).put(update))
}

async fn list(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
) -> Result<ApiResponse<Envelope<Vec<UserProfile>>>, ApiError> {
    if auth.user.role != Role::Admin {
        return Err(DenyReason::role_forbidden(auth.user.role).into());
    }
    let users = typed::find::<User>(
        state.store.as_ref(),
        &Query::new(Filter::new()).sort_desc("createdAt"),
    )
    .await?;
    Ok(ApiResponse::list(users.iter().map(UserProfile::from).collect()))
}

async fn read(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
) -> Result<ApiResponse<Envelope<UserProfile>>, ApiError> {
    let user = load_authorized::<User>(&state, &auth.caller(), Operation::Read, &id).await?;
    Ok(ApiResponse::data(UserProfile::from(&user)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateUser {
    /// Validates the body; `role` is parsed here so a bad value is a 400.
    fn validate(&self) -> Result<Option<Role>, ApiError> {
        let mut v = Validator::new();
        if let Some(name) = &self.name {
            validation::name(&mut v, name);
        }
        validation::phone(&mut v, self.phone.as_deref());
        let role = match self.role.as_deref() {
            None => None,
            Some(raw) => match Role::from_str(raw) {
                Ok(role) => Some(role),
                Err(_) => {
                    v.fail("role", "Invalid role");
                    None
                }
            },
        };
        v.finish()?;
        Ok(role)
    }

    /// Only admins may change role or activation.
    fn check_privileged(&self, caller: &Caller) -> Result<(), ApiError> {
        let privileged = self.role.is_some() || self.is_active.is_some();
        if privileged && caller.role != Role::Admin {
            return Err(DenyReason::role_forbidden(caller.role)
                .with_details(serde_json::json!({ "fields": ["role", "isActive"] }))
                .into());
        }
        Ok(())
    }
}

async fn update(
    State(state): State<AppState>,
    BearerAuth(auth): BearerAuth,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateUser>,
) -> Result<ApiResponse<Envelope<UserProfile>>, ApiError> {
    let role = body.validate()?;
    let caller = auth.caller();
    let mut user = load_authorized::<User>(&state, &caller, Operation::Update, &id).await?;
    body.check_privileged(&caller)?;

    set_if(&mut user.name, body.name.map(|n| n.trim().to_string()));
    if body.phone.is_some() {
        user.phone = body.phone;
    }
    set_if(&mut user.role, role);
    set_if(&mut user.is_active, body.is_active);

    let updated = typed::replace(state.store.as_ref(), &user).await?;
    if role.is_some() || body.is_active.is_some() {
        tracing::info!(
            user = %updated.id,
            role = %updated.role,
            active = updated.is_active,
            by = %caller.id,
            "account privileges changed"
        );
    }
    Ok(ApiResponse::data(UserProfile::from(&updated)))
}
