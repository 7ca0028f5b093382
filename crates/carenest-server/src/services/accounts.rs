//! Registration, login and the current-account endpoint.

use std::str::FromStr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use carenest_api::{ApiError, ApiResponse, Envelope, Validator};
use carenest_auth::BearerAuth;
use carenest_auth::password::hash_password;
use carenest_core::{Role, Timestamp, User, UserProfile, generate_id};
use carenest_storage::{Constraint, EntityStore, Filter, typed};
use serde::{Deserialize, Serialize};

use crate::extract::ApiJson;
use crate::state::AppState;
use crate::validation;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

/// A validated account ready to be stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub phone: Option<String>,
}

const DUPLICATE_EMAIL: &str = "User already exists with this email";

/// Hashes the password and stores the account.
///
/// Returns 400 when the email is already registered. The lookup only saves
/// hashing for the common case; the store's unique email index decides races.
pub async fn create_user(store: &dyn EntityStore, new: NewUser) -> Result<User, ApiError> {
    let email = new.email.trim().to_lowercase();
    let existing =
        typed::find_one::<User>(store, Filter::from(Constraint::eq("email", email.as_str())))
            .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request(DUPLICATE_EMAIL));
    }

    // argon2 is deliberately slow; keep it off the async workers.
    let password = new.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(format!("password hashing task: {e}")))?
        .map_err(|e| ApiError::internal(format!("password hashing: {e}")))?;

    let now = Timestamp::now();
    let user = User {
        id: generate_id(),
        name: new.name.trim().to_string(),
        email,
        password_hash,
        role: new.role,
        phone: new.phone,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    match typed::insert(store, &user).await {
        Ok(user) => Ok(user),
        Err(err) if err.is_conflict() => Err(ApiError::bad_request(DUPLICATE_EMAIL)),
        Err(err) => Err(err.into()),
    }
}

/// `{ success, token, user }`
#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    pub success: bool,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
    pub phone: Option<String>,
}

impl RegisterRequest {
    fn validate(self) -> Result<NewUser, ApiError> {
        let mut v = Validator::new();
        validation::name(&mut v, &self.name);
        validation::email(&mut v, &self.email);
        validation::password(&mut v, &self.password);
        validation::phone(&mut v, self.phone.as_deref());
        let role = match self.role.as_deref() {
            None => Role::Patient,
            Some(raw) => Role::from_str(raw).unwrap_or_else(|_| {
                v.fail("role", "Invalid role");
                Role::Patient
            }),
        };
        v.finish()?;
        Ok(NewUser {
            name: self.name,
            email: self.email,
            password: self.password,
            role,
            phone: self.phone,
        })
    }
}

async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<ApiResponse<Session>, ApiError> {
    let new = body.validate()?;
    let user = create_user(state.store.as_ref(), new).await?;
    let token = state.identity.issue_token(&user)?;
    tracing::info!(user = %user.id, role = %user.role, "account registered");
    Ok(ApiResponse::new(
        Session {
            success: true,
            token,
            user: UserProfile::from(&user),
        },
        StatusCode::CREATED,
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<ApiResponse<Session>, ApiError> {
    let mut v = Validator::new();
    validation::email(&mut v, &body.email);
    v.check(!body.password.is_empty(), "password", "Password is required");
    v.finish()?;

    let user = state
        .identity
        .authenticate(&body.email, &body.password)
        .await
        .inspect_err(|e| tracing::debug!(error = %e, "login rejected"))?;
    let token = state.identity.issue_token(&user)?;
    Ok(ApiResponse::ok(Session {
        success: true,
        token,
        user: UserProfile::from(&user),
    }))
}

async fn me(BearerAuth(auth): BearerAuth) -> ApiResponse<Envelope<UserProfile>> {
    ApiResponse::data(UserProfile::from(&auth.user))
}
