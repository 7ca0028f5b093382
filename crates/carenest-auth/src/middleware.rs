//! Bearer token authentication extractor.
//!
//! # Example
//!
//! ```ignore
//! use carenest_auth::middleware::BearerAuth;
//!
//! async fn me(BearerAuth(auth): BearerAuth) -> String {
//!     format!("Hello, {}!", auth.user.name)
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use carenest_core::User;

use crate::error::{AuthError, NOT_AUTHORIZED_MESSAGE};
use crate::identity::IdentityResolver;
use crate::policy::Caller;

/// State required for bearer token authentication.
///
/// Include it in the application state and expose it to [`BearerAuth`] via
/// `FromRef`.
#[derive(Clone)]
pub struct AuthState {
    pub resolver: Arc<IdentityResolver>,
}

impl AuthState {
    pub fn new(resolver: Arc<IdentityResolver>) -> Self {
        Self { resolver }
    }
}

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
}

impl AuthContext {
    /// The identity the access policy evaluates.
    #[must_use]
    pub fn caller(&self) -> Caller {
        Caller::from(&self.user)
    }
}

/// Axum extractor that validates a bearer token and loads the user.
///
/// # Errors
///
/// Rejects with `AuthError` (a 401 response) if the header is missing or
/// malformed, the token is invalid or expired, or the user is unknown or
/// deactivated.
pub struct BearerAuth(pub AuthContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::unauthorized(NOT_AUTHORIZED_MESSAGE))?;

        let user = auth_state.resolver.resolve(token).await?;
        tracing::debug!(user = %user.id, role = %user.role, "request authenticated");
        Ok(BearerAuth(AuthContext { user }))
    }
}
