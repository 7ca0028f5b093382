//! Resolving bearer tokens and credentials to stored users.

use carenest_core::User;
use carenest_storage::{Constraint, DynStore, Filter, typed};

use crate::config::AuthConfig;
use crate::AuthResult;
use crate::error::AuthError;
use crate::password::verify_password;
use crate::token::{JwtError, JwtService};

/// Turns credentials into active [`User`] records.
pub struct IdentityResolver {
    jwt: JwtService,
    store: DynStore,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(config: &AuthConfig, store: DynStore) -> Self {
        Self {
            jwt: JwtService::new(&config.jwt_secret, config.issuer.clone(), config.token_ttl),
            store,
        }
    }

    /// Resolves a bearer token to the active user it names.
    ///
    /// The stored user is authoritative: a role change or deactivation takes
    /// effect on the next request even while old tokens remain unexpired.
    ///
    /// # Errors
    /// Returns a client error when the token is invalid or expired, or the
    /// user is unknown or deactivated.
    pub async fn resolve(&self, token: &str) -> AuthResult<User> {
        let claims = self.jwt.decode(token).map_err(|e| {
            tracing::debug!(error = %e, "failed to decode token");
            match e {
                JwtError::Expired => AuthError::TokenExpired,
                other => AuthError::invalid_token(other.to_string()),
            }
        })?;

        let user = typed::get::<User>(self.store.as_ref(), &claims.sub)
            .await?
            .ok_or_else(|| {
                tracing::warn!(sub = %claims.sub, "token names an unknown user");
                AuthError::UnknownUser
            })?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(user)
    }

    /// Checks an email/password pair.
    ///
    /// Unknown emails and wrong passwords produce the same error.
    ///
    /// # Errors
    /// Returns `InvalidCredentials` on mismatch and `AccountDisabled` for a
    /// deactivated account with a correct password.
    pub async fn authenticate(&self, email: &str, password: &str) -> AuthResult<User> {
        let email = email.trim().to_lowercase();
        let user = self
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let matches = verify_password(password, &user.password_hash).map_err(|e| {
            tracing::error!(user = %user.id, error = %e, "stored password hash is malformed");
            AuthError::internal("stored password hash is malformed")
        })?;
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(user)
    }

    /// Looks up a user by (already lowercased) email.
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        Ok(typed::find_one::<User>(self.store.as_ref(), Filter::from(Constraint::eq("email", email))).await?)
    }

    /// Issues an access token for `user`.
    ///
    /// # Errors
    /// Returns `Internal` if signing fails.
    pub fn issue_token(&self, user: &User) -> AuthResult<String> {
        self.jwt
            .issue(user)
            .map_err(|e| AuthError::internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carenest_core::{Role, Timestamp};
    use carenest_db_memory::{StorageConfig, create_store};

    use crate::password::hash_password;

    async fn resolver_with(user: &User) -> IdentityResolver {
        let store = create_store(&StorageConfig::default()).await.unwrap();
        typed::insert(store.as_ref(), user).await.unwrap();
        IdentityResolver::new(&AuthConfig::default(), store)
    }

    fn user(active: bool) -> User {
        let now = Timestamp::now();
        User {
            id: "u1".into(),
            name: "Pat Lee".into(),
            email: "pat@example.com".into(),
            password_hash: hash_password("Secret123").unwrap(),
            role: Role::Patient,
            phone: None,
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_token_round_trip_resolves_user() {
        let u = user(true);
        let resolver = resolver_with(&u).await;
        let token = resolver.issue_token(&u).unwrap();
        let resolved = resolver.resolve(&token).await.unwrap();
        assert_eq!(resolved.id, "u1");
    }

    #[tokio::test]
    async fn test_deactivated_user_is_rejected() {
        let u = user(false);
        let resolver = resolver_with(&u).await;
        let token = resolver.issue_token(&u).unwrap();
        assert!(matches!(
            resolver.resolve(&token).await,
            Err(AuthError::AccountDisabled)
        ));
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid() {
        let resolver = resolver_with(&user(true)).await;
        assert!(matches!(
            resolver.resolve("abc.def.ghi").await,
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[tokio::test]
    async fn test_authenticate_checks_password_and_normalizes_email() {
        let resolver = resolver_with(&user(true)).await;
        assert!(resolver.authenticate(" PAT@example.com ", "Secret123").await.is_ok());
        assert!(matches!(
            resolver.authenticate("pat@example.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            resolver.authenticate("nobody@example.com", "Secret123").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
