//! Identity and access control for the carenest API.
//!
//! - [`identity`]: bearer tokens and credentials to stored users
//! - [`middleware`]: the `BearerAuth` axum extractor
//! - [`policy`]: role-based list scopes and point-operation verdicts
//! - [`password`] / [`token`]: argon2 hashing and HS256 tokens

pub mod config;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod token;

pub use config::AuthConfig;
pub use error::{AuthError, ErrorCategory, NOT_AUTHORIZED_MESSAGE};
pub use identity::IdentityResolver;
pub use middleware::{AuthContext, AuthState, BearerAuth};
pub use policy::{
    AccessDecision, AccessPolicy, Caller, DenyReason, Guarded, Operation, OwnerFilters,
    PolicyConfig,
};

/// Result type alias for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;
