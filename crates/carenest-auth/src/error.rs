//! Authentication error types.

use std::fmt;

use axum::response::{IntoResponse, Response};
use carenest_api::ApiError;
use carenest_storage::StorageError;

/// Errors that can occur while resolving a caller's identity.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request lacks valid authentication credentials.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of why the request is unauthorized.
        message: String,
    },

    /// The bearer token is malformed or its signature does not verify.
    #[error("Invalid token: {message}")]
    InvalidToken {
        /// Description of why the token is invalid.
        message: String,
    },

    /// The bearer token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The token names a user that no longer exists.
    #[error("User not found")]
    UnknownUser,

    /// The account exists but has been deactivated.
    #[error("User account is deactivated")]
    AccountDisabled,

    /// Email/password pair did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Looking up the user failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Hashing or signing failed.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidToken` error.
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller should see a 401.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Internal { .. })
    }

    /// Returns the error category for logging.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized { .. } | Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::InvalidToken { .. } | Self::TokenExpired => ErrorCategory::Token,
            Self::UnknownUser | Self::AccountDisabled => ErrorCategory::Account,
            Self::Storage(_) | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of authentication errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Missing or wrong credentials.
    Authentication,
    /// Token-level failures.
    Token,
    /// Account state failures.
    Account,
    /// Server-side failures.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Account => write!(f, "account"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Message used for every token problem; clients are not told which check failed.
pub const NOT_AUTHORIZED_MESSAGE: &str = "Not authorized to access this route";

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_client_error() {
            tracing::debug!(category = %err.category(), error = %err, "request not authenticated");
        } else if let AuthError::Internal { .. } = err {
            // Storage failures are logged by their own conversion.
            tracing::error!(category = %err.category(), error = %err, "authentication failure");
        }
        match err {
            AuthError::Unauthorized { message } => ApiError::unauthorized(message),
            AuthError::InvalidToken { .. } | AuthError::TokenExpired => {
                ApiError::unauthorized(NOT_AUTHORIZED_MESSAGE)
            }
            AuthError::UnknownUser
            | AuthError::AccountDisabled
            | AuthError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            AuthError::Storage(e) => e.into(),
            AuthError::Internal { message } => ApiError::internal(message),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
