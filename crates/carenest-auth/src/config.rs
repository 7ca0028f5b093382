//! Authentication configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Token signing and lifetime settings.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// jwt_secret = "change-me"
/// token_ttl = "7d"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HS256 signing secret. Must be non-empty.
    pub jwt_secret: String,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,

    /// Value of the `iss` claim.
    pub issuer: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-change-me".to_string(),
            token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            issuer: "carenest".to_string(),
        }
    }
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns a message naming the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.trim().is_empty() {
            return Err("auth.jwt_secret must not be empty".into());
        }
        if self.token_ttl.is_zero() {
            return Err("auth.token_ttl must be greater than zero".into());
        }
        if self.issuer.trim().is_empty() {
            return Err("auth.issuer must not be empty".into());
        }
        Ok(())
    }
}
