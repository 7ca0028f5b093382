//! Access decisions returned by the policy engine.

use serde::Serialize;

use carenest_api::ApiError;
use carenest_core::Role;

/// The result of evaluating a point operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access is granted.
    Allow,
    /// Access is denied with a reason.
    Deny(DenyReason),
}

impl AccessDecision {
    /// Returns `true` if access was granted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns `true` if access was denied.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Deny(_))
    }

    /// Get the deny reason if access was denied.
    #[must_use]
    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Self::Deny(reason) => Some(reason),
            Self::Allow => None,
        }
    }

    /// Converts the decision into a `Result` so handlers can use `?`.
    ///
    /// # Errors
    /// Returns the deny reason when access was denied.
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason),
        }
    }

    pub(crate) fn allow_if(condition: bool, otherwise: impl FnOnce() -> DenyReason) -> Self {
        if condition {
            Self::Allow
        } else {
            Self::Deny(otherwise())
        }
    }
}

/// Why access was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DenyReason {
    /// Error code for programmatic handling.
    pub code: String,

    /// Human-readable error message.
    pub message: String,

    /// Additional details about the denial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Name of the rule that denied access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
}

impl DenyReason {
    /// The caller does not own (or is not assigned to) the record.
    #[must_use]
    pub fn not_owner(verb: &str, noun: &str) -> Self {
        Self {
            code: "not-owner".to_string(),
            message: format!("Not authorized to {verb} this {noun}"),
            details: None,
            policy_id: Some("ownership".to_string()),
        }
    }

    /// The caller's role may never perform the operation.
    #[must_use]
    pub fn role_forbidden(role: Role) -> Self {
        Self {
            code: "role-forbidden".to_string(),
            message: format!("User role {role} is not authorized to access this route"),
            details: None,
            policy_id: Some("role".to_string()),
        }
    }

    /// Attach additional details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<DenyReason> for ApiError {
    fn from(reason: DenyReason) -> Self {
        tracing::debug!(code = %reason.code, policy = ?reason.policy_id, "access denied");
        ApiError::forbidden(reason.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_decision_predicates() {
        assert!(AccessDecision::Allow.is_allowed());
        let deny = AccessDecision::Deny(DenyReason::not_owner("view", "appointment"));
        assert!(deny.is_denied());
        assert_eq!(
            deny.deny_reason().map(|r| r.message.as_str()),
            Some("Not authorized to view this appointment")
        );
    }

    #[test]
    fn test_into_result() {
        assert!(AccessDecision::Allow.into_result().is_ok());
        let err = AccessDecision::Deny(DenyReason::role_forbidden(Role::Patient))
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, "role-forbidden");
        assert_eq!(
            err.message,
            "User role patient is not authorized to access this route"
        );
    }

    #[test]
    fn test_deny_maps_to_403() {
        let api: ApiError = DenyReason::not_owner("update", "record").into();
        assert_eq!(api.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(api.to_body().message, "Not authorized to update this record");
    }

    #[test]
    fn test_serialization_skips_empty_fields() {
        let json = serde_json::to_value(DenyReason::role_forbidden(Role::Doctor)).unwrap();
        assert!(json.get("details").is_none());
        assert_eq!(json["policyId"], "role");
    }
}
