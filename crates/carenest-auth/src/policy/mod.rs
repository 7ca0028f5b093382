//! Role-based access policy.
//!
//! Every read, write and aggregate in the API is scoped here. Two entry points
//! cover all of them:
//!
//! - [`AccessPolicy::list_scope`] yields the [`Filter`] that list endpoints,
//!   search and the dashboard AND into their queries. Because all three call
//!   the same function with the same inputs, a caller can never count a record
//!   they cannot list.
//! - [`AccessPolicy::authorize`] decides a point operation on a record that has
//!   already been loaded, so a missing record is reported as not found before
//!   any ownership check runs.
//!
//! Scoping is a closed match on [`Role`]; adding a role fails to compile until
//! every entity has a rule for it.

pub mod decision;
mod ownership;
mod scope;
mod verdict;

use serde::{Deserialize, Serialize};

use carenest_core::{EntityKind, Role, User};
use carenest_storage::Filter;

pub use decision::{AccessDecision, DenyReason};
pub use ownership::{Guarded, Ownership};
pub use scope::{PATIENT_FIELD, practitioner_field};

/// Policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Doctors may read any patient's health records and preventive care,
    /// and an explicit `patient` filter replaces their default scope.
    pub doctor_broad_read: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            doctor_broad_read: true,
        }
    }
}

/// The authenticated principal a decision is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self::new(user.id.clone(), user.role)
    }
}

/// Owner ids a caller asked to filter by. Whether they are honored depends on
/// the caller's role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OwnerFilters {
    pub patient: Option<String>,
    pub doctor: Option<String>,
}

impl OwnerFilters {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// A point operation on an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Update,
    /// Status transition to cancelled; the record is kept.
    Cancel,
    Delete,
}

impl Operation {
    /// Verb used in denial messages.
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Read => "view",
            Self::Update => "update",
            Self::Cancel => "cancel",
            Self::Delete => "delete",
        }
    }
}

/// The access policy engine.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    config: PolicyConfig,
}

impl AccessPolicy {
    #[must_use]
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Constraints a list, search or aggregate query over `kind` must carry.
    ///
    /// # Errors
    /// Returns a deny reason when the caller may not list `kind` at all.
    pub fn list_scope(
        &self,
        caller: &Caller,
        kind: EntityKind,
        filters: &OwnerFilters,
    ) -> Result<Filter, DenyReason> {
        scope::list_scope(&self.config, caller, kind, filters)
    }

    /// Decides a point operation on a loaded record.
    #[must_use]
    pub fn authorize<T: Guarded>(
        &self,
        caller: &Caller,
        operation: Operation,
        record: &T,
    ) -> AccessDecision {
        let decision = verdict::authorize(&self.config, caller, operation, record.ownership());
        if let AccessDecision::Deny(reason) = &decision {
            tracing::debug!(
                caller = %caller.id,
                role = %caller.role,
                operation = ?operation,
                code = %reason.code,
                "point operation denied"
            );
        }
        decision
    }

    /// Decides whether the caller may create a record of `kind`.
    #[must_use]
    pub fn authorize_create(&self, caller: &Caller, kind: EntityKind) -> AccessDecision {
        verdict::authorize_create(caller, kind)
    }
}
