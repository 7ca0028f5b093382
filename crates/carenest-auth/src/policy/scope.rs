//! Query scopes for list, search and aggregation reads.

use carenest_core::{EntityKind, Role};
use carenest_storage::{Constraint, Filter};

use super::{Caller, OwnerFilters, PolicyConfig};
use super::decision::DenyReason;

/// Field holding the owning patient on clinical entities.
pub const PATIENT_FIELD: &str = "patient";

/// Field naming the practitioner responsible for a clinical entity.
#[must_use]
pub fn practitioner_field(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Appointment => Some("doctor"),
        EntityKind::HealthRecord => Some("recordedBy"),
        EntityKind::PreventiveCare => Some("assignedBy"),
        EntityKind::User | EntityKind::Patient => None,
    }
}

pub(super) fn list_scope(
    config: &PolicyConfig,
    caller: &Caller,
    kind: EntityKind,
    filters: &OwnerFilters,
) -> Result<Filter, DenyReason> {
    let by_patient = |id: &str| Constraint::eq(PATIENT_FIELD, id);

    let Some(field) = practitioner_field(kind) else {
        // Accounts and profiles: staff see all of them, patients none.
        return match caller.role {
            Role::Patient => Err(DenyReason::role_forbidden(caller.role)),
            Role::Doctor | Role::Admin => Ok(Filter::new()),
        };
    };
    let own = Constraint::eq(field, caller.id.as_str());

    Ok(match caller.role {
        Role::Patient => Filter::from(by_patient(&caller.id)),
        Role::Admin => admin_scope(field, filters),
        Role::Doctor => match (kind, filters.patient.as_deref()) {
            (_, None) => Filter::from(own),
            (EntityKind::HealthRecord | EntityKind::PreventiveCare, Some(patient))
                if config.doctor_broad_read =>
            {
                Filter::from(by_patient(patient))
            }
            (_, Some(patient)) => Filter::from(own).and(by_patient(patient)),
        },
    })
}

fn admin_scope(practitioner: &str, filters: &OwnerFilters) -> Filter {
    Filter::new()
        .and_maybe(
            filters
                .patient
                .as_deref()
                .map(|id| Constraint::eq(PATIENT_FIELD, id)),
        )
        .and_maybe(
            filters
                .doctor
                .as_deref()
                .map(|id| Constraint::eq(practitioner, id)),
        )
}
