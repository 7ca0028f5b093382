//! Verdicts for point operations on records that have already been loaded.

use carenest_core::{EntityKind, Role};

use super::decision::{AccessDecision, DenyReason};
use super::ownership::Ownership;
use super::{Caller, Operation, PolicyConfig};

fn noun(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => "user",
        EntityKind::Patient => "patient",
        EntityKind::Appointment => "appointment",
        EntityKind::HealthRecord | EntityKind::PreventiveCare => "record",
    }
}

pub(super) fn authorize(
    config: &PolicyConfig,
    caller: &Caller,
    operation: Operation,
    record: Ownership<'_>,
) -> AccessDecision {
    let not_owner = || DenyReason::not_owner(operation.verb(), noun(record.kind));
    let forbidden = || DenyReason::role_forbidden(caller.role);
    let owns = record.owner == caller.id;
    let assigned = record.practitioner == Some(caller.id.as_str());

    match caller.role {
        Role::Admin => AccessDecision::Allow,
        Role::Patient => match (record.kind, operation) {
            (EntityKind::HealthRecord, Operation::Update | Operation::Delete)
            | (EntityKind::PreventiveCare, Operation::Delete)
            | (EntityKind::Appointment | EntityKind::Patient | EntityKind::User, Operation::Delete) => {
                AccessDecision::Deny(forbidden())
            }
            _ => AccessDecision::allow_if(owns, not_owner),
        },
        Role::Doctor => match (record.kind, operation) {
            (_, Operation::Delete) => AccessDecision::Deny(forbidden()),
            (EntityKind::HealthRecord | EntityKind::PreventiveCare, Operation::Read)
                if config.doctor_broad_read =>
            {
                AccessDecision::Allow
            }
            (EntityKind::Patient, _) => AccessDecision::Allow,
            (EntityKind::User, _) => AccessDecision::allow_if(owns, not_owner),
            (EntityKind::Appointment | EntityKind::HealthRecord | EntityKind::PreventiveCare, _) => {
                AccessDecision::allow_if(assigned, not_owner)
            }
        },
    }
}

pub(super) fn authorize_create(caller: &Caller, kind: EntityKind) -> AccessDecision {
    let allowed = match kind {
        EntityKind::Appointment | EntityKind::Patient => true,
        EntityKind::HealthRecord | EntityKind::PreventiveCare => caller.role.is_staff(),
        EntityKind::User => caller.role == Role::Admin,
    };
    AccessDecision::allow_if(allowed, || DenyReason::role_forbidden(caller.role))
}
