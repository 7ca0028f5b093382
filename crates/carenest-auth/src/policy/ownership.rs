//! Owner and practitioner fields of each guarded entity.

use carenest_core::{
    Appointment, EntityKind, HealthRecord, PatientProfile, PreventiveCare, User,
};

/// Who a loaded record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership<'a> {
    pub kind: EntityKind,
    /// The owning patient's user id (the user itself for accounts).
    pub owner: &'a str,
    /// The doctor, recorder or assigner, where the entity has one.
    pub practitioner: Option<&'a str>,
}

/// Entities whose point operations go through the policy engine.
pub trait Guarded {
    fn ownership(&self) -> Ownership<'_>;
}

impl Guarded for Appointment {
    fn ownership(&self) -> Ownership<'_> {
        Ownership {
            kind: EntityKind::Appointment,
            owner: &self.patient,
            practitioner: Some(&self.doctor),
        }
    }
}

impl Guarded for HealthRecord {
    fn ownership(&self) -> Ownership<'_> {
        Ownership {
            kind: EntityKind::HealthRecord,
            owner: &self.patient,
            practitioner: Some(&self.recorded_by),
        }
    }
}

impl Guarded for PreventiveCare {
    fn ownership(&self) -> Ownership<'_> {
        Ownership {
            kind: EntityKind::PreventiveCare,
            owner: &self.patient,
            practitioner: Some(&self.assigned_by),
        }
    }
}

impl Guarded for PatientProfile {
    fn ownership(&self) -> Ownership<'_> {
        Ownership {
            kind: EntityKind::Patient,
            owner: &self.user_id,
            practitioner: None,
        }
    }
}

impl Guarded for User {
    fn ownership(&self) -> Ownership<'_> {
        Ownership {
            kind: EntityKind::User,
            owner: &self.id,
            practitioner: None,
        }
    }
}
