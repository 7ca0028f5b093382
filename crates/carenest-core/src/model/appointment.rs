use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind};
use crate::time::Timestamp;

wire_enum! {
    AppointmentStatus {
        Scheduled => "scheduled",
        Confirmed => "confirmed",
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no-show",
    }
}

impl Default for AppointmentStatus {
    fn default() -> Self {
        AppointmentStatus::Scheduled
    }
}

impl AppointmentStatus {
    /// Statuses that still represent a pending visit.
    pub const PENDING: [AppointmentStatus; 2] =
        [AppointmentStatus::Scheduled, AppointmentStatus::Confirmed];
}

wire_enum! {
    AppointmentType {
        Consultation => "consultation",
        FollowUp => "follow-up",
        Checkup => "checkup",
        Emergency => "emergency",
        Preventive => "preventive",
    }
}

impl Default for AppointmentType {
    fn default() -> Self {
        AppointmentType::Consultation
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub medication: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

/// A visit between one patient and one doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient: String,
    pub doctor: String,
    pub appointment_date: Timestamp,
    pub appointment_time: String,
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(rename = "type", default)]
    pub kind: AppointmentType,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub prescription: Vec<Prescription>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

const DEFAULT_DURATION_MINUTES: u32 = 30;

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

impl Appointment {
    /// Cancels in place. The record itself is kept.
    pub fn cancel(&mut self) {
        self.status = AppointmentStatus::Cancelled;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        AppointmentStatus::PENDING.contains(&self.status)
    }
}

impl Entity for Appointment {
    const KIND: EntityKind = EntityKind::Appointment;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn sample() -> Appointment {
        serde_json::from_value(json!({
            "id": "a1",
            "patient": "p1",
            "doctor": "d1",
            "appointmentDate": "2024-12-31",
            "appointmentTime": "10:00",
            "reason": "Regular checkup",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn defaults_apply_on_deserialize() {
        let appt = sample();
        assert_eq!(appt.duration, 30);
        assert_eq!(appt.kind, AppointmentType::Consultation);
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert!(appt.prescription.is_empty());
        assert!(appt.is_pending());
    }

    #[test]
    fn cancel_only_changes_status() {
        let original = sample();
        let mut cancelled = original.clone();
        cancelled.cancel();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        cancelled.status = original.status;
        assert_eq!(cancelled, original);
    }

    #[test]
    fn type_field_uses_wire_name() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["type"], "consultation");
        assert_eq!(
            AppointmentStatus::from_str("no-show").unwrap(),
            AppointmentStatus::NoShow
        );
    }
}
