use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind};
use crate::time::Timestamp;

wire_enum! {
    CareType {
        Vaccination => "vaccination",
        Screening => "screening",
        HealthCheck => "health-check",
        WellnessProgram => "wellness-program",
        HealthEducation => "health-education",
    }
}

wire_enum! {
    CareStatus {
        Scheduled => "scheduled",
        Completed => "completed",
        Overdue => "overdue",
        Cancelled => "cancelled",
    }
}

impl Default for CareStatus {
    fn default() -> Self {
        CareStatus::Scheduled
    }
}

wire_enum! {
    Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

wire_enum! {
    Frequency {
        OneTime => "one-time",
        Daily => "daily",
        Weekly => "weekly",
        Monthly => "monthly",
        Quarterly => "quarterly",
        Yearly => "yearly",
    }
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::OneTime
    }
}

/// A vaccination, screening or wellness item planned for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreventiveCare {
    pub id: String,
    pub patient: String,
    pub care_type: CareType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scheduled_date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<Timestamp>,
    #[serde(default)]
    pub status: CareStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<Timestamp>,
    #[serde(default)]
    pub frequency: Frequency,
    pub assigned_by: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PreventiveCare {
    /// Moves the item to `status`.
    ///
    /// The first move into `completed` stamps `completed_date` with `now`; a
    /// date that is already present is never overwritten.
    pub fn set_status(&mut self, status: CareStatus, now: Timestamp) {
        self.status = status;
        if status == CareStatus::Completed && self.completed_date.is_none() {
            self.completed_date = Some(now);
        }
    }

    /// Still scheduled but the date has passed.
    #[must_use]
    pub fn is_overdue_at(&self, now: Timestamp) -> bool {
        self.status == CareStatus::Scheduled && self.scheduled_date < now
    }
}

impl Entity for PreventiveCare {
    const KIND: EntityKind = EntityKind::PreventiveCare;

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::datetime;

    fn item(scheduled: Timestamp) -> PreventiveCare {
        PreventiveCare {
            id: "pc1".into(),
            patient: "p1".into(),
            care_type: CareType::Vaccination,
            title: "Flu shot".into(),
            description: None,
            scheduled_date: scheduled,
            completed_date: None,
            status: CareStatus::default(),
            priority: Priority::default(),
            recommendations: Vec::new(),
            notes: None,
            next_due_date: None,
            frequency: Frequency::default(),
            assigned_by: "d1".into(),
            created_at: scheduled,
            updated_at: scheduled,
        }
    }

    #[test]
    fn completing_twice_keeps_first_date() {
        let first = Timestamp::new(datetime!(2024-03-01 09:00:00 UTC));
        let mut care = item(first);

        care.set_status(CareStatus::Completed, first);
        assert_eq!(care.completed_date, Some(first));

        care.set_status(CareStatus::Completed, first + Duration::days(3));
        assert_eq!(care.completed_date, Some(first));
    }

    #[test]
    fn reopening_does_not_clear_completed_date() {
        let first = Timestamp::new(datetime!(2024-03-01 09:00:00 UTC));
        let mut care = item(first);
        care.set_status(CareStatus::Completed, first);
        care.set_status(CareStatus::Scheduled, first + Duration::days(1));
        care.set_status(CareStatus::Completed, first + Duration::days(2));
        assert_eq!(care.completed_date, Some(first));
    }

    #[test]
    fn other_statuses_leave_completed_date_empty() {
        let now = Timestamp::new(datetime!(2024-03-01 09:00:00 UTC));
        let mut care = item(now);
        care.set_status(CareStatus::Cancelled, now);
        assert!(care.completed_date.is_none());
    }

    #[test]
    fn overdue_requires_scheduled_status() {
        let now = Timestamp::new(datetime!(2024-03-10 00:00:00 UTC));
        let mut care = item(now - Duration::days(2));
        assert!(care.is_overdue_at(now));
        care.set_status(CareStatus::Completed, now);
        assert!(!care.is_overdue_at(now));
    }

    #[test]
    fn defaults() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Frequency::default().as_str(), "one-time");
    }
}
