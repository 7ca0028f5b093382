use serde::Serialize;
use serde::de::DeserializeOwned;

wire_enum! {
    /// The document collections the API manages.
    EntityKind {
        User => "users",
        Patient => "patients",
        Appointment => "appointments",
        HealthRecord => "healthRecords",
        PreventiveCare => "preventiveCare",
    }
}

impl EntityKind {
    /// Collection name used by storage backends.
    #[must_use]
    pub fn collection(&self) -> &'static str {
        self.as_str()
    }

    /// Human-readable label used in response messages.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::User => "User",
            EntityKind::Patient => "Patient profile",
            EntityKind::Appointment => "Appointment",
            EntityKind::HealthRecord => "Health record",
            EntityKind::PreventiveCare => "Preventive care item",
        }
    }

    /// Fields whose string value identifies at most one document.
    #[must_use]
    pub fn unique_fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::User => &["email"],
            EntityKind::Patient => &["userId"],
            EntityKind::Appointment | EntityKind::HealthRecord | EntityKind::PreventiveCare => &[],
        }
    }
}

/// A persisted record bound to one collection.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_match_search_type_names() {
        assert_eq!(EntityKind::HealthRecord.collection(), "healthRecords");
        assert_eq!(EntityKind::PreventiveCare.collection(), "preventiveCare");
        assert_eq!(EntityKind::ALL.len(), 5);
    }

    #[test]
    fn labels() {
        assert_eq!(EntityKind::Appointment.label(), "Appointment");
        assert_eq!(EntityKind::Patient.label(), "Patient profile");
    }

    #[test]
    fn account_and_profile_keys_are_unique() {
        assert_eq!(EntityKind::User.unique_fields(), ["email"]);
        assert_eq!(EntityKind::Patient.unique_fields(), ["userId"]);
        assert!(EntityKind::Appointment.unique_fields().is_empty());
    }
}
