use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind};
use crate::time::Timestamp;

wire_enum! {
    ConditionStatus {
        Active => "active",
        Resolved => "resolved",
        Chronic => "chronic",
    }
}

wire_enum! {
    Severity {
        Mild => "mild",
        Moderate => "moderate",
        Severe => "severe",
    }
}

wire_enum! {
    BloodGroup {
        APositive => "A+",
        ANegative => "A-",
        BPositive => "B+",
        BNegative => "B-",
        AbPositive => "AB+",
        AbNegative => "AB-",
        OPositive => "O+",
        ONegative => "O-",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicalCondition {
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConditionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Allergy {
    pub allergen: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prescribed_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Insurance {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_number: Option<String>,
}

/// A value with its unit, e.g. `{ "value": 180, "unit": "cm" }`.
///
/// Height accepts `cm`/`inches` and weight `kg`/`lbs`; the unit check lives
/// with request validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub unit: String,
}

/// Medical background for one patient account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub medical_history: Vec<MedicalCondition>,
    #[serde(default)]
    pub allergies: Vec<Allergy>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance: Option<Insurance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<BloodGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Measurement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Measurement>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PatientProfile {
    /// A profile with no medical data yet.
    pub fn empty(id: impl Into<String>, user_id: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            medical_history: Vec::new(),
            allergies: Vec::new(),
            medications: Vec::new(),
            emergency_contact: None,
            insurance: None,
            blood_group: None,
            height: None,
            weight: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for PatientProfile {
    const KIND: EntityKind = EntityKind::Patient;

    fn id(&self) -> &str {
        &self.id
    }
}
