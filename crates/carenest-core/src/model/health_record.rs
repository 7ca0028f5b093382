use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind};
use crate::time::Timestamp;

wire_enum! {
    RecordType {
        VitalSigns => "vital-signs",
        LabResult => "lab-result",
        Imaging => "imaging",
        Vaccination => "vaccination",
        Screening => "screening",
        Other => "other",
    }
}

wire_enum! {
    TemperatureUnit {
        Celsius => "celsius",
        Fahrenheit => "fahrenheit",
    }
}

wire_enum! {
    LabStatus {
        Normal => "normal",
        Abnormal => "abnormal",
        Critical => "critical",
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BloodPressure {
    pub systolic: u32,
    pub diastolic: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Temperature {
    pub value: f64,
    #[serde(default = "default_temperature_unit")]
    pub unit: TemperatureUnit,
}

fn default_temperature_unit() -> TemperatureUnit {
    TemperatureUnit::Celsius
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<BloodPressure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Temperature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabResults {
    pub test_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LabStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub file_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

/// A clinical observation recorded by a doctor or admin for one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub id: String,
    pub patient: String,
    pub record_type: RecordType,
    pub title: String,
    pub date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vital_signs: Option<VitalSigns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_results: Option<LabResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_by: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Entity for HealthRecord {
    const KIND: EntityKind = EntityKind::HealthRecord;

    fn id(&self) -> &str {
        &self.id
    }
}
