//! Domain model shared by every carenest crate.
//!
//! Entities are plain serde structs with camelCase field names so that the
//! JSON stored by a backend and the JSON returned over HTTP are the same shape.

#[macro_use]
mod macros;

pub mod entity;
pub mod error;
pub mod id;
pub mod model;
pub mod role;
pub mod time;

pub use entity::{Entity, EntityKind};
pub use error::{CoreError, Result};
pub use id::generate_id;
pub use model::{
    Allergy, Appointment, AppointmentStatus, AppointmentType, Attachment, BloodGroup,
    BloodPressure, CareStatus, CareType, ConditionStatus, EmergencyContact, Frequency,
    HealthRecord, Insurance, LabResults, LabStatus, Measurement, MedicalCondition, Medication,
    PatientProfile, Prescription, PreventiveCare, Priority, RecordType, Severity, Temperature,
    TemperatureUnit, User, UserProfile, VitalSigns,
};
pub use role::Role;
pub use time::{Timestamp, now_utc};
