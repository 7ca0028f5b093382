//! Persisted entity shapes.

mod appointment;
mod health_record;
mod patient;
mod preventive_care;
mod user;

pub use appointment::{Appointment, AppointmentStatus, AppointmentType, Prescription};
pub use health_record::{
    Attachment, BloodPressure, HealthRecord, LabResults, LabStatus, RecordType, Temperature,
    TemperatureUnit, VitalSigns,
};
pub use patient::{
    Allergy, BloodGroup, ConditionStatus, EmergencyContact, Insurance, Measurement,
    MedicalCondition, Medication, PatientProfile, Severity,
};
pub use preventive_care::{CareStatus, CareType, Frequency, PreventiveCare, Priority};
pub use user::{User, UserProfile};
