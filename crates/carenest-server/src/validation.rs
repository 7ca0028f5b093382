//! Field rules shared by the request handlers.

use std::sync::LazyLock;

use carenest_api::Validator;
use carenest_core::{BloodPressure, Measurement, VitalSigns};

static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex")
});

static PHONE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^[+]?[(]?[0-9]{1,4}[)]?[-\s.]?[(]?[0-9]{1,4}[)]?[-\s.]?[0-9]{1,9}$")
        .expect("Invalid phone regex")
});

/// 24h `HH:MM`; a single-digit hour is accepted.
static TIME_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").expect("Invalid time regex")
});

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

pub fn name(v: &mut Validator, value: &str) {
    if value.trim().is_empty() {
        v.fail("name", "Name is required");
    } else {
        v.check(
            (2..=50).contains(&char_len(value)),
            "name",
            "Name must be between 2 and 50 characters",
        );
    }
}

pub fn email(v: &mut Validator, value: &str) {
    v.check(
        EMAIL_REGEX.is_match(value.trim()),
        "email",
        "Please provide a valid email",
    );
}

pub fn password(v: &mut Validator, value: &str) {
    if value.chars().count() < 6 {
        v.fail("password", "Password must be at least 6 characters");
        return;
    }
    let complex = value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit());
    v.check(
        complex,
        "password",
        "Password must contain at least one uppercase letter, one lowercase letter, and one number",
    );
}

pub fn phone(v: &mut Validator, value: Option<&str>) {
    if let Some(phone) = value {
        v.check(
            PHONE_REGEX.is_match(phone.trim()),
            "phone",
            "Please provide a valid phone number",
        );
    }
}

pub fn appointment_time(v: &mut Validator, value: &str) {
    if value.trim().is_empty() {
        v.fail("appointmentTime", "Appointment time is required");
    } else {
        v.check(
            TIME_REGEX.is_match(value.trim()),
            "appointmentTime",
            "Invalid time format (use HH:MM)",
        );
    }
}

pub fn reason(v: &mut Validator, value: &str) {
    if value.trim().is_empty() {
        v.fail("reason", "Reason is required");
    } else {
        v.check(
            (10..=500).contains(&char_len(value)),
            "reason",
            "Reason must be between 10 and 500 characters",
        );
    }
}

pub fn duration(v: &mut Validator, value: Option<u32>) {
    if let Some(minutes) = value {
        v.check(
            (15..=240).contains(&minutes),
            "duration",
            "Duration must be between 15 and 240 minutes",
        );
    }
}

pub fn title(v: &mut Validator, value: &str) {
    if value.trim().is_empty() {
        v.fail("title", "Title is required");
    } else {
        v.check(
            (3..=200).contains(&char_len(value)),
            "title",
            "Title must be between 3 and 200 characters",
        );
    }
}

pub fn required_id(v: &mut Validator, field: &str, label: &str, value: Option<&str>) {
    v.check(
        value.is_some_and(|id| !id.trim().is_empty()),
        field,
        format!("{label} is required"),
    );
}

pub fn vital_signs(v: &mut Validator, vitals: Option<&VitalSigns>) {
    let Some(vitals) = vitals else { return };
    if let Some(BloodPressure {
        systolic,
        diastolic,
    }) = &vitals.blood_pressure
    {
        v.check(
            (50..=250).contains(systolic),
            "vitalSigns.bloodPressure.systolic",
            "Systolic pressure must be between 50 and 250",
        );
        v.check(
            (30..=150).contains(diastolic),
            "vitalSigns.bloodPressure.diastolic",
            "Diastolic pressure must be between 30 and 150",
        );
    }
    if let Some(rate) = vitals.heart_rate {
        v.check(
            (30..=220).contains(&rate),
            "vitalSigns.heartRate",
            "Heart rate must be between 30 and 220 bpm",
        );
    }
}

pub fn measurement(v: &mut Validator, field: &str, value: Option<&Measurement>, units: &[&str]) {
    if let Some(m) = value {
        v.check(
            units.contains(&m.unit.as_str()),
            &format!("{field}.unit"),
            format!("{field} unit must be one of {}", units.join(", ")),
        );
        v.check(m.value > 0.0, &format!("{field}.value"), format!("{field} must be positive"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(f: impl FnOnce(&mut Validator)) -> usize {
        let mut v = Validator::new();
        f(&mut v);
        match v.finish() {
            Ok(()) => 0,
            Err(carenest_api::ApiError::Validation { errors, .. }) => errors.len(),
            Err(other) => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn password_rules() {
        assert_eq!(errors(|v| password(v, "Secret1")), 0);
        assert_eq!(errors(|v| password(v, "Ab1")), 1);
        assert_eq!(errors(|v| password(v, "secret123")), 1);
        assert_eq!(errors(|v| password(v, "SECRETabc")), 1);
    }

    #[test]
    fn time_format() {
        assert_eq!(errors(|v| appointment_time(v, "09:30")), 0);
        assert_eq!(errors(|v| appointment_time(v, "9:30")), 0);
        assert_eq!(errors(|v| appointment_time(v, "24:00")), 1);
        assert_eq!(errors(|v| appointment_time(v, "")), 1);
    }

    #[test]
    fn email_and_phone() {
        assert_eq!(errors(|v| email(v, "pat@example.com")), 0);
        assert_eq!(errors(|v| email(v, "not-an-email")), 1);
        assert_eq!(errors(|v| phone(v, Some("+1 (555) 123-4567"))), 0);
        assert_eq!(errors(|v| phone(v, Some("call me"))), 1);
        assert_eq!(errors(|v| phone(v, None)), 0);
    }

    #[test]
    fn vitals_ranges() {
        let vitals = VitalSigns {
            blood_pressure: Some(BloodPressure {
                systolic: 300,
                diastolic: 80,
            }),
            heart_rate: Some(20),
            ..VitalSigns::default()
        };
        assert_eq!(errors(|v| vital_signs(v, Some(&vitals))), 2);
    }

    #[test]
    fn measurement_units() {
        let height = Measurement {
            value: 180.0,
            unit: "cm".into(),
        };
        assert_eq!(errors(|v| measurement(v, "height", Some(&height), &["cm", "inches"])), 0);
        assert_eq!(errors(|v| measurement(v, "weight", Some(&height), &["kg", "lbs"])), 1);
    }

    #[test]
    fn reason_and_title_lengths() {
        assert_eq!(errors(|v| reason(v, "too short")), 1);
        assert_eq!(errors(|v| reason(v, "Persistent headache for a week")), 0);
        assert_eq!(errors(|v| title(v, "BP")), 1);
        assert_eq!(errors(|v| duration(v, Some(10))), 1);
    }
}
