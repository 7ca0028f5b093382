mod common;

use carenest_core::Timestamp;
use carenest_server::AppConfig;
use common::{Account, TestServer, get_json, post_json, register, start_server};
use reqwest::StatusCode;
use serde_json::{Value, json};
use time::Duration;

struct Cast {
    patient: Account,
    other_patient: Account,
    doctor: Account,
}

async fn cast(server: &TestServer) -> Cast {
    Cast {
        patient: register(server, "Pat Lee", "pat@example.com", "patient").await,
        other_patient: register(server, "Quinn Park", "quinn@example.com", "patient").await,
        doctor: register(server, "Dana Reyes", "dana@example.com", "doctor").await,
    }
}

async fn book(server: &TestServer, patient: &Account, doctor: &Account) -> String {
    let (status, body) = post_json(
        server,
        patient,
        "/api/appointments",
        &json!({
            "doctor": doctor.id,
            "appointmentDate": Timestamp::now() + Duration::days(3),
            "appointmentTime": "09:30",
            "type": "checkup",
            "reason": "Annual checkup and blood pressure review"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().expect("appointment id").to_string()
}

async fn record_vitals(
    server: &TestServer,
    doctor: &Account,
    patient: &Account,
    date: Timestamp,
    heart_rate: u32,
) -> Value {
    let (status, body) = post_json(
        server,
        doctor,
        "/api/health-records",
        &json!({
            "patient": patient.id,
            "recordType": "vital-signs",
            "title": "Routine vitals",
            "date": date,
            "vitalSigns": {
                "heartRate": heart_rate,
                "bloodPressure": { "systolic": 120, "diastolic": 80 }
            }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

#[tokio::test]
async fn booked_appointment_is_visible_to_its_participants_only() {
    let server = start_server(&AppConfig::default()).await;
    let c = cast(&server).await;
    let id = book(&server, &c.patient, &c.doctor).await;

    let (status, body) = get_json(&server, &c.patient, "/api/appointments").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["patient"], c.patient.id.as_str());

    let (_, body) = get_json(&server, &c.doctor, "/api/appointments").await;
    assert_eq!(body["count"], 1);

    let (_, body) = get_json(&server, &c.other_patient, "/api/appointments").await;
    assert_eq!(body["count"], 0);

    // Existing but foreign record is forbidden; a missing one is not found.
    let (status, body) =
        get_json(&server, &c.other_patient, &format!("/api/appointments/{id}")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
    let (status, body) =
        get_json(&server, &c.other_patient, "/api/appointments/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Appointment not found");

    server.stop().await;
}

#[tokio::test]
async fn cancelling_keeps_the_appointment() {
    let server = start_server(&AppConfig::default()).await;
    let c = cast(&server).await;
    let id = book(&server, &c.patient, &c.doctor).await;

    let resp = server
        .client
        .delete(server.url(&format!("/api/appointments/{id}")))
        .bearer_auth(&c.patient.token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Appointment cancelled successfully");

    let (_, body) = get_json(&server, &c.patient, "/api/appointments").await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["status"], "cancelled");

    server.stop().await;
}

#[tokio::test]
async fn recorded_vitals_show_on_the_patient_dashboard() {
    let server = start_server(&AppConfig::default()).await;
    let c = cast(&server).await;
    record_vitals(&server, &c.doctor, &c.patient, Timestamp::now(), 72).await;

    let (status, body) = get_json(&server, &c.patient, "/api/analytics/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    let records = &body["data"]["healthRecords"];
    assert_eq!(records["total"], 1);
    assert_eq!(records["recent"], 1);
    assert_eq!(records["byType"], json!({ "vital-signs": 1 }));

    let (_, body) = get_json(&server, &c.other_patient, "/api/analytics/dashboard").await;
    assert_eq!(body["data"]["healthRecords"]["total"], 0);

    // Patients cannot write clinical records.
    let (status, _) = post_json(
        &server,
        &c.patient,
        "/api/health-records",
        &json!({ "patient": c.patient.id, "recordType": "other", "title": "Self report" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    server.stop().await;
}

#[tokio::test]
async fn health_trends_are_oldest_first() {
    let server = start_server(&AppConfig::default()).await;
    let c = cast(&server).await;
    let now = Timestamp::now();
    for (days_ago, rate) in [(2, 70), (10, 80), (5, 75)] {
        record_vitals(&server, &c.doctor, &c.patient, now - Duration::days(days_ago), rate).await;
    }

    let (status, body) = get_json(&server, &c.patient, "/api/analytics/health-trends").await;
    assert_eq!(status, StatusCode::OK);
    let rates: Vec<_> = body["data"]
        .as_array()
        .expect("trend array")
        .iter()
        .map(|p| p["heartRate"].as_u64().unwrap())
        .collect();
    assert_eq!(rates, [80, 75, 70]);

    let start = now - Duration::days(6);
    let (_, body) = get_json(
        &server,
        &c.patient,
        &format!("/api/analytics/health-trends?startDate={start}"),
    )
    .await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    server.stop().await;
}

#[tokio::test]
async fn search_requires_two_characters() {
    let server = start_server(&AppConfig::default()).await;
    let c = cast(&server).await;
    book(&server, &c.patient, &c.doctor).await;

    let (status, body) = get_json(&server, &c.patient, "/api/search?q=a").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Search query must be at least 2 characters");

    let (status, body) = get_json(&server, &c.patient, "/api/search?q=CHECKUP").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalResults"], 1);
    assert_eq!(body["results"]["users"], json!([]));

    let (_, body) = get_json(&server, &c.other_patient, "/api/search?q=checkup").await;
    assert_eq!(body["totalResults"], 0);

    let (_, body) = get_json(&server, &c.doctor, "/api/search?q=example.com&type=users").await;
    assert_eq!(body["results"]["users"].as_array().map(Vec::len), Some(3));
    assert!(body["results"]["users"][0].get("passwordHash").is_none());

    server.stop().await;
}

#[tokio::test]
async fn bearer_credentials_are_required() {
    let server = start_server(&AppConfig::default()).await;

    let resp = server
        .client
        .get(server.url("/api/appointments"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Not authorized to access this route");

    let resp = server
        .client
        .get(server.url("/api/auth/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": "nobody@example.com", "password": "Secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    server.stop().await;
}

#[tokio::test]
async fn login_and_profile_round_trip() {
    let server = start_server(&AppConfig::default()).await;
    let pat = register(&server, "Pat Lee", "pat@example.com", "patient").await;

    let resp = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "email": "PAT@example.com", "password": "Secret123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["id"], pat.id.as_str());

    // The profile is created on first access and reused afterwards.
    let (status, first) = get_json(&server, &pat, "/api/patients/me").await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = get_json(&server, &pat, "/api/patients/me").await;
    assert_eq!(first["data"]["id"], second["data"]["id"]);

    let (status, body) = post_json(&server, &pat, "/api/patients", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Patient profile already exists");

    let (status, _) = get_json(&server, &pat, "/api/users").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_registrations_share_one_account() {
    let server = start_server(&AppConfig::default()).await;

    let attempts = (0..8).map(|_| {
        server
            .client
            .post(server.url("/api/auth/register"))
            .json(&json!({
                "name": "Pat Lee",
                "email": "pat@example.com",
                "password": "Secret123"
            }))
            .send()
    });
    let statuses: Vec<_> = futures_util::future::join_all(attempts)
        .await
        .into_iter()
        .map(|resp| resp.unwrap().status())
        .collect();
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CREATED).count(),
        1,
        "{statuses:?}"
    );
    assert!(
        statuses
            .iter()
            .all(|s| *s == StatusCode::CREATED || *s == StatusCode::BAD_REQUEST)
    );

    let admin = register(&server, "Avery Admin", "avery@example.com", "admin").await;
    let (_, body) = get_json(&server, &admin, "/api/users").await;
    let pats = body["data"]
        .as_array()
        .expect("user list")
        .iter()
        .filter(|u| u["email"] == "pat@example.com")
        .count();
    assert_eq!(pats, 1);

    server.stop().await;
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let server = start_server(&AppConfig::default()).await;

    let body: Value = server
        .client
        .get(server.url("/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "OK");

    let resp = server
        .client
        .get(server.url("/api/nowhere"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Route not found");

    server.stop().await;
}
