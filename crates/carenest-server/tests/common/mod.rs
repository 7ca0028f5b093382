#![allow(dead_code)]

use carenest_server::{AppConfig, build_app};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

pub async fn start_server(config: &AppConfig) -> TestServer {
    let app = build_app(config).await.expect("build app");

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        shutdown: Some(tx),
        handle: Some(handle),
    }
}

/// A registered account: its id and bearer token.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: String,
    pub token: String,
}

pub async fn register(server: &TestServer, name: &str, email: &str, role: &str) -> Account {
    let resp = server
        .client
        .post(server.url("/api/auth/register"))
        .json(&json!({
            "name": name,
            "email": email,
            "password": "Secret123",
            "role": role
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED, "register {email}");
    let body: Value = resp.json().await.unwrap();
    Account {
        id: body["user"]["id"].as_str().expect("user id").to_string(),
        token: body["token"].as_str().expect("token").to_string(),
    }
}

pub async fn get_json(server: &TestServer, who: &Account, path: &str) -> (reqwest::StatusCode, Value) {
    let resp = server
        .client
        .get(server.url(path))
        .bearer_auth(&who.token)
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

pub async fn post_json(
    server: &TestServer,
    who: &Account,
    path: &str,
    body: &Value,
) -> (reqwest::StatusCode, Value) {
    let resp = server
        .client
        .post(server.url(path))
        .bearer_auth(&who.token)
        .json(body)
        .send()
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}
