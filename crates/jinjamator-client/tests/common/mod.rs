#![allow(dead_code)]

use chrono::Utc;
use jinjamator_client::{ConnectionConfig, Session};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "root";
pub const PASSWORD: &str = "ciscocisco";

pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// HS256 token the way the server would mint it.
pub fn jwt(iat: i64, exp: i64) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &json!({ "iat": iat, "exp": exp, "id": 1 }),
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}

pub fn api(suffix: &str) -> String {
    format!("/api{}", suffix)
}

pub fn session_for(server: &MockServer) -> Session {
    let config = ConnectionConfig::new(format!("{}/api", server.uri()))
        .with_poll_interval(Duration::from_millis(50));
    Session::new(config).unwrap()
}

/// Mount a login endpoint that hands out `token` with the given expiry.
pub async fn mount_login(server: &MockServer, token: &str, expires_at: i64, expires_in: i64) {
    Mock::given(method("POST"))
        .and(path(api("/aaa/login/local")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "user_id": 1,
            "expires_at": expires_at,
            "expires_in": expires_in,
        })))
        .mount(server)
        .await;
}

/// A session holding a token valid for the next hour.
pub async fn logged_in_session(server: &MockServer) -> Session {
    let issued = now();
    let token = jwt(issued, issued + 3600);
    mount_login(server, &token, issued + 3600, 3600).await;

    let session = session_for(server);
    session.login(USERNAME, PASSWORD).await.unwrap();
    session
}

pub fn task_list() -> serde_json::Value {
    json!({
        "tasks": [
            {
                "id": "1",
                "path": "vendor/generic/ssh/collect_raw_output",
                "base_dir": "/opt/jinjamator/tasks",
                "description": "Run a command over SSH and return the raw output"
            },
            {
                "id": "2",
                "path": "vendor/generic/ssh/collect_parsed_output",
                "base_dir": "/opt/jinjamator/tasks",
                "description": "Run a command over SSH and parse it with textfsm"
            }
        ]
    })
}

/// Task list for tests that may or may not look up a task.
pub async fn serve_task_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(api("/tasks")))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_list()))
        .mount(server)
        .await;
}

pub async fn mount_task_list(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(api("/tasks")))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_list()))
        .expect(expected_calls)
        .mount(server)
        .await;
}
