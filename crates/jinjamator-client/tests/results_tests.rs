mod common;

use common::*;
use jinjamator_client::{ClientError, ResultSet, Session};
use serde_json::json;
use wiremock::matchers::{header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn results_with(server: &MockServer, session: &Session, payload: serde_json::Value) -> ResultSet {
    Mock::given(method("GET"))
        .and(path(api("/jobs/abc123")))
        .and(query_param("log-level", "INFO"))
        .respond_with(ResponseTemplate::new(200).set_body_json(payload))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(api("/jobs/abc123")))
        .and(query_param("log-level", "TASKLET_RESULT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "SUCCESS" })))
        .mount(server)
        .await;

    session.job("abc123").results().await.unwrap()
}

/// Deterministic, non-repeating-at-4KiB content.
fn file_content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn test_last_message_and_files() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server).await;
    let results = results_with(
        &server,
        &session,
        json!({
            "state": "SUCCESS",
            "log": [ { "t1": "a" }, { "t2": "b" } ],
            "files": ["show_inventory.xlsx", "raw.txt"],
        }),
    )
    .await;

    assert_eq!(results.job_id(), "abc123");
    assert_eq!(results.last_message().unwrap(), "b");
    assert_eq!(results.files(), ["show_inventory.xlsx", "raw.txt"]);
    assert_eq!(results.raw()["state"], "SUCCESS");
}

#[tokio::test]
async fn test_empty_log_has_no_results() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server).await;
    let results = results_with(&server, &session, json!({ "log": [], "files": [] })).await;

    let err = results.last_message().unwrap_err();
    assert!(matches!(err, ClientError::NoResults { .. }));
    assert!(results.files().is_empty());
}

#[tokio::test]
async fn test_save_to_writes_exact_bytes() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server).await;
    let content = file_content(100_003);
    Mock::given(method("GET"))
        .and(path(api("/files/download/abc123/show_inventory.xlsx")))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .expect(1)
        .mount(&server)
        .await;
    let results = results_with(
        &server,
        &session,
        json!({ "log": [ { "t": "done" } ], "files": ["show_inventory.xlsx"] }),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("inventory.xlsx");
    let saved = results
        .save_to("show_inventory.xlsx", &destination)
        .await
        .unwrap();

    assert_eq!(saved, destination);
    let written = std::fs::read(&destination).unwrap();
    assert_eq!(written.len(), content.len());
    assert!(written == content);
}

#[tokio::test]
async fn test_save_empty_file() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server).await;
    Mock::given(method("GET"))
        .and(path(api("/files/download/abc123/empty.txt")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let results = results_with(&server, &session, json!({ "files": ["empty.txt"] })).await;

    let dir = tempfile::tempdir().unwrap();
    let saved = results.save_to("empty.txt", dir.path().join("empty.txt")).await.unwrap();
    assert_eq!(std::fs::metadata(saved).unwrap().len(), 0);
}

#[tokio::test]
async fn test_download_streams_chunks() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server).await;
    let content = file_content(20_000);
    Mock::given(method("GET"))
        .and(path(api("/files/download/abc123/report%20v1.txt")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .mount(&server)
        .await;
    let results = results_with(&server, &session, json!({ "files": ["report v1.txt"] })).await;

    let mut download = results.download("report v1.txt").await.unwrap();
    assert_eq!(download.content_length(), Some(20_000));
    let mut received = Vec::new();
    while let Some(chunk) = download.chunk().await.unwrap() {
        received.extend_from_slice(&chunk);
    }
    assert!(received == content);
}

#[tokio::test]
async fn test_missing_file() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server).await;
    Mock::given(method("GET"))
        .and(path(api("/files/download/abc123/nope.txt")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let results = results_with(&server, &session, json!({ "files": [] })).await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("nope.txt");
    match results.save_to("nope.txt", &destination).await.unwrap_err() {
        ClientError::FileNotFound { job_id, filename, status } => {
            assert_eq!(job_id, "abc123");
            assert_eq!(filename, "nope.txt");
            assert_eq!(status, 404);
        }
        other => panic!("expected FileNotFound, got {:?}", other),
    }
    assert!(!destination.exists());
}

#[tokio::test]
async fn test_job_saves_file_without_fetching_results() {
    let server = MockServer::start().await;
    let session = logged_in_session(&server).await;
    let content = file_content(9_000);
    Mock::given(method("GET"))
        .and(path(api("/files/download/abc123/raw.txt")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content.clone()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api("/jobs/abc123")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "state": "SUCCESS" })))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let job = session.job("abc123");
    let saved = job.save_to("raw.txt", dir.path().join("raw.txt")).await.unwrap();
    assert!(std::fs::read(saved).unwrap() == content);

    let body = job.download("raw.txt").await.unwrap().bytes().await.unwrap();
    assert_eq!(body.len(), content.len());
}
