//! Gemini client and extractor behaviour against a mocked REST API.

#![cfg(feature = "gemini")]

use finchat::llm::{GeminiClient, TableExtractor};
use finchat::{FinChatError, RawTable};
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_pdf(dir: &TempDir) -> PathBuf {
    let pdf = dir.path().join("FY2023.pdf");
    std::fs::write(&pdf, b"%PDF-1.4 test").unwrap();
    pdf
}

fn client_for(server: &MockServer) -> GeminiClient {
    GeminiClient::new("test-key".to_string())
        .with_base_url(server.uri(), format!("{}/upload", server.uri()))
}

/// Mounts the two resumable upload steps; the finalize step reports `state`.
async fn mount_upload(server: &MockServer, state: &str) {
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-goog-upload-url", format!("{}/resumable", server.uri()).as_str())
                .set_body_json(json!({})),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/resumable"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {
                "uri": format!("{}/files/fy2023", server.uri()),
                "name": "files/fy2023",
                "state": state,
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_upload_waits_for_active_state() {
    let server = MockServer::start().await;
    mount_upload(&server, "PROCESSING").await;
    Mock::given(method("GET"))
        .and(path("/files/fy2023"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "files/fy2023",
            "state": "ACTIVE",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let document = client_for(&server)
        .upload_document(&write_pdf(&dir))
        .await
        .unwrap();

    assert!(document.is_active());
    assert_eq!(document.name, "files/fy2023");
    assert_eq!(document.display_name, "FY2023.pdf");
    assert_eq!(document.mime_type, "application/pdf");
}

#[tokio::test]
async fn test_upload_stops_when_status_check_fails() {
    let server = MockServer::start().await;
    mount_upload(&server, "PROCESSING").await;
    Mock::given(method("GET"))
        .and(path("/files/fy2023"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "File not found" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let result = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        client_for(&server).upload_document(&write_pdf(&dir)),
    )
    .await
    .expect("upload must not keep polling after an error response");

    match result {
        Err(FinChatError::Gemini(message)) => assert!(message.contains("404")),
        other => panic!("expected a Gemini error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_rejects_unknown_state() {
    let server = MockServer::start().await;
    mount_upload(&server, "STATE_UNSPECIFIED").await;
    Mock::given(method("GET"))
        .and(path("/files/fy2023"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let result = client_for(&server).upload_document(&write_pdf(&dir)).await;
    assert!(matches!(result, Err(FinChatError::Gemini(_))));
}

#[tokio::test]
async fn test_extract_tables_with_custom_prompt() {
    let server = MockServer::start().await;
    mount_upload(&server, "ACTIVE").await;

    let tables_json = json!({
        "CONSOLIDATED BALANCE SHEETS": [["Item", "2023"], ["Cash", "$1,500"]],
    })
    .to_string();
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-pro:generateContent"))
        .and(body_string_contains("Return only the balance sheet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": tables_json }] },
                "finishReason": "STOP",
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/files/fy2023"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let extractor = TableExtractor::new(client_for(&server), "gemini-2.5-pro")
        .with_system_prompt("Return only the balance sheet as JSON.");
    let targets = vec!["CONSOLIDATED BALANCE SHEETS".to_string()];
    let dir = tempfile::tempdir().unwrap();

    let tables = extractor
        .extract_tables(&write_pdf(&dir), &targets, None)
        .await
        .unwrap();

    assert_eq!(tables.extracted_names(), targets);
    assert!(matches!(
        tables.get("CONSOLIDATED BALANCE SHEETS"),
        Some(RawTable::Grid(rows)) if rows.len() == 2
    ));
}
