//! Upload flow against a mocked SoftEscrow service.
//!
//! The mock server plays both the escrow API (under `/api`) and the storage
//! backend behind the pre-signed URLs (under `/s3`).

use std::io::Write;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use softescrow::{EscrowApi, HttpEscrowApi, RemoteFailure, UploadError, UploadRequest, Uploader};
use tempfile::NamedTempFile;
use wiremock::matchers::{body_bytes, body_json, header, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

const ARTIFACT_ID: &str = "art-1";
const CERTIFICATE_URL: &str = "https://portal.softescrow.com/certificates/art-1";

/// `key` as username with an empty password
const BASIC_AUTH: &str = "Basic a2V5Og==";

/// Matches requests that carry no Authorization header
struct NoAuthorization;

impl Match for NoAuthorization {
    fn matches(&self, request: &Request) -> bool {
        !request.headers.contains_key("authorization")
    }
}

fn source_file(data: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("deposit")
        .suffix(".zip")
        .tempfile()
        .unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}

fn uploader(server: &MockServer, concurrency: usize) -> Uploader {
    let api = HttpEscrowApi::new(
        &format!("{}/api", server.uri()),
        "key",
        Duration::from_secs(10),
    )
    .unwrap();
    Uploader::new(Arc::new(api), concurrency)
}

fn request(file: &NamedTempFile, part_size: u64) -> UploadRequest {
    UploadRequest::new("container-1", file.path()).with_part_size(NonZeroU64::new(part_size))
}

async fn mount_create(server: &MockServer, file: &NamedTempFile) {
    let filename = file.path().file_name().unwrap().to_str().unwrap();
    Mock::given(method("POST"))
        .and(path("/api/artifacts"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_json(json!({"container_id": "container-1", "filename": filename})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"artifact_id": ARTIFACT_ID})))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_presigned(server: &MockServer, parts: u64) {
    let urls: serde_json::Map<String, serde_json::Value> = (1..=parts)
        .map(|n| (n.to_string(), json!(format!("{}/s3/part/{}", server.uri(), n))))
        .collect();

    Mock::given(method("POST"))
        .and(path("/api/artifacts/art-1/generate-multipart-presigned-urls"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_json(json!({"num_parts": parts})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"presigned_urls": urls})))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_part(server: &MockServer, part: u64, data: &[u8], expect: u64) {
    Mock::given(method("PUT"))
        .and(path(format!("/s3/part/{}", part)))
        .and(NoAuthorization)
        .and(body_bytes(data.to_vec()))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", format!("\"etag-{}\"", part).as_str()))
        .expect(expect)
        .mount(server)
        .await;
}

async fn mount_delete(server: &MockServer, status: u16, expect: u64) {
    Mock::given(method("DELETE"))
        .and(path("/api/artifacts/art-1"))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(status))
        .expect(expect)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_upload_returns_certificate_url() {
    let server = MockServer::start().await;
    let file = source_file(b"0123456789");

    mount_create(&server, &file).await;
    mount_presigned(&server, 3).await;
    mount_part(&server, 1, b"0123", 1).await;
    mount_part(&server, 2, b"4567", 1).await;
    mount_part(&server, 3, b"89", 1).await;

    Mock::given(method("POST"))
        .and(path("/api/artifacts/art-1/confirm-multipart-upload"))
        .and(header("authorization", BASIC_AUTH))
        .and(body_json(json!({"parts": [
            {"ETag": "etag-1", "PartNumber": 1},
            {"ETag": "etag-2", "PartNumber": 2},
            {"ETag": "etag-3", "PartNumber": 3},
        ]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"certificate_url": CERTIFICATE_URL})))
        .expect(1)
        .mount(&server)
        .await;
    mount_delete(&server, 204, 0).await;

    let confirmation = uploader(&server, 3).upload_file(&request(&file, 4)).await.unwrap();
    assert_eq!(confirmation.certificate_url, CERTIFICATE_URL);
}

#[tokio::test]
async fn test_failed_part_cancels_artifact() {
    let server = MockServer::start().await;
    let file = source_file(b"aaaabbbbcccc");

    mount_create(&server, &file).await;
    mount_presigned(&server, 3).await;
    mount_part(&server, 1, b"aaaa", 1).await;
    Mock::given(method("PUT"))
        .and(path("/s3/part/2"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<Error><Code>AccessDenied</Code></Error>"))
        .expect(1)
        .mount(&server)
        .await;
    mount_part(&server, 3, b"cccc", 0).await;
    mount_delete(&server, 204, 1).await;

    let error = uploader(&server, 1).upload_file(&request(&file, 4)).await.unwrap_err();
    match error {
        UploadError::PartTransfer {
            part,
            failure: RemoteFailure::Status { status, errors },
        } => {
            assert_eq!(part, 2);
            assert_eq!(status, 403);
            assert!(errors.contains("AccessDenied"));
        }
        other => panic!("expected PartTransfer, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_etag_is_transfer_failure() {
    let server = MockServer::start().await;
    let file = source_file(b"abc");

    mount_create(&server, &file).await;
    mount_presigned(&server, 1).await;
    Mock::given(method("PUT"))
        .and(path("/s3/part/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_delete(&server, 204, 1).await;

    let error = uploader(&server, 1).upload_file(&request(&file, 4)).await.unwrap_err();
    assert!(matches!(
        error,
        UploadError::PartTransfer { part: 1, failure: RemoteFailure::MissingETag }
    ));
}

#[tokio::test]
async fn test_failed_confirm_keeps_finish_error_when_cancel_fails() {
    let server = MockServer::start().await;
    let file = source_file(b"abc");

    mount_create(&server, &file).await;
    mount_presigned(&server, 1).await;
    mount_part(&server, 1, b"abc", 1).await;
    Mock::given(method("POST"))
        .and(path("/api/artifacts/art-1/confirm-multipart-upload"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"errors": "Part list does not match"})))
        .expect(1)
        .mount(&server)
        .await;
    mount_delete(&server, 500, 1).await;

    let error = uploader(&server, 1).upload_file(&request(&file, 4)).await.unwrap_err();
    match error {
        UploadError::RemoteFinish(RemoteFailure::Status { status, errors }) => {
            assert_eq!(status, 400);
            assert_eq!(errors, "Part list does not match");
        }
        other => panic!("expected RemoteFinish, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_begin_reports_service_errors() {
    let server = MockServer::start().await;
    let file = source_file(b"abc");

    Mock::given(method("POST"))
        .and(path("/api/artifacts"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"errors": {"container_id": ["Container not found"]}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_delete(&server, 204, 0).await;

    let error = uploader(&server, 1).upload_file(&request(&file, 4)).await.unwrap_err();
    match &error {
        UploadError::RemoteInit(RemoteFailure::Status { status, errors }) => {
            assert_eq!(*status, 422);
            assert!(errors.contains("Container not found"));
        }
        other => panic!("expected RemoteInit, got {:?}", other),
    }
    assert!(error.to_string().starts_with("Could not initialize upload"));
}

#[tokio::test]
async fn test_short_destination_list_cancels_artifact() {
    let server = MockServer::start().await;
    let file = source_file(b"aaaabbbb");

    mount_create(&server, &file).await;
    Mock::given(method("POST"))
        .and(path("/api/artifacts/art-1/generate-multipart-presigned-urls"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "presigned_urls": {"1": format!("{}/s3/part/1", server.uri())}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_part(&server, 1, b"aaaa", 0).await;
    mount_delete(&server, 204, 1).await;

    let error = uploader(&server, 1).upload_file(&request(&file, 4)).await.unwrap_err();
    assert!(matches!(
        error,
        UploadError::RemoteInit(RemoteFailure::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_request_timeout_limits_service_calls_but_not_part_uploads() {
    let server = MockServer::start().await;
    let api = HttpEscrowApi::new(
        &format!("{}/api", server.uri()),
        "key",
        Duration::from_millis(500),
    )
    .unwrap();

    Mock::given(method("PUT"))
        .and(path("/s3/part/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"slow\"")
                .set_delay(Duration::from_millis(1500)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/artifacts"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"artifact_id": ARTIFACT_ID}))
                .set_delay(Duration::from_millis(1500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let etag = api
        .put_part(&format!("{}/s3/part/1", server.uri()), b"data".to_vec())
        .await
        .unwrap();
    assert_eq!(etag, "\"slow\"");

    let result = api.create_artifact("container-1", "deposit.zip").await;
    assert!(matches!(result, Err(RemoteFailure::Transport(_))));
}
