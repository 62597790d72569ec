//! Escrow API
//!
//! The remote service seen as five calls. [`HttpEscrowApi`] talks to the real
//! service over HTTPS; tests swap in a mock.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ETAG;
use serde::de::DeserializeOwned;

use super::types::{
    ConfirmUploadRequest, ConfirmUploadResponse, CreateArtifactRequest, CreateArtifactResponse,
    ErrorBody, PartResult, PresignedUrlsRequest, PresignedUrlsResponse,
};
use crate::error::RemoteFailure;

/// Remote escrow service
#[async_trait]
pub trait EscrowApi: Send + Sync {
    /// Allocate an artifact in a container, returning its identifier
    async fn create_artifact(&self, container_id: &str, filename: &str) -> Result<String, RemoteFailure>;

    /// Request `num_parts` pre-signed part URLs, keyed by part number as sent by the service
    async fn presigned_urls(
        &self,
        artifact_id: &str,
        num_parts: u64,
    ) -> Result<HashMap<String, String>, RemoteFailure>;

    /// PUT a part to its pre-signed URL, returning the raw ETag header
    async fn put_part(&self, url: &str, data: Vec<u8>) -> Result<String, RemoteFailure>;

    /// Confirm the upload with all parts, returning the certificate URL
    async fn confirm_upload(&self, artifact_id: &str, parts: &[PartResult]) -> Result<String, RemoteFailure>;

    /// Delete an unfinished artifact
    async fn delete_artifact(&self, artifact_id: &str) -> Result<(), RemoteFailure>;
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// Escrow API over HTTPS
///
/// Service calls authenticate with the API key as the basic-auth username and
/// an empty password. Part uploads carry no credentials; the pre-signed URL
/// is the authorization.
///
/// The request timeout applies to service calls only. Part uploads are bounded
/// by the connect timeout, since sending a large part can take arbitrarily long.
#[derive(Clone)]
pub struct HttpEscrowApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    request_timeout: Option<Duration>,
}

impl HttpEscrowApi {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, RemoteFailure> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("softescrow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            request_timeout: Some(timeout),
            ..Self::with_client(client, base_url, api_key)
        })
    }

    /// Use a preconfigured client; no per-request timeout is added
    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            request_timeout: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticate a call to the escrow service
    fn service(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.basic_auth(&self.api_key, Some(""));
        match self.request_timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    fn artifact_url(&self, artifact_id: &str, suffix: &str) -> String {
        format!(
            "{}/artifacts/{}{}",
            self.base_url,
            urlencoding::encode(artifact_id),
            suffix
        )
    }
}

#[async_trait]
impl EscrowApi for HttpEscrowApi {
    async fn create_artifact(&self, container_id: &str, filename: &str) -> Result<String, RemoteFailure> {
        let request = CreateArtifactRequest {
            container_id: container_id.to_string(),
            filename: filename.to_string(),
        };

        let response = self
            .service(self.client.post(format!("{}/artifacts", self.base_url)))
            .json(&request)
            .send()
            .await?;

        let body: CreateArtifactResponse = parse_json(check_status(response).await?).await?;
        Ok(body.artifact_id)
    }

    async fn presigned_urls(
        &self,
        artifact_id: &str,
        num_parts: u64,
    ) -> Result<HashMap<String, String>, RemoteFailure> {
        let response = self
            .service(self.client.post(self.artifact_url(artifact_id, "/generate-multipart-presigned-urls")))
            .json(&PresignedUrlsRequest { num_parts })
            .send()
            .await?;

        let body: PresignedUrlsResponse = parse_json(check_status(response).await?).await?;
        Ok(body.presigned_urls)
    }

    async fn put_part(&self, url: &str, data: Vec<u8>) -> Result<String, RemoteFailure> {
        let response = self.client.put(url).body(data).send().await?;
        let response = check_status(response).await?;

        response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(RemoteFailure::MissingETag)
    }

    async fn confirm_upload(&self, artifact_id: &str, parts: &[PartResult]) -> Result<String, RemoteFailure> {
        let request = ConfirmUploadRequest {
            parts: parts.to_vec(),
        };

        let response = self
            .service(self.client.post(self.artifact_url(artifact_id, "/confirm-multipart-upload")))
            .json(&request)
            .send()
            .await?;

        let body: ConfirmUploadResponse = parse_json(check_status(response).await?).await?;
        Ok(body.certificate_url)
    }

    async fn delete_artifact(&self, artifact_id: &str) -> Result<(), RemoteFailure> {
        let response = self
            .service(self.client.delete(self.artifact_url(artifact_id, "")))
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

/// Turn a non-success response into [`RemoteFailure::Status`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteFailure> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RemoteFailure::Status {
        status: status.as_u16(),
        errors: extract_errors(&body),
    })
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteFailure> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| RemoteFailure::MalformedResponse(e.to_string()))
}

/// The service's `errors` payload if the body carries one, else the body itself
fn extract_errors(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            errors: serde_json::Value::String(message),
        }) => message,
        Ok(ErrorBody { errors }) => errors.to_string(),
        Err(_) => body.trim().to_string(),
    }
}

// ============================================================================
// Mock Implementation
// ============================================================================
