//! Escrow service types
//!
//! Request and response bodies for the artifact endpoints, plus the values
//! an upload session hands between phases.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::RemoteFailure;

// ============================================================================
// Wire Types
// ============================================================================

/// `POST /artifacts`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArtifactRequest {
    pub container_id: String,
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateArtifactResponse {
    pub artifact_id: String,
}

/// `POST /artifacts/{id}/generate-multipart-presigned-urls`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresignedUrlsRequest {
    pub num_parts: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresignedUrlsResponse {
    /// Part number (as a JSON object key) to URL
    pub presigned_urls: HashMap<String, String>,
}

/// `POST /artifacts/{id}/confirm-multipart-upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmUploadRequest {
    pub parts: Vec<PartResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmUploadResponse {
    pub certificate_url: String,
}

/// Error body returned by the service on failure
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub errors: serde_json::Value,
}

// ============================================================================
// Session Values
// ============================================================================

/// Artifact allocated by the service for one upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactHandle {
    id: String,
}

impl ArtifactHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Pre-signed destination URLs keyed by 1-based part number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDestinations {
    urls: BTreeMap<u64, String>,
}

impl PartDestinations {
    /// Build from the service's response, requiring exactly parts `1..=expected`
    pub fn from_response(
        urls: HashMap<String, String>,
        expected: u64,
    ) -> Result<Self, RemoteFailure> {
        let mut by_part = BTreeMap::new();
        for (key, url) in urls {
            let part: u64 = key.trim().parse().map_err(|_| {
                RemoteFailure::MalformedResponse(format!("invalid part number {:?}", key))
            })?;
            if part == 0 || part > expected {
                return Err(RemoteFailure::MalformedResponse(format!(
                    "part number {} outside 1..={}",
                    part, expected
                )));
            }
            if by_part.insert(part, url).is_some() {
                return Err(RemoteFailure::MalformedResponse(format!(
                    "duplicate part number {}",
                    part
                )));
            }
        }

        if by_part.len() as u64 != expected {
            return Err(RemoteFailure::MalformedResponse(format!(
                "expected {} presigned URLs, got {}",
                expected,
                by_part.len()
            )));
        }

        Ok(Self { urls: by_part })
    }

    pub fn get(&self, part_number: u64) -> Option<&str> {
        self.urls.get(&part_number).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// A transferred part, as echoed back to the service at confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartResult {
    #[serde(rename = "ETag")]
    pub etag: String,

    #[serde(rename = "PartNumber")]
    pub part_number: u64,
}

/// Certificate URL proving the deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationReference {
    pub certificate_url: String,
}

impl std::fmt::Display for ConfirmationReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.certificate_url)
    }
}

/// Strip the quotes S3-style services put around ETag values
pub fn normalize_etag(etag: &str) -> &str {
    etag.trim().trim_matches('"')
}

// ============================================================================
// Tests
// ============================================================================
