//! Escrow Session
//!
//! One upload attempt against the escrow service, tracked as a typestate:
//!
//! ```text
//! begin()                 -> EscrowSession<Initialized>
//! request_destinations()  -> EscrowSession<Transferring>
//! transfer_part() x N
//! finish()                -> ConfirmationReference
//! ```
//!
//! A session only exists once the service has allocated an artifact, so
//! `abort()` cannot be called before `begin` succeeds, and `finish` consumes
//! the session so a confirmed artifact cannot be aborted.

use std::sync::Arc;

use futures::TryStreamExt;

use super::api::EscrowApi;
use super::types::{
    normalize_etag, ArtifactHandle, ConfirmationReference, PartDestinations, PartResult,
};
use crate::error::{RemoteFailure, Result, UploadError};
use crate::upload::chunk_reader::{Chunk, ChunkReader};

/// Artifact allocated, no destinations yet
#[derive(Debug)]
pub struct Initialized;

/// Destinations obtained, parts may be sent
#[derive(Debug)]
pub struct Transferring {
    destinations: PartDestinations,
}

/// An upload attempt holding an allocated artifact
pub struct EscrowSession<S> {
    api: Arc<dyn EscrowApi>,
    artifact: ArtifactHandle,
    state: S,
}

/// A failed step that still holds the session, so the caller can release the
/// artifact
pub struct SessionFailure<S> {
    session: EscrowSession<S>,
    error: UploadError,
}

impl<S> EscrowSession<S> {
    pub fn artifact(&self) -> &ArtifactHandle {
        &self.artifact
    }

    /// Delete the artifact on the service
    pub async fn abort(self) -> Result<()> {
        let artifact_id = self.artifact.id().to_string();
        tracing::info!(artifact_id = %artifact_id, "Aborting upload");

        self.api
            .delete_artifact(&artifact_id)
            .await
            .map_err(|failure| UploadError::Abort {
                artifact_id,
                failure,
            })
    }

    /// Pair the session with the error that stopped it
    pub fn fail(self, error: UploadError) -> SessionFailure<S> {
        SessionFailure {
            session: self,
            error,
        }
    }
}

impl EscrowSession<Initialized> {
    /// Allocate an artifact named `filename` in `container_id`
    pub async fn begin(api: Arc<dyn EscrowApi>, container_id: &str, filename: &str) -> Result<Self> {
        let artifact_id = api
            .create_artifact(container_id, filename)
            .await
            .map_err(UploadError::RemoteInit)?;

        tracing::info!(
            artifact_id = %artifact_id,
            container_id = %container_id,
            filename = %filename,
            "Created artifact"
        );

        Ok(Self {
            api,
            artifact: ArtifactHandle::new(artifact_id),
            state: Initialized,
        })
    }

    /// Obtain exactly `part_count` pre-signed destinations for this artifact
    pub async fn request_destinations(
        self,
        part_count: u64,
    ) -> std::result::Result<EscrowSession<Transferring>, SessionFailure<Initialized>> {
        let fetched = self.fetch_destinations(part_count).await;
        let destinations = match fetched {
            Ok(destinations) => destinations,
            Err(failure) => return Err(self.fail(UploadError::RemoteInit(failure))),
        };

        tracing::debug!(
            artifact_id = %self.artifact.id(),
            parts = destinations.len(),
            "Received presigned URLs"
        );

        Ok(EscrowSession {
            api: self.api,
            artifact: self.artifact,
            state: Transferring { destinations },
        })
    }

    async fn fetch_destinations(&self, part_count: u64) -> std::result::Result<PartDestinations, RemoteFailure> {
        let urls = self.api.presigned_urls(self.artifact.id(), part_count).await?;
        PartDestinations::from_response(urls, part_count)
    }
}

impl EscrowSession<Transferring> {
    /// Send one part to its pre-signed destination
    pub async fn transfer_part(&self, part_number: u64, data: Vec<u8>) -> Result<PartResult> {
        let url = self
            .state
            .destinations
            .get(part_number)
            .ok_or(UploadError::PartCountMismatch {
                expected: self.state.destinations.len(),
                actual: part_number as usize,
            })?;

        let size = data.len();
        let etag = self
            .api
            .put_part(url, data)
            .await
            .map_err(|failure| UploadError::PartTransfer {
                part: part_number,
                failure,
            })?;

        tracing::debug!(part = part_number, size = size, "Uploaded part");

        Ok(PartResult {
            etag: normalize_etag(&etag).to_string(),
            part_number,
        })
    }

    /// Send every part the reader produces, at most `concurrency` at a time.
    ///
    /// Results come back sorted by part number. The first failure stops
    /// reading and drops any transfers still in flight.
    pub async fn transfer_all(&self, reader: ChunkReader, concurrency: usize) -> Result<Vec<PartResult>> {
        let mut results: Vec<PartResult> = reader
            .into_stream()
            .map_err(UploadError::from)
            .map_ok(|Chunk { part_number, data }| self.transfer_part(part_number, data))
            .try_buffer_unordered(concurrency.max(1))
            .try_collect()
            .await?;

        if results.len() != self.state.destinations.len() {
            return Err(UploadError::PartCountMismatch {
                expected: self.state.destinations.len(),
                actual: results.len(),
            });
        }

        results.sort_by_key(|part| part.part_number);
        Ok(results)
    }

    /// Confirm the upload with the full set of parts, in part-number order
    pub async fn finish(
        self,
        mut parts: Vec<PartResult>,
    ) -> std::result::Result<ConfirmationReference, SessionFailure<Transferring>> {
        parts.sort_by_key(|part| part.part_number);

        let confirmed = self.api.confirm_upload(self.artifact.id(), &parts).await;
        match confirmed {
            Ok(certificate_url) => {
                tracing::info!(
                    artifact_id = %self.artifact.id(),
                    parts = parts.len(),
                    "Upload confirmed"
                );
                Ok(ConfirmationReference { certificate_url })
            }
            Err(failure) => Err(self.fail(UploadError::RemoteFinish(failure))),
        }
    }
}

impl<S> SessionFailure<S> {
    pub fn error(&self) -> &UploadError {
        &self.error
    }

    pub fn artifact(&self) -> &ArtifactHandle {
        self.session.artifact()
    }

    /// Release the artifact and hand back the original error.
    ///
    /// An abort failure is logged and never replaces the original error.
    pub async fn abort(self) -> UploadError {
        let Self { session, error } = self;
        if let Err(abort_error) = session.abort().await {
            tracing::error!(
                error = %error,
                abort_error = %abort_error,
                "Failed to cancel upload after error"
            );
        }
        error
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for EscrowSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowSession")
            .field("artifact", &self.artifact)
            .field("state", &self.state)
            .finish()
    }
}

impl<S> std::fmt::Debug for SessionFailure<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFailure")
            .field("artifact", &self.session.artifact)
            .field("error", &self.error)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
