//! Upload orchestration
//!
//! Drives one file through plan, begin, destinations, transfer and finish.
//! Once the service has allocated an artifact, any later failure releases it
//! before the original error is returned.

use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, UploadError};
use crate::escrow::{ConfirmationReference, EscrowApi, EscrowSession};

use super::chunk_reader::ChunkReader;
use super::planner;

/// One file to deposit
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub container_id: String,
    /// Explicit part size, bypassing the part-count search
    pub part_size: Option<NonZeroU64>,
}

impl UploadRequest {
    pub fn new(container_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            container_id: container_id.into(),
            part_size: None,
        }
    }

    pub fn with_part_size(mut self, part_size: Option<NonZeroU64>) -> Self {
        self.part_size = part_size;
        self
    }
}

/// Uploads files to the escrow service
#[derive(Clone)]
pub struct Uploader {
    api: Arc<dyn EscrowApi>,
    concurrency: usize,
}

impl Uploader {
    /// `concurrency` bounds the number of parts in flight (and in memory)
    pub fn new(api: Arc<dyn EscrowApi>, concurrency: usize) -> Self {
        Self {
            api,
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Upload a file and return the deposit certificate reference
    pub async fn upload_file(&self, request: &UploadRequest) -> Result<ConfirmationReference> {
        let metadata = tokio::fs::metadata(&request.path).await?;
        if !metadata.is_file() {
            return Err(UploadError::NotAFile(request.path.clone()));
        }

        let filename = file_name(&request.path)?;
        let plan = planner::plan(metadata.len(), request.part_size)?;
        if plan.part_count == 0 {
            return Err(UploadError::EmptyFile(request.path.clone()));
        }

        tracing::info!(
            file = %request.path.display(),
            size = metadata.len(),
            part_size = plan.part_size,
            parts = plan.part_count,
            "Starting upload"
        );

        let session = EscrowSession::begin(self.api.clone(), &request.container_id, filename).await?;

        let session = match session.request_destinations(plan.part_count).await {
            Ok(session) => session,
            Err(failure) => return Err(failure.abort().await),
        };

        let reader = match ChunkReader::open(&request.path, plan.part_size).await {
            Ok(reader) => reader,
            Err(e) => return Err(session.fail(e.into()).abort().await),
        };

        let transferred = session.transfer_all(reader, self.concurrency).await;
        let parts = match transferred {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "Part transfer failed");
                return Err(session.fail(e).abort().await);
            }
        };

        match session.finish(parts).await {
            Ok(confirmation) => Ok(confirmation),
            Err(failure) => Err(failure.abort().await),
        }
    }
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| UploadError::InvalidFileName(path.to_path_buf()))
}

// ============================================================================
// Tests
// ============================================================================
