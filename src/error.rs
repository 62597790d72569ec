//! Error types for SoftEscrow uploads

use std::path::PathBuf;

use thiserror::Error;

/// Library-wide result type
pub type Result<T> = std::result::Result<T, UploadError>;

/// Upload error type
///
/// Each remote phase has its own variant so callers can tell which step of
/// the lifecycle failed. The underlying [`RemoteFailure`] is kept as the
/// error source.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File is too large to upload (size: {size}, max: {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("File is empty: {}", .0.display())]
    EmptyFile(PathBuf),

    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Invalid file name: {}", .0.display())]
    InvalidFileName(PathBuf),

    #[error("Could not initialize upload: {0}")]
    RemoteInit(#[source] RemoteFailure),

    #[error("Could not upload part {part}: {failure}")]
    PartTransfer {
        part: u64,
        #[source]
        failure: RemoteFailure,
    },

    #[error("Could not confirm upload: {0}")]
    RemoteFinish(#[source] RemoteFailure),

    #[error("Could not cancel upload of artifact {artifact_id}: {failure}")]
    Abort {
        artifact_id: String,
        #[source]
        failure: RemoteFailure,
    },

    #[error("Expected {expected} parts but the file produced {actual}")]
    PartCountMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single call to the escrow service or a pre-signed URL failed
#[derive(Error, Debug)]
pub enum RemoteFailure {
    /// Non-success HTTP status. `errors` holds the service's `errors`
    /// payload when the body is JSON, otherwise the raw body.
    #[error("HTTP {status}: {errors}")]
    Status { status: u16, errors: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("response has no ETag header")]
    MissingETag,
}

impl UploadError {
    /// Short machine-friendly name of the error kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileTooLarge { .. } => "file_too_large",
            Self::EmptyFile(_) => "empty_file",
            Self::NotAFile(_) => "not_a_file",
            Self::InvalidFileName(_) => "invalid_file_name",
            Self::RemoteInit(_) => "remote_init",
            Self::PartTransfer { .. } => "part_transfer",
            Self::RemoteFinish(_) => "remote_finish",
            Self::Abort { .. } => "abort",
            Self::PartCountMismatch { .. } => "part_count_mismatch",
            Self::Io(_) => "io",
        }
    }
}
