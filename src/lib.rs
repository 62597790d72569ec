//! SoftEscrow client library
//!
//! Deposits a local file into a SoftEscrow container with the service's
//! multipart upload protocol and returns the deposit certificate URL.
//!
//! # Modules
//!
//! - `upload`: part planning, file chunking and the upload orchestrator
//! - `escrow`: the remote API seam and the typestate upload session
//! - `error`: error taxonomy shared by both

pub mod cli;
pub mod config;
pub mod error;
pub mod escrow;
pub mod logging;
pub mod upload;

pub use error::{RemoteFailure, Result, UploadError};
pub use escrow::{ConfirmationReference, EscrowApi, HttpEscrowApi};
pub use upload::{UploadRequest, Uploader};
