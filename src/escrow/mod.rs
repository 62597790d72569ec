//! SoftEscrow service client
//!
//! Artifact lifecycle against the escrow REST API:
//!
//! ```text
//! POST   /artifacts                                          - allocate artifact
//! POST   /artifacts/{id}/generate-multipart-presigned-urls   - part destinations
//! POST   /artifacts/{id}/confirm-multipart-upload            - confirm parts
//! DELETE /artifacts/{id}                                     - cancel
//! ```

pub mod api;
pub mod session;
pub mod types;

pub use api::{EscrowApi, HttpEscrowApi};
pub use session::{EscrowSession, Initialized, SessionFailure, Transferring};
pub use types::{ArtifactHandle, ConfirmationReference, PartDestinations, PartResult};
