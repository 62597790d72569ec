//! Multipart Upload Module
//!
//! Client side of the escrow multipart protocol:
//! 1. Plan the part size so the part count stays under the service ceiling
//! 2. Allocate an artifact and obtain one pre-signed URL per part
//! 3. PUT each part and collect its ETag
//! 4. Confirm with the ordered ETags, or cancel the artifact on failure

pub mod chunk_reader;
pub mod orchestrator;
pub mod planner;

pub use chunk_reader::{Chunk, ChunkReader};
pub use orchestrator::{UploadRequest, Uploader};
pub use planner::{plan, PartPlan};
