//! Part planning
//!
//! Picks the part size for a multipart upload so the number of parts stays
//! under the service's ceiling.

use std::num::NonZeroU64;

use crate::error::{Result, UploadError};

// ============================================================================
// Constants
// ============================================================================

const MIB: u64 = 1024 * 1024;

/// Smallest part size tried by the search: 10MB
pub const MIN_PART_SIZE: u64 = 10 * MIB;

/// Largest part size tried by the search: 100MB
pub const MAX_PART_SIZE: u64 = 100 * MIB;

/// Step between candidate part sizes: 10MB
pub const PART_SIZE_STEP: u64 = 10 * MIB;

/// Part size used for empty files: 25MB
pub const DEFAULT_PART_SIZE: u64 = 25 * MIB;

/// The part count must stay strictly below this
pub const MAX_PARTS: u64 = 10_000;

// ============================================================================
// Planner
// ============================================================================

/// Part size and count for one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartPlan {
    pub part_size: u64,
    pub part_count: u64,
}

/// Plan the parts for a file of `file_size` bytes.
///
/// A requested part size is trusted as-is. Otherwise the smallest candidate
/// between [`MIN_PART_SIZE`] and [`MAX_PART_SIZE`] that keeps the part count
/// below [`MAX_PARTS`] is chosen.
pub fn plan(file_size: u64, requested_part_size: Option<NonZeroU64>) -> Result<PartPlan> {
    let part_size = match requested_part_size {
        Some(size) => size.get(),
        None if file_size == 0 => DEFAULT_PART_SIZE,
        None => search_part_size(file_size)?,
    };

    Ok(PartPlan {
        part_size,
        part_count: file_size.div_ceil(part_size),
    })
}

/// Largest file the size search can accommodate
pub fn max_supported_size() -> u64 {
    MAX_PART_SIZE * MAX_PARTS
}

fn search_part_size(file_size: u64) -> Result<u64> {
    candidates()
        .find(|candidate| file_size.div_ceil(*candidate) < MAX_PARTS)
        .ok_or(UploadError::FileTooLarge {
            size: file_size,
            max: max_supported_size(),
        })
}

fn candidates() -> impl Iterator<Item = u64> {
    (MIN_PART_SIZE..=MAX_PART_SIZE).step_by(PART_SIZE_STEP as usize)
}

// ============================================================================
// Tests
// ============================================================================
