//! Placement planning: decide how a source file maps onto backend objects.
//!
//! Pure arithmetic, no I/O. A file at or under the destination's object size
//! ceiling becomes one object; anything larger is cut into ceiling-sized
//! segments with the remainder in the final segment.

use crate::models::manifest::PlacementMode;
use thiserror::Error;

/// Default per-object size ceiling: 45 MiB, comfortably under the 50 MB hard
/// limit the reference backend enforces per object.
pub const DEFAULT_OBJECT_SIZE_CEILING: u64 = 45 * 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("cannot plan placement for an empty source")]
    EmptySource,

    #[error("object size ceiling must be greater than zero")]
    ZeroCeiling,
}

/// One contiguous slice of the source file, destined for one backend object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub index: u32,
    pub offset: u64,
    pub len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPlan {
    pub mode: PlacementMode,
    pub segments: Vec<Segment>,
}

impl PlacementPlan {
    pub fn total_size(&self) -> u64 {
        self.segments.iter().map(|s| s.len).sum()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

/// Plan the placement of `file_size` bytes against a destination whose
/// per-object ceiling is `ceiling` bytes.
///
/// Empty sources are rejected: callers must never feed a zero-size file.
pub fn plan(file_size: u64, ceiling: u64) -> Result<PlacementPlan, PlanError> {
    if ceiling == 0 {
        return Err(PlanError::ZeroCeiling);
    }
    if file_size == 0 {
        return Err(PlanError::EmptySource);
    }

    if file_size <= ceiling {
        return Ok(PlacementPlan {
            mode: PlacementMode::Single,
            segments: vec![Segment {
                index: 0,
                offset: 0,
                len: file_size,
            }],
        });
    }

    let count = file_size.div_ceil(ceiling);
    let mut segments = Vec::with_capacity(count as usize);
    for index in 0..count {
        let offset = index * ceiling;
        let len = ceiling.min(file_size - offset);
        segments.push(Segment {
            index: index as u32,
            offset,
            len,
        });
    }

    Ok(PlacementPlan {
        mode: PlacementMode::Chunked,
        segments,
    })
}
