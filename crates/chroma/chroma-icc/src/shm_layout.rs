//! Shared memory layout of the solution ring.
//!
//! The segment is mapped, never serialized, so every participant must agree
//! on these bytes exactly. There is no magic number or version field: the
//! only check an attaching process can make is that the segment length is a
//! whole number of slots past the header.
//!
//! # Memory Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    RegionHeader (12B)                │
//! │  ┌────────────┬───────────────┬──────────────┐       │
//! │  │ terminate  │  write_index  │  read_index  │       │
//! │  │ (i32)      │  (i32)        │  (i32)       │       │
//! │  └────────────┴───────────────┴──────────────┘       │
//! ├──────────────────────────────────────────────────────┤
//! │  Solution[0]   edge_count (i32) + edges (8 × 2 × i32) │
//! ├──────────────────────────────────────────────────────┤
//! │                        ...                           │
//! ├──────────────────────────────────────────────────────┤
//! │  Solution[capacity-1]                                │
//! └──────────────────────────────────────────────────────┘
//! ```

use chroma_events::Solution;
use std::mem::size_of;
use std::sync::atomic::AtomicI32;

/// Header at offset 0 of the segment.
///
/// The fields are atomics so that no process ever performs a plain
/// unsynchronized access to memory another process may be writing.
/// `AtomicI32` has the same size and alignment as `i32`.
#[repr(C)]
pub struct RegionHeader {
    /// 0 while running, 1 once the supervisor started shutting down.
    pub terminate: AtomicI32,

    /// Next slot a producer writes. Guarded by the write mutex.
    pub write_index: AtomicI32,

    /// Next slot the supervisor reads. Only the supervisor touches it.
    pub read_index: AtomicI32,
}

/// Calculates the total bytes required for a ring of `capacity` slots.
///
/// # Example
/// ```
/// assert_eq!(chroma_icc::bytes_for_region(20), 12 + 20 * 68);
/// ```
pub fn bytes_for_region(capacity: usize) -> usize {
    size_of::<RegionHeader>() + capacity * size_of::<Solution>()
}

/// Recovers the slot count from the length of a mapped segment.
pub fn capacity_for_len(len: usize) -> Result<usize, &'static str> {
    let header = size_of::<RegionHeader>();
    if len <= header {
        return Err("segment is too small to hold a single slot");
    }
    let body = len - header;
    if body % size_of::<Solution>() != 0 {
        return Err("segment length is not a whole number of slots");
    }
    Ok(body / size_of::<Solution>())
}
