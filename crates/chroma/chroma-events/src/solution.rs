#![forbid(unsafe_code)]

use std::fmt;

// Every process maps the same bytes, so both types are plain C layouts of
// int32 fields: Edge is 8 bytes, Solution is 4 + 8 * 8 = 68 bytes.

/// Upper bound on conflicting edges a candidate may carry.
pub const MAX_REMOVED_EDGES: usize = 8;

/// An undirected graph edge between nodes `u` and `v`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Edge {
    pub u: i32,
    pub v: i32,
}

impl Edge {
    pub const fn new(u: i32, v: i32) -> Self {
        Self { u, v }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.u, self.v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    #[error("solution already holds the maximum of {max} removed edges")]
    TooManyEdges { max: usize },

    #[error("solution record claims {count} removed edges, limit is {max}")]
    EdgeCountOutOfRange { count: i32, max: usize },

    #[error("{cursor} is {value}, outside a ring of {capacity} slots")]
    CursorOutOfRange {
        cursor: &'static str,
        value: i32,
        capacity: usize,
    },
}

/// The edges a candidate coloring would have to remove to become a valid
/// 3-coloring. Zero edges means the coloring is already valid.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct Solution {
    edge_count: i32,
    edges: [Edge; MAX_REMOVED_EDGES],
}

impl Solution {
    pub const fn new() -> Self {
        Self {
            edge_count: 0,
            edges: [Edge::new(0, 0); MAX_REMOVED_EDGES],
        }
    }

    /// Builds a record from a list of conflicting edges.
    pub fn from_edges(edges: &[Edge]) -> Result<Self, ProtocolViolation> {
        let mut solution = Self::new();
        for &edge in edges {
            solution.push(edge)?;
        }
        Ok(solution)
    }

    /// Appends a conflicting edge. A full record is left untouched.
    pub fn push(&mut self, edge: Edge) -> Result<(), ProtocolViolation> {
        let len = self.len();
        if len >= MAX_REMOVED_EDGES {
            return Err(ProtocolViolation::TooManyEdges {
                max: MAX_REMOVED_EDGES,
            });
        }
        self.edges[len] = edge;
        self.edge_count += 1;
        Ok(())
    }

    /// Number of removed edges. Only meaningful on a validated record.
    #[inline]
    pub fn len(&self) -> usize {
        self.edge_count.clamp(0, MAX_REMOVED_EDGES as i32) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edge_count == 0
    }

    /// A record without conflicts describes a proper 3-coloring.
    #[inline]
    pub fn is_solved(&self) -> bool {
        self.is_empty()
    }

    /// The meaningful prefix of the edge array.
    pub fn edges(&self) -> &[Edge] {
        &self.edges[..self.len()]
    }

    /// Checks a record that came out of shared memory. Records built through
    /// `push` always pass.
    pub fn validate(&self) -> Result<(), ProtocolViolation> {
        if self.edge_count < 0 || self.edge_count as usize > MAX_REMOVED_EDGES {
            return Err(ProtocolViolation::EdgeCountOutOfRange {
                count: self.edge_count,
                max: MAX_REMOVED_EDGES,
            });
        }
        Ok(())
    }
}

impl PartialEq for Solution {
    fn eq(&self, other: &Self) -> bool {
        self.edge_count == other.edge_count && self.edges() == other.edges()
    }
}

impl Eq for Solution {}
