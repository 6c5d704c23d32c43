pub mod solution;
pub use solution::{Edge, MAX_REMOVED_EDGES, ProtocolViolation, Solution};

/// Default number of solution slots in the shared ring.
pub const CAPACITY: usize = 20;
