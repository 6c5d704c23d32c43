mod coloring;
mod graph;

pub use coloring::{Candidate, CandidateSource, RandomColoring, ScriptedSource};
pub use graph::{Graph, GraphError};
