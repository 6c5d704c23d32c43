use crate::graph::Graph;
use chroma_events::Solution;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// What a [`CandidateSource`] produced for one search iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// A coloring whose conflicts fit in a [`Solution`].
    Found(Solution),
    /// A coloring with more conflicts than a record can hold; drop it.
    TooManyConflicts,
    /// The source has nothing more to offer.
    Exhausted,
}

/// Pull-based supplier of candidate solutions.
pub trait CandidateSource {
    fn next_candidate(&mut self) -> Candidate;
}

/// Colors every node uniformly at random with one of three colors and
/// reports the edges whose endpoints share a color.
pub struct RandomColoring {
    graph: Graph,
    rng: StdRng,
    colors: Vec<u8>,
}

impl RandomColoring {
    pub fn new(graph: Graph, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let colors = vec![0; graph.node_count()];
        Self { graph, rng, colors }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

impl CandidateSource for RandomColoring {
    fn next_candidate(&mut self) -> Candidate {
        for color in self.colors.iter_mut() {
            *color = self.rng.gen_range(0..3);
        }

        let mut solution = Solution::new();
        let graph = &self.graph;
        for (&edge, &(u, v)) in graph.edges().iter().zip(graph.indexed_edges()) {
            if self.colors[u] == self.colors[v] && solution.push(edge).is_err() {
                return Candidate::TooManyConflicts;
            }
        }
        Candidate::Found(solution)
    }
}

/// Replays a fixed list of candidates, then reports exhaustion.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: VecDeque<Candidate>,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Candidate>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// A script of records with the given conflict counts, using the edges
    /// `0-1`, `1-2`, ... as placeholder conflicts.
    pub fn from_edge_counts(counts: &[usize]) -> Self {
        Self::new(counts.iter().map(|&count| {
            let mut solution = Solution::new();
            for i in 0..count as i32 {
                if solution.push(chroma_events::Edge::new(i, i + 1)).is_err() {
                    return Candidate::TooManyConflicts;
                }
            }
            Candidate::Found(solution)
        }))
    }
}

impl CandidateSource for ScriptedSource {
    fn next_candidate(&mut self) -> Candidate {
        self.script.pop_front().unwrap_or(Candidate::Exhausted)
    }
}
