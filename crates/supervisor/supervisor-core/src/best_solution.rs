// BestSolution keeps the record with the fewest removed edges seen so far.
//
// Ordering is by edge count only. On a tie the earlier record stays: a later
// record must be strictly better to replace it. A record with zero edges is
// a proper 3-coloring and ends the search, so nothing can improve on it.

use chroma_events::Solution;

/// What happened to an offered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// First record, or strictly fewer edges than the previous best.
    Improved,
    /// Improved all the way down to zero edges.
    Solved,
    /// No better than the current best.
    Ignored,
}

#[derive(Debug, Default)]
pub struct BestSolution {
    best: Option<Solution>,
    /// Records offered so far, improved or not.
    seen: u64,
}

impl BestSolution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, candidate: Solution) -> Offer {
        self.seen += 1;

        let improves = self
            .best
            .as_ref()
            .is_none_or(|best| candidate.len() < best.len());
        if !improves {
            return Offer::Ignored;
        }

        tracing::info!(removed_edges = candidate.len(), "new best solution");
        self.best = Some(candidate);
        if candidate.is_solved() {
            Offer::Solved
        } else {
            Offer::Improved
        }
    }

    pub fn best(&self) -> Option<&Solution> {
        self.best.as_ref()
    }

    /// Edge count of the best record, if any arrived.
    pub fn best_edge_count(&self) -> Option<usize> {
        self.best.as_ref().map(Solution::len)
    }

    pub fn is_solved(&self) -> bool {
        self.best.as_ref().is_some_and(Solution::is_solved)
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }
}
