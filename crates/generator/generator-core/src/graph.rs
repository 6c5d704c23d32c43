use chroma_events::Edge;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("no edges given")]
    Empty,

    #[error("invalid edge '{0}', expected u-v with non-negative integers (e.g. 1-2)")]
    Malformed(String),
}

/// An undirected graph given as an edge list.
///
/// Node IDs are labels: they are mapped to dense indices `0..node_count` in
/// order of first appearance, so a coloring only needs one slot per node
/// that actually occurs, however large its ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    edges: Vec<Edge>,
    /// `edges` with both endpoints replaced by their dense index.
    indexed: Vec<(usize, usize)>,
    node_count: usize,
}

impl Graph {
    pub fn new(edges: Vec<Edge>) -> Result<Self, GraphError> {
        if edges.is_empty() {
            return Err(GraphError::Empty);
        }
        if let Some(bad) = edges.iter().find(|e| e.u < 0 || e.v < 0) {
            return Err(GraphError::Malformed(bad.to_string()));
        }

        let mut index: HashMap<i32, usize> = HashMap::new();
        let mut dense = |label: i32| {
            let next = index.len();
            *index.entry(label).or_insert(next)
        };
        let indexed = edges.iter().map(|e| (dense(e.u), dense(e.v))).collect();

        Ok(Self {
            edges,
            indexed,
            node_count: index.len(),
        })
    }

    /// Parses command-line edge tokens such as `0-1 1-2 2-0`.
    pub fn parse<I, S>(tokens: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let edges = tokens
            .into_iter()
            .map(|t| parse_edge(t.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(edges)
    }

    /// Edges with their original node labels.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges as dense node indices, in the same order as [`Graph::edges`].
    pub fn indexed_edges(&self) -> &[(usize, usize)] {
        &self.indexed
    }

    /// Number of distinct nodes.
    pub fn node_count(&self) -> usize {
        self.node_count
    }
}

fn parse_edge(token: &str) -> Result<Edge, GraphError> {
    let malformed = || GraphError::Malformed(token.to_owned());
    let (u, v) = token.split_once('-').ok_or_else(malformed)?;
    let node = |s: &str| s.trim().parse::<u32>().ok().and_then(|n| i32::try_from(n).ok());
    match (node(u), node(v)) {
        (Some(u), Some(v)) => Ok(Edge::new(u, v)),
        _ => Err(malformed()),
    }
}
