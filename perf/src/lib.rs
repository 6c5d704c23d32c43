use chroma_events::{Edge, MAX_REMOVED_EDGES, Solution};
use chroma_icc::ResourceNames;
use generator_core::Graph;

/// Names unique to this process and tag, so benches never collide with a
/// running supervisor.
pub fn bench_names(tag: &str) -> ResourceNames {
    ResourceNames::with_namespace(&format!("chroma_bench_{}_{tag}", std::process::id()))
}

/// A record with `edges` conflicts, capped at the record size.
pub fn make_solution(edges: usize) -> Solution {
    let edges: Vec<Edge> = (0..edges.min(MAX_REMOVED_EDGES) as i32)
        .map(|i| Edge::new(i, i + 1))
        .collect();
    Solution::from_edges(&edges).expect("edge count is capped")
}

/// Cycle over `nodes` nodes with a chord from every third node.
pub fn make_graph(nodes: u32) -> Graph {
    let mut tokens: Vec<String> = (0..nodes)
        .map(|i| format!("{i}-{}", (i + 1) % nodes))
        .collect();
    tokens.extend(
        (0..nodes)
            .step_by(3)
            .map(|i| format!("{i}-{}", (i + nodes / 2) % nodes)),
    );
    Graph::parse(&tokens).expect("generated graph is well formed")
}
