use pgraph::{reachability, VertexId};
use resource::ResourceGraph;

/// The cartesian product of all distinct vertex pairs, in deterministic (sorted-identity) order.
/// Used by tests that want every possible pair considered regardless of existing dependencies.
pub fn baseline_pairs(graph: &ResourceGraph) -> Vec<(VertexId, VertexId)> {
    let vertices = graph.vertices_sorted();
    let mut pairs = Vec::new();
    for (i, &a) in vertices.iter().enumerate() {
        for &b in &vertices[i + 1..] {
            pairs.push((a, b));
        }
    }
    pairs
}

/// The production default: like [`baseline_pairs`], but skips any pair where one vertex is
/// already reachable from the other — such a pair has an existing ordering dependency and
/// cannot run concurrently, so grouping them serves no purpose (§4.4).
pub fn non_reachable_pairs(graph: &ResourceGraph) -> Vec<(VertexId, VertexId)> {
    baseline_pairs(graph)
        .into_iter()
        .filter(|&(a, b)| {
            reachability(graph, a, b).unwrap_or_default().is_empty()
                && reachability(graph, b, a).unwrap_or_default().is_empty()
        })
        .collect()
}
