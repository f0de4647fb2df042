use std::collections::BinaryHeap;

use crate::{Graph, GraphError, Identity, VertexId};

/// A vertex id ordered by its identity string so a [`BinaryHeap`] can be used as the ready-set
/// in Kahn's algorithm: among several zero-in-degree vertices, the lexicographically smallest
/// identity is always extracted first (invariant I4).
struct ByIdentity(String, VertexId);

impl PartialEq for ByIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for ByIdentity {}
impl PartialOrd for ByIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ByIdentity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed: BinaryHeap is a max-heap, and we want the smallest identity out first.
        other.0.cmp(&self.0)
    }
}

/// Kahn's algorithm with deterministic tie-breaking: among vertices simultaneously ready,
/// the one sorting first by [`Identity::identity`] is emitted first.
pub fn topological_sort<V: Identity, E>(graph: &Graph<V, E>) -> Result<Vec<VertexId>, GraphError> {
    let mut in_degree = std::collections::HashMap::new();
    let mut heap = BinaryHeap::new();
    for id in graph.vertices_sorted() {
        let deg = graph.in_degree(id);
        in_degree.insert(id, deg);
        if deg == 0 {
            heap.push(ByIdentity(graph.vertex(id).expect("id from vertices_sorted()").identity(), id));
        }
    }

    let mut order = Vec::with_capacity(graph.len());
    while let Some(ByIdentity(_, id)) = heap.pop() {
        order.push(id);
        for next in graph.outgoing_vertices(id) {
            let deg = in_degree.get_mut(&next).expect("every vertex has an in_degree entry");
            *deg -= 1;
            if *deg == 0 {
                heap.push(ByIdentity(graph.vertex(next).expect("outgoing vertex exists").identity(), next));
            }
        }
    }

    if order.len() != graph.len() {
        return Err(GraphError::Cyclic);
    }
    Ok(order)
}
