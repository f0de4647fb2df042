use std::collections::VecDeque;

use fixedbitset::FixedBitSet;

use crate::{Graph, Identity, VertexId};

/// A breadth-first walk starting at `start`, following outgoing edges. Mirrors the teacher's
/// `Walk` iterator: a `VecDeque` frontier plus a `FixedBitSet` visited set sized to the graph's
/// node bound, rather than a `HashSet`, since vertex ids are small dense integers here.
pub fn dfs<V: Identity, E>(graph: &Graph<V, E>, start: VertexId) -> Vec<VertexId> {
    let mut visited = FixedBitSet::with_capacity(bound(graph));
    let mut order = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back(start);
    visited.insert(start.0.index());

    while let Some(id) = queue.pop_front() {
        order.push(id);
        let mut next = graph.outgoing_vertices(id);
        next.sort_by_key(|n| graph.vertex(*n).expect("outgoing vertex exists").identity());
        for n in next {
            if !visited.contains(n.0.index()) {
                visited.insert(n.0.index());
                queue.push_back(n);
            }
        }
    }
    order
}

fn bound<V, E>(graph: &Graph<V, E>) -> usize {
    graph
        .vertices()
        .iter()
        .map(|id| id.0.index() + 1)
        .max()
        .unwrap_or(0)
}

/// Weakly-connected components (ignoring edge direction), each sorted by identity, with the
/// component list itself sorted by its first (smallest-identity) member — deterministic output
/// for a given graph (I4).
pub fn disconnected_components<V: Identity, E>(graph: &Graph<V, E>) -> Vec<Vec<VertexId>> {
    let mut visited = std::collections::HashSet::new();
    let mut components = Vec::new();

    for start in graph.vertices_sorted() {
        if visited.contains(&start) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);
        while let Some(id) = queue.pop_front() {
            component.push(id);
            let mut neighbors = graph.outgoing_vertices(id);
            neighbors.extend(graph.incoming_vertices(id));
            neighbors.sort_by_key(|n| graph.vertex(*n).expect("neighbor vertex exists").identity());
            for n in neighbors {
                if !visited.contains(&n) {
                    visited.insert(n);
                    queue.push_back(n);
                }
            }
        }
        component.sort_by_key(|id| graph.vertex(*id).expect("component member exists").identity());
        components.push(component);
    }

    components.sort_by(|a, b| {
        let ka = a.first().map(|id| graph.vertex(*id).expect("non-empty component").identity());
        let kb = b.first().map(|id| graph.vertex(*id).expect("non-empty component").identity());
        ka.cmp(&kb)
    });
    components
}
