use std::collections::{HashMap, VecDeque};

use crate::{topo, Graph, GraphError, Identity, VertexId};

/// The shortest directed path from `from` to `to`, inclusive of both endpoints, or an empty
/// vector if `to` is unreachable from `from`. Fails with [`GraphError::Cyclic`] rather than
/// return a misleading answer if the graph is not presently acyclic (§4.1).
///
/// When more than one shortest path exists, the one returned is deterministic for a given graph:
/// neighbors are explored in [`Graph::vertices_sorted`] order at each BFS layer.
pub fn reachability<V: Identity, E>(
    graph: &Graph<V, E>,
    from: VertexId,
    to: VertexId,
) -> Result<Vec<VertexId>, GraphError> {
    topo::topological_sort(graph)?;

    if from == to {
        return Ok(vec![from]);
    }

    let mut predecessor: HashMap<VertexId, VertexId> = HashMap::new();
    let mut visited = std::collections::HashSet::new();
    visited.insert(from);
    let mut queue = VecDeque::new();
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        let mut next: Vec<VertexId> = graph.outgoing_vertices(current);
        next.sort_by_key(|id| graph.vertex(*id).expect("outgoing vertex exists").identity());
        for n in next {
            if visited.contains(&n) {
                continue;
            }
            visited.insert(n);
            predecessor.insert(n, current);
            if n == to {
                let mut path = vec![to];
                let mut cursor = to;
                while cursor != from {
                    cursor = predecessor[&cursor];
                    path.push(cursor);
                }
                path.reverse();
                return Ok(path);
            }
            queue.push_back(n);
        }
    }

    Ok(Vec::new())
}
