use crate::{reach, Graph, GraphError, Identity, VertexId};

/// The pure/owning functions a [`vertex_merge`] call needs: how to fuse `v2`'s payload into
/// `v1`'s in place, and how to fuse two edge payloads that end up carrying the same ordered pair
/// after the merge.
pub struct MergeFns<AF, EF> {
    /// Absorbs `v2`'s (owned) payload into `v1`'s, in place. Takes `v2` by value rather than by
    /// reference because the typical payload (a boxed resource) is not `Clone` — it has to move,
    /// not copy, into whatever the merged vertex becomes.
    pub absorb: AF,
    pub edge_merge_fn: EF,
}

/// Fuses `v2` into `v1` (component B, §4.2): re-homes every edge incident on `v2` onto `v1`
/// (merging through an existing path when one already connects the two endpoints, rather than
/// adding a redundant parallel route), absorbs `v2`'s payload into `v1`'s, deletes `v2`, and
/// rejects the whole operation — leaving `graph` exactly as it was — if any re-homed edge would
/// create a cycle.
///
/// Mutates in place rather than the "build a candidate copy, validate, then swap" approach a
/// fully `Clone`-able payload would allow: edges are re-homed one at a time, each checked against
/// [`reach::reachability`] before it is added, and any already-added edges are rolled back if a
/// later one turns out to be unsafe.
pub fn vertex_merge<V, E, AF, EF>(
    graph: &mut Graph<V, E>,
    v1: VertexId,
    v2: VertexId,
    fns: MergeFns<AF, EF>,
) -> Result<(), GraphError>
where
    V: Identity,
    E: Clone,
    AF: FnOnce(&mut V, V),
    EF: Fn(&E, &E) -> E,
{
    if v1 == v2 {
        return Ok(());
    }
    if graph.vertex(v1).is_none() {
        return Err(GraphError::VertexNotFound);
    }
    if graph.vertex(v2).is_none() {
        return Err(GraphError::VertexNotFound);
    }

    let mut added_edges = Vec::new();
    let mut removed_direct = Vec::new();

    if let Some(e) = graph.find_edge(v1, v2) {
        removed_direct.push((v1, v2, graph.edge(e).expect("edge exists").clone()));
        graph.delete_edge(e);
    }
    if let Some(e) = graph.find_edge(v2, v1) {
        removed_direct.push((v2, v1, graph.edge(e).expect("edge exists").clone()));
        graph.delete_edge(e);
    }

    let incoming: Vec<(VertexId, E)> = graph
        .incoming_vertices(v2)
        .into_iter()
        .map(|x| {
            let e = graph.find_edge(x, v2).expect("x is an incoming neighbor of v2");
            (x, graph.edge(e).expect("edge exists").clone())
        })
        .collect();
    for (x, payload) in incoming {
        if let Err(err) = rehome(graph, x, v1, &payload, &fns.edge_merge_fn, &mut added_edges) {
            rollback(graph, added_edges, removed_direct);
            return Err(err);
        }
    }

    let outgoing: Vec<(VertexId, E)> = graph
        .outgoing_vertices(v2)
        .into_iter()
        .map(|x| {
            let e = graph.find_edge(v2, x).expect("x is an outgoing neighbor of v2");
            (x, graph.edge(e).expect("edge exists").clone())
        })
        .collect();
    for (x, payload) in outgoing {
        if let Err(err) = rehome(graph, v1, x, &payload, &fns.edge_merge_fn, &mut added_edges) {
            rollback(graph, added_edges, removed_direct);
            return Err(err);
        }
    }

    let v2_payload = graph.delete_vertex(v2).expect("v2 exists");
    let old_v1_identity = graph.vertex(v1).expect("v1 exists").identity();
    let v1_mut = graph.vertex_mut(v1).expect("v1 exists");
    (fns.absorb)(v1_mut, v2_payload);
    graph.reindex(v1, &old_v1_identity);
    Ok(())
}

fn rollback<V, E>(graph: &mut Graph<V, E>, added: Vec<crate::EdgeId>, removed_direct: Vec<(VertexId, VertexId, E)>)
where
    V: Identity,
{
    for e in added {
        graph.delete_edge(e);
    }
    for (from, to, payload) in removed_direct {
        let _ = graph.add_edge(from, to, payload);
    }
}

/// Connects `from -> to` carrying `payload`, unless `to` is already reachable from `from` (in
/// which case `payload` is folded into every edge along that existing path instead of adding a
/// redundant route). Returns [`GraphError::WouldCreateCycle`] without mutating `graph` further
/// if `to` can already reach `from` (making a direct `from -> to` edge complete a loop).
fn rehome<V, E>(
    graph: &mut Graph<V, E>,
    from: VertexId,
    to: VertexId,
    payload: &E,
    edge_merge_fn: &impl Fn(&E, &E) -> E,
    added_edges: &mut Vec<crate::EdgeId>,
) -> Result<(), GraphError>
where
    V: Identity,
    E: Clone,
{
    if from == to {
        return Ok(());
    }
    let forward = reach::reachability(graph, from, to)?;
    if forward.len() >= 2 {
        for pair in forward.windows(2) {
            if let Some(e) = graph.find_edge(pair[0], pair[1]) {
                let merged = edge_merge_fn(graph.edge(e).expect("edge on path exists"), payload);
                *graph.edge_mut(e).expect("edge on path exists") = merged;
            }
        }
        return Ok(());
    }
    if !reach::reachability(graph, to, from)?.is_empty() {
        return Err(GraphError::WouldCreateCycle);
    }
    let merged = match graph.find_edge(from, to) {
        Some(e) => edge_merge_fn(graph.edge(e).expect("edge exists"), payload),
        None => payload.clone(),
    };
    let e = graph.add_edge(from, to, merged)?;
    added_edges.push(e);
    Ok(())
}
