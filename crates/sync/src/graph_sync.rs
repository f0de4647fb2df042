use std::collections::HashMap;
use std::fmt;

use pgraph::{Identity, VertexId};
use resource::{Edge, ResourceGraph, Vertex};

#[derive(Debug)]
pub enum SyncError {
    /// A `vertex_add_fn`/`vertex_remove_fn` validator rejected a vertex; sync did not mutate
    /// the old graph at all.
    Rejected(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Rejected(reason) => write!(f, "graph sync rejected: {reason}"),
        }
    }
}

impl std::error::Error for SyncError {}

/// Reconciles `old` to match `new`, preserving the identity (and therefore the running state) of
/// every vertex `new` still considers "the same" by `vertex_eq`.
///
/// `vertex_add_fn`/`vertex_remove_fn` are pure validators: called on every candidate addition or
/// removal before any mutation happens, so that a rejection leaves `old` completely untouched
/// (§4.5 step 3).
pub fn sync_graph(
    old: &mut ResourceGraph,
    mut new: ResourceGraph,
    vertex_eq: impl Fn(&Vertex, &Vertex) -> bool,
    edge_eq: impl Fn(&Edge, &Edge) -> bool,
    vertex_add_fn: impl Fn(&Vertex) -> Result<(), SyncError>,
    vertex_remove_fn: impl Fn(&Vertex) -> Result<(), SyncError>,
) -> Result<(), SyncError> {
    // Captured before `new` is drained vertex-by-vertex below, since a new vertex's `VertexId`
    // stops resolving in `new` the moment it is moved into `old`.
    let new_edges: Vec<(String, String, Edge)> = new
        .vertices_sorted()
        .into_iter()
        .flat_map(|from| {
            new.outgoing_edges(from).into_iter().map(move |e| {
                let (_, to) = new.lookup_edge(e).expect("edge from outgoing_edges()");
                let from_id = new.vertex(from).expect("id from vertices_sorted()").identity();
                let to_id = new.vertex(to).expect("edge endpoint").identity();
                (from_id, to_id, new.edge(e).expect("edge from outgoing_edges()").clone())
            })
        })
        .collect();

    let new_ids = new.vertices_sorted();
    let old_ids = old.vertices_sorted();

    // new identity -> Some(old vertex it matches) or None (a pending addition).
    let mut claimed_old: Vec<VertexId> = Vec::new();
    let mut matched: Vec<(VertexId, String, Option<VertexId>)> = Vec::with_capacity(new_ids.len());
    for &nid in &new_ids {
        let new_v = new.vertex(nid).expect("id from vertices_sorted()");
        let identity = new_v.identity();
        let found = old_ids
            .iter()
            .copied()
            .filter(|oid| !claimed_old.contains(oid))
            .find(|&oid| vertex_eq(new_v, old.vertex(oid).expect("id from vertices_sorted()")));
        if let Some(oid) = found {
            claimed_old.push(oid);
        }
        matched.push((nid, identity, found));
    }

    let removals: Vec<VertexId> = old_ids.into_iter().filter(|oid| !claimed_old.contains(oid)).collect();

    for &oid in &removals {
        vertex_remove_fn(old.vertex(oid).expect("removal id came from old graph"))?;
    }
    for (nid, _, matched_old) in &matched {
        if matched_old.is_none() {
            vertex_add_fn(new.vertex(*nid).expect("addition id came from new graph"))?;
        }
    }

    for &oid in &removals {
        old.delete_vertex(oid);
    }

    // new identity -> the VertexId it now occupies in `old` (the matched one, or a fresh one).
    let mut resolved: HashMap<String, VertexId> = HashMap::new();
    for (nid, identity, matched_old) in matched {
        let oid = match matched_old {
            Some(oid) => oid,
            None => {
                let payload = new.delete_vertex(nid).expect("addition id came from new graph");
                old.add_vertex(payload)
            }
        };
        resolved.insert(identity, oid);
    }

    let mut tracked: Vec<pgraph::EdgeId> = Vec::new();
    for (from_identity, to_identity, new_edge) in new_edges {
        let from = *resolved.get(&from_identity).expect("every new edge endpoint was resolved");
        let to = *resolved.get(&to_identity).expect("every new edge endpoint was resolved");
        let id = match old.find_edge(from, to) {
            Some(existing) if edge_eq(old.edge(existing).expect("edge exists"), &new_edge) => existing,
            _ => old.add_edge(from, to, new_edge).expect("sync edges never touch a self-loop"),
        };
        tracked.push(id);
    }

    let stale: Vec<pgraph::EdgeId> = old
        .vertices_sorted()
        .into_iter()
        .flat_map(|v| old.outgoing_edges(v))
        .filter(|e| !tracked.contains(e))
        .collect();
    for e in stale {
        old.delete_edge(e);
    }

    Ok(())
}
