// Copyright 2026 Convoy project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! AutoEdge (component C, §4.3): synthesizes implicit dependency edges by matching each
//! edge-capable vertex's seeking UIDs against every other vertex's advertised UIDs.
//!
//! Grounded on the teacher's `engine/graph/src/lib.rs` traversal helpers: the redundancy check
//! below is the same "is the target already reachable" walk `invalidate_from_roots` uses before
//! deciding whether an edge needs to be retained.

use std::any::TypeId;
use std::collections::HashMap;

use fnv::FnvBuildHasher;
use pgraph::{reachability, Identity, VertexId};
use resource::{Edge, ResourceGraph};


/// Runs one AutoEdge pass over `graph`, returning the number of edges added.
///
/// Idempotent (property 3, §8): a second call over the same graph state adds nothing, because
/// every candidate edge this pass would add is either already present or already reachable by
/// the time it is considered.
pub fn auto_edge(graph: &mut ResourceGraph) -> usize {
    let all = graph.vertices_sorted();

    // UID-type index: bucket every advertising vertex by the concrete type of each UID it
    // offers, so matching a seeking UID only has to scan vertices that could possibly satisfy it
    // (§4.3's "iff is always false across unrelated types" assumption, resolved as exact in
    // `DESIGN.md`).
    let mut index: HashMap<TypeId, Vec<VertexId>, FnvBuildHasher> = HashMap::default();
    for &id in &all {
        let vertex = graph.vertex(id).expect("id from vertices_sorted()");
        if vertex.resource.disabled() {
            continue;
        }
        for uid in vertex.resource.uids() {
            index.entry(uid.as_any().type_id()).or_default().push(id);
        }
    }
    // Candidate vertex ids within each bucket were pushed in vertices_sorted order, so scans
    // over a bucket are already deterministic (I4).

    let mut added = 0;
    for &self_id in &all {
        let (disabled, mut stream) = {
            let vertex = graph.vertex(self_id).expect("id from vertices_sorted()");
            (vertex.resource.disabled(), vertex.resource.auto_edges())
        };
        if disabled {
            continue;
        }
        let Some(stream) = stream.as_deref_mut() else { continue };

        loop {
            let Some(batch) = stream.next() else { break };
            let mut results = Vec::with_capacity(batch.len());
            for seeking in &batch {
                let matched = match_one(graph, &index, self_id, seeking, &mut added);
                results.push(matched);
            }
            if !stream.test(results) {
                break;
            }
        }
    }
    added
}

fn match_one(
    graph: &mut ResourceGraph,
    index: &HashMap<TypeId, Vec<VertexId>, FnvBuildHasher>,
    self_id: VertexId,
    seeking: &resource::SeekingUid,
    added: &mut usize,
) -> bool {
    let type_tag = seeking.uid.as_any().type_id();
    let Some(candidates) = index.get(&type_tag) else { return false };

    for &cand_id in candidates {
        if cand_id == self_id {
            continue;
        }
        let is_match = {
            let cand_vertex = graph.vertex(cand_id).expect("candidate from index");
            !cand_vertex.resource.disabled()
                && cand_vertex.resource.uids().iter().any(|u| u.iff(&*seeking.uid))
        };
        if !is_match {
            continue;
        }

        let (from, to) = if seeking.is_reversed { (self_id, cand_id) } else { (cand_id, self_id) };
        if graph.find_edge(from, to).is_none() {
            let redundant = !reachability(graph, from, to).unwrap_or_default().is_empty();
            if !redundant {
                let from_name = graph.vertex(from).expect("endpoint exists").identity();
                let to_name = graph.vertex(to).expect("endpoint exists").identity();
                graph
                    .add_edge(from, to, Edge::new(format!("autoedge:{from_name}->{to_name}")))
                    .expect("from != to is guaranteed by the cand_id == self_id check above");
                *added += 1;
            }
        }
        return true;
    }
    false
}
