// Copyright 2026 Convoy project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! AutoGroup (component D, §4.4): fuses vertices that opt into grouping, sharing a kind, and
//! passing a payload-specific comparison, as long as doing so would not introduce a cycle.
//!
//! Grounded on `pgraph::vertex_merge`'s in-place absorb/rehome implementation; this crate only
//! supplies the candidate-pair strategies and the `Vertex`-level absorb/edge-merge closures.

mod grouped;
mod strategy;

#[cfg(test)]
mod tests;

pub use grouped::Grouped;
pub use strategy::{baseline_pairs, non_reachable_pairs};

use itertools::Itertools;
use pgraph::{merge, VertexId};
use resource::{Edge, ResourceGraph};

/// Runs AutoGroup to a fixpoint using `candidates` to propose pairs, returning how many merges
/// happened.
///
/// `candidates` is re-invoked after every successful merge (vertex ids are only stable for
/// vertices that were not touched by a merge — see `grouped::Grouped`'s doc comment — so a
/// freshly recomputed candidate list is the simplest way to stay correct).
pub fn auto_group(
    graph: &mut ResourceGraph,
    candidates: impl Fn(&ResourceGraph) -> Vec<(VertexId, VertexId)>,
) -> usize {
    let mut merges = 0;
    'restart: loop {
        for (a, b) in candidates(graph) {
            if !graph.has_vertex(a) || !graph.has_vertex(b) {
                continue;
            }
            if !compare_ok(graph, a, b) {
                continue;
            }
            let result = merge::vertex_merge(
                graph,
                a,
                b,
                merge::MergeFns {
                    absorb: |v1: &mut resource::Vertex, v2: resource::Vertex| {
                        let existing =
                            std::mem::replace(&mut v1.resource, Box::new(resource::Noop::new(String::new())));
                        v1.resource = Grouped::absorb(existing, v2.resource);
                    },
                    edge_merge_fn: merge_edges,
                },
            );
            if result.is_ok() {
                merges += 1;
                continue 'restart;
            }
        }
        break;
    }
    merges
}

fn compare_ok(graph: &ResourceGraph, a: VertexId, b: VertexId) -> bool {
    if a == b {
        return false;
    }
    let (Some(va), Some(vb)) = (graph.vertex(a), graph.vertex(b)) else { return false };
    if va.resource.disabled() || vb.resource.disabled() {
        return false;
    }
    let (Some(ga), Some(gb)) = (va.resource.groupable(), vb.resource.groupable()) else {
        return false;
    };
    ga.kind() == gb.kind() && ga.compare(gb)
}

/// Name-union merge (§4.4: "parallel edges arising from fusion merge by name union"), used as
/// the default `edge_merge_fn`.
fn merge_edges(a: &Edge, b: &Edge) -> Edge {
    let names = a
        .name
        .split(',')
        .chain(b.name.split(','))
        .sorted()
        .dedup()
        .collect::<Vec<_>>()
        .join(",");
    Edge { name: names, notify: a.notify || b.notify, refresh: a.refresh || b.refresh }
}
