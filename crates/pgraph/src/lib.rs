// Copyright 2026 Convoy project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! A deterministic, acyclic-by-convention directed multigraph.
//!
//! `Graph<V, E>` is the shared primitive underneath the rest of this workspace: AutoEdge and
//! AutoGroup mutate it, the transactional editor in `sync` wraps it, and the scheduler walks it.
//! Every ordering-sensitive query (topological sort ties, reachability path choice, vertex
//! iteration) breaks ties by each vertex's [`Identity::identity`] string, so that two passes over
//! an identical graph always produce identical output.

mod dot;
mod merge;
mod reach;
mod topo;
mod walk;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fmt;

use fnv::FnvBuildHasher;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::Direction;

pub use dot::write_dot;
pub use merge::{vertex_merge, MergeFns};
pub use reach::reachability;
pub use topo::topological_sort;
pub use walk::{dfs, disconnected_components};

/// A stable, human-legible identity for a vertex payload.
///
/// Every deterministic operation in this crate sorts by this string rather than by insertion
/// order or by the backing `NodeIndex`, which is an implementation detail that petgraph does not
/// guarantee is insertion-stable once vertices are removed.
pub trait Identity {
    fn identity(&self) -> String;
}

/// A handle to a vertex. Stable across vertex removal elsewhere in the graph (petgraph's stable
/// graph tombstones removed slots rather than reusing indices while other handles are live).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub(crate) NodeIndex<u32>);

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VertexId({})", self.0.index())
    }
}

/// A handle to an edge.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) EdgeIndex<u32>);

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0.index())
    }
}

/// Coarse graph-level lifecycle state, set by whatever owns execution (the `scheduler` crate).
/// Carried here because it is part of the graph's data model (`SPEC_FULL.md` §3), not because
/// this crate interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphState {
    #[default]
    Nil,
    Starting,
    Started,
    Pausing,
    Paused,
}

#[derive(Debug)]
pub enum GraphError {
    EmptyName,
    SelfEdge(String),
    WouldCreateCycle,
    VertexNotFound,
    Cyclic,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::EmptyName => write!(f, "graph name must not be empty"),
            GraphError::SelfEdge(id) => write!(f, "refusing to add a self-edge on {id}"),
            GraphError::WouldCreateCycle => write!(f, "operation would create a cycle"),
            GraphError::VertexNotFound => write!(f, "vertex not present in this graph"),
            GraphError::Cyclic => write!(f, "graph is cyclic"),
        }
    }
}

impl std::error::Error for GraphError {}

type Index<V> = HashMap<String, NodeIndex<u32>, FnvBuildHasher>;

/// A directed multigraph, at most one edge per ordered vertex pair (invariant I2).
pub struct Graph<V, E> {
    name: String,
    inner: StableDiGraph<V, EdgeSlot<E>, u32>,
    index: Index<V>,
    state: GraphState,
}

/// Edges are stored with their own slot so `add_edge` can overwrite a prior edge between the same
/// ordered pair without leaving petgraph free to grow a parallel edge (I2).
struct EdgeSlot<E>(E);

impl<V: Identity, E> Graph<V, E> {
    pub fn new(name: impl Into<String>) -> Result<Self, GraphError> {
        let name = name.into();
        if name.is_empty() {
            return Err(GraphError::EmptyName);
        }
        Ok(Self {
            name,
            inner: StableDiGraph::new(),
            index: Index::default(),
            state: GraphState::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    pub fn set_state(&mut self, state: GraphState) {
        self.state = state;
    }

    pub fn len(&self) -> usize {
        self.inner.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.node_count() == 0
    }

    /// Adds a new vertex, replacing (and returning) any prior vertex with the same identity.
    pub fn add_vertex(&mut self, v: V) -> VertexId {
        let identity = v.identity();
        if let Some(&existing) = self.index.get(&identity) {
            self.inner[existing] = v;
            return VertexId(existing);
        }
        let idx = self.inner.add_node(v);
        self.index.insert(identity, idx);
        VertexId(idx)
    }

    pub fn find_vertex(&self, identity: &str) -> Option<VertexId> {
        self.index.get(identity).copied().map(VertexId)
    }

    pub fn has_vertex(&self, id: VertexId) -> bool {
        self.inner.node_weight(id.0).is_some()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&V> {
        self.inner.node_weight(id.0)
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut V> {
        self.inner.node_weight_mut(id.0)
    }

    /// Re-synchronizes the identity index for `id` after an in-place payload mutation (via
    /// [`Graph::vertex_mut`]) changed what [`Identity::identity`] it reports. Crate-internal:
    /// [`vertex_merge`] is the only caller, since it is the only place a vertex's identity can
    /// legitimately change without going through [`Graph::add_vertex`]/[`Graph::delete_vertex`].
    pub(crate) fn reindex(&mut self, id: VertexId, old_identity: &str) {
        self.index.remove(old_identity);
        let new_identity = self.inner[id.0].identity();
        self.index.insert(new_identity, id.0);
    }

    /// Removes a vertex and all incident edges, returning its payload.
    pub fn delete_vertex(&mut self, id: VertexId) -> Option<V> {
        let v = self.inner.remove_node(id.0)?;
        self.index.remove(&v.identity());
        Some(v)
    }

    /// Adds (or replaces) the edge from `from` to `to`. Rejects self-edges (I5); does not itself
    /// check acyclicity (I3) — callers that must preserve acyclicity use [`vertex_merge`] or
    /// check [`topological_sort`] after mutating.
    pub fn add_edge(&mut self, from: VertexId, to: VertexId, edge: E) -> Result<EdgeId, GraphError> {
        if from == to {
            let label = self.vertex(from).map(Identity::identity).unwrap_or_default();
            return Err(GraphError::SelfEdge(label));
        }
        if let Some(existing) = self.find_edge(from, to) {
            self.inner[existing.0] = EdgeSlot(edge);
            return Ok(existing);
        }
        Ok(EdgeId(self.inner.add_edge(from.0, to.0, EdgeSlot(edge))))
    }

    pub fn delete_edge(&mut self, id: EdgeId) {
        self.inner.remove_edge(id.0);
    }

    pub fn find_edge(&self, from: VertexId, to: VertexId) -> Option<EdgeId> {
        self.inner.find_edge(from.0, to.0).map(EdgeId)
    }

    pub fn lookup_edge(&self, id: EdgeId) -> Option<(VertexId, VertexId)> {
        self.inner
            .edge_endpoints(id.0)
            .map(|(a, b)| (VertexId(a), VertexId(b)))
    }

    pub fn edge(&self, id: EdgeId) -> Option<&E> {
        self.inner.edge_weight(id.0).map(|slot| &slot.0)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut E> {
        self.inner.edge_weight_mut(id.0).map(|slot| &mut slot.0)
    }

    pub fn incoming_vertices(&self, id: VertexId) -> Vec<VertexId> {
        self.inner
            .neighbors_directed(id.0, Direction::Incoming)
            .map(VertexId)
            .collect()
    }

    pub fn outgoing_vertices(&self, id: VertexId) -> Vec<VertexId> {
        self.inner
            .neighbors_directed(id.0, Direction::Outgoing)
            .map(VertexId)
            .collect()
    }

    pub fn incoming_edges(&self, id: VertexId) -> Vec<EdgeId> {
        self.inner
            .edges_directed(id.0, Direction::Incoming)
            .map(|e| EdgeId(e.id()))
            .collect()
    }

    pub fn outgoing_edges(&self, id: VertexId) -> Vec<EdgeId> {
        self.inner
            .edges_directed(id.0, Direction::Outgoing)
            .map(|e| EdgeId(e.id()))
            .collect()
    }

    pub fn in_degree(&self, id: VertexId) -> usize {
        self.inner.edges_directed(id.0, Direction::Incoming).count()
    }

    pub fn out_degree(&self, id: VertexId) -> usize {
        self.inner.edges_directed(id.0, Direction::Outgoing).count()
    }

    /// All vertices, in petgraph's internal (non-deterministic-across-mutation) order. Prefer
    /// [`Graph::vertices_sorted`] whenever the result feeds a pass that must be deterministic
    /// (I4).
    pub fn vertices(&self) -> Vec<VertexId> {
        self.inner.node_indices().map(VertexId).collect()
    }

    /// All vertices sorted by [`Identity::identity`] (invariant I4).
    pub fn vertices_sorted(&self) -> Vec<VertexId> {
        let mut ids = self.vertices();
        ids.sort_by_key(|id| self.vertex(*id).expect("id from vertices()").identity());
        ids
    }

    /// Produces a new graph containing only the vertices matching `pred`, and the edges between
    /// two surviving vertices.
    pub fn filter(&self, pred: impl Fn(&V) -> bool) -> Graph<V, E>
    where
        V: Clone,
        E: Clone,
    {
        let mut out = Graph {
            name: self.name.clone(),
            inner: StableDiGraph::new(),
            index: Index::default(),
            state: self.state,
        };
        for id in self.vertices_sorted() {
            let v = self.vertex(id).expect("id from vertices_sorted()");
            if pred(v) {
                out.add_vertex(v.clone());
            }
        }
        for id in self.vertices_sorted() {
            let v = self.vertex(id).expect("id from vertices_sorted()");
            if !pred(v) {
                continue;
            }
            for edge_id in self.outgoing_edges(id) {
                let (from, to) = self.lookup_edge(edge_id).expect("edge from outgoing_edges()");
                let to_v = self.vertex(to).expect("endpoint vertex");
                if !pred(to_v) {
                    continue;
                }
                let from_handle = out.find_vertex(&v.identity()).expect("just inserted");
                let to_handle = out.find_vertex(&to_v.identity()).expect("just inserted");
                let edge = self.edge(edge_id).expect("edge from outgoing_edges()").clone();
                out.add_edge(from_handle, to_handle, edge)
                    .expect("filtered copy cannot introduce a self-edge");
            }
        }
        out
    }

    /// A deep copy: same vertex and edge payloads, independent storage.
    pub fn copy(&self) -> Graph<V, E>
    where
        V: Clone,
        E: Clone,
    {
        self.filter(|_| true)
    }

    /// Structural equality up to caller-supplied payload equivalence, matching Graph Sync's
    /// (§4.5) notion of "the same graph": a vertex bijection satisfying `vertex_eq`, an edge
    /// bijection satisfying `edge_eq`, with matching incident degree. O(V·V + E·E): the vertex
    /// bijection is found by a greedy search over unclaimed candidates rather than each graph's
    /// own independent sort order, since `vertex_eq` is caller-supplied and need not agree with
    /// `Identity::identity()` ordering.
    pub fn compare(
        &self,
        other: &Graph<V, E>,
        vertex_eq: impl Fn(&V, &V) -> bool,
        edge_eq: impl Fn(&E, &E) -> bool,
    ) -> bool {
        if self.len() != other.len() {
            return false;
        }
        let mine = self.vertices_sorted();
        let theirs = other.vertices_sorted();

        let mut claimed = vec![false; theirs.len()];
        let mut mapping: HashMap<VertexId, VertexId> = HashMap::with_capacity(mine.len());
        for &a in &mine {
            let va = self.vertex(a).expect("id from vertices_sorted()");
            let degree_a = (self.in_degree(a), self.out_degree(a));
            let found = theirs.iter().enumerate().find(|&(i, &b)| {
                !claimed[i]
                    && degree_a == (other.in_degree(b), other.out_degree(b))
                    && vertex_eq(va, other.vertex(b).expect("id from vertices_sorted()"))
            });
            let Some((i, &b)) = found else { return false };
            claimed[i] = true;
            mapping.insert(a, b);
        }

        for &a in &mine {
            let b = mapping[&a];
            for edge_id in self.outgoing_edges(a) {
                let (_, to) = self.lookup_edge(edge_id).expect("edge from outgoing_edges()");
                let mapped_to = mapping[&to];
                let Some(other_edge_id) = other.find_edge(b, mapped_to) else { return false };
                let edge_a = self.edge(edge_id).expect("edge from outgoing_edges()");
                let edge_b = other.edge(other_edge_id).expect("edge just found by find_edge()");
                if !edge_eq(edge_a, edge_b) {
                    return false;
                }
            }
        }
        true
    }
}
