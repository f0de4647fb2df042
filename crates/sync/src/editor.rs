use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use parking_lot::Mutex;
use pgraph::VertexId;
use resource::{Edge, ResourceGraph, Vertex};

#[derive(Debug)]
pub enum EditorError {
    VertexNotFound,
    /// `AddEdge` between a pair that already carries an edge whose args are a literal superset
    /// match of the new edge's — re-adding the exact same dependency is a programming error,
    /// not a no-op (§4.6).
    DuplicateEdgeArgs,
    Graph(pgraph::GraphError),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::VertexNotFound => write!(f, "vertex not present in the backing graph"),
            EditorError::DuplicateEdgeArgs => write!(f, "edge args already present between this pair"),
            EditorError::Graph(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EditorError {}

impl From<pgraph::GraphError> for EditorError {
    fn from(e: pgraph::GraphError) -> Self {
        EditorError::Graph(e)
    }
}

/// A pending mutation, appended by the editor's builder methods and applied in order by
/// [`GraphEditor::commit`].
pub enum Op {
    AddVertex(Vertex),
    AddEdge { from: VertexId, to: VertexId, edge: Edge },
    DeleteVertex(VertexId),
    AddGraph(ResourceGraph),
}

/// What undoes a successfully-applied [`Op`]. Captured with enough owned state (not just ids) to
/// restore exactly what was there before, since vertex and edge payloads are not `Clone`.
enum InverseOp {
    DeleteVertex(VertexId),
    RestoreEdge { from: VertexId, to: VertexId, edge: Option<Edge> },
    RestoreVertex { vertex: Vertex, incoming: Vec<(VertexId, Edge)>, outgoing: Vec<(VertexId, Edge)> },
    DeleteVertices(Vec<VertexId>),
}

/// A sequence of graph mutations applied atomically, with reference-counted garbage collection
/// and a reverse (undo) stack.
///
/// Grounded on the teacher's `graph::entry::Entry` state-replacement discipline, generalized from
/// "one memoized node transitions between states" to "a batch of graph edits commits together".
pub struct GraphEditor {
    graph: Arc<Mutex<ResourceGraph>>,
    refcounts: Arc<Mutex<HashMap<VertexId, u32>>>,
    pending: Vec<Op>,
    reverse: Vec<InverseOp>,
}

impl GraphEditor {
    pub fn new(graph: Arc<Mutex<ResourceGraph>>) -> Self {
        Self { graph, refcounts: Arc::new(Mutex::new(HashMap::new())), pending: Vec::new(), reverse: Vec::new() }
    }

    pub fn add_vertex(&mut self, v: Vertex) {
        self.pending.push(Op::AddVertex(v));
    }

    pub fn add_edge(&mut self, from: VertexId, to: VertexId, edge: Edge) {
        self.pending.push(Op::AddEdge { from, to, edge });
    }

    pub fn delete_vertex(&mut self, id: VertexId) {
        self.pending.push(Op::DeleteVertex(id));
    }

    pub fn add_graph(&mut self, g: ResourceGraph) {
        self.pending.push(Op::AddGraph(g));
    }

    /// Discards every not-yet-committed op without touching the backing graph.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Discards the undo history. Ops already committed stay committed; `reverse` no longer has
    /// anything to replay.
    pub fn erase(&mut self) {
        self.reverse.clear();
    }

    /// Applies every pending op, in order, under both the graph lock and the refcount lock.
    /// Atomic (§4.6): if any op fails, every op already applied this call is undone and the
    /// refcount table is restored to its pre-commit snapshot before the error is returned, so the
    /// graph ends up exactly as it started. The whole original op list (the failed op plus
    /// everything still unapplied after it) goes back into `pending` for the caller to fix and
    /// retry. Runs garbage collection only once every op has committed.
    pub fn commit(&mut self) -> Result<(), EditorError> {
        let ops = std::mem::take(&mut self.pending);
        let mut graph = self.graph.lock();
        let mut refcounts = self.refcounts.lock();
        let refcounts_before = refcounts.clone();

        let mut applied = Vec::new();
        let mut iter = ops.into_iter();
        while let Some(op) = iter.next() {
            match apply(&mut graph, &mut refcounts, op) {
                Ok(inverse) => applied.push(inverse),
                Err((failed_op, err)) => {
                    while let Some(inverse) = applied.pop() {
                        apply_inverse(&mut graph, inverse).expect("undoing an op this call just applied cannot fail");
                    }
                    *refcounts = refcounts_before;
                    let mut remaining = vec![failed_op];
                    remaining.extend(iter);
                    self.pending = remaining;
                    return Err(err);
                }
            }
        }

        self.reverse.extend(applied);
        gc(&mut graph, &mut refcounts);
        Ok(())
    }

    /// Replays the undo stack, most-recent-first, discarding it as it goes (its ops are not
    /// themselves reversible — undoing an undo is a fresh `commit`, not a `reverse`).
    pub fn reverse(&mut self) -> Result<(), EditorError> {
        let mut graph = self.graph.lock();
        while let Some(inverse) = self.reverse.pop() {
            apply_inverse(&mut graph, inverse)?;
        }
        Ok(())
    }
}

fn apply(
    graph: &mut ResourceGraph,
    refcounts: &mut HashMap<VertexId, u32>,
    op: Op,
) -> Result<InverseOp, (Op, EditorError)> {
    match op {
        Op::AddVertex(v) => {
            let id = graph.add_vertex(v);
            *refcounts.entry(id).or_insert(0) += 1;
            Ok(InverseOp::DeleteVertex(id))
        }
        Op::AddEdge { from, to, edge } => {
            let prior = graph.find_edge(from, to).map(|e| graph.edge(e).expect("edge exists").clone());
            let merged = match &prior {
                Some(existing) => match union_edge_args(existing, &edge) {
                    Ok(merged) => merged,
                    Err(err) => return Err((Op::AddEdge { from, to, edge }, err)),
                },
                None => edge,
            };
            let merged_for_retry = merged.clone();
            if let Err(e) = graph.add_edge(from, to, merged) {
                return Err((Op::AddEdge { from, to, edge: merged_for_retry }, e.into()));
            }
            *refcounts.entry(to).or_insert(0) += 1;
            Ok(InverseOp::RestoreEdge { from, to, edge: prior })
        }
        Op::DeleteVertex(id) => {
            let incoming: Vec<(VertexId, Edge)> = graph
                .incoming_vertices(id)
                .into_iter()
                .map(|x| {
                    let e = graph.find_edge(x, id).expect("incoming neighbor has an edge");
                    (x, graph.edge(e).expect("edge exists").clone())
                })
                .collect();
            let outgoing: Vec<(VertexId, Edge)> = graph
                .outgoing_vertices(id)
                .into_iter()
                .map(|x| {
                    let e = graph.find_edge(id, x).expect("outgoing neighbor has an edge");
                    (x, graph.edge(e).expect("edge exists").clone())
                })
                .collect();
            let count = refcounts.entry(id).or_insert(1);
            *count = count.saturating_sub(1);
            let Some(vertex) = graph.delete_vertex(id) else {
                return Err((Op::DeleteVertex(id), EditorError::VertexNotFound));
            };
            refcounts.remove(&id);
            Ok(InverseOp::RestoreVertex { vertex, incoming, outgoing })
        }
        Op::AddGraph(mut g) => {
            let mut added = Vec::new();
            for id in g.vertices_sorted() {
                let payload = g.delete_vertex(id).expect("id from vertices_sorted()");
                let new_id = graph.add_vertex(payload);
                *refcounts.entry(new_id).or_insert(0) += 1;
                added.push(new_id);
            }
            Ok(InverseOp::DeleteVertices(added))
        }
    }
}

fn apply_inverse(graph: &mut ResourceGraph, inverse: InverseOp) -> Result<(), EditorError> {
    match inverse {
        InverseOp::DeleteVertex(id) => {
            graph.delete_vertex(id);
            Ok(())
        }
        InverseOp::RestoreEdge { from, to, edge } => {
            match edge {
                Some(edge) => {
                    graph.add_edge(from, to, edge)?;
                }
                None => {
                    if let Some(e) = graph.find_edge(from, to) {
                        graph.delete_edge(e);
                    }
                }
            }
            Ok(())
        }
        InverseOp::RestoreVertex { vertex, incoming, outgoing } => {
            let id = graph.add_vertex(vertex);
            for (from, edge) in incoming {
                if graph.has_vertex(from) {
                    graph.add_edge(from, id, edge)?;
                }
            }
            for (to, edge) in outgoing {
                if graph.has_vertex(to) {
                    graph.add_edge(id, to, edge)?;
                }
            }
            Ok(())
        }
        InverseOp::DeleteVertices(ids) => {
            for id in ids {
                graph.delete_vertex(id);
            }
            Ok(())
        }
    }
}

/// Garbage-collects every vertex whose refcount dropped to zero this commit (§4.6).
fn gc(graph: &mut ResourceGraph, refcounts: &mut HashMap<VertexId, u32>) {
    let dead: Vec<VertexId> = refcounts.iter().filter(|(_, &c)| c == 0).map(|(&id, _)| id).collect();
    for id in dead {
        graph.delete_vertex(id);
        refcounts.remove(&id);
    }
}

fn union_edge_args(existing: &Edge, incoming: &Edge) -> Result<Edge, EditorError> {
    let existing_tokens: Vec<&str> = existing.name.split(',').collect();
    let incoming_tokens: Vec<&str> = incoming.name.split(',').collect();
    if incoming_tokens.iter().any(|t| existing_tokens.contains(t)) {
        return Err(EditorError::DuplicateEdgeArgs);
    }
    let name = existing_tokens
        .into_iter()
        .chain(incoming_tokens)
        .sorted()
        .dedup()
        .collect::<Vec<_>>()
        .join(",");
    Ok(Edge { name, notify: existing.notify || incoming.notify, refresh: existing.refresh || incoming.refresh })
}
