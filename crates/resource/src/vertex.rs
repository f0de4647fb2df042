use pgraph::Identity;

use crate::Resource;

/// A graph vertex: a boxed resource payload. The vertex's [`Identity`] is the resource's own
/// name, which must be unique within a graph.
pub struct Vertex {
    pub resource: Box<dyn Resource>,
}

impl Vertex {
    pub fn new(resource: impl Resource + 'static) -> Self {
        Self { resource: Box::new(resource) }
    }

    pub fn boxed(resource: Box<dyn Resource>) -> Self {
        Self { resource }
    }
}

impl Identity for Vertex {
    fn identity(&self) -> String {
        self.resource.name().to_string()
    }
}

/// A graph edge: a name (used by `autogroup`'s name-union merge, §4.4) plus the notify/refresh
/// pair that carries refresh propagation (§4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub name: String,
    /// This edge is a refresh channel: a completed Applied `check_apply` on the source sets
    /// `refresh` on every outgoing edge with `notify == true`.
    pub notify: bool,
    /// A notification is presently pending along this edge.
    pub refresh: bool,
}

impl Edge {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), notify: false, refresh: false }
    }

    pub fn notify(name: impl Into<String>) -> Self {
        Self { name: name.into(), notify: true, refresh: false }
    }
}

/// The concrete graph type the rest of the workspace (`autoedge`, `autogroup`, `sync`,
/// `scheduler`, `convoy`) operates on.
pub type ResourceGraph = pgraph::Graph<Vertex, Edge>;
