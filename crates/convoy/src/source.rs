use async_trait::async_trait;
use resource::ResourceGraph;
use tokio::sync::mpsc;

/// One delivery from a frontend (§6): a new graph to swap in via Graph Sync, an error to log, or
/// a permanent-shutdown signal, in any combination (a delivery can both carry a graph and set
/// `exit`, e.g. "here is the final graph, then stop").
pub struct GraphDelivery {
    pub graph: Option<ResourceGraph>,
    pub err: Option<resource::ResourceError>,
    pub exit: bool,
}

impl GraphDelivery {
    pub fn graph(graph: ResourceGraph) -> Self {
        Self { graph: Some(graph), err: None, exit: false }
    }

    pub fn error(err: resource::ResourceError) -> Self {
        Self { graph: None, err: Some(err), exit: false }
    }

    pub fn exit() -> Self {
        Self { graph: None, err: None, exit: true }
    }
}

/// A frontend's graph-producing stream. mcl/YAML frontends are out of scope; this trait is the
/// seam a future one would implement against.
#[async_trait]
pub trait GraphSource: Send {
    async fn next(&mut self) -> Option<GraphDelivery>;
}

/// A convenience `GraphSource` for programmatic callers and tests: a bounded channel standing in
/// for an actual frontend.
pub struct ChannelGraphSource {
    rx: mpsc::Receiver<GraphDelivery>,
}

#[async_trait]
impl GraphSource for ChannelGraphSource {
    async fn next(&mut self) -> Option<GraphDelivery> {
        self.rx.recv().await
    }
}

pub type GraphSender = mpsc::Sender<GraphDelivery>;

/// Builds a linked `(sender, ChannelGraphSource)` pair.
pub fn channel(capacity: usize) -> (GraphSender, ChannelGraphSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, ChannelGraphSource { rx })
}
