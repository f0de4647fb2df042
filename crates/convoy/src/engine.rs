use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use resource::{Edge, ResourceGraph, Vertex};
use scheduler::{Scheduler, SchedulerError};
use sync::SyncError;
use task_executor::Executor;
use tokio::sync::RwLock;

use crate::source::GraphSource;

#[derive(Debug)]
pub enum EngineError {
    Scheduler(SchedulerError),
    Sync(SyncError),
    /// `apply_graph` tried to reclaim the previous scheduler's graph after `exit` but another
    /// clone of it was still alive; reconciliation was aborted rather than silently copying.
    GraphStillShared,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Scheduler(e) => write!(f, "{e}"),
            EngineError::Sync(e) => write!(f, "{e}"),
            EngineError::GraphStillShared => {
                write!(f, "previous graph is still referenced elsewhere; refusing to reconcile")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<SchedulerError> for EngineError {
    fn from(e: SchedulerError) -> Self {
        EngineError::Scheduler(e)
    }
}

impl From<SyncError> for EngineError {
    fn from(e: SyncError) -> Self {
        EngineError::Sync(e)
    }
}

/// Builds an [`Engine`]. The only thing worth configuring is which [`Executor`] workers run on;
/// everything else (graph content, scheduling policy) arrives later through [`Engine::run`] or
/// [`Engine::apply_graph`].
pub struct EngineBuilder {
    executor: Option<Executor>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self { executor: None }
    }

    pub fn executor(mut self, executor: Executor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> Engine {
        Engine { executor: self.executor.unwrap_or_default(), scheduler: RwLock::new(None) }
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Ties AutoEdge, AutoGroup, Graph Sync, and the scheduler together (§2's component diagram).
///
/// Owns at most one live [`Scheduler`] at a time. Applying a new graph while one is already
/// running (the common case: a frontend reacting to a config change) drains the old one via
/// `exit`, reconciles its graph against the freshly computed one with `sync::sync_graph`, and
/// starts a brand new `Scheduler` over the reconciled result — matching the scheduler crate's own
/// documented division of labor (`Scheduler` owns one graph for its lifetime; reconciling a
/// running graph against a new one is the caller's job).
pub struct Engine {
    executor: Executor,
    scheduler: RwLock<Option<Scheduler>>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Consumes `source` until it yields `None` or a delivery with `exit` set, applying every
    /// graph it delivers and logging every error along the way (§6).
    pub async fn run(&self, source: &mut dyn GraphSource) -> Result<(), EngineError> {
        while let Some(delivery) = source.next().await {
            if let Some(err) = delivery.err {
                log::error!("graph source reported an error: {err}");
            }
            if let Some(graph) = delivery.graph {
                self.apply_graph(graph).await?;
            }
            if delivery.exit {
                return self.exit().await;
            }
        }
        Ok(())
    }

    /// Runs `new_graph` through AutoEdge (to a fixpoint, per property 3/§8) and AutoGroup, then
    /// either boots the first `Scheduler` or reconciles against the one already running.
    pub async fn apply_graph(&self, mut new_graph: ResourceGraph) -> Result<(), EngineError> {
        while autoedge::auto_edge(&mut new_graph) > 0 {}
        autogroup::auto_group(&mut new_graph, autogroup::non_reachable_pairs);

        let mut guard = self.scheduler.write().await;
        let scheduler = match guard.take() {
            None => {
                let scheduler = Scheduler::new(new_graph, self.executor.to_borrowed());
                scheduler.start(true).await?;
                scheduler
            }
            Some(old) => {
                old.exit().await?;
                let graph_arc = old.graph();
                drop(old);
                let mutex = Arc::try_unwrap(graph_arc).map_err(|_| EngineError::GraphStillShared)?;
                let mut reconciled = mutex.into_inner();
                sync::sync_graph(&mut reconciled, new_graph, vertex_eq, edge_eq, log_addition, log_removal)?;
                let scheduler = Scheduler::new(reconciled, self.executor.to_borrowed());
                scheduler.start(false).await?;
                scheduler
            }
        };
        *guard = Some(scheduler);
        Ok(())
    }

    pub async fn pause(&self) -> Result<(), EngineError> {
        match &*self.scheduler.read().await {
            Some(scheduler) => Ok(scheduler.pause().await?),
            None => Ok(()),
        }
    }

    pub async fn exit(&self) -> Result<(), EngineError> {
        if let Some(scheduler) = self.scheduler.write().await.take() {
            scheduler.exit().await?;
        }
        Ok(())
    }

    pub async fn fast_exit(&self) -> Result<(), EngineError> {
        if let Some(scheduler) = self.scheduler.write().await.take() {
            scheduler.fast_exit().await?;
        }
        Ok(())
    }

    /// Trips every live vertex's cancellation token. A no-op if no graph has been applied yet.
    pub async fn interrupt(&self) {
        if let Some(scheduler) = &*self.scheduler.read().await {
            scheduler.interrupt();
        }
    }

    /// `true` once every worker in the running graph has been idle for at least `idle_for`.
    /// `false` (never converged) before the first graph is applied.
    pub async fn converged(&self, idle_for: Duration) -> bool {
        match &*self.scheduler.read().await {
            Some(scheduler) => scheduler.converged(idle_for),
            None => false,
        }
    }

    /// Writes the currently running graph as GraphViz DOT (§6). A no-op writing nothing if no
    /// graph has been applied yet.
    pub async fn write_dot(&self, w: &mut impl io::Write) -> io::Result<()> {
        let guard = self.scheduler.read().await;
        let Some(scheduler) = &*guard else { return Ok(()) };
        let graph_arc = scheduler.graph();
        let graph = graph_arc.lock();
        pgraph::write_dot(&*graph, w)
    }
}

fn vertex_eq(a: &Vertex, b: &Vertex) -> bool {
    a.resource.name() == b.resource.name()
}

fn edge_eq(a: &Edge, b: &Edge) -> bool {
    a.name == b.name && a.notify == b.notify
}

fn log_addition(v: &Vertex) -> Result<(), SyncError> {
    log::info!("graph sync: adding vertex {:?}", v.resource.name());
    Ok(())
}

fn log_removal(v: &Vertex) -> Result<(), SyncError> {
    log::info!("graph sync: removing vertex {:?}", v.resource.name());
    Ok(())
}
