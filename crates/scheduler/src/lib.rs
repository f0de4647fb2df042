// Copyright 2026 Convoy project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The concurrent scheduler (component H, §4.8/§5): drives a resource graph's vertices through
//! per-vertex Watching/Event/CheckApply/Poking state machines, and the graph itself through
//! Starting/Started/Pausing/Paused lifecycle transitions.
//!
//! Grounded on the teacher's `task_executor`/`async_latch` pairing for lifecycle plumbing; the
//! per-vertex state machine itself has no teacher analogue (the teacher has no long-running
//! convergent workers) and is built directly from the pseudocode in the specification this
//! workspace implements.

mod cancel;
mod event;
mod limiter;
mod process;
mod retry;
mod runtime;
mod timestamp;
mod worker;

#[cfg(test)]
mod tests;

pub use cancel::CancelToken;
pub use event::{channel, Ack, Delivery, Event, EventReceiver, EventSender};
pub use limiter::{Reservation, TokenBucket};
pub use process::{process, ProcessOutcome, Runtimes};
pub use retry::{RetryOutcome, RetryState};
pub use runtime::{ConvergerCounters, VertexRuntime, WorkerState};
pub use timestamp::Clock;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pgraph::{topological_sort, GraphError, GraphState, VertexId};
use resource::ResourceGraph;
use semaphore::Registry;
use task_executor::{Executor, PendingTasks};

#[derive(Debug)]
pub enum SchedulerError {
    Graph(GraphError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::Graph(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<GraphError> for SchedulerError {
    fn from(e: GraphError) -> Self {
        SchedulerError::Graph(e)
    }
}

/// How long `exit` waits for workers to finish an in-flight `Process` before giving up and
/// aborting them.
const DEFAULT_EXIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Ties together a graph, its per-vertex runtime state, and the machinery every worker needs
/// (semaphores, a clock, an executor), and drives the graph-level lifecycle (§5) across it.
///
/// A `Scheduler` owns the graph for its entire lifetime: AutoEdge, AutoGroup, and Graph Sync all
/// run before one is constructed, against a graph in [`GraphState::Nil`]. Reconciling a running
/// graph against a freshly computed one (a new `Scheduler`) is the caller's job, built from
/// `sync::sync_graph` plus `pause`/`exit` on the old scheduler and `start` on the new one.
pub struct Scheduler {
    graph: Arc<Mutex<ResourceGraph>>,
    runtimes: Arc<Runtimes>,
    semaphores: Arc<Registry>,
    clock: Arc<Clock>,
    executor: Executor,
    pending: PendingTasks,
}

impl Scheduler {
    /// Spawns one worker per vertex already in `graph`. Workers start paused (§5: a vertex only
    /// begins watching once it receives `Start`) and stay alive, idling, across `pause`/`start`
    /// cycles until `exit`/`fast_exit` tells them to stop.
    pub fn new(graph: ResourceGraph, executor: Executor) -> Self {
        const CHANNEL_CAPACITY: usize = 32;

        let graph = Arc::new(Mutex::new(graph));
        let mut runtimes = Runtimes::new();
        let mut pending_receivers = Vec::new();
        {
            let g = graph.lock();
            for id in g.vertices_sorted() {
                let vertex = g.vertex(id).expect("id from vertices_sorted()");
                let (tx, rx) = event::channel(CHANNEL_CAPACITY);
                let rt = Arc::new(VertexRuntime::new(vertex.resource.meta(), tx));
                runtimes.insert(id, rt);
                pending_receivers.push((id, rx));
            }
        }

        let scheduler = Self {
            graph,
            runtimes: Arc::new(runtimes),
            semaphores: Arc::new(Registry::new()),
            clock: Arc::new(Clock::new()),
            executor,
            pending: PendingTasks::new(),
        };

        for (id, rx) in pending_receivers {
            scheduler.spawn_worker(id, rx);
        }
        scheduler
    }

    fn spawn_worker(&self, id: VertexId, rx: EventReceiver) {
        let graph = self.graph.clone();
        let runtimes = self.runtimes.clone();
        let semaphores = self.semaphores.clone();
        let clock = self.clock.clone();
        let handle = self.executor.handle().clone();
        self.pending.spawn_on(&format!("worker-{id:?}"), &handle, async move {
            worker::run_worker(graph, runtimes, semaphores, clock, id, rx).await;
        });
    }

    async fn send(&self, id: VertexId, event: Event) {
        if let Some(rt) = self.runtimes.get(&id) {
            let _ = rt.process_tx.send(Delivery::new(event)).await;
        }
    }

    /// `Start` (§5): ensures every vertex's worker is watching. `first` restricts the initial
    /// `Start` to zero-in-degree vertices (sources boot their own downstream via `Poke` once they
    /// first converge); a later `start(false)` (e.g. resuming from `Paused`) reaches every vertex.
    pub async fn start(&self, first: bool) -> Result<(), SchedulerError> {
        self.graph.lock().set_state(GraphState::Starting);
        let mut order = { topological_sort(&self.graph.lock())? };
        order.reverse();
        for id in order {
            let in_degree = self.graph.lock().in_degree(id);
            if !first || in_degree == 0 {
                self.send(id, Event::Start).await;
            }
        }
        self.graph.lock().set_state(GraphState::Started);
        Ok(())
    }

    /// `Pause` (§5): tells every worker to stop watching/polling without tearing it down.
    pub async fn pause(&self) -> Result<(), SchedulerError> {
        self.graph.lock().set_state(GraphState::Pausing);
        let order = { topological_sort(&self.graph.lock())? };
        for id in order {
            self.send(id, Event::Pause).await;
        }
        self.graph.lock().set_state(GraphState::Paused);
        Ok(())
    }

    /// `Exit` (§5): tells every worker to stop permanently, then waits (up to
    /// [`DEFAULT_EXIT_TIMEOUT`]) for them to drain.
    pub async fn exit(&self) -> Result<(), SchedulerError> {
        self.exit_inner(DEFAULT_EXIT_TIMEOUT).await
    }

    /// `FastExit` (§5): like `exit`, but does not wait for in-flight `Process` calls to settle.
    pub async fn fast_exit(&self) -> Result<(), SchedulerError> {
        self.exit_inner(Duration::ZERO).await
    }

    async fn exit_inner(&self, timeout: Duration) -> Result<(), SchedulerError> {
        let order = { topological_sort(&self.graph.lock())? };
        for id in order {
            self.send(id, Event::Exit).await;
        }
        self.pending.clone().wait(timeout).await;
        Ok(())
    }

    /// `Interrupt` (§5): trips every vertex's cancellation token, unblocking a worker stuck inside
    /// a misbehaving `watch`/`check_apply` call without waiting for it to return on its own.
    pub fn interrupt(&self) {
        for rt in self.runtimes.values() {
            rt.cancel.trigger();
        }
    }

    /// `true` once every worker has been idle (not running `Process`) for at least `idle_for`
    /// (§4.8's converged-reporting rule).
    pub fn converged(&self, idle_for: Duration) -> bool {
        self.runtimes.values().all(|rt| rt.converger.converged(idle_for))
    }

    pub fn graph(&self) -> Arc<Mutex<ResourceGraph>> {
        self.graph.clone()
    }

    pub fn runtimes(&self) -> Arc<Runtimes> {
        self.runtimes.clone()
    }

    pub fn semaphores(&self) -> Arc<Registry> {
        self.semaphores.clone()
    }
}
