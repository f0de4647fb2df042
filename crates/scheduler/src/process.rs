use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use pgraph::VertexId;
use resource::{CheckApplyOutcome, Noop, ResourceError, ResourceGraph};
use semaphore::Registry;

use crate::event::{Delivery, Event};
use crate::runtime::{VertexRuntime, WorkerState};
use crate::timestamp::Clock;

pub type Runtimes = HashMap<VertexId, Arc<VertexRuntime>>;

/// What running `Process` on one vertex concluded.
pub enum ProcessOutcome {
    /// A predecessor is itself mid-`Process`; returned without touching the resource, relying on
    /// that predecessor's own completion to poke this vertex again.
    NotReady,
    UpToDate,
    Applied,
    Failed(ResourceError),
}

/// Swaps the live resource out from under its vertex for the duration of an async capability
/// call, so the graph's lock is never held across an `.await` (holding a `parking_lot::Mutex`
/// guard across an await point is both a deadlock risk and makes the enclosing future `!Send`).
///
/// Mirrors the teacher's `entry.rs` discipline of `mem::replace`-ing an `Entry`'s state with a
/// transient "running" placeholder before an async `run`, then replacing it with the real result
/// once that future resolves.
pub(crate) fn take_resource(graph: &Mutex<ResourceGraph>, id: VertexId) -> Box<dyn resource::Resource> {
    let mut graph = graph.lock();
    let vertex = graph.vertex_mut(id).expect("process called for a vertex still in the graph");
    std::mem::replace(&mut vertex.resource, Box::new(Noop::new(String::new())))
}

pub(crate) fn return_resource(graph: &Mutex<ResourceGraph>, id: VertexId, resource: Box<dyn resource::Resource>) {
    let mut graph = graph.lock();
    if let Some(vertex) = graph.vertex_mut(id) {
        vertex.resource = resource;
    }
}

/// Runs the `Process(v)` contract (§4.8) for one vertex.
pub async fn process(
    graph: &Mutex<ResourceGraph>,
    runtimes: &Runtimes,
    semaphores: &Registry,
    clock: &Clock,
    id: VertexId,
) -> ProcessOutcome {
    let rt = runtimes.get(&id).expect("process called for a tracked vertex").clone();

    // Step 1: readiness. `claim` is the timestamp this run would stamp itself with if it proceeds
    // (the clock is a single shared monotonic counter, so every completed Process anywhere in the
    // graph has already consumed a strictly smaller value than whatever `clock.now()` returns
    // here). A predecessor whose last recorded timestamp is >= `claim` therefore finished — or is
    // about to finish — concurrently with this check; proceeding now could run against a view of
    // it that's already out of date. BackPoke every such predecessor so it re-asserts itself,
    // unless it's already mid-`Process` (it will poke us again on its own completion, so nudging
    // it now would just be redundant).
    let claim = clock.now();
    let stale_predecessors: Vec<VertexId> = {
        let graph = graph.lock();
        graph
            .incoming_vertices(id)
            .into_iter()
            .filter(|pred| runtimes.get(pred).is_some_and(|r| r.timestamp.load(Ordering::SeqCst) >= claim))
            .collect()
    };
    if !stale_predecessors.is_empty() {
        for pred in stale_predecessors {
            let Some(pred_rt) = runtimes.get(&pred) else { continue };
            if matches!(pred_rt.get_state(), WorkerState::Event | WorkerState::CheckApply) {
                continue;
            }
            let _ = pred_rt.process_tx.send(Delivery::new(Event::BackPoke)).await;
        }
        return ProcessOutcome::NotReady;
    }

    rt.set_state(WorkerState::CheckApply);
    rt.converger.enter_running();
    let outcome = run_check_apply(graph, runtimes, semaphores, clock, id, &rt).await;
    rt.converger.exit_running();
    rt.set_state(WorkerState::Watching);
    outcome
}

async fn run_check_apply(
    graph: &Mutex<ResourceGraph>,
    runtimes: &Runtimes,
    semaphores: &Registry,
    clock: &Clock,
    id: VertexId,
    rt: &VertexRuntime,
) -> ProcessOutcome {
    let mut live = take_resource(graph, id);

    let send_recv_result = live.send_recv().await;
    let updates = match send_recv_result {
        Ok(updates) => updates,
        Err(err) => {
            return_resource(graph, id, live);
            return ProcessOutcome::Failed(err);
        }
    };
    if !updates.is_empty() {
        rt.dirty.store(true, Ordering::SeqCst);
    }

    let refresh = {
        let graph = graph.lock();
        graph
            .incoming_edges(id)
            .into_iter()
            .any(|e| graph.edge(e).is_some_and(|e| e.notify && e.refresh))
    };

    let meta = live.meta().clone();
    let dirty = rt.dirty.load(Ordering::SeqCst);

    let result: Result<CheckApplyOutcome, ResourceError> = if !dirty && !refresh {
        Ok(CheckApplyOutcome::UpToDate)
    } else {
        let _guard = if meta.sema.is_empty() {
            None
        } else {
            match semaphores.acquire(&meta.sema).await {
                Ok(guard) => Some(guard),
                Err(err) => {
                    return_resource(graph, id, live);
                    return ProcessOutcome::Failed(Box::new(err));
                }
            }
        };
        live.check_apply(!meta.noop).await
    };

    return_resource(graph, id, live);

    let outcome = match result {
        Ok(CheckApplyOutcome::UpToDate) => ProcessOutcome::UpToDate,
        Ok(CheckApplyOutcome::Applied) => ProcessOutcome::Applied,
        Err(err) => return ProcessOutcome::Failed(err),
    };

    if !meta.noop {
        rt.dirty.store(false, Ordering::SeqCst);
        if refresh {
            let mut graph = graph.lock();
            for e in graph.incoming_edges(id) {
                if let Some(edge) = graph.edge_mut(e) {
                    if edge.notify {
                        edge.refresh = false;
                    }
                }
            }
        }
    }

    if matches!(outcome, ProcessOutcome::Applied) && !meta.noop {
        let mut graph = graph.lock();
        for e in graph.outgoing_edges(id) {
            if let Some(edge) = graph.edge_mut(e) {
                if edge.notify {
                    edge.refresh = true;
                }
            }
        }
    }

    // Timestamps must advance before downstream is poked, so a Poke never observes a stale
    // value (§4.8 step 7).
    rt.timestamp.store(clock.now(), Ordering::SeqCst);

    rt.set_state(WorkerState::Poking);
    let downstream: Vec<VertexId> = graph.lock().outgoing_vertices(id);
    for next in downstream {
        let Some(next_rt) = runtimes.get(&next) else { continue };
        let state = next_rt.get_state();
        if matches!(state, WorkerState::Event | WorkerState::CheckApply) {
            continue;
        }
        let _ = next_rt.process_tx.send(Delivery::new(Event::Poke)).await;
    }

    outcome
}
