use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pgraph::VertexId;
use resource::{Resource, ResourceGraph, WatchEvent};
use semaphore::Registry;
use tokio::sync::mpsc;

use crate::event::{Ack, Delivery, Event, EventReceiver};
use crate::limiter::Reservation;
use crate::process::{process, ProcessOutcome, Runtimes};
use crate::retry::RetryOutcome;
use crate::runtime::{VertexRuntime, WorkerState};
use crate::timestamp::Clock;

/// Drives one vertex's per-worker state machine (§4.8) for the lifetime of the graph's Started
/// state: `init`, a Nil/Watching/Event/CheckApply/Poking loop reacting to its process channel and
/// to its own `watch` stream, then `close` on exit.
///
/// `Resource::watch` and `Resource::check_apply` both require `&mut self`, and this port keeps a
/// single owned `Box<dyn Resource>` per worker rather than sharing it across tasks — so unlike
/// the specification's goroutine model (where Watch and Process genuinely run in parallel), here
/// a `watch` call in flight is dropped (not polled further) the moment an event needs `Process`
/// to run, and is freshly re-entered afterward. See `DESIGN.md`'s Open Question resolution for
/// why this is the one place this port's concurrency is strictly weaker than the specification's.
pub async fn run_worker(
    graph: Arc<Mutex<ResourceGraph>>,
    runtimes: Arc<Runtimes>,
    semaphores: Arc<Registry>,
    clock: Arc<Clock>,
    id: VertexId,
    mut process_rx: EventReceiver,
) {
    let rt = runtimes.get(&id).expect("worker spawned for a tracked vertex").clone();
    let mut resource = crate::process::take_resource(&graph, id);

    if let Err(err) = resource.init().await {
        log::error!("init failed: {err}");
        crate::process::return_resource(&graph, id, resource);
        return;
    }

    let meta = resource.meta().clone();
    let mut paused = true;
    let mut watch_delay = Duration::ZERO;

    'outer: loop {
        rt.converger.enter_waiting();

        if paused {
            let delivery = tokio::select! {
                biased;
                _ = rt.cancel.triggered() => break 'outer,
                maybe = process_rx.recv() => match maybe {
                    Some(delivery) => delivery,
                    None => break 'outer,
                },
            };
            let (r, outcome) =
                handle_delivery(delivery, &graph, &runtimes, &semaphores, &clock, id, &rt, resource).await;
            resource = r;
            match outcome {
                Outcome::Exit => break 'outer,
                Outcome::Paused => {}
                Outcome::Continue => paused = false,
            }
            continue 'outer;
        }

        rt.set_state(WorkerState::Watching);

        if watch_delay > Duration::ZERO {
            let mut delay = Box::pin(tokio::time::sleep(watch_delay));
            loop {
                tokio::select! {
                    biased;
                    _ = rt.cancel.triggered() => break 'outer,
                    () = &mut delay => break,
                    maybe = process_rx.recv() => {
                        let delivery = match maybe {
                            Some(delivery) => delivery,
                            None => break 'outer,
                        };
                        let (r, outcome) =
                            handle_delivery(delivery, &graph, &runtimes, &semaphores, &clock, id, &rt, resource).await;
                        resource = r;
                        match outcome {
                            Outcome::Exit => break 'outer,
                            Outcome::Paused => {
                                paused = true;
                                watch_delay = Duration::ZERO;
                                continue 'outer;
                            }
                            Outcome::Continue => {}
                        }
                    }
                }
            }
            watch_delay = Duration::ZERO;
        }

        let (watch_tx, mut watch_rx) = mpsc::channel::<WatchEvent>(8);
        let watch_outcome = if meta.poll_sec == 0 {
            tokio::select! {
                biased;
                _ = rt.cancel.triggered() => break 'outer,
                result = resource.watch(watch_tx) => WatchOutcome::from_result(result),
                Some(_ev) = watch_rx.recv() => WatchOutcome::Changed,
                maybe = process_rx.recv() => match maybe {
                    Some(delivery) => WatchOutcome::Control(delivery),
                    None => break 'outer,
                },
            }
        } else {
            drop(watch_tx);
            tokio::select! {
                biased;
                _ = rt.cancel.triggered() => break 'outer,
                _ = tokio::time::sleep(Duration::from_secs(meta.poll_sec)) => WatchOutcome::Changed,
                maybe = process_rx.recv() => match maybe {
                    Some(delivery) => WatchOutcome::Control(delivery),
                    None => break 'outer,
                },
            }
        };

        match watch_outcome {
            WatchOutcome::Graceful => break 'outer,
            WatchOutcome::Failed(err) => {
                log::warn!("watch failed: {err}");
                match rt.retry.lock().fail() {
                    RetryOutcome::Exhausted => {
                        log::error!("retries exhausted, exiting worker");
                        break 'outer;
                    }
                    RetryOutcome::Retry(delay) => watch_delay = delay,
                }
            }
            WatchOutcome::Changed => {
                resource = run_one_process(&graph, &runtimes, &semaphores, &clock, id, &rt, resource).await;
            }
            WatchOutcome::Control(delivery) => {
                let (r, outcome) =
                    handle_delivery(delivery, &graph, &runtimes, &semaphores, &clock, id, &rt, resource).await;
                resource = r;
                match outcome {
                    Outcome::Exit => break 'outer,
                    Outcome::Paused => paused = true,
                    Outcome::Continue => {}
                }
            }
        }
    }

    rt.set_state(WorkerState::Nil);
    let _ = resource.close().await;
    crate::process::return_resource(&graph, id, resource);
}

enum WatchOutcome {
    Graceful,
    Failed(resource::ResourceError),
    Changed,
    Control(Delivery),
}

impl WatchOutcome {
    fn from_result(result: Result<(), resource::ResourceError>) -> Self {
        match result {
            Ok(()) => WatchOutcome::Graceful,
            Err(err) => WatchOutcome::Failed(err),
        }
    }
}

/// What the worker should do after handling one control-channel delivery.
enum Outcome {
    Continue,
    Paused,
    Exit,
}

/// Handles one delivery from the process channel: `Start`/`Poke`/`BackPoke` all run `Process` once
/// (§4.8); `Pause` idles the worker without tearing it down; `Exit` ends it.
async fn handle_delivery(
    delivery: Delivery,
    graph: &Mutex<ResourceGraph>,
    runtimes: &Runtimes,
    semaphores: &Registry,
    clock: &Clock,
    id: VertexId,
    rt: &VertexRuntime,
    resource: Box<dyn Resource>,
) -> (Box<dyn Resource>, Outcome) {
    match delivery.event {
        Event::Exit => {
            ack(delivery.ack, Ok(()));
            (resource, Outcome::Exit)
        }
        Event::Pause => {
            ack(delivery.ack, Ok(()));
            (resource, Outcome::Paused)
        }
        Event::Start | Event::Poke | Event::BackPoke => {
            let resource = run_one_process(graph, runtimes, semaphores, clock, id, rt, resource).await;
            ack(delivery.ack, Ok(()));
            (resource, Outcome::Continue)
        }
        Event::Nil => {
            ack(delivery.ack, Ok(()));
            (resource, Outcome::Continue)
        }
    }
}

/// Runs one `Process` for this vertex. The worker keeps its resource checked out of the graph for
/// the rest of its lifetime (see the module doc), so it is briefly handed back for the duration of
/// this call — `process` (and the rest of the scheduler) only ever sees a vertex's resource
/// through the graph, never through a worker's local variable.
async fn run_one_process(
    graph: &Mutex<ResourceGraph>,
    runtimes: &Runtimes,
    semaphores: &Registry,
    clock: &Clock,
    id: VertexId,
    rt: &VertexRuntime,
    resource: Box<dyn Resource>,
) -> Box<dyn Resource> {
    rt.set_state(WorkerState::Event);
    match rt.limiter.lock().reserve() {
        Reservation::PermanentlyLimited => {
            log::error!("vertex is permanently rate-limited (finite limit, zero burst)");
            return resource;
        }
        Reservation::Wait(delay) => tokio::time::sleep(delay).await,
        Reservation::Unlimited | Reservation::Go => {}
    }

    crate::process::return_resource(graph, id, resource);
    let outcome = process(graph, runtimes, semaphores, clock, id).await;
    match outcome {
        ProcessOutcome::NotReady => {}
        ProcessOutcome::UpToDate | ProcessOutcome::Applied => {
            rt.retry.lock().succeed();
        }
        ProcessOutcome::Failed(ref err) => {
            log::warn!("check_apply failed: {err}");
        }
    }
    crate::process::take_resource(graph, id)
}

fn ack(ack: Option<Ack>, result: Result<(), String>) {
    if let Some(ack) = ack {
        let _ = ack.send(result);
    }
}
