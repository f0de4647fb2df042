use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use resource::{CheckApplyOutcome, Edge, Meta, Resource, ResourceError, ResourceGraph, Vertex, WatchEvent};
use task_executor::Executor;
use tokio::sync::mpsc;

use crate::limiter::{Reservation, TokenBucket};
use crate::retry::{RetryOutcome, RetryState};
use crate::timestamp::Clock;
use crate::{CancelToken, Scheduler};

/// A resource whose `check_apply` counts how many times it actually ran, for tests that need to
/// observe convergence from outside the opaque `Box<dyn Resource>` the graph holds.
struct Counted {
    name: String,
    meta: Meta,
    applies: Arc<AtomicUsize>,
}

impl Counted {
    fn new(name: &str, applies: Arc<AtomicUsize>) -> Self {
        Self { name: name.to_string(), meta: Meta::default(), applies }
    }
}

#[async_trait]
impl Resource for Counted {
    fn name(&self) -> &str {
        &self.name
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    async fn watch(&mut self, _events: mpsc::Sender<WatchEvent>) -> Result<(), ResourceError> {
        std::future::pending().await
    }

    async fn check_apply(&mut self, _apply: bool) -> Result<CheckApplyOutcome, ResourceError> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        Ok(CheckApplyOutcome::Applied)
    }
}

#[test]
fn clock_is_strictly_increasing() {
    let clock = Clock::new();
    let mut last = clock.now();
    for _ in 0..1000 {
        let next = clock.now();
        assert!(next > last);
        last = next;
    }
}

#[test]
fn retry_state_exhausts_then_resets_on_success() {
    let mut retry = RetryState::new(resource::Retry::Finite(2), 10);
    assert!(matches!(retry.fail(), RetryOutcome::Retry(_)));
    assert!(matches!(retry.fail(), RetryOutcome::Retry(_)));
    assert!(matches!(retry.fail(), RetryOutcome::Exhausted));

    retry.succeed();
    assert!(matches!(retry.fail(), RetryOutcome::Retry(_)));
}

#[test]
fn retry_state_infinite_never_exhausts() {
    let mut retry = RetryState::new(resource::Retry::Infinite, 5);
    for _ in 0..50 {
        assert!(matches!(retry.fail(), RetryOutcome::Retry(_)));
    }
}

#[test]
fn token_bucket_drains_burst_then_waits() {
    let mut bucket = TokenBucket::new(resource::RateLimit::PerSecond(1.0), 2);
    assert!(matches!(bucket.reserve(), Reservation::Go));
    assert!(matches!(bucket.reserve(), Reservation::Go));
    assert!(matches!(bucket.reserve(), Reservation::Wait(_)));
}

#[test]
fn token_bucket_with_zero_burst_is_permanently_limited() {
    let mut bucket = TokenBucket::new(resource::RateLimit::PerSecond(5.0), 0);
    assert!(matches!(bucket.reserve(), Reservation::PermanentlyLimited));
}

#[test]
fn token_bucket_unlimited_always_goes() {
    let mut bucket = TokenBucket::new(resource::RateLimit::Infinite, 0);
    assert!(matches!(bucket.reserve(), Reservation::Unlimited));
}

#[tokio::test]
async fn cancel_token_releases_every_waiter() {
    let token = CancelToken::new();
    let a = token.clone();
    let b = token.clone();
    assert!(!token.is_triggered());

    let handle = tokio::spawn(async move {
        a.triggered().await;
    });
    token.trigger();
    handle.await.unwrap();
    b.triggered().await;
    assert!(token.is_triggered());
}

fn add(graph: &mut ResourceGraph, resource: impl Resource + 'static) -> pgraph::VertexId {
    graph.add_vertex(Vertex::new(resource))
}

#[tokio::test(flavor = "multi_thread")]
async fn starting_a_source_vertex_converges_it() {
    let applies = Arc::new(AtomicUsize::new(0));
    let mut graph = ResourceGraph::new("g").unwrap();
    add(&mut graph, Counted::new("a", applies.clone()));

    let scheduler = Scheduler::new(graph, Executor::new());
    scheduler.start(true).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while applies.load(Ordering::SeqCst) == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(applies.load(Ordering::SeqCst), 1);

    scheduler.fast_exit().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn poke_propagates_convergence_down_a_chain() {
    let applies_a = Arc::new(AtomicUsize::new(0));
    let applies_b = Arc::new(AtomicUsize::new(0));

    let mut graph = ResourceGraph::new("g").unwrap();
    let a = add(&mut graph, Counted::new("a", applies_a.clone()));
    let b = add(&mut graph, Counted::new("b", applies_b.clone()));
    graph.add_edge(a, b, Edge::notify("e1")).unwrap();

    let scheduler = Scheduler::new(graph, Executor::new());
    scheduler.start(true).await.unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while applies_b.load(Ordering::SeqCst) == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(applies_a.load(Ordering::SeqCst) >= 1);
    assert!(applies_b.load(Ordering::SeqCst) >= 1);

    scheduler.fast_exit().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_then_start_resumes_without_rebuilding_workers() {
    let applies = Arc::new(AtomicUsize::new(0));
    let mut graph = ResourceGraph::new("g").unwrap();
    add(&mut graph, Counted::new("a", applies.clone()));

    let scheduler = Scheduler::new(graph, Executor::new());
    scheduler.start(true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(applies.load(Ordering::SeqCst), 1);

    // Pausing and resuming a vertex that is already converged (nothing dirty, nothing to
    // refresh) must not force a spurious re-apply.
    scheduler.pause().await.unwrap();
    scheduler.start(false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(applies.load(Ordering::SeqCst), 1);

    scheduler.fast_exit().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn interrupt_trips_every_vertex_cancel_token() {
    let applies = Arc::new(AtomicUsize::new(0));
    let mut graph = ResourceGraph::new("g").unwrap();
    add(&mut graph, Counted::new("a", applies.clone()));

    let scheduler = Scheduler::new(graph, Executor::new());
    scheduler.start(true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    scheduler.interrupt();
    let runtimes = scheduler.runtimes();
    for rt in runtimes.values() {
        assert!(rt.cancel.is_triggered());
    }
}
