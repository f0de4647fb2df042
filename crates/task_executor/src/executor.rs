use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::{JoinError, JoinHandle};

/// A handle to a tokio `Runtime`, in one of two flavors:
///
/// * "borrowed" (`Executor::new`, `Executor::to_borrowed`): does not own a `Runtime`. Dropping
///   every clone has no effect, and `shutdown` is a no-op. Used inside `#[tokio::test]`s and
///   anywhere else the ambient runtime outlives the `Executor`.
/// * "owned" (`Executor::new_owned`): owns a `Runtime`. `shutdown` tears it down for every clone;
///   dropping the last clone without calling `shutdown` leaks the runtime's threads rather than
///   blocking the drop.
#[derive(Debug, Clone)]
pub struct Executor {
    runtime: Arc<Mutex<Option<Runtime>>>,
    handle: Handle,
}

impl Executor {
    /// Wraps the runtime of the calling context (e.g. a `#[tokio::main]`/`#[tokio::test]` body).
    pub fn new() -> Executor {
        Self { runtime: Arc::new(Mutex::new(None)), handle: Handle::current() }
    }

    /// Builds and owns a fresh multi-thread `Runtime`.
    pub fn new_owned(num_worker_threads: usize, max_blocking_threads: usize) -> Result<Executor, String> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(num_worker_threads)
            .max_blocking_threads(max_blocking_threads)
            .enable_all()
            .build()
            .map_err(|e| format!("failed to start the runtime: {e}"))?;
        let handle = runtime.handle().clone();
        Ok(Executor { runtime: Arc::new(Mutex::new(Some(runtime))), handle })
    }

    /// A clone disconnected from this `Executor`'s shutdown: dropping it, or calling `shutdown`
    /// on it, never tears down the underlying runtime.
    pub fn to_borrowed(&self) -> Executor {
        Self { runtime: Arc::new(Mutex::new(None)), handle: self.handle.clone() }
    }

    pub fn enter<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = self.handle.enter();
        f()
    }

    /// Spawns `future` as a new task, returning a future that resolves to its output, recovering
    /// a panicked task via `rescue_join_error` rather than propagating the `JoinError`.
    pub fn spawn<O, F>(&self, future: F, rescue_join_error: impl FnOnce(JoinError) -> O) -> impl Future<Output = O>
    where
        O: Send + 'static,
        F: Future<Output = O> + Send + 'static,
    {
        self.native_spawn(future).map(|res| match res {
            Ok(o) => o,
            Err(e) => rescue_join_error(e),
        })
    }

    pub fn native_spawn<O, F>(&self, future: F) -> JoinHandle<O>
    where
        O: Send + 'static,
        F: Future<Output = O> + Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Runs `future` to completion on this runtime. Must only be called from outside an async
    /// context (a main function, a test body) — never from within a spawned task.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.handle.block_on(future)
    }

    pub fn spawn_blocking<F, R>(&self, f: F, rescue_join_error: impl FnOnce(JoinError) -> R) -> impl Future<Output = R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.native_spawn_blocking(f).map(|res| match res {
            Ok(o) => o,
            Err(e) => rescue_join_error(e),
        })
    }

    pub fn native_spawn_blocking<F, R>(&self, f: F) -> JoinHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.handle.spawn_blocking(f)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Blocks until an owned runtime's tasks drain, or `timeout` elapses (in which case any
    /// still-running tasks are leaked). A no-op on a borrowed `Executor`.
    pub fn shutdown(&self, timeout: Duration) {
        let Some(runtime) = self.runtime.lock().take() else { return };
        let start = Instant::now();
        runtime.shutdown_timeout(timeout);
        if start.elapsed() > timeout {
            log::warn!("executor shutdown took unexpectedly long: tasks were likely leaked");
        }
    }

    /// `true` once `shutdown` has run; always `true` for a borrowed `Executor`.
    pub fn is_shutdown(&self) -> bool {
        self.runtime.lock().is_none()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
