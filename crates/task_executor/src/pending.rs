use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::FutureExt;
use itertools::Itertools;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::{Id, JoinSet};

/// Tracks background tasks spawned for vertices the scheduler is in the middle of pausing
/// (§4.8): a watch loop or an in-flight `check_apply` that was told to stop but has not yet
/// observed its cancellation. `wait` blocks the graph's Pausing -> Paused transition until every
/// tracked task finishes, or `timeout` elapses.
#[derive(Clone)]
pub struct PendingTasks {
    inner: Arc<Mutex<Option<Inner>>>,
}

struct Inner {
    id_to_name: HashMap<Id, String>,
    task_set: JoinSet<()>,
}

impl PendingTasks {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Some(Inner { id_to_name: HashMap::new(), task_set: JoinSet::new() }))) }
    }

    /// Spawns `task` on `handle`, tracked under `name` for logging once it finishes (or is
    /// reported as having failed to finish within a `wait` timeout).
    pub fn spawn_on<F>(&self, name: &str, handle: &Handle, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.inner.lock();
        let Some(inner) = &mut *guard else {
            log::warn!("pending task `{name}` submitted after draining completed");
            return;
        };
        let h = inner.task_set.spawn_on(task, handle);
        inner.id_to_name.insert(h.id(), name.to_string());
    }

    /// Waits for every tracked task to finish, up to `timeout`; aborts whatever is left after
    /// that. Calling this a second time (on a clone sharing the same inner state) is a no-op.
    pub async fn wait(self, timeout: Duration) {
        let Some(mut inner) = self.inner.lock().take() else {
            log::debug!("pending tasks awaited more than once");
            return;
        };
        if inner.task_set.is_empty() {
            return;
        }
        log::debug!("waiting for {} pending task(s) to drain", inner.task_set.len());

        let mut timeout = tokio::time::sleep(timeout).boxed();
        loop {
            tokio::select! {
                biased;
                _ = &mut timeout => break,
                next = inner.task_set.join_next_with_id() => {
                    match next {
                        Some(Ok((id, _))) => {
                            inner.id_to_name.remove(&id);
                        }
                        Some(Err(err)) => {
                            let name = inner.id_to_name.get(&err.id());
                            log::error!("pending task `{name:?}` panicked: {err:?}");
                        }
                        None => break,
                    }
                }
            }
        }

        if inner.task_set.is_empty() {
            log::debug!("all pending tasks drained");
        } else {
            log::warn!(
                "{} pending task(s) did not drain within timeout: {}",
                inner.task_set.len(),
                inner.id_to_name.values().join(", "),
            );
            inner.task_set.abort_all();
        }
    }
}

impl Default for PendingTasks {
    fn default() -> Self {
        Self::new()
    }
}
