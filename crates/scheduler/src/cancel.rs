use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

/// A condition that can be triggered exactly once to release every waiter. Grounded on the
/// teacher's `async_latch::AsyncLatch` verbatim: triggering drops the `watch::Sender`, and every
/// clone of the `Receiver` observes that as a `changed()` error and returns from `triggered`.
#[derive(Clone)]
pub struct CancelToken {
    sender: Arc<Mutex<Option<watch::Sender<()>>>>,
    receiver: watch::Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(());
        Self { sender: Arc::new(Mutex::new(Some(sender))), receiver }
    }

    /// Triggers the token. Every call after the first is a no-op.
    pub fn trigger(&self) {
        self.sender.lock().take();
    }

    pub async fn triggered(&self) {
        let mut receiver = self.receiver.clone();
        while receiver.changed().await.is_ok() {}
    }

    pub fn is_triggered(&self) -> bool {
        self.sender.lock().is_none()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
