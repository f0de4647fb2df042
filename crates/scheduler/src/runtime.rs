use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use resource::Meta;

use crate::cancel::CancelToken;
use crate::event::EventSender;
use crate::limiter::TokenBucket;
use crate::retry::RetryState;

/// A vertex's position in the per-vertex state machine (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Nil,
    Watching,
    Event,
    CheckApply,
    Poking,
}

/// Everything the scheduler tracks for one live vertex, independent of the graph itself (so it
/// survives across `vertex_mut` borrows of the resource payload).
pub struct VertexRuntime {
    pub state: Mutex<WorkerState>,
    pub timestamp: AtomicU64,
    pub dirty: AtomicBool,
    pub retry: Mutex<RetryState>,
    pub limiter: Mutex<TokenBucket>,
    pub cancel: CancelToken,
    pub process_tx: EventSender,
    pub converger: ConvergerCounters,
}

impl VertexRuntime {
    pub fn new(meta: &Meta, process_tx: EventSender) -> Self {
        Self {
            state: Mutex::new(WorkerState::Nil),
            timestamp: AtomicU64::new(0),
            dirty: AtomicBool::new(true),
            retry: Mutex::new(RetryState::new(meta.retry, meta.delay_ms)),
            limiter: Mutex::new(TokenBucket::new(meta.limit, meta.burst)),
            cancel: CancelToken::new(),
            process_tx,
            converger: ConvergerCounters::new(),
        }
    }

    pub fn set_state(&self, state: WorkerState) {
        *self.state.lock() = state;
    }

    pub fn get_state(&self) -> WorkerState {
        *self.state.lock()
    }
}

/// Two per-worker counters feeding the converged-reporting check (§4.8): one for "worker is idle,
/// waiting on its next event" and one for "a Process is actually running".
pub struct ConvergerCounters {
    waiting: AtomicBool,
    running: AtomicBool,
    last_activity: Mutex<Instant>,
}

impl ConvergerCounters {
    pub fn new() -> Self {
        Self { waiting: AtomicBool::new(false), running: AtomicBool::new(false), last_activity: Mutex::new(Instant::now()) }
    }

    pub fn enter_waiting(&self) {
        self.waiting.store(true, Ordering::SeqCst);
        *self.last_activity.lock() = Instant::now();
    }

    pub fn enter_running(&self) {
        self.waiting.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        *self.last_activity.lock() = Instant::now();
    }

    pub fn exit_running(&self) {
        self.running.store(false, Ordering::SeqCst);
        *self.last_activity.lock() = Instant::now();
    }

    /// `true` if this worker has been idle (waiting, not running) for at least `idle_for`.
    pub fn converged(&self, idle_for: Duration) -> bool {
        !self.running.load(Ordering::SeqCst) && self.last_activity.lock().elapsed() >= idle_for
    }
}

impl Default for ConvergerCounters {
    fn default() -> Self {
        Self::new()
    }
}
