use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch, with a monotonic-counter fallback (§5: "timestamps are
/// strictly monotonic per-vertex; implementations should fall back to a monotonic counter if
/// wall-clock could stutter").
///
/// Grounded on the teacher's `concrete_time::Duration`, trimmed of its `serde`/`deepsize` derives
/// (this system never serializes a timestamp across a process boundary) down to the one thing
/// the scheduler actually needs: a total order that never goes backwards.
pub struct Clock {
    last: AtomicU64,
}

impl Clock {
    pub fn new() -> Self {
        Self { last: AtomicU64::new(0) }
    }

    /// Returns a nanosecond timestamp strictly greater than every value this clock has returned
    /// before.
    pub fn now(&self) -> u64 {
        let wall = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as u64;
        loop {
            let prev = self.last.load(Ordering::SeqCst);
            let next = wall.max(prev + 1);
            if self.last.compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
                return next;
            }
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
