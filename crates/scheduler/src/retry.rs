use std::time::Duration;

use rand::Rng;
use resource::Retry;

/// Tracks how many retries a worker has left and the delay before the next one, per §4.8:
/// on a `Process` error, decrement (unless infinite) and schedule a retry after `delay_ms`;
/// reset to the original count on the next success.
pub struct RetryState {
    original: Retry,
    remaining: Retry,
    delay_ms: u64,
}

/// What a worker should do after a failed `Process`.
pub enum RetryOutcome {
    /// Retries are exhausted: exit the worker permanently.
    Exhausted,
    /// Wait this long, then retry.
    Retry(Duration),
}

impl RetryState {
    pub fn new(retry: Retry, delay_ms: u64) -> Self {
        Self { original: retry, remaining: retry, delay_ms }
    }

    /// Records a failure, returning what the worker should do next. The delay carries a little
    /// jitter (half to full of `delay_ms`) so that several vertices failing at once don't all
    /// retry in lockstep, the same reason the teacher's own gRPC retry helper rolls a
    /// `rand::Rng` into its backoff.
    pub fn fail(&mut self) -> RetryOutcome {
        match self.remaining {
            Retry::Finite(0) => RetryOutcome::Exhausted,
            Retry::Finite(n) => {
                self.remaining = Retry::Finite(n - 1);
                RetryOutcome::Retry(self.jittered_delay())
            }
            Retry::Infinite => RetryOutcome::Retry(self.jittered_delay()),
        }
    }

    fn jittered_delay(&self) -> Duration {
        if self.delay_ms == 0 {
            return Duration::ZERO;
        }
        let floor = self.delay_ms / 2;
        let millis = rand::rng().random_range(floor..=self.delay_ms);
        Duration::from_millis(millis)
    }

    /// Records a success, resetting the retry budget to its original value.
    pub fn succeed(&mut self) {
        self.remaining = self.original;
    }
}
