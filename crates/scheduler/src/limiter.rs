use std::time::{Duration, Instant};

use resource::RateLimit;

/// A token bucket, hand-rolled: nothing in the teacher's dependency graph provides rate limiting
/// (no `governor`/`ratelimit` crate appears anywhere in its workspace), so this composes directly
/// from `std::time` the way the teacher's own retry helper composes from `rand` for jitter.
pub struct TokenBucket {
    rate_per_sec: f64,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
}

/// What a worker should do before running `Process` again, per §4.8's rate-limiting rule.
pub enum Reservation {
    /// No limit configured; proceed immediately.
    Unlimited,
    /// A token was available; proceed immediately.
    Go,
    /// No token available; wait this long, then the reservation is implicitly granted.
    Wait(Duration),
    /// `limit` is finite but `burst == 0`: this vertex can never run. Fail the worker outright.
    PermanentlyLimited,
}

impl TokenBucket {
    pub fn new(limit: RateLimit, burst: u32) -> Self {
        let rate_per_sec = match limit {
            RateLimit::Infinite => 0.0,
            RateLimit::PerSecond(r) => r,
        };
        Self { rate_per_sec, burst: burst as f64, tokens: burst as f64, last_refill: Instant::now() }
    }

    fn refill(&mut self) {
        if self.rate_per_sec <= 0.0 {
            return;
        }
        let elapsed = self.last_refill.elapsed().as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.burst);
        self.last_refill = Instant::now();
    }

    /// Reserves one token, per §4.8's rate-limiting rule.
    pub fn reserve(&mut self) -> Reservation {
        if self.rate_per_sec <= 0.0 {
            return Reservation::Unlimited;
        }
        if self.burst <= 0.0 {
            return Reservation::PermanentlyLimited;
        }
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Reservation::Go;
        }
        let deficit = 1.0 - self.tokens;
        Reservation::Wait(Duration::from_secs_f64(deficit / self.rate_per_sec))
    }
}
