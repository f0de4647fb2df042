/// Scheduling metadata a resource declares, consumed by the `scheduler` crate (§4.8).
#[derive(Debug, Clone)]
pub struct Meta {
    /// Run `check_apply` but never actually converge state.
    pub noop: bool,
    pub retry: Retry,
    /// Delay before the first retry attempt, and the base for subsequent ones.
    pub delay_ms: u64,
    pub limit: RateLimit,
    /// Token bucket capacity; ignored when `limit` is [`RateLimit::Infinite`].
    pub burst: u32,
    /// Semaphore ids (`name[:N]`) this vertex must hold while running `check_apply`.
    pub sema: Vec<String>,
    /// `0` means "use `watch`"; otherwise poll `check_apply` every `poll_sec` seconds.
    pub poll_sec: u64,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            noop: false,
            retry: Retry::Finite(0),
            delay_ms: 0,
            limit: RateLimit::Infinite,
            burst: 0,
            sema: Vec::new(),
            poll_sec: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    Finite(u32),
    Infinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimit {
    Infinite,
    PerSecond(f64),
}
