use tokio::sync::{mpsc, oneshot};

/// What a worker's Event-dispatch task reports back to whoever synchronously waits on an event
/// (§6: "the sender awaits an ack ... when it needs synchronous semantics").
pub type Ack = oneshot::Sender<Result<(), String>>;

/// An event delivered to a vertex's process channel (§6).
pub enum Event {
    Nil,
    Exit,
    Start,
    Pause,
    /// An upstream neighbour reporting a completed `Process`.
    Poke,
    /// A downstream neighbour reporting that this vertex is stale relative to it and may be
    /// ready to run again.
    BackPoke,
}

/// A process-channel event bundled with an optional ack the dispatcher should fulfil once it has
/// been handled.
pub struct Delivery {
    pub event: Event,
    pub ack: Option<Ack>,
}

impl Delivery {
    pub fn new(event: Event) -> Self {
        Self { event, ack: None }
    }

    pub fn with_ack(event: Event, ack: Ack) -> Self {
        Self { event, ack: Some(ack) }
    }
}

pub type EventSender = mpsc::Sender<Delivery>;
pub type EventReceiver = mpsc::Receiver<Delivery>;

pub fn channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity)
}
