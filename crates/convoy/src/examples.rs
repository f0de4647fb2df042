//! Resources exercising the full AutoEdge/AutoGroup/scheduler pipeline, used by this crate's own
//! integration tests. Mirrors the role `resource::{Const, Noop}` play for the lower-level crates:
//! public, but meant for tests and demonstrations rather than production use.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use resource::{CheckApplyOutcome, Groupable, Meta, Resource, ResourceError, SendRecvUpdates, SeekingUid, SingleBatch, Uid, WatchEvent};
use tokio::sync::mpsc;

/// A [`Uid`] identified purely by an opaque string, for wiring up an AutoEdge producer/consumer
/// pair without a domain-specific notion of identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringUid(pub String);

impl Uid for StringUid {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn iff(&self, other: &dyn Uid) -> bool {
        other.as_any().downcast_ref::<StringUid>().is_some_and(|o| o.0 == self.0)
    }
}

/// A resource that counts how many times it actually converged, and can be configured to
/// advertise a UID, seek one, or opt into grouping — the three things `autoedge`/`autogroup`
/// dispatch through.
pub struct Tracked {
    name: String,
    meta: Meta,
    provides: Option<String>,
    seeks: Vec<String>,
    group_kind: Option<String>,
    applies: Arc<AtomicUsize>,
}

impl Tracked {
    pub fn new(name: impl Into<String>, applies: Arc<AtomicUsize>) -> Self {
        Self {
            name: name.into(),
            meta: Meta::default(),
            provides: None,
            seeks: Vec::new(),
            group_kind: None,
            applies,
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    /// Advertises `uid` (via `Resource::uids`) so another vertex's `seeking` can match it.
    pub fn providing(mut self, uid: impl Into<String>) -> Self {
        self.provides = Some(uid.into());
        self
    }

    /// Seeks `uid` via a single-batch `AutoEdgeStream`; a matching producer gets an edge to this
    /// vertex.
    pub fn seeking(mut self, uid: impl Into<String>) -> Self {
        self.seeks.push(uid.into());
        self
    }

    /// Opts into AutoGroup fusion with any other `Tracked` sharing the same `kind`.
    pub fn grouped_with(mut self, kind: impl Into<String>) -> Self {
        self.group_kind = Some(kind.into());
        self
    }
}

#[async_trait]
impl Resource for Tracked {
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

    async fn send_recv(&mut self) -> Result<SendRecvUpdates, ResourceError> {
        Ok(SendRecvUpdates::new())
    }

    fn uids(&self) -> Vec<Box<dyn Uid>> {
        self.provides.clone().map(|uid| Box::new(StringUid(uid)) as Box<dyn Uid>).into_iter().collect()
    }

    fn auto_edges(&self) -> Option<Box<dyn resource::AutoEdgeStream>> {
        if self.seeks.is_empty() {
            return None;
        }
        let seeking = self.seeks.iter().map(|uid| SeekingUid::new(Box::new(StringUid(uid.clone())))).collect();
        Some(SingleBatch::new(seeking))
    }

    fn groupable(&self) -> Option<&dyn Groupable> {
        self.group_kind.is_some().then_some(self as &dyn Groupable)
    }
}

impl Groupable for Tracked {
    fn kind(&self) -> &str {
        self.group_kind.as_deref().unwrap_or("")
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn compare(&self, other: &dyn Groupable) -> bool {
        other.as_any().downcast_ref::<Tracked>().is_some_and(|o| o.group_kind == self.group_kind)
    }
}
