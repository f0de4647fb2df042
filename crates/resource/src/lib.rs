// Copyright 2026 Convoy project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The capability interface a schedulable payload implements, plus the smaller UID and grouping
//! traits that the `autoedge` and `autogroup` passes dispatch through.
//!
//! Modeled on the teacher's `Node`/`NodeContext`/`NodeError` trait split (associated `Context` /
//! `Item` / `Error` types, object-safety discipline), adapted from "compute a memoized value
//! once" to "drive a convergent piece of external state forever".

mod examples;
mod meta;
mod uid;
mod vertex;

pub use examples::{Const, Noop};
pub use meta::{Meta, RateLimit, Retry};
pub use uid::{SeekingUid, Uid};
pub use vertex::{Edge, ResourceGraph, Vertex};

use std::any::Any;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub type ResourceError = Box<dyn StdError + Send + Sync>;

/// What `check_apply` discovered/did. Mirrors §4.8's three-way contract collapsed into two
/// `Ok` variants (the third, "failure", is the `Err` side of the `Result` it is wrapped in).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckApplyOutcome {
    /// No changes were required.
    UpToDate,
    /// Changes were required and (since `apply` was true) were made.
    Applied,
}

/// Parameter values a resource pushes to whatever is downstream of it, keyed by parameter name.
pub type SendRecvUpdates = HashMap<String, String>;

/// An event a `watch` loop publishes onto its process channel, per §4.8/§6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    Changed,
}

/// The capability set a resource exposes to the scheduler (§4.8).
#[async_trait]
pub trait Resource: Send + Sync {
    /// Stable identity, used both as the vertex's [`pgraph::Identity`] and in log output.
    fn name(&self) -> &str;

    fn meta(&self) -> &Meta;

    async fn init(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }

    /// Runs until it hits a permanent condition (returns `Ok(())`), a transient one the
    /// scheduler should retry (`Err`), or is cancelled. Implementations that prefer polling set
    /// `meta().poll_sec != 0` and the scheduler calls this on an interval instead of expecting it
    /// to run forever.
    async fn watch(&mut self, events: mpsc::Sender<WatchEvent>) -> Result<(), ResourceError>;

    /// Verifies (and, if `apply`, converges) this resource's state.
    async fn check_apply(&mut self, apply: bool) -> Result<CheckApplyOutcome, ResourceError>;

    /// Exchanges parameter values with linked resources. Default: nothing to propagate.
    async fn send_recv(&mut self) -> Result<SendRecvUpdates, ResourceError> {
        Ok(HashMap::new())
    }

    /// UIDs this resource advertises, for `autoedge` producers to match against. Default: none.
    fn uids(&self) -> Vec<Box<dyn Uid>> {
        Vec::new()
    }

    /// An autoedge candidate stream, pulled by `autoedge` once per pass. Default: no implicit
    /// dependencies.
    fn auto_edges(&self) -> Option<Box<dyn AutoEdgeStream>> {
        None
    }

    /// Whether (and how) this resource may fuse with another of the same kind, for `autogroup`.
    /// Default: never groupable.
    fn groupable(&self) -> Option<&dyn Groupable> {
        None
    }

    /// Vertices this resource opts out of both `autoedge` and `autogroup` (§4.3, §4.4). Default:
    /// never disabled.
    fn disabled(&self) -> bool {
        false
    }
}

/// A pull-based stream of autoedge candidate batches (§4.3): each call to `next` yields the next
/// batch of UIDs this resource is seeking; `test` is then called with one boolean per UID in
/// that batch (whether a match was found), and returns whether the stream should keep going.
pub trait AutoEdgeStream: Send {
    fn next(&mut self) -> Option<Vec<SeekingUid>>;
    fn test(&mut self, results: Vec<bool>) -> bool;
}

/// A single-batch [`AutoEdgeStream`], the common case: one list of seeking UIDs, no further
/// conditional narrowing.
pub struct SingleBatch(Option<Vec<SeekingUid>>);

impl SingleBatch {
    pub fn new(uids: Vec<SeekingUid>) -> Box<dyn AutoEdgeStream> {
        Box::new(SingleBatch(Some(uids)))
    }
}

impl AutoEdgeStream for SingleBatch {
    fn next(&mut self) -> Option<Vec<SeekingUid>> {
        self.0.take()
    }

    fn test(&mut self, _results: Vec<bool>) -> bool {
        false
    }
}

/// Dispatch surface for `autogroup`'s pairwise comparison (§4.4). `kind` restricts candidate
/// pairs to the same resource type before `compare` (which may safely downcast) ever runs.
pub trait Groupable: Send + Sync {
    fn kind(&self) -> &str;
    fn as_any(&self) -> &dyn Any;
    fn compare(&self, other: &dyn Groupable) -> bool;
}

impl fmt::Debug for dyn Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StrUid(&'static str);
    impl Uid for StrUid {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn iff(&self, other: &dyn Uid) -> bool {
            other
                .as_any()
                .downcast_ref::<StrUid>()
                .map(|o| o.0 == self.0)
                .unwrap_or(false)
        }
    }

    #[test]
    fn uid_type_tag_distinguishes_concrete_types() {
        struct OtherUid;
        impl Uid for OtherUid {
            fn as_any(&self) -> &dyn Any {
                self
            }
            fn iff(&self, _other: &dyn Uid) -> bool {
                false
            }
        }
        let a = StrUid("x");
        let b = OtherUid;
        assert_ne!(uid::type_tag(&a), uid::type_tag(&b));
    }

    #[test]
    fn uid_iff_matches_same_value() {
        let a = StrUid("x");
        let b = StrUid("x");
        let c = StrUid("y");
        assert!(a.iff(&b));
        assert!(!a.iff(&c));
    }

    #[tokio::test]
    async fn const_resource_applies_once_then_reports_up_to_date() {
        let mut c = Const::new("c1");
        assert_eq!(c.check_apply(true).await.unwrap(), CheckApplyOutcome::Applied);
        assert_eq!(c.check_apply(true).await.unwrap(), CheckApplyOutcome::UpToDate);
    }

    #[tokio::test]
    async fn noop_resource_is_always_up_to_date() {
        let mut n = Noop::new("n1");
        assert_eq!(n.check_apply(true).await.unwrap(), CheckApplyOutcome::UpToDate);
    }
}
