use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{CheckApplyOutcome, Meta, Resource, ResourceError, WatchEvent};

/// A resource that never has work to do. Used throughout the test suites in this workspace to
/// stand in for vertices whose only relevant behavior is their position in the graph.
pub struct Noop {
    name: String,
    meta: Meta,
}

impl Noop {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), meta: Meta::default() }
    }
}

#[async_trait]
impl Resource for Noop {
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
        Ok(CheckApplyOutcome::UpToDate)
    }
}

/// A resource that is dirty exactly once (the first `check_apply` applies a change; every
/// subsequent one reports up to date), useful for exercising the scheduler's refresh/poke paths.
pub struct Const {
    name: String,
    meta: Meta,
    applied: bool,
}

impl Const {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), meta: Meta::default(), applied: false }
    }

    pub fn with_meta(name: impl Into<String>, meta: Meta) -> Self {
        Self { name: name.into(), meta, applied: false }
    }
}

#[async_trait]
impl Resource for Const {
    fn name(&self) -> &str {
        &self.name
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    async fn watch(&mut self, _events: mpsc::Sender<WatchEvent>) -> Result<(), ResourceError> {
        std::future::pending().await
    }

    async fn check_apply(&mut self, apply: bool) -> Result<CheckApplyOutcome, ResourceError> {
        if self.applied {
            return Ok(CheckApplyOutcome::UpToDate);
        }
        if apply {
            self.applied = true;
        }
        Ok(CheckApplyOutcome::Applied)
    }
}
