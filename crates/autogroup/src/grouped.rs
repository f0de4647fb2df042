use async_trait::async_trait;
use resource::{CheckApplyOutcome, Meta, Resource, ResourceError, SendRecvUpdates, Uid, WatchEvent};
use tokio::sync::mpsc;

/// The vertex payload an AutoGroup merge produces: delegates every capability to its two
/// children, which may themselves be further `Grouped` resources from an earlier merge (fusing
/// three or more vertices nests rather than flattens — simpler than downcasting to detect and
/// flatten an existing `Grouped`, and behaviorally identical).
pub struct Grouped {
    name: String,
    meta: Meta,
    children: Vec<Box<dyn Resource>>,
}

impl Grouped {
    /// Fuses `existing` and `other` into a single resource, unioning their semaphore ids (I6's
    /// "duplicate-removal is lexicographic", §4.4) and their names (property 5/6, §8).
    pub fn absorb(existing: Box<dyn Resource>, other: Box<dyn Resource>) -> Box<dyn Resource> {
        let name = union_names(existing.name(), other.name());
        let mut sema = existing.meta().sema.clone();
        sema.extend(other.meta().sema.iter().cloned());
        sema.sort();
        sema.dedup();
        let meta = Meta { sema, ..existing.meta().clone() };
        Box::new(Grouped { name, meta, children: vec![existing, other] })
    }
}

fn union_names(a: &str, b: &str) -> String {
    let mut names: Vec<&str> = a.split(',').chain(b.split(',')).collect();
    names.sort_unstable();
    names.dedup();
    names.join(",")
}

#[async_trait]
impl Resource for Grouped {
    fn name(&self) -> &str {
        &self.name
    }

    fn meta(&self) -> &Meta {
        &self.meta
    }

    async fn init(&mut self) -> Result<(), ResourceError> {
        for child in &mut self.children {
            child.init().await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ResourceError> {
        for child in &mut self.children {
            child.close().await?;
        }
        Ok(())
    }

    async fn watch(&mut self, events: mpsc::Sender<WatchEvent>) -> Result<(), ResourceError> {
        let watch_futs = self.children.iter_mut().map(|child| child.watch(events.clone()));
        let (result, _idx, _rest) = futures::future::select_all(watch_futs).await;
        result
    }

    async fn check_apply(&mut self, apply: bool) -> Result<CheckApplyOutcome, ResourceError> {
        let mut applied = false;
        for child in &mut self.children {
            if child.check_apply(apply).await? == CheckApplyOutcome::Applied {
                applied = true;
            }
        }
        Ok(if applied { CheckApplyOutcome::Applied } else { CheckApplyOutcome::UpToDate })
    }

    async fn send_recv(&mut self) -> Result<SendRecvUpdates, ResourceError> {
        let mut merged = SendRecvUpdates::new();
        for child in &mut self.children {
            merged.extend(child.send_recv().await?);
        }
        Ok(merged)
    }

    fn uids(&self) -> Vec<Box<dyn Uid>> {
        self.children.iter().flat_map(|child| child.uids()).collect()
    }
}
