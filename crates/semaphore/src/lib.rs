// Copyright 2026 Convoy project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Named counting semaphores (component G, §4.7): parse ids of the form `"name[:N]"`, acquire a
//! set of them in a globally-consistent sorted order (so two callers wanting the same set of
//! semaphores never wait on each other in opposite orders), and release them in the reverse of
//! that order.
//!
//! Grounded on the teacher's `async_semaphore` crate's `AsyncSemaphore`/`Permit`/`with_acquired`
//! shape, modernized onto `tokio::sync::Semaphore` — see `DESIGN.md` ("Semaphore modernization")
//! for why this is the one crate in the workspace that does not reuse the teacher's actual
//! `Future::poll` implementation, only its external API.

mod id;

#[cfg(test)]
mod tests;

pub use id::SemaphoreId;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

#[derive(Debug)]
pub enum SemaphoreError {
    InvalidId(String),
    Closed,
}

impl fmt::Display for SemaphoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemaphoreError::InvalidId(id) => write!(f, "invalid semaphore id: {id:?}"),
            SemaphoreError::Closed => write!(f, "semaphore registry is closed"),
        }
    }
}

impl std::error::Error for SemaphoreError {}

struct Entry {
    size: usize,
    semaphore: Arc<Semaphore>,
}

/// A process-wide (or test-scoped) table of named semaphores, lazily created on first use.
pub struct Registry {
    entries: Mutex<HashMap<String, Entry>>,
    close_tx: watch::Sender<bool>,
    close_rx: watch::Receiver<bool>,
}

impl Registry {
    pub fn new() -> Self {
        let (close_tx, close_rx) = watch::channel(false);
        Self {
            entries: Mutex::new(HashMap::new()),
            close_tx,
            close_rx,
        }
    }

    /// Unblocks every current and future waiter with [`SemaphoreError::Closed`].
    pub fn close(&self) {
        let _ = self.close_tx.send(true);
    }

    fn entry_for(&self, id: &SemaphoreId) -> Arc<Semaphore> {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&id.name) {
            if existing.size != id.size {
                log::warn!(
                    "semaphore {:?} requested with size {} but already created with size {}",
                    id.name,
                    id.size,
                    existing.size,
                );
            }
            return existing.semaphore.clone();
        }
        let semaphore = Arc::new(Semaphore::new(id.size));
        entries.insert(
            id.name.clone(),
            Entry { size: id.size, semaphore: semaphore.clone() },
        );
        semaphore
    }

    /// Parses, sorts, and acquires one slot from every id in `ids`, in ascending name order
    /// (§4.7's deadlock-free global order). Held permits release, in the reverse order, when the
    /// returned [`Guard`] drops.
    pub async fn acquire(&self, ids: &[String]) -> Result<Guard, SemaphoreError> {
        let mut parsed: Vec<SemaphoreId> =
            ids.iter().map(|s| SemaphoreId::parse(s)).collect::<Result<_, _>>()?;
        parsed.sort_by(|a, b| a.name.cmp(&b.name));

        let mut permits = Vec::with_capacity(parsed.len());
        let mut close_rx = self.close_rx.clone();
        for id in &parsed {
            if *close_rx.borrow() {
                return Err(SemaphoreError::Closed);
            }
            let semaphore = self.entry_for(id);
            tokio::select! {
                biased;
                permit = semaphore.acquire_owned() => {
                    permits.push(permit.expect("semaphore is never closed directly"));
                }
                _ = close_rx.changed() => return Err(SemaphoreError::Closed),
            }
        }
        Ok(Guard { permits })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Held permits for a set of semaphores, released in the reverse of acquisition order on drop.
pub struct Guard {
    permits: Vec<OwnedSemaphorePermit>,
}

impl Drop for Guard {
    fn drop(&mut self) {
        while self.permits.pop().is_some() {}
    }
}
