// Copyright 2026 Convoy project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! A cloneable runtime handle (`Executor`) and a small bit of bookkeeping (`PendingTasks`) for
//! work that must finish draining before a graph can finish pausing (§4.8's Pausing state).
//!
//! Grounded on the teacher's `task_executor` crate, trimmed of its `stdio`/`workunit_store`
//! context-propagation plumbing (this workspace has no equivalent of pantsd's per-thread log
//! destination or workunit tree to carry across a spawn boundary).

mod executor;
mod pending;


pub use executor::Executor;
pub use pending::PendingTasks;
