// Copyright 2026 Convoy project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Graph Sync (component E, §4.5) and the transactional graph editor (component F, §4.6).
//!
//! Grounded on the teacher's `graph::InnerContext`/`entry::Entry` pairing: a validate-then-mutate
//! discipline (errors surface before anything changes) and a `mem::replace`-on-the-entry style of
//! in-place state transition, adapted from "invalidate and recompute a memoized node" to
//! "reconcile a live dependency graph against a freshly produced one".

mod editor;
mod graph_sync;


pub use editor::{EditorError, GraphEditor, Op};
pub use graph_sync::{sync_graph, SyncError};
