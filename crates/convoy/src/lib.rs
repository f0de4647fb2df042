// Copyright 2026 Convoy project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Aggregates the rest of this workspace into a single `Engine`: a frontend hands it a stream of
//! graphs (§6), and it runs each one through AutoEdge, AutoGroup, and Graph Sync before handing
//! the result to the scheduler.
//!
//! Grounded on the aggregation role `engine/src/lib.rs` plays in the teacher's own workspace (a
//! thin top-level crate that only wires other crates together and re-exports their public types)
//! and on `workunit_store`'s use of plain `log` macros for ambient logging rather than a
//! dedicated tracing layer.

mod deploy;
mod engine;
pub mod examples;
pub mod logging;
mod source;

#[cfg(test)]
mod tests;

pub use deploy::DeployBlob;
pub use engine::{Engine, EngineBuilder, EngineError};
pub use source::{channel, ChannelGraphSource, GraphDelivery, GraphSender, GraphSource};
