//! Dependency Graph
//!
//! This module holds the bookkeeping that connects reads to writes:
//!
//! - [`DependencyGraph`]: key → subscribers that read the key during their
//!   last run, with forward edges for targeted clearing.
//! - [`UpdateScheduler`]: the pending set that batches notified effects into
//!   one frame-aligned flush.
//!
//! # Design Decisions
//!
//! 1. Each runtime owns its own graph; cross-runtime reads (a child scope
//!    reading its parent's state) are recorded in the graph of the runtime
//!    that owns the key, with a weak handle back to the reader's runtime.
//!
//! 2. An effect's edges are rebuilt on every run: the run clears its own
//!    entries first, then repopulates them as reads happen.

mod deps;
mod scheduler;

pub use deps::{DependencyGraph, Key, PropKey};
pub use scheduler::UpdateScheduler;
