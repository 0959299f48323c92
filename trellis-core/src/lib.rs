//! Trellis Core
//!
//! This crate provides the client-side runtime for the Trellis reactive UI
//! framework. It implements:
//!
//! - Tracked containers with per-key dependency tracking
//! - A dependency graph and a frame-aligned, batching update scheduler
//! - Named computed values with transitive invalidation
//! - Structural reconciliation: keyed lists and conditional branch chains
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: containers, effects, computed values and the runtime
//! - `graph`: dependency edges and the update scheduler
//! - `reconcile`: `for` and `if` bindings over a host tree
//! - `dom`: host tree, frame and transition abstractions, plus an in-memory
//!   tree for tests
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use trellis_core::dom::ManualFrames;
//! use trellis_core::reactive::Runtime;
//!
//! let frames = ManualFrames::new();
//! let rt = Runtime::new(frames.clone());
//! let state = rt.tracked(json!({"count": 0})).unwrap();
//!
//! let s = state.clone();
//! rt.create_effect(move || {
//!     println!("count = {}", s.get("count").to_display_string());
//! });
//!
//! state.set("count", 1).unwrap();
//! state.set("count", 2).unwrap();
//! // Both writes are flushed together on the next frame.
//! frames.tick();
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod reconcile;

pub use config::RuntimeConfig;
pub use error::{EvalError, ReactiveError};
