//! Reactive Primitives
//!
//! This module implements the reactive core: the version ledger, tracked
//! containers, effects, computed values and the runtime that ties them
//! together.
//!
//! # Concepts
//!
//! ## Tracked containers
//!
//! Application state is wrapped into [`Tracked`] containers (records,
//! arrays, keyed maps, unique sets). Reads inside an effect or computed
//! evaluation register a dependency on the exact key read; writes notify
//! only the dependents of the keys they touched.
//!
//! ## Computed values
//!
//! Named derivations cached per runtime. A cached value is evicted when any
//! key it read, directly or through another computed value, is notified.
//!
//! ## Effects
//!
//! Re-runnable bindings. Notified effects never run synchronously: they are
//! batched and flushed once per frame.
//!
//! # Implementation Notes
//!
//! Dependency tracking is automatic. A thread-local context stack records
//! who is reading; the runtime owning the key being read records the edge in
//! its own graph, even when the reader belongs to another runtime.

mod computed;
mod context;
mod effect;
mod group;
mod ledger;
mod runtime;
mod subscriber;
mod tracked;
mod value;

pub use context::ReactiveContext;
pub use effect::{on_cleanup, EffectHandle, EffectOutput};
pub use group::{Component, EffectGroup};
pub use ledger::{Ledger, ObjectId};
pub use runtime::Runtime;
pub use subscriber::{EffectId, RuntimeId, Subscriber};
pub use tracked::{Tracked, TrackedKind, MAX_ARRAY_PADDING};
pub use value::{Plain, Value, ValueKey};
