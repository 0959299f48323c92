//! Host Integration
//!
//! Everything the runtime needs from its environment: a tree of nodes to
//! reconcile into, a source of frames and timers, and transition hooks.

mod frame;
mod host;
mod memory;
mod transition;

pub use frame::{FrameCallback, FrameHost, ManualFrames, TokioFrames};
pub use host::{Host, NodeId};
pub use memory::{DomStats, MemoryDom, NodeKind};
pub use transition::{Instant, Transition, TransitionPhase};
