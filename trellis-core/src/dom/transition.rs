//! Enter and leave transitions for conditional branches.

use super::host::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    Enter,
    Leave,
}

/// Animation hook run around branch insertion and removal.
///
/// For `Leave`, the branch's nodes stay in the tree until `on_done` is
/// called or the runtime's transition timeout elapses, whichever comes
/// first. `on_done` may be called synchronously.
pub trait Transition {
    fn run(&self, nodes: &[NodeId], phase: TransitionPhase, on_done: Box<dyn FnOnce()>);
}

/// Transition that completes immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct Instant;

impl Transition for Instant {
    fn run(&self, _nodes: &[NodeId], _phase: TransitionPhase, on_done: Box<dyn FnOnce()>) {
        on_done();
    }
}
