//! Reactive Context
//!
//! The reactive context tracks which computation is currently running. This
//! enables automatic dependency tracking: when a tracked key is read, the
//! owning runtime asks the context who is reading and records the edge.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Running an effect or evaluating a
//! computed value pushes a frame; the returned guard pops it when dropped,
//! including while unwinding from a panic. The frame on top of the stack is
//! the "currently active" reader. It never outlives one synchronous call tree.
//!
//! Computed frames also buffer the keys read during evaluation, so the
//! computed table can replace its dependency set in one step once the
//! derivation returns.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::graph::Key;

use super::runtime::RuntimeInner;
use super::subscriber::{EffectId, RuntimeId};

/// Who is reading.
#[derive(Clone)]
pub(crate) enum Frame {
    Effect {
        id: EffectId,
        owner: Weak<RuntimeInner>,
    },
    Computed {
        name: Rc<str>,
        owner_id: RuntimeId,
        owner: Weak<RuntimeInner>,
    },
    /// Reads inside this frame are not attributed to anyone.
    Untracked,
}

impl Frame {
    fn label(&self) -> String {
        match self {
            Frame::Effect { id, .. } => id.to_string(),
            Frame::Computed { name, .. } => format!("computed:{name}"),
            Frame::Untracked => "untracked".to_string(),
        }
    }
}

struct ContextEntry {
    frame: Frame,
    /// Keys read by a computed frame of the owning runtime.
    dependencies: Vec<Key>,
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if the
/// computation panics.
pub struct ReactiveContext {
    depth: usize,
}

impl ReactiveContext {
    pub(crate) fn enter(frame: Frame) -> Self {
        let depth = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(ContextEntry {
                frame,
                dependencies: Vec::new(),
            });
            stack.len()
        });
        Self { depth }
    }

    /// Check if a tracking frame (effect or computed) is on top of the stack.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|e| !matches!(e.frame, Frame::Untracked))
        })
    }

    /// The effect currently running, if the top frame is an effect.
    pub fn current_effect() -> Option<EffectId> {
        CONTEXT_STACK.with(|stack| match stack.borrow().last().map(|e| &e.frame) {
            Some(Frame::Effect { id, .. }) => Some(*id),
            _ => None,
        })
    }

    /// Name of the innermost computed value being evaluated, if any frame on
    /// the stack is a computed evaluation.
    pub fn computing() -> Option<Rc<str>> {
        CONTEXT_STACK.with(|stack| {
            stack.borrow().iter().rev().find_map(|e| match &e.frame {
                Frame::Computed { name, .. } => Some(name.clone()),
                _ => None,
            })
        })
    }

    pub(crate) fn current_frame() -> Option<Frame> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|e| e.frame.clone()))
    }

    /// Buffer a key read by the computed frame on top of the stack.
    pub(crate) fn record(key: Key) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if !entry.dependencies.contains(&key) {
                    entry.dependencies.push(key);
                }
            }
        });
    }

    /// Drain the keys buffered by the top frame.
    pub(crate) fn take_dependencies() -> Vec<Key> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .last_mut()
                .map(|e| std::mem::take(&mut e.dependencies))
                .unwrap_or_default()
        })
    }

    /// Run `f` without attributing its reads to the current reader.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let _ctx = Self::enter(Frame::Untracked);
        f()
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(
                stack.len(),
                self.depth,
                "ReactiveContext mismatch: top frame is {:?}",
                stack.last().map(|e| e.frame.label())
            );
            stack.pop();
        });
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
