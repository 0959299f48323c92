//! Effect Implementation
//!
//! An Effect is a re-runnable unit of work representing one binding: a text
//! interpolation, an attribute binding, a structural directive.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately to establish its
//!    initial dependencies.
//!
//! 2. When any dependency changes, the effect is added to its runtime's
//!    pending set and re-runs on the next flush.
//!
//! 3. Before re-running, the effect clears its old dependencies and releases
//!    the resources it registered, then tracks new ones during execution.
//!
//! # Static effects
//!
//! An effect whose last run read nothing reactive is static: it never needs
//! to run again, and the full-update path skips it.
//!
//! # Resources
//!
//! External handles opened inside a body (timers, requests, observers) are
//! registered with [`on_cleanup`] under a slot name. Registering the same slot
//! twice releases the older resource first, and every resource is released
//! when the effect re-runs or is disposed.
//!
//! # Disposal
//!
//! Disposal is explicit. Dropping an [`EffectHandle`] does not stop the
//! effect; the owning subtree calls [`EffectHandle::dispose`] when it is torn
//! down.

use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::{Frame, ReactiveContext};
use super::runtime::RuntimeInner;
use super::subscriber::EffectId;

pub(crate) type EffectBody = Rc<dyn Fn() -> Result<(), String>>;
pub(crate) type Cleanup = Box<dyn FnOnce()>;

/// Return types accepted from effect bodies.
///
/// An `Err` is caught at the effect boundary and logged; it never reaches the
/// flush loop.
pub trait EffectOutput {
    fn into_outcome(self) -> Result<(), String>;
}

impl EffectOutput for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: fmt::Display> EffectOutput for Result<(), E> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

/// Runtime-side state of one effect.
pub(crate) struct EffectRecord {
    pub body: EffectBody,
    /// Whether the last run read at least one reactive key.
    pub has_deps: bool,
    pub suspended: bool,
    /// Notified while suspended; must re-run on resume.
    pub stale: bool,
    pub run_count: usize,
    /// Other runtimes whose graphs hold edges for this effect.
    pub foreign: SmallVec<[Weak<RuntimeInner>; 1]>,
    pub resources: IndexMap<Rc<str>, Cleanup>,
}

impl EffectRecord {
    pub fn new(body: EffectBody) -> Self {
        Self {
            body,
            has_deps: false,
            suspended: false,
            stale: false,
            run_count: 0,
            foreign: SmallVec::new(),
            resources: IndexMap::new(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.run_count > 0 && !self.has_deps
    }
}

/// Handle to an effect registered with a runtime.
///
/// Clones refer to the same effect.
#[derive(Clone)]
pub struct EffectHandle {
    pub(crate) id: EffectId,
    pub(crate) owner: Weak<RuntimeInner>,
}

impl EffectHandle {
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Exclude the effect from scheduling. Notifications received while
    /// suspended are remembered.
    pub fn suspend(&self) {
        if let Some(rt) = self.owner.upgrade() {
            rt.suspend_effect(self.id);
        }
    }

    /// Re-include the effect. Returns true if it re-ran because it was
    /// notified while suspended.
    pub fn resume(&self) -> bool {
        self.owner
            .upgrade()
            .is_some_and(|rt| rt.resume_effect(self.id))
    }

    /// Unregister the effect, releasing its dependencies and resources.
    pub fn dispose(&self) {
        if let Some(rt) = self.owner.upgrade() {
            rt.dispose_effect(self.id);
        }
    }

    /// Run the effect now, outside the scheduler.
    pub fn run_now(&self) -> bool {
        self.owner
            .upgrade()
            .is_some_and(|rt| rt.run_effect(self.id))
    }

    pub fn is_disposed(&self) -> bool {
        self.with_record(|_| ()).is_none()
    }

    pub fn is_suspended(&self) -> bool {
        self.with_record(|r| r.suspended).unwrap_or(false)
    }

    pub fn is_static(&self) -> bool {
        self.with_record(EffectRecord::is_static).unwrap_or(false)
    }

    pub fn run_count(&self) -> usize {
        self.with_record(|r| r.run_count).unwrap_or(0)
    }

    /// Number of keys read during the last run, in the owning runtime's graph.
    pub fn dependency_count(&self) -> usize {
        self.owner
            .upgrade()
            .map(|rt| rt.effect_dependency_count(self.id))
            .unwrap_or(0)
    }

    fn with_record<R>(&self, f: impl FnOnce(&EffectRecord) -> R) -> Option<R> {
        let rt = self.owner.upgrade()?;
        let effects = rt.effects.borrow();
        effects.get(&self.id).map(f)
    }
}

impl fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Register a resource release callback on the running effect under `slot`.
///
/// If the slot already holds a resource, that older resource is released
/// first. Returns false (and drops `release` without calling it) when no
/// effect is running.
pub fn on_cleanup(slot: &str, release: impl FnOnce() + 'static) -> bool {
    let Some(Frame::Effect { id, owner }) = ReactiveContext::current_frame() else {
        return false;
    };
    let Some(rt) = owner.upgrade() else {
        return false;
    };

    let previous = {
        let mut effects = rt.effects.borrow_mut();
        let Some(record) = effects.get_mut(&id) else {
            return false;
        };
        let previous = record.resources.shift_remove(slot);
        record.resources.insert(slot.into(), Box::new(release));
        previous
    };

    if let Some(previous) = previous {
        previous();
    }
    true
}

pub(crate) fn release_resources(resources: IndexMap<Rc<str>, Cleanup>) {
    for (_, release) in resources {
        release();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ManualFrames;
    use crate::reactive::Runtime;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    fn runtime() -> (Runtime, Rc<ManualFrames>) {
        let frames = ManualFrames::new();
        (Runtime::new(frames.clone()), frames)
    }

    #[test]
    fn effect_runs_on_creation() {
        let (rt, _) = runtime();
        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();

        let effect = rt.create_effect(move || runs_clone.set(runs_clone.get() + 1));

        assert_eq!(runs.get(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_without_reads_is_static() {
        let (rt, _) = runtime();
        let state = rt.tracked(json!({"n": 1})).unwrap();

        let fixed = rt.create_effect(|| {});
        let state_clone = state.clone();
        let live = rt.create_effect(move || {
            state_clone.get("n");
        });

        assert!(fixed.is_static());
        assert!(!live.is_static());
        assert_eq!(live.dependency_count(), 1);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let (rt, frames) = runtime();
        let state = rt.tracked(json!({"n": 1})).unwrap();
        let runs = Rc::new(Cell::new(0));

        let state_clone = state.clone();
        let runs_clone = runs.clone();
        let effect = rt.create_effect(move || {
            state_clone.get("n");
            runs_clone.set(runs_clone.get() + 1);
        });

        effect.dispose();
        assert!(effect.is_disposed());

        state.set("n", 2).unwrap();
        frames.tick();
        assert_eq!(runs.get(), 1);
        assert!(!effect.run_now());
    }

    #[test]
    fn cleanup_slots_newest_wins() {
        let (rt, frames) = runtime();
        let state = rt.tracked(json!({"n": 0})).unwrap();
        let released = Rc::new(RefCell::new(Vec::new()));

        let state_clone = state.clone();
        let released_clone = released.clone();
        let effect = rt.create_effect(move || {
            let n = state_clone.get("n").as_number().unwrap_or(0.0) as i64;
            let log = released_clone.clone();
            on_cleanup("timer", move || log.borrow_mut().push(format!("timer {n}")));
            let log = released_clone.clone();
            on_cleanup("timer", move || log.borrow_mut().push(format!("timer {n} b")));
        });

        // Second registration in the same run released the first.
        assert_eq!(*released.borrow(), vec!["timer 0".to_string()]);

        state.set("n", 1).unwrap();
        frames.tick();
        assert_eq!(
            *released.borrow(),
            vec!["timer 0".to_string(), "timer 0 b".to_string(), "timer 1".to_string()]
        );

        effect.dispose();
        assert_eq!(released.borrow().last().map(String::as_str), Some("timer 1 b"));
    }

    #[test]
    fn on_cleanup_outside_effect_is_rejected() {
        let called = Rc::new(Cell::new(false));
        let called_clone = called.clone();
        assert!(!on_cleanup("slot", move || called_clone.set(true)));
        assert!(!called.get());
    }

    #[test]
    fn suspended_effect_catches_up_on_resume() {
        let (rt, frames) = runtime();
        let state = rt.tracked(json!({"n": 0})).unwrap();
        let seen = Rc::new(Cell::new(0.0));

        let state_clone = state.clone();
        let seen_clone = seen.clone();
        let effect = rt.create_effect(move || {
            seen_clone.set(state_clone.get("n").as_number().unwrap_or(-1.0));
        });

        effect.suspend();
        state.set("n", 7).unwrap();
        frames.tick();
        assert_eq!(seen.get(), 0.0);

        assert!(effect.resume());
        assert_eq!(seen.get(), 7.0);

        // Nothing changed while suspended this time: no re-run.
        effect.suspend();
        assert!(!effect.resume());
        assert_eq!(effect.run_count(), 2);
    }

    #[test]
    fn result_errors_are_contained() {
        let (rt, _) = runtime();
        let effect = rt.create_effect(|| -> Result<(), String> { Err("broken binding".into()) });
        assert_eq!(effect.run_count(), 1);
        assert!(!effect.is_disposed());
    }
}
