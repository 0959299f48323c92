//! Effect Groups
//!
//! An effect group collects the effects, nested groups, components and
//! cleanup callbacks created while it is the current group, so a whole
//! subtree (one list instance, one conditional branch) can be suspended,
//! resumed or disposed in one call.
//!
//! # Lifecycle
//!
//! - `suspend`: components get `before_unmount`, every effect stops being
//!   scheduled, then components get `unmounted`.
//! - `resume`: effects notified while suspended re-run, then components get
//!   `mounted`. Parked children stay suspended.
//! - `park` / `unpark`: suspension owned by the group's structural owner
//!   (a cached branch that is not showing). An ancestor's `resume` never
//!   wakes a parked group; only `unpark` does.
//! - `dispose`: children first, then effects, cleanups in registration
//!   order, and finally `destroy` on every component.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::effect::EffectHandle;

thread_local! {
    static GROUP_STACK: RefCell<Vec<EffectGroup>> = const { RefCell::new(Vec::new()) };
}

/// Lifecycle hooks of a component instance living inside a group.
pub trait Component {
    fn mounted(&self) {}
    fn before_unmount(&self) {}
    fn unmounted(&self) {}
    fn destroy(&self) {}
}

#[derive(Default)]
struct GroupInner {
    effects: RefCell<Vec<EffectHandle>>,
    children: RefCell<Vec<EffectGroup>>,
    components: RefCell<Vec<Rc<dyn Component>>>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    suspended: Cell<bool>,
    parked: Cell<bool>,
    disposed: Cell<bool>,
}

/// Owner of a subtree's effects. Clones share the group.
#[derive(Clone, Default)]
pub struct EffectGroup(Rc<GroupInner>);

struct GroupGuard;

impl Drop for GroupGuard {
    fn drop(&mut self) {
        GROUP_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl EffectGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with this group current. Effects created inside join it.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        GROUP_STACK.with(|stack| stack.borrow_mut().push(self.clone()));
        let _guard = GroupGuard;
        f()
    }

    pub fn current() -> Option<EffectGroup> {
        GROUP_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Create a nested group disposed along with this one.
    pub fn child(&self) -> EffectGroup {
        let child = EffectGroup::new();
        let mut children = self.0.children.borrow_mut();
        children.retain(|c| !c.is_disposed());
        children.push(child.clone());
        child
    }

    /// Create a nested group under the current group, or a free-standing one.
    pub fn child_of_current() -> EffectGroup {
        match Self::current() {
            Some(parent) => parent.child(),
            None => EffectGroup::new(),
        }
    }

    pub fn adopt_effect(&self, effect: EffectHandle) {
        if self.is_disposed() {
            effect.dispose();
            return;
        }
        if self.is_suspended() {
            effect.suspend();
        }
        let mut effects = self.0.effects.borrow_mut();
        effects.retain(|e| !e.is_disposed());
        effects.push(effect);
    }

    /// Attach a component. It is considered mounted unless the group is
    /// suspended.
    pub fn adopt_component(&self, component: Rc<dyn Component>) {
        if !self.is_suspended() {
            component.mounted();
        }
        self.0.components.borrow_mut().push(component);
    }

    /// Register a callback to run on disposal.
    pub fn on_dispose(&self, cleanup: impl FnOnce() + 'static) {
        if self.is_disposed() {
            cleanup();
            return;
        }
        self.0.cleanups.borrow_mut().push(Box::new(cleanup));
    }

    pub fn suspend(&self) {
        if self.is_disposed() || self.is_suspended() {
            return;
        }
        let components = self.0.components.borrow().clone();
        for component in &components {
            component.before_unmount();
        }

        self.0.suspended.set(true);
        let effects = self.0.effects.borrow().clone();
        for effect in &effects {
            effect.suspend();
        }
        let children = self.0.children.borrow().clone();
        for child in &children {
            child.suspend();
        }

        for component in &components {
            component.unmounted();
        }
    }

    /// Returns how many effects re-ran because they went stale while
    /// suspended.
    pub fn resume(&self) -> usize {
        if self.is_disposed() || !self.is_suspended() {
            return 0;
        }
        self.0.suspended.set(false);

        let effects = self.0.effects.borrow().clone();
        let mut rerun = effects.iter().filter(|e| e.resume()).count();
        let children = self.0.children.borrow().clone();
        for child in children.iter().filter(|c| !c.is_parked()) {
            rerun += child.resume();
        }

        let components = self.0.components.borrow().clone();
        for component in &components {
            component.mounted();
        }
        rerun
    }

    /// Suspend on behalf of the structural owner. The group stays suspended
    /// through any ancestor's `resume` until `unpark`.
    pub fn park(&self) {
        self.0.parked.set(true);
        self.suspend();
    }

    /// Clear the park and resume. Returns how many effects re-ran.
    pub fn unpark(&self) -> usize {
        self.0.parked.set(false);
        self.resume()
    }

    pub fn is_parked(&self) -> bool {
        self.0.parked.get()
    }

    /// Run every live effect in the subtree now, skipping parked groups.
    /// Returns how many ran.
    pub fn rerun(&self) -> usize {
        if self.is_parked() {
            return 0;
        }
        let effects = self.0.effects.borrow().clone();
        let mut ran = effects.iter().filter(|e| e.run_now()).count();
        let children = self.0.children.borrow().clone();
        for child in &children {
            ran += child.rerun();
        }
        ran
    }

    pub fn dispose(&self) {
        if self.0.disposed.replace(true) {
            return;
        }
        let was_suspended = self.0.suspended.get();
        let components = std::mem::take(&mut *self.0.components.borrow_mut());
        if !was_suspended {
            for component in &components {
                component.before_unmount();
            }
        }

        let children = std::mem::take(&mut *self.0.children.borrow_mut());
        for child in children {
            child.dispose();
        }
        let effects = std::mem::take(&mut *self.0.effects.borrow_mut());
        for effect in effects {
            effect.dispose();
        }
        let cleanups = std::mem::take(&mut *self.0.cleanups.borrow_mut());
        for cleanup in cleanups {
            cleanup();
        }

        for component in &components {
            if !was_suspended {
                component.unmounted();
            }
            component.destroy();
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.0.suspended.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.get()
    }

    /// Live effects in this group and its descendants.
    pub fn effect_count(&self) -> usize {
        let own = self
            .0
            .effects
            .borrow()
            .iter()
            .filter(|e| !e.is_disposed())
            .count();
        own + self
            .0
            .children
            .borrow()
            .iter()
            .map(EffectGroup::effect_count)
            .sum::<usize>()
    }

    pub fn ptr_eq(&self, other: &EffectGroup) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EffectGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectGroup")
            .field("effects", &self.effect_count())
            .field("suspended", &self.is_suspended())
            .field("disposed", &self.is_disposed())
            .finish()
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

    #[derive(Default)]
    struct Lifecycle {
        log: RefCell<Vec<&'static str>>,
    }

    impl Component for Lifecycle {
        fn mounted(&self) {
            self.log.borrow_mut().push("mounted");
        }
        fn before_unmount(&self) {
            self.log.borrow_mut().push("before_unmount");
        }
        fn unmounted(&self) {
            self.log.borrow_mut().push("unmounted");
        }
        fn destroy(&self) {
            self.log.borrow_mut().push("destroy");
        }
    }

    #[test]
    fn effects_join_the_current_group() {
        let rt = Runtime::new(ManualFrames::new());
        let group = EffectGroup::new();
        let nested = group.run(|| {
            rt.create_effect(|| {});
            let nested = EffectGroup::child_of_current();
            nested.run(|| rt.create_effect(|| {}));
            nested
        });
        assert_eq!(group.effect_count(), 2);
        assert!(EffectGroup::current().is_none());

        group.dispose();
        assert!(nested.is_disposed());
        assert_eq!(rt.effect_count(), 0);
    }

    #[test]
    fn suspend_and_resume_catch_up() {
        let frames = ManualFrames::new();
        let rt = Runtime::new(frames.clone());
        let state = rt.tracked(json!({"n": 0})).unwrap();
        let runs = Rc::new(Cell::new(0));

        let group = EffectGroup::new();
        let s = state.clone();
        let r = runs.clone();
        group.run(|| {
            rt.create_effect(move || {
                s.get("n");
                r.set(r.get() + 1);
            })
        });

        group.suspend();
        state.set("n", 1).unwrap();
        frames.tick();
        assert_eq!(runs.get(), 1);

        assert_eq!(group.resume(), 1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn component_hooks_fire_in_order() {
        let group = EffectGroup::new();
        let hooks = Rc::new(Lifecycle::default());
        group.adopt_component(hooks.clone());

        group.suspend();
        group.resume();
        group.dispose();

        assert_eq!(
            *hooks.log.borrow(),
            vec![
                "mounted",
                "before_unmount",
                "unmounted",
                "mounted",
                "before_unmount",
                "unmounted",
                "destroy"
            ]
        );
    }

    #[test]
    fn disposing_a_suspended_group_skips_unmount_hooks() {
        let group = EffectGroup::new();
        let hooks = Rc::new(Lifecycle::default());
        group.adopt_component(hooks.clone());
        group.suspend();
        hooks.log.borrow_mut().clear();

        group.dispose();
        assert_eq!(*hooks.log.borrow(), vec!["destroy"]);
    }

    #[test]
    fn on_dispose_after_disposal_runs_immediately() {
        let group = EffectGroup::new();
        group.dispose();
        let ran = Rc::new(Cell::new(false));
        let r = ran.clone();
        group.on_dispose(move || r.set(true));
        assert!(ran.get());
    }

    #[test]
    fn parked_children_stay_suspended_through_parent_resume() {
        let frames = ManualFrames::new();
        let rt = Runtime::new(frames.clone());
        let state = rt.tracked(json!({"n": 0})).unwrap();
        let runs = Rc::new(Cell::new(0));

        let parent = EffectGroup::new();
        let parked = parent.child();
        let s = state.clone();
        let r = runs.clone();
        parked.run(|| {
            rt.create_effect(move || {
                s.get("n");
                r.set(r.get() + 1);
            })
        });
        let hooks = Rc::new(Lifecycle::default());
        parked.adopt_component(hooks.clone());

        parked.park();
        parent.suspend();
        parent.resume();
        state.set("n", 1).unwrap();
        frames.tick();
        assert!(parked.is_suspended());
        assert_eq!(runs.get(), 1);
        assert_eq!(
            *hooks.log.borrow(),
            vec!["mounted", "before_unmount", "unmounted"]
        );

        assert_eq!(parent.rerun(), 0);
        assert_eq!(runs.get(), 1);

        assert_eq!(parked.unpark(), 1);
        assert_eq!(runs.get(), 2);
        assert!(!parked.is_parked());
    }

    #[test]
    fn adopting_prunes_disposed_effects() {
        let rt = Runtime::new(ManualFrames::new());
        let group = EffectGroup::new();
        let first = group.run(|| rt.create_effect(|| {}));
        first.dispose();
        group.run(|| rt.create_effect(|| {}));
        assert_eq!(group.0.effects.borrow().len(), 1);
    }
}
