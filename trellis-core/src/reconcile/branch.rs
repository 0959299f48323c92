//! Conditional branch chain (`if` / `else-if` / `else`).
//!
//! Conditions are evaluated top to bottom and the first truthy one wins;
//! later conditions are not evaluated. A branch with no condition always
//! matches. At most one branch is active.
//!
//! # Switching branches
//!
//! The outgoing branch is parked (its effects stop, components get
//! `before_unmount`/`unmounted`) and kept cached with its nodes. A parked
//! branch stays asleep when an enclosing branch or list instance is hidden
//! and shown again; only this chain wakes it. Its nodes
//! leave the tree immediately, or after the leave transition reports done,
//! or after the transition timeout, whichever happens first.
//!
//! The incoming branch is resumed from the cache if it was built before
//! (same nodes, stale effects re-run, components get `mounted`), otherwise
//! built fresh. Reactivating a branch whose leave is still pending cancels
//! the removal.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::dom::{FrameHost, Host, NodeId, Transition, TransitionPhase};
use crate::error::EvalError;
use crate::reactive::{EffectGroup, EffectHandle, ReactiveContext, Runtime};

use super::scope::{Expression, Scope, Template};
use super::{anchor_parent, Roots};

/// One arm of the chain. `condition: None` is the `else` arm.
#[derive(Clone)]
pub struct Branch {
    pub condition: Option<Expression>,
    pub template: Template,
}

/// Declaration of a conditional chain.
#[derive(Clone, Default)]
pub struct IfBinding {
    pub branches: Vec<Branch>,
    pub transition: Option<Rc<dyn Transition>>,
}

impl IfBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an `if` / `else-if` arm.
    pub fn when(mut self, condition: Expression, template: Template) -> Self {
        self.branches.push(Branch {
            condition: Some(condition),
            template,
        });
        self
    }

    /// Add the `else` arm.
    pub fn otherwise(mut self, template: Template) -> Self {
        self.branches.push(Branch {
            condition: None,
            template,
        });
        self
    }

    pub fn transition(mut self, transition: Rc<dyn Transition>) -> Self {
        self.transition = Some(transition);
        self
    }
}

struct CachedBranch {
    roots: Rc<Roots>,
    group: EffectGroup,
    /// Set while a leave is pending; cleared when the removal happens or is
    /// cancelled.
    leaving: Option<Rc<Cell<bool>>>,
}

struct IfState {
    host: Rc<dyn Host>,
    frames: Rc<dyn FrameHost>,
    anchor: NodeId,
    scope: Scope,
    binding: IfBinding,
    group: EffectGroup,
    timeout: Duration,
    active: Cell<Option<usize>>,
    cache: RefCell<Vec<Option<CachedBranch>>>,
}

/// Live conditional binding.
pub struct IfHandle {
    state: Rc<IfState>,
    effect: EffectHandle,
}

/// Bind a conditional chain before `anchor`. The first evaluation happens
/// immediately.
pub fn bind_if(
    rt: &Runtime,
    host: Rc<dyn Host>,
    anchor: NodeId,
    scope: &Scope,
    binding: IfBinding,
) -> IfHandle {
    let group = EffectGroup::child_of_current();
    let branch_count = binding.branches.len();
    let state = Rc::new(IfState {
        host,
        frames: rt.frames(),
        anchor,
        scope: scope.clone(),
        binding,
        group: group.clone(),
        timeout: rt.config().transition_timeout(),
        active: Cell::new(None),
        cache: RefCell::new((0..branch_count).map(|_| None).collect()),
    });

    let body_state = state.clone();
    let effect = group.run(|| {
        rt.create_effect(move || {
            let next = body_state.select();
            ReactiveContext::untracked(|| body_state.switch_to(next));
        })
    });

    IfHandle { state, effect }
}

impl IfState {
    fn select(&self) -> Option<usize> {
        for (index, branch) in self.binding.branches.iter().enumerate() {
            let Some(condition) = &branch.condition else {
                return Some(index);
            };
            match condition(&self.scope) {
                Ok(value) if value.is_truthy() => return Some(index),
                Ok(_) => {}
                Err(err) => {
                    warn!(branch = index, error = %err, "branch condition failed; treating as false");
                }
            }
        }
        None
    }

    fn switch_to(&self, next: Option<usize>) {
        let current = self.active.get();
        if current == next {
            return;
        }
        debug!(from = ?current, to = ?next, "branch switch");
        if let Some(index) = current {
            self.deactivate(index);
        }
        self.active.set(next);
        if let Some(index) = next {
            self.activate(index);
        }
    }

    fn deactivate(&self, index: usize) {
        let (roots, group, token) = {
            let mut cache = self.cache.borrow_mut();
            let Some(cached) = cache.get_mut(index).and_then(Option::as_mut) else {
                return;
            };
            let token = Rc::new(Cell::new(true));
            cached.leaving = Some(token.clone());
            (cached.roots.clone(), cached.group.clone(), token)
        };

        group.park();

        let host = self.host.clone();
        let finish: Rc<dyn Fn()> = Rc::new(move || {
            if token.replace(false) {
                roots.remove(host.as_ref());
            }
        });

        match &self.binding.transition {
            None => finish(),
            Some(transition) => {
                let on_timeout = finish.clone();
                self.frames
                    .set_timeout(self.timeout, Box::new(move || on_timeout()));
                let nodes = self.cached_nodes(index);
                transition.run(&nodes, TransitionPhase::Leave, Box::new(move || finish()));
            }
        }
    }

    fn activate(&self, index: usize) {
        let host = self.host.as_ref();
        let resumed = {
            let mut cache = self.cache.borrow_mut();
            cache.get_mut(index).and_then(Option::as_mut).map(|cached| {
                let still_attached = cached
                    .leaving
                    .take()
                    .is_some_and(|token| token.replace(false));
                (cached.roots.clone(), cached.group.clone(), still_attached)
            })
        };

        match resumed {
            Some((roots, group, still_attached)) => {
                if !still_attached {
                    let parent = anchor_parent(host, self.anchor);
                    roots.insert_before(host, parent, Some(self.anchor));
                }
                group.unpark();
            }
            None => {
                let branch = &self.binding.branches[index];
                let group = self.group.child();
                let template = branch.template.clone();
                let scope = self.scope.clone();
                let nodes = group
                    .run(|| template(&scope))
                    .unwrap_or_else(|err: EvalError| {
                        warn!(branch = index, error = %err, "branch template failed; rendering nothing");
                        Vec::new()
                    });
                let roots = Rc::new(Roots::new(host, nodes, "if-branch"));
                let parent = anchor_parent(host, self.anchor);
                roots.insert_before(host, parent, Some(self.anchor));
                if let Some(slot) = self.cache.borrow_mut().get_mut(index) {
                    *slot = Some(CachedBranch {
                        roots,
                        group,
                        leaving: None,
                    });
                }
            }
        }

        if let Some(transition) = &self.binding.transition {
            let nodes = self.cached_nodes(index);
            transition.run(&nodes, TransitionPhase::Enter, Box::new(|| {}));
        }
    }

    fn cached_nodes(&self, index: usize) -> Vec<NodeId> {
        let roots = self
            .cache
            .borrow()
            .get(index)
            .and_then(Option::as_ref)
            .map(|c| c.roots.clone());
        roots
            .map(|r| r.snapshot(self.host.as_ref()))
            .unwrap_or_default()
    }

    fn teardown(&self) {
        let cache = std::mem::take(&mut *self.cache.borrow_mut());
        for cached in cache.into_iter().flatten() {
            if let Some(token) = &cached.leaving {
                token.set(false);
            }
            cached.roots.remove(self.host.as_ref());
            cached.group.dispose();
        }
        self.active.set(None);
    }
}

impl IfHandle {
    /// Index of the active branch.
    pub fn active(&self) -> Option<usize> {
        self.state.active.get()
    }

    /// Current nodes of the active branch, markers included.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.active()
            .map(|index| self.state.cached_nodes(index))
            .unwrap_or_default()
    }

    /// Whether branch `index` has been built and is held in the cache.
    pub fn is_cached(&self, index: usize) -> bool {
        self.state
            .cache
            .borrow()
            .get(index)
            .is_some_and(Option::is_some)
    }

    /// Group owning branch `index`'s effects, if built.
    pub fn branch_group(&self, index: usize) -> Option<EffectGroup> {
        self.state
            .cache
            .borrow()
            .get(index)
            .and_then(Option::as_ref)
            .map(|c| c.group.clone())
    }

    pub fn effect(&self) -> &EffectHandle {
        &self.effect
    }

    /// Stop the binding, dispose every cached branch and remove its nodes.
    pub fn dispose(&self) {
        self.effect.dispose();
        self.state.teardown();
        self.state.group.dispose();
    }
}
