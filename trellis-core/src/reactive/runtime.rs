//! Reactive Runtime
//!
//! The runtime is the central coordinator for one owning consumer (one
//! component instance). It owns the version ledger, the dependency graph,
//! the update scheduler, the effect table and the computed cache, and it is
//! the only place where reads are attributed and writes are propagated.
//!
//! # How It Works
//!
//! 1. Containers are wrapped on entry ([`Runtime::wrap`]) and every read asks
//!    the runtime to record an edge from the key to the current reader.
//!
//! 2. When a committed write notifies a key, the runtime:
//!    a. Evicts every computed entry transitively derived from the key
//!    b. Collects the effects that read the key or any evicted entry
//!    c. Queues them, requesting one frame per batch
//!
//! 3. On the frame callback the queue is drained in insertion order. Effects
//!    queued during a flush land in a fresh batch with its own frame.
//!
//! # Owner states
//!
//! - *frozen*: user-toggled read-only. Freezing also seals; unfreezing
//!   restores the previous seal flag and forces a full update.
//! - *sealed*: externally suspended. Writes are rejected and flushed effects
//!   are skipped. Unsealing forces a full update if anything was skipped.
//! - *destroyed*: permanently torn down.
//!
//! # Threading
//!
//! Everything here is single-threaded: handles are `Rc` and interior state
//! lives in `RefCell`s. No borrow is held while user code (effect bodies,
//! derivations, cleanups) runs.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::{debug, error, trace, warn};

use crate::config::RuntimeConfig;
use crate::dom::FrameHost;
use crate::error::{ReactiveError, Result};
use crate::graph::{DependencyGraph, Key, UpdateScheduler};

use super::computed::ComputedTable;
use super::context::{Frame, ReactiveContext};
use super::effect::{release_resources, EffectBody, EffectHandle, EffectOutput, EffectRecord};
use super::group::EffectGroup;
use super::ledger::{Ledger, ObjectId};
use super::subscriber::{EffectId, RuntimeId, Subscriber};
use super::tracked::{Container, Tracked, TrackedCell};
use super::value::{Plain, Value, ValueKey};

#[derive(Debug, Clone, Copy, Default)]
struct OwnerState {
    frozen: bool,
    sealed: bool,
    /// Seal flag saved by `freeze`, restored by `unfreeze`.
    sealed_before_freeze: bool,
    destroyed: bool,
    /// At least one flushed effect was skipped while sealed.
    skipped_while_sealed: bool,
}

pub(crate) struct RuntimeInner {
    pub(crate) id: RuntimeId,
    pub(crate) config: RuntimeConfig,
    pub(crate) frames: Rc<dyn FrameHost>,
    pub(crate) ledger: RefCell<Ledger>,
    pub(crate) graph: RefCell<DependencyGraph<Weak<RuntimeInner>>>,
    pub(crate) scheduler: RefCell<UpdateScheduler>,
    pub(crate) effects: RefCell<IndexMap<EffectId, EffectRecord>>,
    pub(crate) computed: RefCell<ComputedTable>,
    objects: RefCell<HashMap<ObjectId, Weak<TrackedCell>>>,
    state: Cell<OwnerState>,
    /// Per-owner mirror of the running effect.
    active_effect: Cell<Option<EffectId>>,
    parent: Option<Weak<RuntimeInner>>,
    self_weak: Weak<RuntimeInner>,
}

impl RuntimeInner {
    fn new(
        config: RuntimeConfig,
        frames: Rc<dyn FrameHost>,
        parent: Option<Weak<RuntimeInner>>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|self_weak| Self {
            id: RuntimeId::new(),
            config,
            frames,
            ledger: RefCell::new(Ledger::new()),
            graph: RefCell::new(DependencyGraph::new()),
            scheduler: RefCell::new(UpdateScheduler::new()),
            effects: RefCell::new(IndexMap::new()),
            computed: RefCell::new(ComputedTable::new()),
            objects: RefCell::new(HashMap::new()),
            state: Cell::new(OwnerState::default()),
            active_effect: Cell::new(None),
            parent,
            self_weak: self_weak.clone(),
        })
    }

    pub(crate) fn weak(&self) -> Weak<RuntimeInner> {
        self.self_weak.clone()
    }

    fn update_state(&self, f: impl FnOnce(&mut OwnerState)) {
        let mut state = self.state.get();
        f(&mut state);
        self.state.set(state);
    }

    // ------------------------------------------------------------------
    // Wrapping
    // ------------------------------------------------------------------

    /// Convert plain data into runtime values, wrapping every container
    /// found. Existing wrappers pass through untouched.
    pub(crate) fn wrap_plain(&self, plain: Plain, hint: Option<Rc<str>>) -> Value {
        match plain {
            Plain::Undefined => Value::Undefined,
            Plain::Null => Value::Null,
            Plain::Bool(b) => Value::Bool(b),
            Plain::Number(n) => Value::Number(n),
            Plain::String(s) => Value::String(s.into()),
            Plain::Opaque(o) => Value::Opaque(o),
            Plain::Tracked(t) => Value::Object(t),
            Plain::Record(fields) => {
                let map = fields
                    .into_iter()
                    .map(|(name, v)| {
                        let child = child_hint(&hint, &name);
                        (Rc::<str>::from(name), self.wrap_plain(v, child))
                    })
                    .collect();
                Value::Object(self.adopt(Container::Record(map), hint))
            }
            Plain::Array(items) => {
                let child = child_hint(&hint, "[]");
                let items = items
                    .into_iter()
                    .map(|v| self.wrap_plain(v, child.clone()))
                    .collect();
                Value::Object(self.adopt(Container::Array(items), hint))
            }
            Plain::Map(entries) => {
                let child = child_hint(&hint, "{}");
                let mut map: IndexMap<ValueKey, (Value, Value)> = IndexMap::new();
                for (k, v) in entries {
                    let k = self.wrap_plain(k, None);
                    let v = self.wrap_plain(v, child.clone());
                    map.insert(k.key(), (k, v));
                }
                Value::Object(self.adopt(Container::Map(map), hint))
            }
            Plain::Set(items) => {
                let child = child_hint(&hint, "{}");
                let mut set: IndexMap<ValueKey, Value> = IndexMap::new();
                for v in items {
                    let v = self.wrap_plain(v, child.clone());
                    set.entry(v.key()).or_insert(v);
                }
                Value::Object(self.adopt(Container::Set(set), hint))
            }
        }
    }

    fn adopt(&self, data: Container, label: Option<Rc<str>>) -> Tracked {
        let id = self.ledger.borrow_mut().allocate();
        let cell = Rc::new(TrackedCell::new(id, label, data, self.weak()));
        self.objects.borrow_mut().insert(id, Rc::downgrade(&cell));
        Tracked(cell)
    }

    /// Called from `TrackedCell::drop`. Tolerates re-entrant drops during
    /// teardown.
    pub(crate) fn release_object(&self, id: ObjectId) {
        if let Ok(mut ledger) = self.ledger.try_borrow_mut() {
            ledger.release(id);
        }
        if let Ok(mut objects) = self.objects.try_borrow_mut() {
            objects.remove(&id);
        }
    }

    // ------------------------------------------------------------------
    // Tracking and notification
    // ------------------------------------------------------------------

    /// Attribute a read of `key` to the reader on top of the context stack.
    pub(crate) fn track(&self, key: Key) {
        if self.state.get().destroyed {
            return;
        }
        let Some(frame) = ReactiveContext::current_frame() else {
            return;
        };
        match frame {
            Frame::Untracked => {}
            Frame::Effect { id, owner } => {
                let added = self
                    .graph
                    .borrow_mut()
                    .add(key, Subscriber::Effect(id), owner.clone());
                if !added {
                    return;
                }
                if owner.ptr_eq(&self.self_weak) {
                    self.note_effect_dep(id, None);
                } else if let Some(reader) = owner.upgrade() {
                    reader.note_effect_dep(id, Some(self.weak()));
                }
            }
            Frame::Computed {
                name,
                owner_id,
                owner,
            } => {
                if owner.ptr_eq(&self.self_weak) {
                    ReactiveContext::record(key);
                    return;
                }
                let added = self.graph.borrow_mut().add(
                    key,
                    Subscriber::Computed(owner_id, name.clone()),
                    owner.clone(),
                );
                if added {
                    if let Some(reader) = owner.upgrade() {
                        reader
                            .computed
                            .borrow_mut()
                            .note_foreign(&name, self.weak());
                    }
                }
            }
        }
    }

    fn note_effect_dep(&self, id: EffectId, foreign: Option<Weak<RuntimeInner>>) {
        let mut effects = self.effects.borrow_mut();
        let Some(record) = effects.get_mut(&id) else {
            return;
        };
        record.has_deps = true;
        if let Some(graph_owner) = foreign {
            if !record.foreign.iter().any(|w| w.ptr_eq(&graph_owner)) {
                record.foreign.push(graph_owner);
            }
        }
    }

    /// Propagate one notification covering `keys`.
    pub(crate) fn notify_keys(&self, keys: &[Key]) {
        if keys.is_empty() || self.state.get().destroyed {
            return;
        }

        let mut targets: Vec<(Subscriber, Weak<RuntimeInner>)> = Vec::new();
        {
            let mut computed = self.computed.borrow_mut();
            let graph = self.graph.borrow();
            for key in keys {
                trace!(runtime = self.id.raw(), key = %key, "notify");
                if let Key::Computed(name) = key {
                    computed.evict(name);
                }
                targets.extend(graph.dependents(key));
                for name in computed.affected_by(key) {
                    computed.evict(&name);
                    targets.extend(graph.dependents(&Key::Computed(name)));
                }
            }
        }

        for (subscriber, owner) in targets {
            let Some(owner) = owner.upgrade() else {
                continue;
            };
            match subscriber {
                Subscriber::Effect(id) => owner.schedule(id),
                Subscriber::Computed(_, name) => owner.notify_keys(&[Key::Computed(name)]),
            }
        }
    }

    pub(crate) fn check_writable(&self, describe: &dyn Fn() -> String) -> Result<()> {
        if let Some(computed) = ReactiveContext::computing() {
            return Err(ReactiveError::ComputedWrite {
                computed: computed.to_string(),
                key: describe(),
            });
        }
        let state = self.state.get();
        if state.destroyed {
            return Err(ReactiveError::Destroyed { key: describe() });
        }
        if state.frozen {
            return Err(ReactiveError::Frozen { key: describe() });
        }
        if state.sealed {
            return Err(ReactiveError::Sealed { key: describe() });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    pub(crate) fn schedule(&self, id: EffectId) {
        if self.state.get().destroyed {
            return;
        }
        {
            let mut effects = self.effects.borrow_mut();
            let Some(record) = effects.get_mut(&id) else {
                return;
            };
            if record.suspended {
                record.stale = true;
                return;
            }
        }

        let needs_frame = self.scheduler.borrow_mut().enqueue(id);
        if needs_frame {
            trace!(runtime = self.id.raw(), "frame requested");
            let weak = self.weak();
            self.frames.request_frame(Box::new(move || {
                if let Some(rt) = weak.upgrade() {
                    rt.flush();
                }
            }));
        }
    }

    /// Drain the current batch. Returns how many effects ran.
    pub(crate) fn flush(&self) -> usize {
        let pending = self.scheduler.borrow_mut().take_pending();
        if pending.is_empty() {
            return 0;
        }
        debug!(runtime = self.id.raw(), effects = pending.len(), "flush");

        let mut ran = 0;
        for id in pending {
            let state = self.state.get();
            if state.destroyed {
                break;
            }
            if state.sealed {
                self.update_state(|s| s.skipped_while_sealed = true);
                continue;
            }
            if self.run_effect(id) {
                ran += 1;
            }
        }
        ran
    }

    /// Run one effect body with fresh tracking. Returns false if the effect
    /// is gone or suspended.
    pub(crate) fn run_effect(&self, id: EffectId) -> bool {
        let (body, resources, foreign) = {
            let mut effects = self.effects.borrow_mut();
            let Some(record) = effects.get_mut(&id) else {
                return false;
            };
            if record.suspended {
                record.stale = true;
                return false;
            }
            record.stale = false;
            record.has_deps = false;
            record.run_count += 1;
            (
                record.body.clone(),
                std::mem::take(&mut record.resources),
                std::mem::take(&mut record.foreign),
            )
        };

        let subscriber = Subscriber::Effect(id);
        self.graph.borrow_mut().clear_subscriber(&subscriber);
        for graph_owner in foreign {
            if let Some(other) = graph_owner.upgrade() {
                other.graph.borrow_mut().clear_subscriber(&subscriber);
            }
        }
        release_resources(resources);

        let outcome = {
            let _ctx = ReactiveContext::enter(Frame::Effect {
                id,
                owner: self.weak(),
            });
            let previous = self.active_effect.replace(Some(id));
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| body()));
            self.active_effect.set(previous);
            outcome
        };

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(message)) => {
                warn!(effect = %id, error = %message, "effect failed; keeping previous output")
            }
            Err(payload) => {
                error!(effect = %id, panic = %panic_message(payload.as_ref()), "effect panicked")
            }
        }
        true
    }

    pub(crate) fn suspend_effect(&self, id: EffectId) {
        if let Some(record) = self.effects.borrow_mut().get_mut(&id) {
            record.suspended = true;
        }
    }

    pub(crate) fn resume_effect(&self, id: EffectId) -> bool {
        let stale = {
            let mut effects = self.effects.borrow_mut();
            let Some(record) = effects.get_mut(&id) else {
                return false;
            };
            record.suspended = false;
            record.stale
        };
        stale && self.run_effect(id)
    }

    pub(crate) fn dispose_effect(&self, id: EffectId) {
        let record = self.effects.borrow_mut().shift_remove(&id);
        let Some(record) = record else {
            return;
        };
        let subscriber = Subscriber::Effect(id);
        self.graph.borrow_mut().clear_subscriber(&subscriber);
        for graph_owner in &record.foreign {
            if let Some(other) = graph_owner.upgrade() {
                other.graph.borrow_mut().clear_subscriber(&subscriber);
            }
        }
        trace!(effect = %id, "effect disposed");
        release_resources(record.resources);
    }

    pub(crate) fn effect_dependency_count(&self, id: EffectId) -> usize {
        let subscriber = Subscriber::Effect(id);
        let foreign: Vec<Weak<RuntimeInner>> = self
            .effects
            .borrow()
            .get(&id)
            .map(|r| r.foreign.iter().cloned().collect())
            .unwrap_or_default();
        let own = self.graph.borrow().dependency_count(&subscriber);
        own + foreign
            .iter()
            .filter_map(Weak::upgrade)
            .map(|other| other.graph.borrow().dependency_count(&subscriber))
            .sum::<usize>()
    }

    // ------------------------------------------------------------------
    // Computed values
    // ------------------------------------------------------------------

    pub(crate) fn computed_value(&self, name: &str) -> Result<Value> {
        if !self.computed.borrow().contains(name) {
            return Err(ReactiveError::UnknownComputed(name.to_string()));
        }
        let name: Rc<str> = name.into();
        self.track(Key::Computed(name.clone()));

        if let Some(value) = self.computed.borrow().cached(&name) {
            return Ok(value);
        }

        let derive = self
            .computed
            .borrow()
            .derivation(&name)
            .ok_or_else(|| ReactiveError::UnknownComputed(name.to_string()))?;
        let foreign = self.computed.borrow_mut().take_foreign(&name);
        let subscriber = Subscriber::Computed(self.id, name.clone());
        for graph_owner in foreign {
            if let Some(other) = graph_owner.upgrade() {
                other.graph.borrow_mut().clear_subscriber(&subscriber);
            }
        }

        let (value, dependencies) = {
            let _ctx = ReactiveContext::enter(Frame::Computed {
                name: name.clone(),
                owner_id: self.id,
                owner: self.weak(),
            });
            let value = derive();
            (value, ReactiveContext::take_dependencies())
        };
        trace!(computed = %name, dependencies = dependencies.len(), "computed evaluated");

        self.computed
            .borrow_mut()
            .store(&name, value.clone(), dependencies);
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Owner lifecycle
    // ------------------------------------------------------------------

    fn full_update(&self) {
        if self.state.get().destroyed {
            return;
        }
        self.computed.borrow_mut().clear_cache();
        let ids: Vec<EffectId> = self
            .effects
            .borrow()
            .iter()
            .filter(|(_, record)| !record.is_static())
            .map(|(id, _)| *id)
            .collect();
        debug!(runtime = self.id.raw(), effects = ids.len(), "full update");
        for id in ids {
            self.schedule(id);
        }
    }

    fn destroy(&self) {
        if self.state.get().destroyed {
            return;
        }
        self.update_state(|s| s.destroyed = true);
        debug!(runtime = self.id.raw(), "runtime destroyed");

        let effects = std::mem::take(&mut *self.effects.borrow_mut());
        self.scheduler.borrow_mut().clear();
        self.graph.borrow_mut().clear();
        for (id, record) in effects {
            let subscriber = Subscriber::Effect(id);
            for graph_owner in &record.foreign {
                if let Some(other) = graph_owner.upgrade() {
                    other.graph.borrow_mut().clear_subscriber(&subscriber);
                }
            }
            release_resources(record.resources);
        }

        let computed = std::mem::take(&mut *self.computed.borrow_mut());
        drop(computed);

        let cells: Vec<Rc<TrackedCell>> = self
            .objects
            .borrow_mut()
            .drain()
            .filter_map(|(_, cell)| cell.upgrade())
            .collect();
        for cell in &cells {
            cell.clear_data();
        }
        self.ledger.borrow_mut().clear();
    }
}

fn child_hint(hint: &Option<Rc<str>>, prop: &str) -> Option<Rc<str>> {
    hint.as_ref().map(|h| format!("{h}.{prop}").into())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Handle to one owning consumer's reactive runtime.
///
/// Clones share the same runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    /// Create a runtime with default configuration.
    pub fn new(frames: Rc<dyn FrameHost>) -> Self {
        Self::with_config(RuntimeConfig::default(), frames)
    }

    pub fn with_config(config: RuntimeConfig, frames: Rc<dyn FrameHost>) -> Self {
        let inner = RuntimeInner::new(config, frames, None);
        debug!(runtime = inner.id.raw(), "runtime created");
        Self { inner }
    }

    /// Create a nested consumer sharing this runtime's frame host and
    /// configuration. Effects in either may depend on the other's state.
    pub fn child(&self) -> Runtime {
        let inner = RuntimeInner::new(
            self.inner.config.clone(),
            self.inner.frames.clone(),
            Some(self.inner.weak()),
        );
        debug!(runtime = inner.id.raw(), parent = self.inner.id.raw(), "child runtime created");
        Runtime { inner }
    }

    pub fn parent(&self) -> Option<Runtime> {
        self.inner
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Runtime { inner })
    }

    pub fn id(&self) -> RuntimeId {
        self.inner.id
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub fn frames(&self) -> Rc<dyn FrameHost> {
        self.inner.frames.clone()
    }

    // ------------------------------------------------------------------
    // Wrapping
    // ------------------------------------------------------------------

    /// Wrap plain data. Containers become [`Tracked`] handles; primitives
    /// and opaque values pass through. Already-wrapped containers are
    /// returned as they are.
    pub fn wrap(&self, plain: impl Into<Plain>) -> Value {
        self.inner.wrap_plain(plain.into(), None)
    }

    /// Like [`wrap`](Self::wrap), labelling the containers for error
    /// messages (`hint.field.nested`).
    pub fn wrap_with_hint(&self, plain: impl Into<Plain>, hint: &str) -> Value {
        self.inner.wrap_plain(plain.into(), Some(hint.into()))
    }

    /// Wrap and return the container handle, or `None` for primitives.
    pub fn tracked(&self, plain: impl Into<Plain>) -> Option<Tracked> {
        self.wrap(plain).as_object().cloned()
    }

    /// Recover plain data (untracked).
    pub fn unwrap(&self, value: &Value) -> Plain {
        value.to_plain()
    }

    pub fn owns(&self, tracked: &Tracked) -> bool {
        tracked.belongs_to(&self.inner.self_weak)
    }

    /// Live containers in the ledger.
    pub fn live_objects(&self) -> usize {
        self.inner.ledger.borrow().live_count()
    }

    /// Summed versions of `value` and its nested containers, bounded by
    /// `deep_version_depth`.
    pub fn deep_version(&self, value: &Value) -> u64 {
        value.deep_version(self.inner.config.deep_version_depth)
    }

    // ------------------------------------------------------------------
    // Tracking
    // ------------------------------------------------------------------

    /// Record a read of `key` by the current reader.
    pub fn track(&self, key: Key) {
        self.inner.track(key);
    }

    /// Notify dependents of `key`.
    pub fn notify(&self, key: Key) {
        self.inner.notify_keys(std::slice::from_ref(&key));
    }

    /// Notify dependents of several keys as one notification.
    pub fn notify_keys(&self, keys: &[Key]) {
        self.inner.notify_keys(keys);
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Register an effect and run it once immediately. The effect joins the
    /// current [`EffectGroup`], if any.
    pub fn create_effect<O, F>(&self, body: F) -> EffectHandle
    where
        O: EffectOutput,
        F: Fn() -> O + 'static,
    {
        let body: EffectBody = Rc::new(move || body().into_outcome());
        let id = EffectId::new();
        let handle = EffectHandle {
            id,
            owner: self.inner.weak(),
        };
        if self.inner.state.get().destroyed {
            return handle;
        }

        self.inner
            .effects
            .borrow_mut()
            .insert(id, EffectRecord::new(body));
        if let Some(group) = EffectGroup::current() {
            group.adopt_effect(handle.clone());
        }
        trace!(runtime = self.inner.id.raw(), effect = %id, "effect created");
        self.inner.run_effect(id);
        handle
    }

    /// The effect currently running in this runtime.
    pub fn active_effect(&self) -> Option<EffectId> {
        self.inner.active_effect.get()
    }

    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    // ------------------------------------------------------------------
    // Computed values
    // ------------------------------------------------------------------

    /// Register a named derivation. Redefining a name invalidates readers
    /// of the old one.
    pub fn define_computed(&self, name: &str, derive: impl Fn() -> Value + 'static) {
        let replaced = self.inner.computed.borrow().contains(name);
        self.inner
            .computed
            .borrow_mut()
            .define(name.into(), Rc::new(derive));
        if replaced {
            self.inner.notify_keys(&[Key::computed(name)]);
        }
    }

    /// Read a computed value, evaluating it on a cache miss.
    pub fn computed(&self, name: &str) -> Result<Value> {
        self.inner.computed_value(name)
    }

    /// How many times `name` has been evaluated.
    pub fn computed_evaluations(&self, name: &str) -> usize {
        self.inner.computed.borrow().evaluations(name)
    }

    /// Keys the last evaluation of `name` read within this runtime.
    pub fn computed_dependencies(&self, name: &str) -> Vec<Key> {
        self.inner.computed.borrow().dependencies(name)
    }

    // ------------------------------------------------------------------
    // Flushing
    // ------------------------------------------------------------------

    /// Drain the current batch now. Returns how many effects ran.
    pub fn flush(&self) -> usize {
        self.inner.flush()
    }

    /// Flush repeatedly until nothing is pending, bounded by
    /// `max_flush_rounds`. Returns the number of rounds.
    pub fn settle(&self) -> usize {
        let mut rounds = 0;
        while self.has_pending() {
            if rounds >= self.inner.config.max_flush_rounds {
                warn!(
                    runtime = self.inner.id.raw(),
                    rounds, "settle gave up; effects keep re-queuing each other"
                );
                break;
            }
            self.inner.flush();
            rounds += 1;
        }
        rounds
    }

    pub fn has_pending(&self) -> bool {
        self.inner.scheduler.borrow().has_pending()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.scheduler.borrow().pending_len()
    }

    pub fn flush_count(&self) -> u64 {
        self.inner.scheduler.borrow().flush_count()
    }

    /// Drop every cached computed value and queue every non-static effect.
    pub fn full_update(&self) {
        self.inner.full_update();
    }

    // ------------------------------------------------------------------
    // Owner states
    // ------------------------------------------------------------------

    pub fn freeze(&self) {
        if self.inner.state.get().frozen {
            return;
        }
        self.inner.update_state(|s| {
            s.frozen = true;
            s.sealed_before_freeze = s.sealed;
            s.sealed = true;
        });
        debug!(runtime = self.inner.id.raw(), "frozen");
    }

    pub fn unfreeze(&self) {
        if !self.inner.state.get().frozen {
            return;
        }
        self.inner.update_state(|s| {
            s.frozen = false;
            s.sealed = s.sealed_before_freeze;
            s.skipped_while_sealed = false;
        });
        debug!(runtime = self.inner.id.raw(), "unfrozen");
        self.inner.full_update();
    }

    pub fn seal(&self) {
        self.inner.update_state(|s| s.sealed = true);
        debug!(runtime = self.inner.id.raw(), "sealed");
    }

    pub fn unseal(&self) {
        let state = self.inner.state.get();
        if !state.sealed {
            return;
        }
        self.inner.update_state(|s| {
            s.sealed = false;
            s.skipped_while_sealed = false;
        });
        debug!(runtime = self.inner.id.raw(), "unsealed");
        if state.skipped_while_sealed {
            self.inner.full_update();
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.state.get().frozen
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.state.get().sealed
    }

    /// Tear the runtime down: dispose every effect, release every resource,
    /// drop every dependency and cached value. Further writes fail with
    /// [`ReactiveError::Destroyed`].
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.state.get().destroyed
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.get();
        f.debug_struct("Runtime")
            .field("id", &self.inner.id.raw())
            .field("effects", &self.effect_count())
            .field("pending", &self.pending_count())
            .field("frozen", &state.frozen)
            .field("sealed", &state.sealed)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
