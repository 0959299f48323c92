//! Keyed list binding.
//!
//! # Algorithm
//!
//! 1. Evaluate the source (tracked) into `(item, index)` pairs.
//! 2. Resolve a key per item: the key expression if bound, else the item's
//!    `id` field, else its identity token, else its primitive signature.
//! 3. Match keys against the previous instances (first-in, first-out for
//!    duplicates). A reused instance refreshes its effects only if its item
//!    changed, its index changed while an index variable is bound, or the
//!    item's deep version moved.
//! 4. Remove unmatched old instances.
//! 5. Walk the new list backwards. Instances on one longest increasing
//!    subsequence of old positions stay put; every other reused instance is
//!    moved before its right neighbour, and new instances are inserted
//!    there.
//!
//! Sources: arrays, sets, records and maps (index is the key), and numbers
//! (`n` yields `1..=n`). Anything else renders nothing.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use tracing::{trace, warn};

use crate::dom::{Host, NodeId};
use crate::error::EvalError;
use crate::reactive::{EffectGroup, EffectHandle, ReactiveContext, Runtime, TrackedKind, Value};

use super::key::{default_key, ItemKey};
use super::lis::longest_increasing_subsequence;
use super::scope::{Expression, Scope, Template};
use super::{anchor_parent, ReconcileReport, Roots};

/// Largest numeric range source rendered.
const MAX_RANGE: f64 = 1_000_000.0;

/// Declaration of a keyed list.
#[derive(Clone)]
pub struct ForBinding {
    pub source: Expression,
    pub item: Rc<str>,
    pub index: Option<Rc<str>>,
    pub key: Option<Expression>,
    pub template: Template,
}

impl ForBinding {
    pub fn new(item: &str, source: Expression, template: Template) -> Self {
        Self {
            source,
            item: item.into(),
            index: None,
            key: None,
            template,
        }
    }

    pub fn index(mut self, name: &str) -> Self {
        self.index = Some(name.into());
        self
    }

    pub fn key(mut self, key: Expression) -> Self {
        self.key = Some(key);
        self
    }
}

struct Instance {
    key: ItemKey,
    item: Value,
    index: Value,
    deep_version: u64,
    scope: Scope,
    group: EffectGroup,
    roots: Roots,
}

struct ForState {
    host: Rc<dyn Host>,
    anchor: NodeId,
    scope: Scope,
    binding: ForBinding,
    group: EffectGroup,
    deep_depth: usize,
    instances: RefCell<Vec<Instance>>,
    report: Cell<ReconcileReport>,
}

/// Live list binding.
pub struct ForHandle {
    state: Rc<ForState>,
    effect: EffectHandle,
}

/// Bind a keyed list before `anchor`. The first render happens immediately.
pub fn bind_for(
    rt: &Runtime,
    host: Rc<dyn Host>,
    anchor: NodeId,
    scope: &Scope,
    binding: ForBinding,
) -> ForHandle {
    let group = EffectGroup::child_of_current();
    let state = Rc::new(ForState {
        host,
        anchor,
        scope: scope.clone(),
        binding,
        group: group.clone(),
        deep_depth: rt.config().deep_version_depth,
        instances: RefCell::new(Vec::new()),
        report: Cell::new(ReconcileReport::default()),
    });

    let body_state = state.clone();
    let effect = group.run(|| {
        rt.create_effect(move || -> Result<(), EvalError> {
            let items = body_state.evaluate_source()?;
            body_state.reconcile(items);
            Ok(())
        })
    });

    ForHandle { state, effect }
}

impl ForState {
    fn evaluate_source(&self) -> Result<Vec<(Value, Value)>, EvalError> {
        let source = (self.binding.source)(&self.scope)?;
        Ok(match &source {
            Value::Object(list) => match list.kind() {
                TrackedKind::Array | TrackedKind::Set => list
                    .items()
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| (item, Value::from(i)))
                    .collect(),
                TrackedKind::Record | TrackedKind::Map => list
                    .entries()
                    .into_iter()
                    .map(|(key, item)| (item, key))
                    .collect(),
            },
            Value::Number(n) if n.is_finite() && *n >= 1.0 => {
                let n = n.min(MAX_RANGE).floor() as usize;
                (1..=n).map(|i| (Value::from(i), Value::from(i - 1))).collect()
            }
            _ => Vec::new(),
        })
    }

    fn resolve_key(&self, item: &Value, index: &Value) -> ItemKey {
        let Some(key_expr) = &self.binding.key else {
            return default_key(item);
        };
        let key_scope = self.instance_scope(item, index);
        match key_expr(&key_scope) {
            Ok(key) => ItemKey::Keyed(key.key()),
            Err(err) => {
                warn!(error = %err, "list key expression failed; using the default key");
                default_key(item)
            }
        }
    }

    fn instance_scope(&self, item: &Value, index: &Value) -> Scope {
        let scope = self.scope.child().with(&self.binding.item, item.clone());
        if let Some(index_name) = &self.binding.index {
            scope.set(index_name, index.clone());
        }
        scope
    }

    fn create_instance(&self, key: ItemKey, item: Value, index: Value) -> Instance {
        let scope = self.instance_scope(&item, &index);
        let group = self.group.child();
        let template = self.binding.template.clone();
        let nodes = group.run(|| ReactiveContext::untracked(|| template(&scope)));
        let nodes = nodes.unwrap_or_else(|err| {
            warn!(error = %err, "list template failed; rendering an empty instance");
            Vec::new()
        });
        let deep_version = item.deep_version(self.deep_depth);
        Instance {
            key,
            roots: Roots::new(self.host.as_ref(), nodes, "for-item"),
            item,
            index,
            deep_version,
            scope,
            group,
        }
    }

    fn reconcile(&self, next: Vec<(Value, Value)>) {
        let host = self.host.as_ref();
        let mut report = ReconcileReport::default();

        let old = std::mem::take(&mut *self.instances.borrow_mut());
        let mut by_key: HashMap<ItemKey, VecDeque<usize>> = HashMap::new();
        for (position, instance) in old.iter().enumerate() {
            by_key
                .entry(instance.key.clone())
                .or_default()
                .push_back(position);
        }
        let mut old: Vec<Option<Instance>> = old.into_iter().map(Some).collect();

        let mut instances: Vec<Instance> = Vec::with_capacity(next.len());
        let mut previous_positions: Vec<Option<usize>> = Vec::with_capacity(next.len());

        for (item, index) in next {
            let key = self.resolve_key(&item, &index);
            let reused = by_key
                .get_mut(&key)
                .and_then(VecDeque::pop_front)
                .and_then(|position| old[position].take().map(|inst| (position, inst)));

            match reused {
                Some((position, instance)) => {
                    let instance = ReactiveContext::untracked(|| {
                        self.refresh(instance, item, index, &mut report)
                    });
                    instances.push(instance);
                    previous_positions.push(Some(position));
                    report.reused += 1;
                }
                None => {
                    let instance = self.create_instance(key, item, index);
                    instances.push(instance);
                    previous_positions.push(None);
                    report.created += 1;
                }
            }
        }

        for instance in old.into_iter().flatten() {
            instance.roots.remove(host);
            instance.group.dispose();
            report.removed += 1;
        }

        let parent = anchor_parent(host, self.anchor);
        let stable: HashSet<usize> = longest_increasing_subsequence(&previous_positions)
            .into_iter()
            .collect();
        let mut reference = Some(self.anchor);
        for (position, instance) in instances.iter().enumerate().rev() {
            let reused = previous_positions[position].is_some();
            if !reused || !stable.contains(&position) {
                instance.roots.insert_before(host, parent, reference);
                if reused {
                    report.moved += 1;
                }
            }
            reference = instance.roots.first().or(reference);
        }

        trace!(
            created = report.created,
            reused = report.reused,
            removed = report.removed,
            moved = report.moved,
            "list reconciled"
        );
        *self.instances.borrow_mut() = instances;
        self.report.set(report);
    }

    fn refresh(
        &self,
        mut instance: Instance,
        item: Value,
        index: Value,
        report: &mut ReconcileReport,
    ) -> Instance {
        let item_changed = !instance.item.same(&item);
        let index_changed = self.binding.index.is_some() && !instance.index.same(&index);
        let deep_version = item.deep_version(self.deep_depth);
        let deep_changed = deep_version != instance.deep_version;

        if item_changed {
            instance.scope.set(&self.binding.item, item.clone());
        }
        if index_changed {
            if let Some(index_name) = &self.binding.index {
                instance.scope.set(index_name, index.clone());
            }
        }
        instance.item = item;
        instance.index = index;
        instance.deep_version = deep_version;

        if item_changed || index_changed || deep_changed {
            instance.group.rerun();
            report.refreshed += 1;
        }
        instance
    }

    fn teardown(&self) {
        let instances = std::mem::take(&mut *self.instances.borrow_mut());
        for instance in instances {
            instance.roots.remove(self.host.as_ref());
            instance.group.dispose();
        }
    }
}

impl ForHandle {
    /// What the most recent reconciliation did.
    pub fn last_report(&self) -> ReconcileReport {
        self.state.report.get()
    }

    pub fn len(&self) -> usize {
        self.state.instances.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<ItemKey> {
        self.state
            .instances
            .borrow()
            .iter()
            .map(|i| i.key.clone())
            .collect()
    }

    /// First root node of every instance, in list order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.state
            .instances
            .borrow()
            .iter()
            .filter_map(|i| i.roots.first())
            .collect()
    }

    pub fn effect(&self) -> &EffectHandle {
        &self.effect
    }

    /// Stop the binding and remove every instance from the tree.
    pub fn dispose(&self) {
        self.effect.dispose();
        self.state.teardown();
        self.state.group.dispose();
    }
}
