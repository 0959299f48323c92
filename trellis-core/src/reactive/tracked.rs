//! Tracked Containers
//!
//! A [`Tracked`] handle wraps one structurally mutable container (record,
//! array, keyed map or unique set) owned by a runtime. Every read registers
//! the current reader against the key it touched; every committed write bumps
//! the container's mutation version and notifies the runtime.
//!
//! # Keys
//!
//! | read | tracks |
//! |---|---|
//! | record `get`/`has` | `Field(name)` |
//! | array `at` | `Index(i)` and `Shape` |
//! | map/set `entry`/`has_entry` | `Entry(key)` |
//! | `len`, `keys` | `Shape` |
//! | `items`, `entries` | `Shape` and `Values` |
//!
//! # Writes
//!
//! A write compares old and new values by identity and does nothing when they
//! are the same. Structural array methods compare the identity sequence
//! before and after, and emit a single `Shape` notification only when it
//! changed. Writes are rejected while the owner is frozen, sealed or
//! destroyed, and while any computed value is being evaluated.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::error::{ReactiveError, Result};
use crate::graph::{Key, PropKey};

use super::ledger::{self, ObjectId};
use super::runtime::RuntimeInner;
use super::value::{Plain, Value, ValueKey};

/// Most `Undefined` slots a single `set_at` may pad an array with.
pub const MAX_ARRAY_PADDING: usize = 1 << 16;

/// The four container shapes the interception layer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedKind {
    Record,
    Array,
    Map,
    Set,
}

impl TrackedKind {
    pub fn name(&self) -> &'static str {
        match self {
            TrackedKind::Record => "record",
            TrackedKind::Array => "array",
            TrackedKind::Map => "map",
            TrackedKind::Set => "set",
        }
    }
}

pub(crate) enum Container {
    Record(IndexMap<Rc<str>, Value>),
    Array(Vec<Value>),
    Map(IndexMap<ValueKey, (Value, Value)>),
    Set(IndexMap<ValueKey, Value>),
}

impl Container {
    fn kind(&self) -> TrackedKind {
        match self {
            Container::Record(_) => TrackedKind::Record,
            Container::Array(_) => TrackedKind::Array,
            Container::Map(_) => TrackedKind::Map,
            Container::Set(_) => TrackedKind::Set,
        }
    }

    fn empty(kind: TrackedKind) -> Self {
        match kind {
            TrackedKind::Record => Container::Record(IndexMap::new()),
            TrackedKind::Array => Container::Array(Vec::new()),
            TrackedKind::Map => Container::Map(IndexMap::new()),
            TrackedKind::Set => Container::Set(IndexMap::new()),
        }
    }

    fn len(&self) -> usize {
        match self {
            Container::Record(m) => m.len(),
            Container::Array(v) => v.len(),
            Container::Map(m) => m.len(),
            Container::Set(s) => s.len(),
        }
    }

    fn values(&self) -> Vec<Value> {
        match self {
            Container::Record(m) => m.values().cloned().collect(),
            Container::Array(v) => v.clone(),
            Container::Map(m) => m.values().map(|(_, v)| v.clone()).collect(),
            Container::Set(s) => s.values().cloned().collect(),
        }
    }
}

pub(crate) struct TrackedCell {
    id: ObjectId,
    kind: TrackedKind,
    label: Option<Rc<str>>,
    data: RefCell<Container>,
    owner: Weak<RuntimeInner>,
}

impl TrackedCell {
    pub(crate) fn new(
        id: ObjectId,
        label: Option<Rc<str>>,
        data: Container,
        owner: Weak<RuntimeInner>,
    ) -> Self {
        Self {
            id,
            kind: data.kind(),
            label,
            data: RefCell::new(data),
            owner,
        }
    }

    /// Empty the container, dropping its children outside the borrow.
    pub(crate) fn clear_data(&self) {
        let old = std::mem::replace(&mut *self.data.borrow_mut(), Container::empty(self.kind));
        drop(old);
    }
}

impl Drop for TrackedCell {
    fn drop(&mut self) {
        if let Some(rt) = self.owner.upgrade() {
            rt.release_object(self.id);
        }
    }
}

/// Handle to a tracked container. Clones share the container.
#[derive(Clone)]
pub struct Tracked(pub(crate) Rc<TrackedCell>);

impl Tracked {
    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn kind(&self) -> TrackedKind {
        self.0.kind
    }

    /// Debug label derived from the owner key hint given at wrap time.
    pub fn label(&self) -> String {
        match &self.0.label {
            Some(label) => label.to_string(),
            None => self.0.id.to_string(),
        }
    }

    pub fn ptr_eq(&self, other: &Tracked) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub(crate) fn belongs_to(&self, rt: &Weak<RuntimeInner>) -> bool {
        self.0.owner.ptr_eq(rt)
    }

    /// Current mutation version. Untracked.
    pub fn version(&self) -> u64 {
        self.owner()
            .map(|rt| rt.ledger.borrow().version(self.0.id))
            .unwrap_or(0)
    }

    /// Stable identity token, assigned on first request.
    pub fn identity(&self) -> u64 {
        self.owner()
            .and_then(|rt| rt.ledger.borrow_mut().identity(self.0.id))
            .unwrap_or_else(ledger::detached_identity)
    }

    /// Sum of this container's version and its children's, down to `depth`
    /// levels. Each container is counted once even if reachable twice or
    /// through a cycle. Untracked.
    pub fn deep_version(&self, depth: usize) -> u64 {
        let mut seen = HashSet::new();
        self.deep_version_inner(depth, &mut seen)
    }

    fn deep_version_inner(&self, depth: usize, seen: &mut HashSet<usize>) -> u64 {
        if !seen.insert(self.addr()) {
            return 0;
        }
        let mut total = self.version();
        if depth == 0 {
            return total;
        }
        let children: Vec<Tracked> = {
            let data = self.0.data.borrow();
            let mut children: Vec<Tracked> = data
                .values()
                .into_iter()
                .filter_map(|v| v.as_object().cloned())
                .collect();
            if let Container::Map(m) = &*data {
                children.extend(m.values().filter_map(|(k, _)| k.as_object().cloned()));
            }
            children
        };
        for child in children {
            total = total.wrapping_add(child.deep_version_inner(depth - 1, seen));
        }
        total
    }

    /// Recover the unwrapped form (untracked).
    pub fn unwrap(&self) -> Plain {
        let mut path = HashSet::new();
        self.to_plain_inner(&mut path)
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.unwrap().to_json()
    }

    pub(crate) fn to_plain_inner(&self, path: &mut HashSet<usize>) -> Plain {
        if !path.insert(self.addr()) {
            return Plain::Undefined;
        }
        let plain = {
            let data = self.0.data.borrow();
            match &*data {
                Container::Record(m) => Plain::Record(
                    m.iter()
                        .map(|(k, v)| (k.to_string(), v.to_plain_inner(path)))
                        .collect(),
                ),
                Container::Array(items) => {
                    Plain::Array(items.iter().map(|v| v.to_plain_inner(path)).collect())
                }
                Container::Map(m) => Plain::Map(
                    m.values()
                        .map(|(k, v)| (k.to_plain_inner(path), v.to_plain_inner(path)))
                        .collect(),
                ),
                Container::Set(s) => {
                    Plain::Set(s.values().map(|v| v.to_plain_inner(path)).collect())
                }
            }
        };
        path.remove(&self.addr());
        plain
    }

    // ------------------------------------------------------------------
    // Reads shared by every kind
    // ------------------------------------------------------------------

    /// Number of fields, slots or entries. Tracks the shape.
    pub fn len(&self) -> usize {
        self.track(PropKey::Shape);
        self.0.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values in order: record field values, array slots, map values, set
    /// members. Tracks the shape and the value sweep.
    pub fn items(&self) -> Vec<Value> {
        self.track(PropKey::Shape);
        self.track(PropKey::Values);
        self.peek_items()
    }

    pub fn peek_items(&self) -> Vec<Value> {
        self.0.data.borrow().values()
    }

    /// Key/value pairs in order. Records yield field names, arrays indices,
    /// maps their keys, sets each member twice.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.track(PropKey::Shape);
        self.track(PropKey::Values);
        let data = self.0.data.borrow();
        match &*data {
            Container::Record(m) => m
                .iter()
                .map(|(k, v)| (Value::String(k.clone()), v.clone()))
                .collect(),
            Container::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (Value::from(i), v.clone()))
                .collect(),
            Container::Map(m) => m.values().cloned().collect(),
            Container::Set(s) => s.values().map(|v| (v.clone(), v.clone())).collect(),
        }
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Read a record field. Missing fields read as `Undefined`.
    pub fn get(&self, field: &str) -> Value {
        self.track(PropKey::Field(field.into()));
        self.peek(field)
    }

    /// Read a record field without tracking.
    pub fn peek(&self, field: &str) -> Value {
        match &*self.0.data.borrow() {
            Container::Record(m) => m.get(field).cloned().unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    pub fn has(&self, field: &str) -> bool {
        self.track(PropKey::Field(field.into()));
        match &*self.0.data.borrow() {
            Container::Record(m) => m.contains_key(field),
            _ => false,
        }
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        self.track(PropKey::Shape);
        match &*self.0.data.borrow() {
            Container::Record(m) => m.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Assign a record field, installing it if missing. Returns false when
    /// the field already held the same value.
    pub fn set(&self, field: &str, value: impl Into<Plain>) -> Result<bool> {
        self.expect_kind(TrackedKind::Record, "set")?;
        let rt = self.begin_write(|| self.describe(field))?;
        let new = rt.wrap_plain(value.into(), self.child_hint(field));

        let (inserted, _replaced) = {
            let mut data = self.0.data.borrow_mut();
            let Container::Record(map) = &mut *data else {
                return Err(self.wrong_kind("set"));
            };
            match map.get_mut(field) {
                Some(slot) if slot.same(&new) => return Ok(false),
                Some(slot) => (false, Some(std::mem::replace(slot, new))),
                None => {
                    map.insert(field.into(), new);
                    (true, None)
                }
            }
        };

        let mut props = vec![PropKey::Field(field.into()), PropKey::Values];
        if inserted {
            props.push(PropKey::Shape);
        }
        self.commit(&rt, props);
        Ok(true)
    }

    /// Remove a record field. Returns false if it was absent.
    pub fn delete(&self, field: &str) -> Result<bool> {
        self.expect_kind(TrackedKind::Record, "delete")?;
        let rt = self.begin_write(|| self.describe(field))?;
        let removed = {
            let mut data = self.0.data.borrow_mut();
            match &mut *data {
                Container::Record(map) => map.shift_remove(field),
                _ => None,
            }
        };
        if removed.is_none() {
            return Ok(false);
        }
        self.commit(
            &rt,
            vec![PropKey::Field(field.into()), PropKey::Values, PropKey::Shape],
        );
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Arrays
    // ------------------------------------------------------------------

    /// Read an array slot. Out-of-range reads yield `Undefined`.
    pub fn at(&self, index: usize) -> Value {
        self.track(PropKey::Index(index));
        self.track(PropKey::Shape);
        self.peek_at(index)
    }

    pub fn peek_at(&self, index: usize) -> Value {
        match &*self.0.data.borrow() {
            Container::Array(items) => items.get(index).cloned().unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// Assign an array slot. Writing past the end pads with `Undefined`, at
    /// most [`MAX_ARRAY_PADDING`] slots; further out is `IndexOutOfBounds`.
    pub fn set_at(&self, index: usize, value: impl Into<Plain>) -> Result<bool> {
        self.expect_kind(TrackedKind::Array, "set_at")?;
        let rt = self.begin_write(|| self.describe(&index))?;
        let len = self.peek_len();
        if index.saturating_sub(len) > MAX_ARRAY_PADDING {
            return Err(ReactiveError::IndexOutOfBounds { index, len });
        }
        let new = rt.wrap_plain(value.into(), self.child_hint("[]"));

        let (grew, _replaced) = {
            let mut data = self.0.data.borrow_mut();
            let Container::Array(items) = &mut *data else {
                return Err(self.wrong_kind("set_at"));
            };
            if index < items.len() {
                if items[index].same(&new) {
                    return Ok(false);
                }
                (false, Some(std::mem::replace(&mut items[index], new)))
            } else {
                items.resize(index, Value::Undefined);
                items.push(new);
                (true, None)
            }
        };

        let props = if grew {
            vec![PropKey::Shape]
        } else {
            vec![PropKey::Index(index), PropKey::Values]
        };
        self.commit(&rt, props);
        Ok(true)
    }

    /// Append a value; returns the new length.
    pub fn push(&self, value: impl Into<Plain>) -> Result<usize> {
        self.mutate_array("push", vec![value.into()], |items, mut incoming| {
            items.append(&mut incoming);
            items.len()
        })
    }

    pub fn extend<I, P>(&self, values: I) -> Result<usize>
    where
        I: IntoIterator<Item = P>,
        P: Into<Plain>,
    {
        let incoming = values.into_iter().map(Into::into).collect();
        self.mutate_array("extend", incoming, |items, mut incoming| {
            items.append(&mut incoming);
            items.len()
        })
    }

    pub fn pop(&self) -> Result<Value> {
        self.mutate_array("pop", Vec::new(), |items, _| items.pop().unwrap_or_default())
    }

    pub fn shift(&self) -> Result<Value> {
        self.mutate_array("shift", Vec::new(), |items, _| {
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        })
    }

    /// Prepend a value; returns the new length.
    pub fn unshift(&self, value: impl Into<Plain>) -> Result<usize> {
        self.mutate_array("unshift", vec![value.into()], |items, incoming| {
            items.splice(0..0, incoming);
            items.len()
        })
    }

    pub fn insert(&self, index: usize, value: impl Into<Plain>) -> Result<()> {
        let len = self.peek_len();
        if index > len {
            return Err(ReactiveError::IndexOutOfBounds { index, len });
        }
        self.mutate_array("insert", vec![value.into()], |items, incoming| {
            items.splice(index..index, incoming);
        })
    }

    /// Remove the slot at `index`, returning its value (`Undefined` when out
    /// of range).
    pub fn remove(&self, index: usize) -> Result<Value> {
        self.mutate_array("remove", Vec::new(), |items, _| {
            if index < items.len() {
                items.remove(index)
            } else {
                Value::Undefined
            }
        })
    }

    /// Remove `delete_count` slots starting at `start` and insert `values` in
    /// their place. Both bounds are clamped. Returns the removed values.
    pub fn splice<P: Into<Plain>>(
        &self,
        start: usize,
        delete_count: usize,
        values: Vec<P>,
    ) -> Result<Vec<Value>> {
        let incoming = values.into_iter().map(Into::into).collect();
        self.mutate_array("splice", incoming, |items, incoming| {
            let start = start.min(items.len());
            let end = start.saturating_add(delete_count).min(items.len());
            items.splice(start..end, incoming).collect()
        })
    }

    pub fn reverse(&self) -> Result<()> {
        self.mutate_array("reverse", Vec::new(), |items, _| items.reverse())
    }

    /// Stable sort with a caller-supplied comparator.
    pub fn sort_by(&self, mut compare: impl FnMut(&Value, &Value) -> Ordering) -> Result<()> {
        self.mutate_array("sort", Vec::new(), |items, _| {
            items.sort_by(|a, b| compare(a, b))
        })
    }

    /// Keep only the slots for which `keep` returns true. Returns how many
    /// were removed.
    pub fn retain(&self, mut keep: impl FnMut(&Value) -> bool) -> Result<usize> {
        self.mutate_array("retain", Vec::new(), |items, _| {
            let before = items.len();
            items.retain(|v| keep(v));
            before - items.len()
        })
    }

    // ------------------------------------------------------------------
    // Maps and sets
    // ------------------------------------------------------------------

    /// Read a map entry. Missing keys read as `Undefined`.
    pub fn entry(&self, key: impl Into<Plain>) -> Value {
        let Some(k) = key.into().lookup_key() else {
            return Value::Undefined;
        };
        self.track(PropKey::Entry(k.clone()));
        match &*self.0.data.borrow() {
            Container::Map(m) => m.get(&k).map(|(_, v)| v.clone()).unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    /// Membership test for maps (by key) and sets (by member).
    pub fn has_entry(&self, key: impl Into<Plain>) -> bool {
        let Some(k) = key.into().lookup_key() else {
            return false;
        };
        self.track(PropKey::Entry(k.clone()));
        match &*self.0.data.borrow() {
            Container::Map(m) => m.contains_key(&k),
            Container::Set(s) => s.contains_key(&k),
            _ => false,
        }
    }

    /// Insert or update a map entry. Returns false if the key already held
    /// the same value.
    pub fn insert_entry(&self, key: impl Into<Plain>, value: impl Into<Plain>) -> Result<bool> {
        self.expect_kind(TrackedKind::Map, "insert_entry")?;
        let key = key.into();
        let rt = self.begin_write(|| self.describe(&format!("{key:?}")))?;
        let key = rt.wrap_plain(key, None);
        let value = rt.wrap_plain(value.into(), self.child_hint("{}"));
        let k = key.key();

        let (inserted, _replaced) = {
            let mut data = self.0.data.borrow_mut();
            let Container::Map(map) = &mut *data else {
                return Err(self.wrong_kind("insert_entry"));
            };
            match map.get_mut(&k) {
                Some((_, slot)) if slot.same(&value) => return Ok(false),
                Some((_, slot)) => (false, Some(std::mem::replace(slot, value))),
                None => {
                    map.insert(k.clone(), (key, value));
                    (true, None)
                }
            }
        };

        let mut props = vec![PropKey::Entry(k), PropKey::Values];
        if inserted {
            props.push(PropKey::Shape);
        }
        self.commit(&rt, props);
        Ok(true)
    }

    /// Add a set member. Returns false if it was already present.
    pub fn add(&self, value: impl Into<Plain>) -> Result<bool> {
        self.expect_kind(TrackedKind::Set, "add")?;
        let value = value.into();
        let rt = self.begin_write(|| self.describe(&format!("{value:?}")))?;
        let value = rt.wrap_plain(value, self.child_hint("{}"));
        let k = value.key();

        {
            let mut data = self.0.data.borrow_mut();
            let Container::Set(set) = &mut *data else {
                return Err(self.wrong_kind("add"));
            };
            if set.contains_key(&k) {
                return Ok(false);
            }
            set.insert(k.clone(), value);
        }

        self.commit(&rt, vec![PropKey::Entry(k), PropKey::Values, PropKey::Shape]);
        Ok(true)
    }

    /// Remove a map entry or set member. Returns false if it was absent.
    pub fn remove_entry(&self, key: impl Into<Plain>) -> Result<bool> {
        let key = key.into();
        if !matches!(self.kind(), TrackedKind::Map | TrackedKind::Set) {
            return Err(self.wrong_kind("remove_entry"));
        }
        let rt = self.begin_write(|| self.describe(&format!("{key:?}")))?;
        let Some(k) = key.lookup_key() else {
            return Ok(false);
        };

        let removed = {
            let mut data = self.0.data.borrow_mut();
            match &mut *data {
                Container::Map(m) => m.shift_remove(&k).map(|(key, value)| vec![key, value]),
                Container::Set(s) => s.shift_remove(&k).map(|v| vec![v]),
                _ => None,
            }
        };
        if removed.is_none() {
            return Ok(false);
        }
        self.commit(&rt, vec![PropKey::Entry(k), PropKey::Values, PropKey::Shape]);
        Ok(true)
    }

    /// Empty the container. Returns false if it was already empty.
    pub fn clear(&self) -> Result<bool> {
        let rt = self.begin_write(|| self.describe("clear"))?;
        let (old, mut props) = {
            let mut data = self.0.data.borrow_mut();
            if data.len() == 0 {
                return Ok(false);
            }
            let props: Vec<PropKey> = match &*data {
                Container::Record(m) => m.keys().map(|k| PropKey::Field(k.clone())).collect(),
                Container::Map(m) => m.keys().map(|k| PropKey::Entry(k.clone())).collect(),
                Container::Set(s) => s.keys().map(|k| PropKey::Entry(k.clone())).collect(),
                Container::Array(_) => Vec::new(),
            };
            (std::mem::replace(&mut *data, Container::empty(self.kind())), props)
        };
        drop(old);
        props.push(PropKey::Values);
        props.push(PropKey::Shape);
        self.commit(&rt, props);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn owner(&self) -> Option<Rc<RuntimeInner>> {
        self.0.owner.upgrade()
    }

    fn track(&self, prop: PropKey) {
        if let Some(rt) = self.owner() {
            rt.track(Key::Prop(self.0.id, prop));
        }
    }

    fn peek_len(&self) -> usize {
        self.0.data.borrow().len()
    }

    fn describe(&self, prop: &(impl fmt::Display + ?Sized)) -> String {
        format!("{}.{}", self.label(), prop)
    }

    fn child_hint(&self, prop: &str) -> Option<Rc<str>> {
        self.0
            .label
            .as_ref()
            .map(|label| format!("{label}.{prop}").into())
    }

    fn wrong_kind(&self, operation: &'static str) -> ReactiveError {
        ReactiveError::WrongKind {
            operation,
            kind: self.kind().name(),
        }
    }

    fn expect_kind(&self, kind: TrackedKind, operation: &'static str) -> Result<()> {
        if self.kind() == kind {
            Ok(())
        } else {
            Err(self.wrong_kind(operation))
        }
    }

    fn begin_write(&self, describe: impl Fn() -> String) -> Result<Rc<RuntimeInner>> {
        match self.owner() {
            Some(rt) => {
                rt.check_writable(&describe)?;
                Ok(rt)
            }
            None => Err(ReactiveError::Destroyed { key: describe() }),
        }
    }

    fn commit(&self, rt: &RuntimeInner, props: Vec<PropKey>) {
        rt.ledger.borrow_mut().bump(self.0.id);
        let keys: Vec<Key> = props
            .into_iter()
            .map(|prop| Key::Prop(self.0.id, prop))
            .collect();
        rt.notify_keys(&keys);
    }

    /// Run one structural array operation, notifying `Shape` once if the
    /// identity sequence changed.
    fn mutate_array<R>(
        &self,
        operation: &'static str,
        incoming: Vec<Plain>,
        apply: impl FnOnce(&mut Vec<Value>, Vec<Value>) -> R,
    ) -> Result<R> {
        self.expect_kind(TrackedKind::Array, operation)?;
        let rt = self.begin_write(|| self.describe(operation))?;
        let hint = self.child_hint("[]");
        let incoming: Vec<Value> = incoming
            .into_iter()
            .map(|plain| rt.wrap_plain(plain, hint.clone()))
            .collect();

        let (result, changed) = {
            let mut data = self.0.data.borrow_mut();
            let Container::Array(items) = &mut *data else {
                return Err(self.wrong_kind(operation));
            };
            let before: Vec<ValueKey> = items.iter().map(Value::key).collect();
            let result = apply(items, incoming);
            let changed = before.len() != items.len()
                || before.iter().zip(items.iter()).any(|(k, v)| *k != v.key());
            (result, changed)
        };

        if changed {
            self.commit(&rt, vec![PropKey::Shape]);
        }
        Ok(result)
    }
}

impl fmt::Debug for Tracked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tracked({} {}", self.kind().name(), self.0.id)?;
        if let Some(label) = &self.0.label {
            write!(f, " {label:?}")?;
        }
        write!(f, ")")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
