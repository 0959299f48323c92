//! Computed Value Cache
//!
//! A computed entry is a named derivation whose result is cached until one of
//! its transitive dependencies changes.
//!
//! # How Computed Entries Work
//!
//! 1. On first read, the derivation runs inside a computed frame. Reads made
//!    during the run are buffered on that frame and become the entry's
//!    dependency set. Reading another computed entry records
//!    `Key::Computed(other)`, which is how chains form.
//!
//! 2. Subsequent reads return the cache.
//!
//! 3. On any notification, the reverse index (base key → computed entries
//!    that read it) is walked breadth-first. Every entry reached is evicted,
//!    and reaching an entry also queues `Key::Computed(entry)` so entries
//!    that depend on it are evicted too.
//!
//! The reverse index is rebuilt lazily: any change to any entry's dependency
//! set drops it, and the next notification rebuilds it.
//!
//! An entry with no dependencies is evaluated once per cache miss and is never
//! reached by notifications, so it stays cached.

use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use crate::graph::Key;

use super::runtime::RuntimeInner;
use super::value::Value;

pub(crate) type Derivation = Rc<dyn Fn() -> Value>;

pub(crate) struct ComputedEntry {
    derive: Derivation,
    cached: Option<Value>,
    dependencies: IndexSet<Key>,
    /// Runtimes whose graphs hold edges for this entry.
    pub foreign: SmallVec<[Weak<RuntimeInner>; 1]>,
    evaluations: usize,
}

/// Per-runtime table of computed entries.
#[derive(Default)]
pub(crate) struct ComputedTable {
    entries: IndexMap<Rc<str>, ComputedEntry>,
    reverse: Option<HashMap<Key, IndexSet<Rc<str>>>>,
}

impl ComputedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a derivation. Replacing drops the cached value.
    pub fn define(&mut self, name: Rc<str>, derive: Derivation) {
        let previous = self.entries.insert(
            name,
            ComputedEntry {
                derive,
                cached: None,
                dependencies: IndexSet::new(),
                foreign: SmallVec::new(),
                evaluations: 0,
            },
        );
        if previous.is_some_and(|p| !p.dependencies.is_empty()) {
            self.reverse = None;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn cached(&self, name: &str) -> Option<Value> {
        self.entries.get(name).and_then(|e| e.cached.clone())
    }

    pub fn derivation(&self, name: &str) -> Option<Derivation> {
        self.entries.get(name).map(|e| e.derive.clone())
    }

    /// Take the foreign graph handles so their edges can be cleared before a
    /// re-evaluation.
    pub fn take_foreign(&mut self, name: &str) -> SmallVec<[Weak<RuntimeInner>; 1]> {
        self.entries
            .get_mut(name)
            .map(|e| std::mem::take(&mut e.foreign))
            .unwrap_or_default()
    }

    pub fn note_foreign(&mut self, name: &str, graph_owner: Weak<RuntimeInner>) {
        if let Some(entry) = self.entries.get_mut(name) {
            if !entry.foreign.iter().any(|w| w.ptr_eq(&graph_owner)) {
                entry.foreign.push(graph_owner);
            }
        }
    }

    /// Store a freshly derived value along with the keys it read.
    pub fn store(&mut self, name: &str, value: Value, dependencies: Vec<Key>) {
        let Some(entry) = self.entries.get_mut(name) else {
            return;
        };
        entry.cached = Some(value);
        entry.evaluations += 1;

        let dependencies: IndexSet<Key> = dependencies.into_iter().collect();
        if entry.dependencies != dependencies {
            entry.dependencies = dependencies;
            self.reverse = None;
        }
    }

    /// Drop the cached value. Returns true if there was one.
    pub fn evict(&mut self, name: &str) -> bool {
        self.entries
            .get_mut(name)
            .is_some_and(|e| e.cached.take().is_some())
    }

    pub fn clear_cache(&mut self) {
        for entry in self.entries.values_mut() {
            entry.cached = None;
        }
    }

    pub fn evaluations(&self, name: &str) -> usize {
        self.entries.get(name).map(|e| e.evaluations).unwrap_or(0)
    }

    pub fn dependencies(&self, name: &str) -> Vec<Key> {
        self.entries
            .get(name)
            .map(|e| e.dependencies.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every computed entry directly or transitively affected by `key`, in
    /// breadth-first order.
    pub fn affected_by(&mut self, key: &Key) -> Vec<Rc<str>> {
        self.ensure_reverse();
        let Some(reverse) = self.reverse.as_ref() else {
            return Vec::new();
        };

        let mut affected: IndexSet<Rc<str>> = IndexSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(key.clone());

        while let Some(current) = queue.pop_front() {
            if let Some(names) = reverse.get(&current) {
                for name in names {
                    if affected.insert(name.clone()) {
                        queue.push_back(Key::Computed(name.clone()));
                    }
                }
            }
        }

        affected.into_iter().collect()
    }

    pub fn is_reverse_index_built(&self) -> bool {
        self.reverse.is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.reverse = None;
    }

    fn ensure_reverse(&mut self) {
        if self.reverse.is_some() {
            return;
        }
        let mut reverse: HashMap<Key, IndexSet<Rc<str>>> = HashMap::new();
        for (name, entry) in &self.entries {
            for dep in &entry.dependencies {
                reverse.entry(dep.clone()).or_default().insert(name.clone());
            }
        }
        self.reverse = Some(reverse);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
