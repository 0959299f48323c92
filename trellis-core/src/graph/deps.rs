//! Dependency Keys and Edges
//!
//! A [`Key`] names one observable location: a field, index, entry, the value
//! sweep or the shape of a tracked container, or a computed entry. The graph
//! maps each key to the subscribers that read it during their last run, and
//! keeps the forward edges too so that one subscriber's entries can be
//! cleared without scanning every key.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::reactive::{ObjectId, Subscriber, ValueKey};

/// Which part of a tracked container was read or written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropKey {
    /// A named record field.
    Field(Rc<str>),
    /// One array slot.
    Index(usize),
    /// One map or set entry.
    Entry(ValueKey),
    /// The contents of every slot, as read by a full sweep.
    Values,
    /// Membership, order and length.
    Shape,
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropKey::Field(name) => write!(f, "{name}"),
            PropKey::Index(i) => write!(f, "{i}"),
            PropKey::Entry(key) => write!(f, "{key:?}"),
            PropKey::Values => write!(f, "<values>"),
            PropKey::Shape => write!(f, "<shape>"),
        }
    }
}

/// A trackable location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Prop(ObjectId, PropKey),
    Computed(Rc<str>),
}

impl Key {
    pub fn field(object: ObjectId, name: &str) -> Self {
        Key::Prop(object, PropKey::Field(name.into()))
    }

    pub fn shape(object: ObjectId) -> Self {
        Key::Prop(object, PropKey::Shape)
    }

    pub fn computed(name: &str) -> Self {
        Key::Computed(name.into())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Prop(object, prop) => write!(f, "{object}.{prop}"),
            Key::Computed(name) => write!(f, "computed:{name}"),
        }
    }
}

/// Key → subscriber edges, with the owner handle needed to reach each
/// subscriber stored alongside.
#[derive(Debug)]
pub struct DependencyGraph<O = ()> {
    dependents: HashMap<Key, IndexMap<Subscriber, O>>,
    dependencies: HashMap<Subscriber, IndexSet<Key>>,
}

impl<O> Default for DependencyGraph<O> {
    fn default() -> Self {
        Self {
            dependents: HashMap::new(),
            dependencies: HashMap::new(),
        }
    }
}

impl<O: Clone> DependencyGraph<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `subscriber` read `key`. Returns false if the edge existed.
    pub fn add(&mut self, key: Key, subscriber: Subscriber, owner: O) -> bool {
        let forward = self.dependencies.entry(subscriber.clone()).or_default();
        if !forward.insert(key.clone()) {
            return false;
        }
        self.dependents
            .entry(key)
            .or_default()
            .insert(subscriber, owner);
        true
    }

    /// Remove every edge of `subscriber`. Returns how many were removed.
    pub fn clear_subscriber(&mut self, subscriber: &Subscriber) -> usize {
        let Some(keys) = self.dependencies.remove(subscriber) else {
            return 0;
        };
        for key in &keys {
            if let Some(subs) = self.dependents.get_mut(key) {
                subs.shift_remove(subscriber);
                if subs.is_empty() {
                    self.dependents.remove(key);
                }
            }
        }
        keys.len()
    }

    /// Subscribers of `key`, in the order they first read it.
    pub fn dependents(&self, key: &Key) -> Vec<(Subscriber, O)> {
        self.dependents
            .get(key)
            .map(|subs| {
                subs.iter()
                    .map(|(s, o)| (s.clone(), o.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn dependency_count(&self, subscriber: &Subscriber) -> usize {
        self.dependencies
            .get(subscriber)
            .map(IndexSet::len)
            .unwrap_or(0)
    }

    /// Number of keys with at least one subscriber.
    pub fn key_count(&self) -> usize {
        self.dependents.len()
    }

    pub fn clear(&mut self) {
        self.dependents.clear();
        self.dependencies.clear();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{EffectId, Ledger};

    fn object() -> ObjectId {
        Ledger::new().allocate()
    }

    #[test]
    fn add_and_clear_edges() {
        let mut graph: DependencyGraph = DependencyGraph::new();
        let obj = object();
        let effect = Subscriber::Effect(EffectId::new());

        assert!(graph.add(Key::field(obj, "a"), effect.clone(), ()));
        assert!(graph.add(Key::field(obj, "b"), effect.clone(), ()));
        assert!(!graph.add(Key::field(obj, "a"), effect.clone(), ()));

        assert_eq!(graph.dependency_count(&effect), 2);
        assert_eq!(graph.dependents(&Key::field(obj, "a")).len(), 1);

        assert_eq!(graph.clear_subscriber(&effect), 2);
        assert_eq!(graph.dependency_count(&effect), 0);
        assert!(graph.dependents(&Key::field(obj, "a")).is_empty());
        assert_eq!(graph.key_count(), 0);
    }

    #[test]
    fn dependents_keep_read_order() {
        let mut graph: DependencyGraph = DependencyGraph::new();
        let obj = object();
        let first = Subscriber::Effect(EffectId::new());
        let second = Subscriber::Effect(EffectId::new());

        graph.add(Key::shape(obj), second.clone(), ());
        graph.add(Key::shape(obj), first.clone(), ());

        let subs: Vec<_> = graph
            .dependents(&Key::shape(obj))
            .into_iter()
            .map(|(s, _)| s)
            .collect();
        assert_eq!(subs, vec![second, first]);
    }

    #[test]
    fn clearing_one_subscriber_leaves_others() {
        let mut graph: DependencyGraph = DependencyGraph::new();
        let obj = object();
        let a = Subscriber::Effect(EffectId::new());
        let b = Subscriber::Effect(EffectId::new());

        graph.add(Key::field(obj, "x"), a.clone(), ());
        graph.add(Key::field(obj, "x"), b.clone(), ());
        graph.clear_subscriber(&a);

        let subs = graph.dependents(&Key::field(obj, "x"));
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].0, b);
    }
}
