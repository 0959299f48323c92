//! Structural Reconciler
//!
//! Two structural bindings keep a host tree in step with reactive state:
//!
//! - [`bind_for`]: a keyed list. Instances are matched to the previous
//!   render by key, reused in place when possible, and reordered with the
//!   minimal number of moves (everything outside one longest increasing
//!   subsequence of reused positions).
//! - [`bind_if`]: an exclusive chain of conditional branches. Leaving a
//!   branch suspends its effects and keeps it cached; coming back resumes
//!   it with the same nodes.
//!
//! Both insert their content before an anchor node the caller places in the
//! tree, and both build templates untracked so template reads never
//! subscribe the structural binding itself.

mod branch;
mod for_each;
mod key;
mod lis;
mod scope;

use std::cell::RefCell;

use tracing::trace;

use crate::dom::{Host, NodeId};

pub use branch::{bind_if, Branch, IfBinding, IfHandle};
pub use for_each::{bind_for, ForBinding, ForHandle};
pub use key::ItemKey;
pub use lis::longest_increasing_subsequence;
pub use scope::{expression, template, Expression, Scope, Template};

/// What one list reconciliation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub reused: usize,
    pub removed: usize,
    /// Reused instances moved to a new position.
    pub moved: usize,
    /// Reused instances whose effects were re-run.
    pub refreshed: usize,
}

/// Root nodes of one instance or branch.
///
/// A returned node that sits in a fragment (the anchor of a nested binding
/// bound while detached) stands for the fragment's whole content. A template
/// producing exactly one node is placed as is. Anything else is bracketed by
/// a pair of comment markers, and the range is re-read from the tree
/// whenever it is attached, so nodes a nested binding inserted between the
/// markers travel with it.
pub(crate) struct Roots {
    nodes: RefCell<Vec<NodeId>>,
    ranged: bool,
}

impl Roots {
    pub(crate) fn new(host: &dyn Host, nodes: Vec<NodeId>, label: &str) -> Self {
        let nodes = expand_fragments(host, nodes);
        if nodes.len() == 1 {
            return Self {
                nodes: RefCell::new(nodes),
                ranged: false,
            };
        }
        let start = host.create_comment(label);
        let end = host.create_comment(&format!("/{label}"));
        let mut bracketed = Vec::with_capacity(nodes.len() + 2);
        bracketed.push(start);
        bracketed.extend(nodes);
        bracketed.push(end);
        Self {
            nodes: RefCell::new(bracketed),
            ranged: true,
        }
    }

    pub(crate) fn first(&self) -> Option<NodeId> {
        self.nodes.borrow().first().copied()
    }

    /// Current node list, refreshed from the tree for attached ranges.
    pub(crate) fn snapshot(&self, host: &dyn Host) -> Vec<NodeId> {
        let mut nodes = self.nodes.borrow_mut();
        if !self.ranged {
            return nodes.clone();
        }
        let (Some(&start), Some(&end)) = (nodes.first(), nodes.last()) else {
            return nodes.clone();
        };
        if host.parent(start).is_none() {
            return nodes.clone();
        }

        let mut walked = vec![start];
        let mut cursor = host.next_sibling(start);
        while let Some(node) = cursor {
            walked.push(node);
            if node == end {
                *nodes = walked;
                return nodes.clone();
            }
            cursor = host.next_sibling(node);
        }
        // End marker not found after start: keep the last known list.
        nodes.clone()
    }

    pub(crate) fn insert_before(&self, host: &dyn Host, parent: NodeId, reference: Option<NodeId>) {
        for node in self.snapshot(host) {
            host.insert_before(parent, node, reference);
        }
    }

    pub(crate) fn remove(&self, host: &dyn Host) {
        for node in self.snapshot(host) {
            host.remove(node);
        }
    }

    pub(crate) fn is_attached(&self, host: &dyn Host) -> bool {
        self.first().is_some_and(|n| host.parent(n).is_some())
    }
}

/// Parent that structural content is inserted into. A detached anchor is
/// first moved into a fresh fragment, so a binding made inside a template
/// renders into the fragment and its content joins the template's roots.
pub(crate) fn anchor_parent(host: &dyn Host, anchor: NodeId) -> NodeId {
    if let Some(parent) = host.parent(anchor) {
        return parent;
    }
    let fragment = host.create_fragment();
    host.insert_before(fragment, anchor, None);
    trace!(%anchor, %fragment, "detached anchor; placing content in a fragment");
    fragment
}

/// Replace each node held by a fragment with the fragment's children.
fn expand_fragments(host: &dyn Host, nodes: Vec<NodeId>) -> Vec<NodeId> {
    let mut expanded = Vec::with_capacity(nodes.len());
    let mut seen: Vec<NodeId> = Vec::new();
    for node in nodes {
        match host.parent(node) {
            Some(fragment) if host.is_fragment(fragment) => {
                if seen.contains(&fragment) {
                    continue;
                }
                seen.push(fragment);
                let mut cursor = host.first_child(fragment);
                while let Some(child) = cursor {
                    expanded.push(child);
                    cursor = host.next_sibling(child);
                }
            }
            _ => expanded.push(node),
        }
    }
    expanded
}
