//! Host tree abstraction.
//!
//! The reconciler only needs a handful of node operations: make a comment
//! marker or a fragment, insert before a reference sibling, detach, and walk
//! parent, child and sibling links. Anything that can do those can host structural bindings.

use std::fmt;

/// Handle to a node in a host tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Node operations the reconciler performs.
///
/// Methods take `&self`; implementations use interior mutability so
/// templates and the reconciler can share one host.
pub trait Host {
    /// Create a detached comment node (used as a range marker).
    fn create_comment(&self, text: &str) -> NodeId;

    /// Create a detached fragment: a parentless holder for nodes that have
    /// no place in the tree yet. It never renders on its own.
    fn create_fragment(&self) -> NodeId;

    fn is_fragment(&self, node: NodeId) -> bool;

    /// Insert `node` under `parent` before `reference`, or at the end when
    /// `reference` is `None`. An attached node is moved.
    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>);

    /// Detach `node` from its parent. Detached nodes stay valid and may be
    /// inserted again.
    fn remove(&self, node: NodeId);

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn first_child(&self, node: NodeId) -> Option<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
}
