//! In-memory host tree.
//!
//! An arena of element, text and comment nodes with operation counters, used
//! by tests and benchmarks to observe exactly how many inserts, moves and
//! removals a reconciliation performed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::warn;

use super::host::{Host, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(String),
    Text(String),
    Comment(String),
    Fragment,
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Host operation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomStats {
    /// Detached nodes inserted into a parent.
    pub inserts: usize,
    /// Attached nodes re-inserted at another position.
    pub moves: usize,
    pub removes: usize,
}

impl DomStats {
    pub fn total(&self) -> usize {
        self.inserts + self.moves + self.removes
    }
}

pub struct MemoryDom {
    nodes: RefCell<Vec<NodeData>>,
    stats: Cell<DomStats>,
    root: NodeId,
}

impl MemoryDom {
    /// Create a tree with a single `root` element.
    pub fn new() -> Rc<Self> {
        let root = NodeData {
            kind: NodeKind::Element("root".to_string()),
            parent: None,
            children: Vec::new(),
        };
        Rc::new(Self {
            nodes: RefCell::new(vec![root]),
            stats: Cell::new(DomStats::default()),
            root: NodeId(0),
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn create_element(&self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(tag.to_string()))
    }

    pub fn create_text(&self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    /// Replace the content of a text or comment node.
    pub fn set_text(&self, node: NodeId, text: &str) {
        let mut nodes = self.nodes.borrow_mut();
        match nodes.get_mut(node.0 as usize).map(|n| &mut n.kind) {
            Some(NodeKind::Text(content)) | Some(NodeKind::Comment(content)) => {
                *content = text.to_string();
            }
            _ => warn!(%node, "set_text on a node without text"),
        }
    }

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.borrow().get(node.0 as usize).map(|n| n.kind.clone())
    }

    /// Element children only, skipping comment markers and text.
    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .into_iter()
            .filter(|c| matches!(self.kind(*c), Some(NodeKind::Element(_))))
            .collect()
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            Some(NodeKind::Text(text)) => out.push_str(&text),
            Some(NodeKind::Element(_)) | Some(NodeKind::Fragment) => {
                for child in self.children(node) {
                    self.collect_text(child, out);
                }
            }
            _ => {}
        }
    }

    /// Serialize the subtree as markup, comments included.
    pub fn render(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.render_into(node, &mut out);
        out
    }

    fn render_into(&self, node: NodeId, out: &mut String) {
        match self.kind(node) {
            Some(NodeKind::Element(tag)) => {
                out.push_str(&format!("<{tag}>"));
                for child in self.children(node) {
                    self.render_into(child, out);
                }
                out.push_str(&format!("</{tag}>"));
            }
            Some(NodeKind::Text(text)) => out.push_str(&text),
            Some(NodeKind::Comment(text)) => out.push_str(&format!("<!--{text}-->")),
            Some(NodeKind::Fragment) => {
                for child in self.children(node) {
                    self.render_into(child, out);
                }
            }
            None => {}
        }
    }

    pub fn stats(&self) -> DomStats {
        self.stats.get()
    }

    pub fn reset_stats(&self) {
        self.stats.set(DomStats::default());
    }

    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    fn alloc(&self, kind: NodeKind) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(nodes.len() as u32);
        nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn bump(&self, f: impl FnOnce(&mut DomStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    /// Unlink `node`, returning its former parent.
    fn detach(nodes: &mut [NodeData], node: NodeId) -> Option<NodeId> {
        let parent = nodes[node.0 as usize].parent.take()?;
        nodes[parent.0 as usize].children.retain(|c| *c != node);
        Some(parent)
    }
}

impl Host for MemoryDom {
    fn create_comment(&self, text: &str) -> NodeId {
        self.alloc(NodeKind::Comment(text.to_string()))
    }

    fn create_fragment(&self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    fn is_fragment(&self, node: NodeId) -> bool {
        matches!(
            self.nodes.borrow().get(node.0 as usize).map(|n| &n.kind),
            Some(NodeKind::Fragment)
        )
    }

    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        let mut nodes = self.nodes.borrow_mut();
        let len = nodes.len();
        if parent.0 as usize >= len || node.0 as usize >= len || parent == node {
            warn!(%parent, %node, "insert_before with an invalid node");
            return;
        }

        // Leaving a fragment counts as an insert, not a move.
        let was_attached = Self::detach(&mut nodes, node)
            .is_some_and(|p| nodes[p.0 as usize].kind != NodeKind::Fragment);
        let siblings = &mut nodes[parent.0 as usize].children;
        let position = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(position, node);
        nodes[node.0 as usize].parent = Some(parent);
        drop(nodes);

        self.bump(|s| {
            if was_attached {
                s.moves += 1;
            } else {
                s.inserts += 1;
            }
        });
    }

    fn remove(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if node.0 as usize >= nodes.len() {
            return;
        }
        if Self::detach(&mut nodes, node).is_some() {
            drop(nodes);
            self.bump(|s| s.removes += 1);
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node.0 as usize).and_then(|n| n.parent)
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes
            .borrow()
            .get(node.0 as usize)
            .and_then(|n| n.children.first().copied())
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let nodes = self.nodes.borrow();
        let parent = nodes.get(node.0 as usize)?.parent?;
        let siblings = &nodes[parent.0 as usize].children;
        let position = siblings.iter().position(|c| *c == node)?;
        siblings.get(position + 1).copied()
    }
}
