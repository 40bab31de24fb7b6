//! Arena records for nodes and edges.
//!
//! Nodes and edges live in the owning [`Tree`](crate::tree::Tree) and refer to
//! each other through [`NodeId`] / [`EdgeId`] handles instead of references.
//! A node exclusively owns one edge (the edge subtending it), so for every
//! node `n`: `edge(n.edge()).head() == n`.

use crate::bitset::Bitset;
use crate::taxon::TaxonId;
use std::fmt;

/// Index of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of an edge in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node of a tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) edge: EdgeId,
    pub(crate) taxon: Option<TaxonId>,
    pub(crate) label: Option<String>,
}

impl Node {
    pub(crate) fn new(edge: EdgeId, taxon: Option<TaxonId>, label: Option<String>) -> Self {
        Node {
            children: Vec::new(),
            parent: None,
            edge,
            taxon,
            label,
        }
    }

    /// Children in order. Borrowed view; see [`Node::child_nodes`] for a snapshot.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Owned copy of the child list. Changing it does not touch the tree.
    pub fn child_nodes(&self) -> Vec<NodeId> {
        self.children.clone()
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The edge subtending this node.
    pub fn edge(&self) -> EdgeId {
        self.edge
    }

    pub fn taxon(&self) -> Option<TaxonId> {
        self.taxon
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_taxon(&mut self, taxon: Option<TaxonId>) {
        self.taxon = taxon;
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    /// Returns true if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns true if the node has children.
    pub fn is_internal(&self) -> bool {
        !self.children.is_empty()
    }
}

/// An edge from `tail` (parent side) to `head` (child side).
#[derive(Debug, Clone)]
pub struct Edge {
    pub(crate) head: NodeId,
    pub(crate) tail: Option<NodeId>,
    pub(crate) length: Option<f64>,
    pub(crate) split_bitmask: Option<Bitset>,
    pub(crate) label: Option<String>,
}

impl Edge {
    pub(crate) fn new(head: NodeId, length: Option<f64>) -> Self {
        Edge {
            head,
            tail: None,
            length,
            split_bitmask: None,
            label: None,
        }
    }

    /// The node this edge subtends.
    pub fn head(&self) -> NodeId {
        self.head
    }

    /// The parent side; `None` for the seed edge and detached nodes.
    pub fn tail(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn length(&self) -> Option<f64> {
        self.length
    }

    /// Split bitmask, present only after encoding.
    pub fn split_bitmask(&self) -> Option<&Bitset> {
        self.split_bitmask.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }
}

/// Attributes for a node about to be created.
#[derive(Debug, Clone, Default)]
pub struct NodeData {
    pub taxon: Option<TaxonId>,
    pub label: Option<String>,
    pub edge_length: Option<f64>,
}

impl NodeData {
    /// Node carrying `taxon`, typically a leaf.
    pub fn taxon(taxon: TaxonId) -> Self {
        NodeData { taxon: Some(taxon), ..Default::default() }
    }

    /// Node carrying a label but no taxon.
    pub fn labelled(label: impl Into<String>) -> Self {
        NodeData { label: Some(label.into()), ..Default::default() }
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.edge_length = Some(length);
        self
    }
}
