//! The tree container.
//!
//! A [`Tree`] owns an arena of [`Node`]s and [`Edge`]s plus a seed node, the
//! entry point of the structure. The seed node is not necessarily the
//! biological root: `is_rooted` only says how the structure is to be read.
//!
//! # Structure
//! - Every node owns exactly one edge, created together with the node.
//! - Parent/child and head/tail links are stored as [`NodeId`]s.
//! - Detached nodes stay in the arena but are unreachable from the seed node.
//! - The split registry (`split_edges`) is only present while every edge
//!   bitmask reflects the current topology. Structural edits drop it.
//!
//! # Cloning
//! `Clone` deep-copies the node/edge arena but shares the taxon namespace:
//! taxa are immutable and identified by their namespace, so both copies keep
//! comparing against the same bit positions. Handles stay valid in the copy.

use crate::bitset::Bitset;
use crate::error::{PhyloError, Result};
use crate::newick::{self, NewickOptions};
use crate::node::{Edge, EdgeId, Node, NodeData, NodeId};
use crate::taxon::{NamespaceRef, TaxonId, TaxonNamespace};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A phylogenetic tree over a shared [`TaxonNamespace`].
#[derive(Debug, Clone)]
pub struct Tree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) seed: NodeId,
    pub(crate) namespace: NamespaceRef,
    pub(crate) is_rooted: bool,
    /// Split bitmask → edge, present only while bitmasks are current
    pub(crate) split_edges: Option<HashMap<Bitset, EdgeId>>,
    pub(crate) label: Option<String>,
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new(TaxonNamespace::new().into_shared())
    }
}

// ============================================================================
// Construction, accessors
// ============================================================================
impl Tree {
    /// Creates a minimal tree: a seed node with its own, unattached edge.
    pub fn new(namespace: NamespaceRef) -> Self {
        let mut tree = Tree {
            nodes: Vec::new(),
            edges: Vec::new(),
            seed: NodeId(0),
            namespace,
            is_rooted: false,
            split_edges: None,
            label: None,
        };
        tree.seed = tree.new_node(NodeData::default());
        tree
    }

    /// Attaches a label to this tree.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn namespace(&self) -> &NamespaceRef {
        &self.namespace
    }

    /// Returns whether `other` refers to the very same namespace.
    pub fn shares_namespace(&self, other: &Tree) -> bool {
        Rc::ptr_eq(&self.namespace, &other.namespace)
    }

    /// Convenience: `require_taxon` on the tree's namespace.
    pub fn require_taxon(&self, label: &str) -> TaxonId {
        self.namespace.borrow_mut().require_taxon(label)
    }

    pub fn seed_node(&self) -> NodeId {
        self.seed
    }

    pub fn is_rooted(&self) -> bool {
        self.is_rooted
    }

    pub fn is_unrooted(&self) -> bool {
        !self.is_rooted
    }

    /// Changes how the tree is interpreted. The stored structure is untouched.
    pub fn set_rooted(&mut self, rooted: bool) {
        self.is_rooted = rooted;
    }

    /// Returns the node for `id`, or `None` if this tree never issued it.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0)
    }

    /// The edge subtending `node`.
    ///
    /// # Panics
    /// Panics if `node` was not issued by this tree.
    pub fn edge_of(&self, node: NodeId) -> &Edge {
        &self[self[node].edge]
    }

    pub fn edge_length(&self, node: NodeId) -> Option<f64> {
        self.edge_of(node).length
    }

    pub fn set_edge_length(&mut self, edge: EdgeId, length: Option<f64>) {
        self[edge].length = length;
    }

    /// Creates a detached node together with the edge it owns.
    pub fn new_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        let edge = EdgeId(self.edges.len());
        self.edges.push(Edge::new(id, data.edge_length));
        self.nodes.push(Node::new(edge, data.taxon, data.label));
        id
    }

    /// Creates a node and appends it to the children of `parent`.
    pub fn new_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let child = self.new_node(data);
        self.add_child(parent, child, None, None)
    }

    /// Number of nodes reachable from the seed node.
    pub fn num_nodes(&self) -> usize {
        self.preorder_node_iter().count()
    }

    /// Returns an error unless `id` was issued by this tree.
    pub(crate) fn check_node(&self, id: NodeId) -> Result<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(PhyloError::NotInTree(id))
        }
    }

    /// Returns whether `node` can be reached from the seed node.
    pub fn contains(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
            && self.ancestor_iter(node, true).last() == Some(self.seed)
    }
}

impl std::ops::Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index.0]
    }
}

impl std::ops::IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self.nodes[index.0]
    }
}

impl std::ops::Index<EdgeId> for Tree {
    type Output = Edge;

    fn index(&self, index: EdgeId) -> &Self::Output {
        &self.edges[index.0]
    }
}

impl std::ops::IndexMut<EdgeId> for Tree {
    fn index_mut(&mut self, index: EdgeId) -> &mut Self::Output {
        &mut self.edges[index.0]
    }
}

// ============================================================================
// Queries
// ============================================================================
impl Tree {
    /// All nodes in preorder.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.preorder_node_iter().collect()
    }

    /// Nodes in preorder for which `filter` holds.
    pub fn nodes_matching(&self, mut filter: impl FnMut(&Node) -> bool) -> Vec<NodeId> {
        self.preorder_node_iter().filter(|&n| filter(&self[n])).collect()
    }

    /// Leaves in postorder.
    pub fn leaf_nodes(&self) -> Vec<NodeId> {
        self.leaf_iter().collect()
    }

    /// Internal nodes in preorder.
    pub fn internal_nodes(&self) -> Vec<NodeId> {
        self.nodes_matching(Node::is_internal)
    }

    /// Edges in preorder of their head nodes.
    pub fn edges(&self) -> Vec<EdgeId> {
        self.preorder_edge_iter().collect()
    }

    /// First node (preorder) carrying `taxon`.
    pub fn find_node_for_taxon(&self, taxon: TaxonId) -> Option<NodeId> {
        self.find_node(|n| n.taxon == Some(taxon))
    }

    /// First node (preorder) for which `filter` holds.
    pub fn find_node(&self, mut filter: impl FnMut(&Node) -> bool) -> Option<NodeId> {
        self.preorder_node_iter().find(|&n| filter(&self[n]))
    }

    /// First node whose taxon is the namespace's taxon labelled `label`.
    pub fn find_node_with_taxon_label(&self, label: &str) -> Option<NodeId> {
        let taxon = self.namespace.borrow().get_taxon(label)?;
        self.find_node_for_taxon(taxon)
    }

    /// First edge (preorder) for which `filter` holds.
    pub fn find_edge(&self, mut filter: impl FnMut(&Edge) -> bool) -> Option<EdgeId> {
        self.preorder_edge_iter().find(|&e| filter(&self[e]))
    }

    /// Taxa present on the tree, in postorder, without repeats.
    pub fn infer_taxa(&self) -> Vec<TaxonId> {
        let mut seen = HashSet::new();
        self.postorder_node_iter()
            .filter_map(|n| self[n].taxon)
            .filter(|t| seen.insert(*t))
            .collect()
    }

    /// Edges sharing a node with `node`: its own edge and its children's edges.
    pub fn incident_edges(&self, node: NodeId) -> Vec<EdgeId> {
        let mut edges: Vec<EdgeId> = self[node].children.iter().map(|&c| self[c].edge).collect();
        edges.push(self[node].edge);
        edges
    }

    /// Children followed by the parent, if any.
    pub fn adjacent_nodes(&self, node: NodeId) -> Vec<NodeId> {
        let mut nodes = self[node].child_nodes();
        nodes.extend(self[node].parent);
        nodes
    }

    /// Edges that share the head or the tail node of `edge`.
    pub fn adjacent_edges(&self, edge: EdgeId) -> Vec<EdgeId> {
        let e = &self[edge];
        let mut adjacent: Vec<EdgeId> = self
            .incident_edges(e.head)
            .into_iter()
            .filter(|&x| x != edge)
            .collect();
        if let Some(tail) = e.tail {
            adjacent.extend(self.incident_edges(tail).into_iter().filter(|&x| x != edge));
        }
        adjacent
    }

    /// True if the head of `edge` is a leaf.
    pub fn is_terminal_edge(&self, edge: EdgeId) -> bool {
        self[self[edge].head].is_leaf()
    }

    /// True if the head of `edge` has children.
    pub fn is_internal_edge(&self, edge: EdgeId) -> bool {
        self[self[edge].head].is_internal()
    }

    /// Number of ancestors of `node`.
    pub fn level(&self, node: NodeId) -> usize {
        self.ancestor_iter(node, false).count()
    }

    /// Sum of edge lengths from `node` up to its topmost ancestor,
    /// including the edge of that ancestor. Missing lengths count as zero.
    pub fn distance_from_root(&self, node: NodeId) -> f64 {
        self.ancestor_iter(node, true)
            .filter_map(|n| self.edge_length(n))
            .sum()
    }

    /// Longest path from `node` down to a leaf. Missing lengths count as zero.
    pub fn distance_from_tip(&self, node: NodeId) -> f64 {
        let mut below: HashMap<NodeId, f64> = HashMap::new();
        for n in self.postorder_from(node) {
            let dist = self[n]
                .children
                .iter()
                .map(|&c| below[&c] + self.edge_length(c).unwrap_or(0.0))
                .fold(0.0, f64::max);
            below.insert(n, dist);
        }
        below[&node]
    }

    /// Leaves below `node` (or `node` itself when it is a leaf), in postorder.
    pub fn leaf_nodes_under(&self, node: NodeId) -> Vec<NodeId> {
        self.leaf_iter_from(node).collect()
    }

    /// Most recent common ancestor of `a` and `b`, if they share a tree.
    pub fn mrca(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let ancestors_a: HashSet<NodeId> = self.ancestor_iter(a, true).collect();
        self.ancestor_iter(b, true).find(|n| ancestors_a.contains(n))
    }

    /// Sum of all edge lengths reachable from the seed node.
    /// Missing lengths count as zero.
    pub fn length(&self) -> f64 {
        self.postorder_edge_iter()
            .filter_map(|e| self[e].length)
            .sum()
    }

    /// Newick representation, delegated to [`newick::to_newick`].
    pub fn as_newick_string(&self, options: &NewickOptions<'_>) -> String {
        newick::to_newick(self, options)
    }
}

// ============================================================================
// Topology edits at the seed
// ============================================================================
impl Tree {
    /// Converts a bifurcation at the seed node into a trifurcation.
    ///
    /// Only acts when the seed has exactly two children and exactly one of
    /// them is internal (has at least two children). The internal child is
    /// collapsed into the seed and its edge length is added to its sibling's.
    /// Returns whether anything changed.
    pub fn deroot(&mut self) -> bool {
        let children = self[self.seed].child_nodes();
        let [first, second] = children[..] else {
            return false;
        };
        let is_internal = |n: NodeId| self[n].children.len() >= 2;
        let (keep, collapse) = match (is_internal(first), is_internal(second)) {
            (false, true) => (first, second),
            (true, false) => (second, first),
            _ => return false,
        };
        let extra = self.edge_length(collapse);
        self.absorb_length(self[keep].edge, extra);
        let edge = self[collapse].edge;
        self.collapse_edge(edge)
    }

    /// Removes the head node of `edge`, moving its children onto the tail
    /// node at the head's position.
    ///
    /// Does nothing for terminal edges and edges without a tail node.
    /// Returns whether the edge was collapsed.
    pub fn collapse_edge(&mut self, edge: EdgeId) -> bool {
        let head = self[edge].head;
        let Some(tail) = self[edge].tail else {
            return false;
        };
        if self[head].is_leaf() {
            return false;
        }
        let Ok(pos) = self.detach(tail, head) else {
            return false;
        };
        let grandchildren = std::mem::take(&mut self[head].children);
        for (offset, child) in grandchildren.into_iter().enumerate() {
            self.attach(tail, child, None, Some(pos + offset));
        }
        self.discard_splits();
        true
    }
}
