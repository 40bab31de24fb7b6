//! Lazy traversals over nodes and edges.
//!
//! Every iterator keeps its own explicit stack or queue, so traversals never
//! recurse and deep trees cannot overflow the call stack. Each call starts a
//! fresh traversal; iterators borrow the tree immutably and share no state.
//! Filtering is done with ordinary iterator adapters, which keeps the
//! relative order of the unfiltered sequence:
//!
//! ```
//! # use phylo_splits::tree::Tree;
//! # use phylo_splits::node::NodeData;
//! let mut tree = Tree::default();
//! let seed = tree.seed_node();
//! let inner = tree.new_child(seed, NodeData::default());
//! tree.new_child(inner, NodeData::labelled("x"));
//! let labelled: Vec<_> = tree
//!     .preorder_node_iter()
//!     .filter(|&n| tree[n].label().is_some())
//!     .collect();
//! assert_eq!(labelled.len(), 1);
//! ```

use crate::node::{EdgeId, NodeId};
use crate::tree::Tree;
use std::collections::VecDeque;

/// Preorder traversal (parents before children, children left to right).
pub struct PreorderIter<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for PreorderIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Rightmost child first so the leftmost is popped next
        self.stack.extend(self.tree[node].children().iter().rev());
        Some(node)
    }
}

/// Postorder traversal (children left to right, then the parent).
pub struct PostorderIter<'a> {
    tree: &'a Tree,
    stack: Vec<(NodeId, bool)>, // (node, children_visited)
}

impl<'a> Iterator for PostorderIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        while let Some((node, children_visited)) = self.stack.pop() {
            let children = tree[node].children();
            if children_visited || children.is_empty() {
                return Some(node);
            }
            self.stack.push((node, true));
            self.stack.extend(children.iter().rev().map(|&c| (c, false)));
        }
        None
    }
}

/// Breadth-first traversal, one level at a time.
pub struct LevelOrderIter<'a> {
    tree: &'a Tree,
    queue: VecDeque<NodeId>,
}

impl<'a> Iterator for LevelOrderIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(self.tree[node].children());
        Some(node)
    }
}

/// Leaves in postorder.
pub struct LeafIter<'a> {
    inner: PostorderIter<'a>,
}

impl<'a> Iterator for LeafIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.inner.tree;
        self.inner.by_ref().find(|&n| tree[n].is_leaf())
    }
}

/// Walk from a node towards the top of its tree.
pub struct AncestorIter<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl<'a> Iterator for AncestorIter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = self.tree[node].parent();
        Some(node)
    }
}

impl Tree {
    pub fn preorder_node_iter(&self) -> PreorderIter<'_> {
        self.preorder_from(self.seed)
    }

    /// Preorder over the subtree rooted at `start`.
    pub fn preorder_from(&self, start: NodeId) -> PreorderIter<'_> {
        PreorderIter { tree: self, stack: vec![start] }
    }

    pub fn postorder_node_iter(&self) -> PostorderIter<'_> {
        self.postorder_from(self.seed)
    }

    /// Postorder over the subtree rooted at `start`.
    pub fn postorder_from(&self, start: NodeId) -> PostorderIter<'_> {
        PostorderIter { tree: self, stack: vec![(start, false)] }
    }

    pub fn level_order_node_iter(&self) -> LevelOrderIter<'_> {
        self.level_order_from(self.seed)
    }

    pub fn level_order_from(&self, start: NodeId) -> LevelOrderIter<'_> {
        LevelOrderIter { tree: self, queue: VecDeque::from([start]) }
    }

    pub fn leaf_iter(&self) -> LeafIter<'_> {
        self.leaf_iter_from(self.seed)
    }

    pub fn leaf_iter_from(&self, start: NodeId) -> LeafIter<'_> {
        LeafIter { inner: self.postorder_from(start) }
    }

    /// Ancestors of `node`, nearest first; `inclusive` starts at `node` itself.
    pub fn ancestor_iter(&self, node: NodeId, inclusive: bool) -> AncestorIter<'_> {
        let next = if inclusive { Some(node) } else { self[node].parent() };
        AncestorIter { tree: self, next }
    }

    /// Edges subtending the nodes of [`Tree::preorder_node_iter`].
    pub fn preorder_edge_iter(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.preorder_node_iter().map(|n| self[n].edge())
    }

    pub fn postorder_edge_iter(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.postorder_node_iter().map(|n| self[n].edge())
    }

    pub fn level_order_edge_iter(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.level_order_node_iter().map(|n| self[n].edge())
    }
}
