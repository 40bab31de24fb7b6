//! Attaching and detaching children.
//!
//! Public edits discard split bitmasks (see [`Tree::clear_splits`]) since
//! they change which taxa sit below an edge. The rerooting engine uses the
//! crate-private `attach`/`detach` primitives and keeps the registry itself.

use crate::error::{PhyloError, Result};
use crate::node::{EdgeId, NodeId};
use crate::tree::Tree;

/// One structural change made by [`Tree::reversible_remove_child`].
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalRecord {
    /// Node taken out of the tree.
    pub node: NodeId,
    /// Its parent before removal.
    pub parent: NodeId,
    /// Its index in the parent's child list before removal.
    pub position: usize,
    /// Children moved off `node` while suppressing a degree-two node.
    pub stolen: Vec<NodeId>,
    /// Edge whose length absorbed the length of `node`'s edge.
    pub lengthened: Option<EdgeId>,
}

/// Undo log, in the order the changes were made.
pub type RemovalLog = Vec<RemovalRecord>;

impl Tree {
    /// Attaches `child` to `parent`, at the end or at `position`.
    ///
    /// A given `edge_length` overwrites the child's edge length. The caller
    /// must make sure `child` is not linked anywhere else.
    ///
    /// # Panics
    /// Panics if either node was not issued by this tree.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        edge_length: Option<f64>,
        position: Option<usize>,
    ) -> NodeId {
        self.attach(parent, child, edge_length, position);
        self.discard_splits();
        child
    }

    /// Detaches `child` from `parent`.
    ///
    /// With `suppress_degree_two`, a parent left with a single child is
    /// spliced out, and a seed node left with two children where one is
    /// internal has that child collapsed into it. Lengths of removed edges
    /// are added to the edges taking their place; a missing length on
    /// either side leaves the receiving edge untouched.
    pub fn remove_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        suppress_degree_two: bool,
    ) -> Result<NodeId> {
        self.reversible_remove_child(parent, child, suppress_degree_two)?;
        Ok(child)
    }

    /// Same as [`Tree::remove_child`], returning a log that
    /// [`Tree::reinsert_nodes`] uses to restore the previous structure.
    ///
    /// Fails with [`PhyloError::NotAChild`] and leaves the tree unchanged if
    /// `child` is not currently a child of `parent`.
    pub fn reversible_remove_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        suppress_degree_two: bool,
    ) -> Result<RemovalLog> {
        self.check_node(parent)?;
        self.check_node(child)?;
        let position = self.detach(parent, child)?;
        let mut log = vec![RemovalRecord {
            node: child,
            parent,
            position,
            stolen: Vec::new(),
            lengthened: None,
        }];

        if suppress_degree_two {
            let record = match self[parent].parent {
                Some(grandparent) => self.splice_out(grandparent, parent)?,
                None => self.collapse_into_seed(parent)?,
            };
            log.extend(record);
        }
        self.discard_splits();
        Ok(log)
    }

    /// Undoes a [`RemovalLog`], most recent change first.
    pub fn reinsert_nodes(&mut self, log: &[RemovalRecord]) -> Result<()> {
        for record in log.iter().rev() {
            for &stolen in &record.stolen {
                if let Some(current) = self[stolen].parent {
                    self.detach(current, stolen)?;
                }
                self.attach(record.node, stolen, None, None);
            }
            self.attach(record.parent, record.node, None, Some(record.position));
            if let Some(edge) = record.lengthened {
                let removed = self.edge_length(record.node);
                if let (Some(len), Some(removed)) = (self[edge].length, removed) {
                    self[edge].length = Some(len - removed);
                }
            }
        }
        self.discard_splits();
        Ok(())
    }

    /// Removes `node` (left with one child) from under `grandparent`,
    /// putting its only child in its place.
    fn splice_out(&mut self, grandparent: NodeId, node: NodeId) -> Result<Option<RemovalRecord>> {
        let [only] = self[node].children[..] else {
            return Ok(None);
        };
        let position = self.position_in(grandparent, node)?;
        self.attach(grandparent, only, None, Some(position));
        self[node].children.clear();
        self.detach(grandparent, node)?;
        let extra = self.edge_length(node);
        let lengthened = self.absorb_length(self[only].edge, extra);
        Ok(Some(RemovalRecord {
            node,
            parent: grandparent,
            position,
            stolen: vec![only],
            lengthened,
        }))
    }

    /// Collapses the internal child of a two-child seed node into the seed,
    /// adding its edge length to the other child.
    fn collapse_into_seed(&mut self, seed: NodeId) -> Result<Option<RemovalRecord>> {
        let [first, second] = self[seed].children[..] else {
            return Ok(None);
        };
        let (collapse, keep) = if self[first].is_internal() {
            (first, second)
        } else if self[second].is_internal() {
            (second, first)
        } else {
            return Ok(None);
        };
        let extra = self.edge_length(collapse);
        let lengthened = self.absorb_length(self[keep].edge, extra);
        let position = self.detach(seed, collapse)?;
        let stolen = std::mem::take(&mut self[collapse].children);
        for (offset, &grandchild) in stolen.iter().enumerate() {
            self.attach(seed, grandchild, None, Some(position + offset));
        }
        Ok(Some(RemovalRecord {
            node: collapse,
            parent: seed,
            position,
            stolen,
            lengthened,
        }))
    }

    /// Links `child` under `parent` without touching split data.
    pub(crate) fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        edge_length: Option<f64>,
        position: Option<usize>,
    ) {
        let edge = self[child].edge;
        self[child].parent = Some(parent);
        self[edge].tail = Some(parent);
        if edge_length.is_some() {
            self[edge].length = edge_length;
        }
        let children = &mut self[parent].children;
        match position {
            Some(pos) if pos <= children.len() => children.insert(pos, child),
            _ => children.push(child),
        }
    }

    /// Unlinks `child` from `parent`, returning its former position.
    pub(crate) fn detach(&mut self, parent: NodeId, child: NodeId) -> Result<usize> {
        let position = self.position_in(parent, child)?;
        self[parent].children.remove(position);
        let edge = self[child].edge;
        self[child].parent = None;
        self[edge].tail = None;
        Ok(position)
    }

    fn position_in(&self, parent: NodeId, child: NodeId) -> Result<usize> {
        self[parent]
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(PhyloError::NotAChild { parent, child })
    }

    /// Adds `extra` to the length of `edge` when both are known.
    /// Returns the edge if its length changed.
    pub(crate) fn absorb_length(&mut self, edge: EdgeId, extra: Option<f64>) -> Option<EdgeId> {
        match (self[edge].length, extra) {
            (Some(len), Some(extra)) => {
                self[edge].length = Some(len + extra);
                Some(edge)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::node::NodeData;
    use crate::tree::Tree;
    use crate::tree::tests::{balanced_tree, leaf};

    fn parent_map(tree: &Tree) -> Vec<(usize, Option<usize>, Vec<usize>, Option<f64>)> {
        tree.nodes()
            .into_iter()
            .map(|n| {
                (
                    n.0,
                    tree[n].parent().map(|p| p.0),
                    tree[n].children().iter().map(|c| c.0).collect(),
                    tree.edge_length(n),
                )
            })
            .collect()
    }

    /// (A:1,B:2,C:3)
    fn trifurcation() -> Tree {
        let mut tree = Tree::default();
        let seed = tree.seed_node();
        for (label, len) in [("A", 1.0), ("B", 2.0), ("C", 3.0)] {
            let t = tree.require_taxon(label);
            tree.new_child(seed, NodeData::taxon(t).with_length(len));
        }
        tree
    }

    #[test]
    fn test_add_child_at_position() {
        let mut tree = trifurcation();
        let seed = tree.seed_node();
        let d = tree.new_node(NodeData::labelled("D"));
        tree.add_child(seed, d, Some(0.25), Some(1));
        assert_eq!(tree[seed].children()[1], d);
        assert_eq!(tree[d].parent(), Some(seed));
        assert_eq!(tree.edge_of(d).tail(), Some(seed));
        assert_eq!(tree.edge_length(d), Some(0.25));
    }

    #[test]
    fn test_remove_missing_child_fails() {
        let mut tree = balanced_tree();
        let before = parent_map(&tree);
        let seed = tree.seed_node();
        let a = leaf(&tree, "A");

        let err = tree.remove_child(seed, a, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(parent_map(&tree), before);
    }

    #[test]
    fn test_remove_suppresses_unifurcation() {
        // ((A:1,B:2)ab:0.5,(C:3,D:4)cd:1.5) minus A -> (B:2.5,(C,D))
        let mut tree = balanced_tree();
        let a = leaf(&tree, "A");
        let b = leaf(&tree, "B");
        let ab = tree[a].parent().unwrap();
        let seed = tree.seed_node();

        tree.remove_child(ab, a, true).unwrap();
        assert_eq!(tree[seed].children()[0], b);
        assert_eq!(tree[b].parent(), Some(seed));
        assert_eq!(tree.edge_length(b), Some(2.5));
        assert!(!tree.contains(ab));
        assert!(!tree.contains(a));
    }

    #[test]
    fn test_missing_length_propagates() {
        let mut tree = balanced_tree();
        let a = leaf(&tree, "A");
        let b = leaf(&tree, "B");
        let ab = tree[a].parent().unwrap();
        tree.set_edge_length(tree[ab].edge(), None);

        tree.remove_child(ab, a, true).unwrap();
        assert_eq!(tree.edge_length(b), Some(2.0));

        let mut tree = balanced_tree();
        let a = leaf(&tree, "A");
        let b = leaf(&tree, "B");
        let ab = tree[a].parent().unwrap();
        tree.set_edge_length(tree[b].edge(), None);
        tree.remove_child(ab, a, true).unwrap();
        assert_eq!(tree.edge_length(b), None);
    }

    #[test]
    fn test_reversible_remove_at_seed() {
        let mut tree = trifurcation();
        let before = parent_map(&tree);
        let seed = tree.seed_node();
        let b = tree[seed].children()[1];

        let log = tree.reversible_remove_child(seed, b, true).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(tree[seed].num_children(), 2);

        tree.reinsert_nodes(&log).unwrap();
        assert_eq!(parent_map(&tree), before);
    }

    #[test]
    fn test_reversible_remove_collapses_seed_child() {
        // (A:1,(B:2,C:3)bc:0.5,D:4) minus D -> (A:1.5,B:2,C:3)
        let mut tree = Tree::default();
        let seed = tree.seed_node();
        let ta = tree.require_taxon("A");
        let a = tree.new_child(seed, NodeData::taxon(ta).with_length(1.0));
        let bc = tree.new_child(seed, NodeData::labelled("bc").with_length(0.5));
        for (label, len) in [("B", 2.0), ("C", 3.0)] {
            let t = tree.require_taxon(label);
            tree.new_child(bc, NodeData::taxon(t).with_length(len));
        }
        let td = tree.require_taxon("D");
        let d = tree.new_child(seed, NodeData::taxon(td).with_length(4.0));
        let before = parent_map(&tree);

        let log = tree.reversible_remove_child(seed, d, true).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].node, bc);
        assert_eq!(log[1].lengthened, Some(tree[a].edge()));
        assert_eq!(tree[seed].num_children(), 3);
        assert_eq!(tree.edge_length(a), Some(1.5));

        tree.reinsert_nodes(&log).unwrap();
        assert_eq!(parent_map(&tree), before);
    }

    #[test]
    fn test_child_nodes_is_snapshot() {
        let tree = trifurcation();
        let seed = tree.seed_node();
        let mut snapshot = tree[seed].child_nodes();
        snapshot.clear();
        assert_eq!(tree[seed].num_children(), 3);
    }
}
