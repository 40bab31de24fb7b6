//! Moving the seed node.
//!
//! Rerooting walks the path from the target up to the current seed and
//! rotates each parent/child pair from the top down: the pair swaps edges,
//! the parent becomes the last child of the former child, and that child
//! becomes the seed. The rotated edge now subtends the other side of the
//! same bipartition, so with `update_splits` its bitmask is replaced by its
//! complement within the taxa mask and its registry entry is moved.

use crate::bitset::Bitset;
use crate::error::{PhyloError, Result};
use crate::node::NodeId;
use crate::tree::Tree;

/// How [`Tree::reroot`] treats split data and the former seed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RerootOptions {
    /// Keep bitmasks and the registry current (requires encoded splits).
    /// Otherwise split data is dropped.
    pub update_splits: bool,
    /// Splice out a former seed node left with two children.
    pub suppress_degree_two: bool,
}

impl Default for RerootOptions {
    fn default() -> Self {
        RerootOptions {
            update_splits: false,
            suppress_degree_two: true,
        }
    }
}

impl Tree {
    /// Makes `target` the seed node. See [`Tree::reroot`].
    pub fn reroot_at(
        &mut self,
        target: NodeId,
        update_splits: bool,
        suppress_degree_two: bool,
    ) -> Result<()> {
        self.reroot(target, RerootOptions { update_splits, suppress_degree_two })
    }

    /// Makes `target` the seed node, keeping the unrooted topology.
    ///
    /// Fails with [`PhyloError::NotInTree`] if `target` cannot be reached from
    /// the seed node and with [`PhyloError::SplitsNotEncoded`] if
    /// `update_splits` is requested on a tree without split data. The tree is
    /// unchanged on failure. Rerooting at the seed node does nothing.
    pub fn reroot(&mut self, target: NodeId, options: RerootOptions) -> Result<()> {
        self.check_node(target)?;
        if target == self.seed {
            return Ok(());
        }
        // target, its parent, ..., the seed
        let path: Vec<NodeId> = self.ancestor_iter(target, true).collect();
        if path.last() != Some(&self.seed) {
            return Err(PhyloError::NotInTree(target));
        }
        let taxa_mask = if options.update_splits {
            Some(self.taxa_mask()?)
        } else {
            None
        };

        let top = path.len() - 2;
        for i in (0..=top).rev() {
            let (node, parent) = (path[i], path[i + 1]);
            if i == top
                && options.suppress_degree_two
                && self[parent].num_children() == 2
                && self[parent].taxon.is_none()
            {
                self.splice_seed(node, parent)?;
            } else {
                self.rotate(node, parent, taxa_mask.as_ref())?;
            }
        }

        if !options.update_splits {
            self.discard_splits();
        }
        Ok(())
    }

    /// Reroots at the parent of `node` and moves `node` to the first child
    /// position of the new seed.
    pub fn to_outgroup_position(&mut self, node: NodeId, options: RerootOptions) -> Result<()> {
        self.check_node(node)?;
        let parent = self[node].parent().ok_or_else(|| {
            PhyloError::InvalidOperation(format!("node {node} has no parent to reroot at"))
        })?;
        self.reroot(parent, options)?;
        self.detach(parent, node)?;
        self.attach(parent, node, None, Some(0));
        Ok(())
    }

    /// Replaces a two-child seed by its child `node`: `node` takes over the
    /// seed edge, the sister hangs below `node` and absorbs `node`'s length.
    fn splice_seed(&mut self, node: NodeId, seed: NodeId) -> Result<()> {
        let sister = match self[seed].children() {
            [first, second] if *first == node => *second,
            [first, second] if *second == node => *first,
            _ => return Err(PhyloError::NotAChild { parent: seed, child: node }),
        };
        let node_length = self.edge_length(node);
        self.absorb_length(self[sister].edge, node_length);

        let node_edge = self[node].edge;
        let seed_edge = self[seed].edge;
        let mut orphaned = None;
        if let Some(mask) = self[node_edge].split_bitmask.take()
            && let Some(registry) = self.split_edges.as_mut()
            && registry.get(&mask) == Some(&node_edge)
        {
            registry.remove(&mask);
            orphaned = Some(mask);
        }
        self[node].edge = seed_edge;
        self[seed_edge].head = node;
        self[seed].edge = node_edge;
        self[node_edge].head = seed;
        self[node_edge].tail = None;

        // The former seed leaves the tree with nothing below it
        self[seed].children.clear();
        self[node].parent = None;
        self.attach(node, sister, None, None);
        self.seed = node;
        if let Some(mask) = orphaned {
            self.reregister_split(mask, &[node]);
        }
        Ok(())
    }

    /// Turns the edge between `node` and the current seed `parent` around.
    fn rotate(&mut self, node: NodeId, parent: NodeId, taxa_mask: Option<&Bitset>) -> Result<()> {
        let node_edge = self[node].edge;
        let parent_edge = self[parent].edge;
        self[node].edge = parent_edge;
        self[parent_edge].head = node;
        self[parent].edge = node_edge;
        self[node_edge].head = parent;

        let mut orphaned = None;
        if let Some(taxa_mask) = taxa_mask
            && let Some(old) = self[node_edge].split_bitmask.take()
        {
            let flipped = old.complement_in(taxa_mask);
            if let Some(registry) = self.split_edges.as_mut() {
                if registry.get(&old) == Some(&node_edge) {
                    registry.remove(&old);
                    orphaned = Some(old);
                }
                registry.insert(flipped.clone(), node_edge);
            }
            self[node_edge].split_bitmask = Some(flipped);
        }

        self.detach(parent, node)?;
        let length = self[node_edge].length;
        self.attach(node, parent, length, None);
        self.seed = node;
        if let Some(mask) = orphaned {
            self.reregister_split(mask, &[node, parent]);
        }
        Ok(())
    }

    /// Edges sharing a mask lie on a chain of unary nodes, so when the
    /// registered one gives the mask up, a holder is found among the edges
    /// touching `near`.
    fn reregister_split(&mut self, mask: Bitset, near: &[NodeId]) {
        let holder = near
            .iter()
            .flat_map(|&n| self.incident_edges(n))
            .find(|&e| self[e].split_bitmask.as_ref() == Some(&mask));
        if let Some(edge) = holder
            && let Some(registry) = self.split_edges.as_mut()
        {
            registry.insert(mask, edge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeData;
    use crate::snapshot::TreeSnapshot;
    use crate::traversal::tests::arb_tree;
    use crate::tree::tests::{balanced_tree, leaf};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn parents(tree: &Tree) -> BTreeMap<NodeId, (Option<NodeId>, Option<f64>)> {
        tree.nodes()
            .into_iter()
            .map(|n| (n, (tree[n].parent(), tree.edge_length(n))))
            .collect()
    }

    fn masks(tree: &Tree) -> BTreeMap<NodeId, Option<Bitset>> {
        tree.nodes()
            .into_iter()
            .map(|n| (n, tree.edge_of(n).split_bitmask().cloned()))
            .collect()
    }

    #[test]
    fn test_reroot_at_seed_is_noop() {
        let mut tree = balanced_tree();
        tree.encode_splits().unwrap();
        let before = (parents(&tree), masks(&tree));
        let seed = tree.seed_node();

        tree.reroot_at(seed, true, true).unwrap();
        assert_eq!(tree.seed_node(), seed);
        assert_eq!((parents(&tree), masks(&tree)), before);
    }

    #[test]
    fn test_reroot_suppresses_old_seed() {
        let mut tree = balanced_tree();
        tree.encode_splits().unwrap();
        let old_seed = tree.seed_node();
        let a = leaf(&tree, "A");
        let ab = tree[a].parent().unwrap();
        let cd = tree[old_seed].children()[1];

        tree.reroot_at(a, true, true).unwrap();
        assert_eq!(tree.seed_node(), a);
        assert_eq!(tree[a].children(), &[ab]);
        assert_eq!(tree[ab].children(), &[leaf(&tree, "B"), cd]);
        assert!(!tree.contains(old_seed));
        assert_eq!(tree.edge_length(cd), Some(2.0));
        assert_eq!(tree.edge_length(ab), Some(1.0));

        assert_eq!(tree.taxa_mask().unwrap(), Bitset::from(0b1111));
        assert_eq!(tree.edge_of(ab).split_bitmask(), Some(&Bitset::from(0b1110)));
        let registry = tree.split_edges().unwrap();
        assert_eq!(registry[&Bitset::from(0b1110)], tree[ab].edge());
        assert!(!registry.contains_key(&Bitset::from(0b0011)));
        tree.validate().unwrap();
    }

    #[test]
    fn test_reroot_at_leaf_keeps_its_taxon() {
        let mut tree = balanced_tree();
        tree.encode_splits().unwrap();
        let before = TreeSnapshot::from_tree(&tree).unwrap();
        let a = leaf(&tree, "A");

        tree.reroot_at(a, true, true).unwrap();
        assert!(tree[a].is_internal());
        assert_eq!(tree.edge_of(a).split_bitmask(), Some(&Bitset::from(0b1111)));
        tree.validate().unwrap();

        let after = TreeSnapshot::from_tree(&tree).unwrap();
        assert_eq!(after.parts, before.parts);
        assert_eq!(after.lengths[&Bitset::from(0b0011)], before.lengths[&Bitset::from(0b0011)]);
        assert_eq!(after.num_leaves, 4);

        tree.encode_splits().unwrap();
        assert_eq!(tree.taxa_mask().unwrap(), Bitset::from(0b1111));
        assert_eq!(tree.edge_of(a).split_bitmask(), Some(&Bitset::from(0b1111)));
        tree.validate().unwrap();
    }

    /// `(((A,B)ab)x,(C,D)cd)`: the unary `x` shares its mask with `ab`.
    fn unary_chain_tree() -> (Tree, NodeId, NodeId) {
        let mut tree = balanced_tree();
        let seed = tree.seed_node();
        let ab = tree[seed].children()[0];
        let x = tree.new_node(NodeData::labelled("x"));
        tree.detach(seed, ab).unwrap();
        tree.attach(seed, x, Some(1.0), Some(0));
        tree.attach(x, ab, Some(0.5), None);
        (tree, x, ab)
    }

    #[test]
    fn test_reroot_keeps_shared_mask_registered() {
        let (mut tree, x, ab) = unary_chain_tree();
        tree.encode_splits().unwrap();
        let shared = Bitset::from(0b0011);
        assert_eq!(tree.edge_of(ab).split_bitmask(), Some(&shared));
        assert_eq!(tree.edge_of(x).split_bitmask(), Some(&shared));

        tree.reroot_at(x, true, false).unwrap();
        assert_eq!(tree.seed_node(), x);
        assert_eq!(tree.edge_for_split(&shared).unwrap(), Some(tree[ab].edge()));
        let cd_side = Bitset::from(0b1100);
        let holder = tree.edge_for_split(&cd_side).unwrap().unwrap();
        assert_eq!(tree[holder].split_bitmask(), Some(&cd_side));
        tree.validate().unwrap();
    }

    #[test]
    fn test_reroot_round_trip() {
        let mut tree = balanced_tree();
        let before = parents(&tree);
        let seed = tree.seed_node();
        let c = leaf(&tree, "C");

        tree.reroot_at(c, false, false).unwrap();
        assert_eq!(tree.seed_node(), c);
        assert_eq!(tree.length(), 12.0);
        tree.reroot_at(seed, false, false).unwrap();
        assert_eq!(parents(&tree), before);
    }

    #[test]
    fn test_reroot_errors() {
        let mut tree = balanced_tree();
        let stray = tree.new_node(NodeData::default());
        assert!(matches!(tree.reroot_at(stray, false, true), Err(PhyloError::NotInTree(n)) if n == stray));
        assert!(matches!(
            tree.reroot_at(NodeId(999), false, true),
            Err(PhyloError::NotInTree(_))
        ));

        let before = parents(&tree);
        let a = leaf(&tree, "A");
        assert!(matches!(tree.reroot_at(a, true, true), Err(PhyloError::SplitsNotEncoded)));
        assert_eq!(parents(&tree), before);
    }

    #[test]
    fn test_reroot_without_update_drops_splits() {
        let mut tree = balanced_tree();
        tree.encode_splits().unwrap();
        let d = leaf(&tree, "D");
        tree.reroot(d, RerootOptions::default()).unwrap();
        assert!(!tree.is_encoded());
    }

    #[test]
    fn test_to_outgroup_position() {
        let mut tree = balanced_tree();
        let d = leaf(&tree, "D");
        let cd = tree[d].parent().unwrap();
        tree.to_outgroup_position(d, RerootOptions::default()).unwrap();
        assert_eq!(tree.seed_node(), cd);
        assert_eq!(tree[cd].children()[0], d);
        assert_eq!(tree[cd].num_children(), 3);
        assert_eq!(tree.leaf_nodes().len(), 4);
    }

    /// Random tree with a taxon on every leaf and unit edge lengths.
    fn arb_taxon_tree() -> impl Strategy<Value = (Tree, prop::sample::Index)> {
        (arb_tree(), any::<prop::sample::Index>()).prop_map(|(mut tree, idx)| {
            // A one-child seed would turn into an untaxoned leaf once rotated
            let seed = tree.seed_node();
            if tree[seed].num_children() == 1 {
                tree.new_child(seed, NodeData::default());
            }
            for (i, n) in tree.leaf_nodes().into_iter().enumerate() {
                let taxon = tree.require_taxon(&format!("t{i}"));
                tree[n].set_taxon(Some(taxon));
            }
            for n in tree.nodes() {
                if n != tree.seed_node() {
                    let e = tree[n].edge();
                    tree.set_edge_length(e, Some(1.0));
                }
            }
            (tree, idx)
        })
    }

    proptest! {
        #[test]
        fn prop_reroot_keeps_splits_consistent(
            (mut tree, idx) in arb_taxon_tree(),
            suppress in any::<bool>(),
        ) {
            tree.encode_splits().unwrap();
            let nodes = tree.nodes();
            let target = nodes[idx.index(nodes.len())];
            let num_leaves = tree.leaf_nodes().len();
            let length = tree.length();

            tree.reroot_at(target, true, suppress).unwrap();
            prop_assert_eq!(tree.seed_node(), target);
            prop_assert!(tree.validate().is_ok());
            prop_assert_eq!(tree.length(), length);
            prop_assert_eq!(tree.leaf_nodes().len(), num_leaves);

            // Same bitmasks as encoding the rerooted tree from scratch
            let mut fresh = tree.clone();
            fresh.encode_splits().unwrap();
            prop_assert_eq!(masks(&tree), masks(&fresh));
            for (mask, &edge) in tree.split_edges().unwrap() {
                prop_assert_eq!(tree[edge].split_bitmask(), Some(mask));
                prop_assert!(tree.contains(tree[edge].head()));
            }
        }

        #[test]
        fn prop_reroot_round_trip((mut tree, idx) in arb_taxon_tree()) {
            let before = parents(&tree);
            let seed = tree.seed_node();
            let nodes = tree.nodes();
            let target = nodes[idx.index(nodes.len())];

            tree.reroot_at(target, false, false).unwrap();
            tree.reroot_at(seed, false, false).unwrap();
            prop_assert_eq!(parents(&tree), before);
        }
    }
}
