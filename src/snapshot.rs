//! Immutable split snapshots of encoded trees.
//!
//! # Overview
//! A [`TreeSnapshot`] captures the bipartitions (splits) of a tree together
//! with their branch lengths. Trees hold their namespace through an `Rc` and
//! cannot cross threads; snapshots own plain data, so many of them can be
//! compared in parallel.
//!
//! # What is a bipartition?
//! Each internal branch divides the leaves into two groups:
//! ```text
//!      root
//!     /    \
//!   {A,B}  {C,D}  ← this branch creates the split {A,B} | {C,D}
//! ```
//!
//! Only one side is stored, in the canonical orientation of
//! [`normalize`]: the numerically smaller of the mask and its complement.
//!
//! # Bit positions come from the namespace
//! Two trees are only comparable when they were built over the same
//! [`TaxonNamespace`](crate::taxon::TaxonNamespace), which pins every taxon
//! label to one bit position for all trees.

use crate::bitset::Bitset;
use crate::error::Result;
use crate::splits::normalize;
use crate::tree::Tree;
use std::collections::{HashMap, HashSet};

/// An immutable snapshot of the non-trivial splits of a tree.
///
/// # Fields
/// - `parts`: canonical non-trivial splits (HashSet for O(1) lookup)
/// - `lengths`: branch length per canonical split
/// - `root_children`: rooted-orientation masks of the seed's children, sorted
/// - `taxa_mask`: taxa present on the tree
/// - `num_leaves`: number of taxa on the tree, counting a taxon-carrying
///   seed left behind by rerooting at a leaf
/// - `rooted`: whether the tree is read as rooted
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    pub parts: HashSet<Bitset>,
    pub lengths: HashMap<Bitset, f64>,
    pub root_children: Vec<Bitset>,
    pub taxa_mask: Bitset,
    pub num_leaves: usize,
    pub rooted: bool,
}

impl TreeSnapshot {
    /// Takes a snapshot of an encoded tree.
    ///
    /// # Algorithm
    /// 1. Walk every edge below the seed node
    /// 2. Canonicalize its split bitmask against the taxa mask
    /// 3. Skip trivial splits (one side holds at most one taxon)
    /// 4. Accumulate branch lengths per canonical split. Both edges below a
    ///    two-child seed induce the same split, so their lengths add up.
    ///
    /// Missing branch lengths count as 0.0.
    ///
    /// # Errors
    /// [`PhyloError::SplitsNotEncoded`](crate::error::PhyloError::SplitsNotEncoded)
    /// if [`Tree::encode_splits`] has not been run since the last edit.
    pub fn from_tree(tree: &Tree) -> Result<Self> {
        let taxa_mask = tree.taxa_mask()?;
        let num_taxa = taxa_mask.count_ones();
        let seed = tree.seed_node();

        let mut parts = HashSet::new();
        let mut lengths: HashMap<Bitset, f64> = HashMap::new();
        for node in tree.preorder_node_iter().filter(|&n| n != seed) {
            let Some(mask) = tree.edge_of(node).split_bitmask() else {
                continue;
            };
            let canonical = normalize(mask, &taxa_mask);
            let size = canonical.count_ones();
            if size <= 1 || num_taxa - size <= 1 {
                continue;
            }
            *lengths.entry(canonical.clone()).or_insert(0.0) += tree.edge_length(node).unwrap_or(0.0);
            parts.insert(canonical);
        }

        let mut root_children: Vec<Bitset> = tree[seed]
            .children()
            .iter()
            .filter_map(|&c| tree.edge_of(c).split_bitmask().cloned())
            .collect();
        root_children.sort_unstable();

        Ok(TreeSnapshot {
            parts,
            lengths,
            root_children,
            num_leaves: num_taxa,
            taxa_mask,
            rooted: tree.is_rooted(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PhyloError;
    use crate::io::parse_newick;
    use crate::taxon::TaxonNamespace;

    /// ```text
    ///              root
    ///             /    \
    ///         node1     E
    ///         /   \
    ///     node2    D
    ///     /   \
    ///    A    node3
    ///         /   \
    ///        B     C
    /// ```
    ///
    /// Taxa: A=0, B=1, C=2, D=3, E=4
    ///
    /// | Node  | Leaves Below | Raw     | Canonical | Kept?              |
    /// |-------|--------------|---------|-----------|--------------------|
    /// | node3 | {B, C}       | 0b00110 | 0b00110   | yes                |
    /// | node2 | {A, B, C}    | 0b00111 | 0b00111   | yes ({D,E} larger) |
    /// | node1 | {A,B,C,D}    | 0b01111 | 0b01111   | no, other side {E} |
    #[test]
    fn test_asymmetric_tree() {
        let ns = TaxonNamespace::from_labels(["A", "B", "C", "D", "E"]).into_shared();
        let mut tree = parse_newick("(((A:1,(B:1,C:1):0.5):0.25,D:1):2,E:1);", &ns).unwrap();
        tree.encode_splits().unwrap();
        let snap = TreeSnapshot::from_tree(&tree).unwrap();

        let expected: HashSet<Bitset> = [Bitset::from(0b00110), Bitset::from(0b00111)].into();
        assert_eq!(snap.parts, expected);
        assert_eq!(snap.lengths[&Bitset::from(0b00110)], 0.5);
        assert_eq!(snap.lengths[&Bitset::from(0b00111)], 0.25);
        assert_eq!(snap.num_leaves, 5);
        assert_eq!(snap.root_children, vec![Bitset::from(0b01111), Bitset::from(0b10000)]);
    }

    /// Both sides of a rooted bifurcation are one split.
    ///
    /// ```text
    /// Tree 1: ((A,B):1,(C,D):2)    Tree 2: ((C,D):0.5,(A,B):0.5)
    /// ```
    /// In both, {A,B} | {C,D} is stored once as 0b0011 with the summed length.
    #[test]
    fn test_root_split_lengths_add_up() {
        let ns = TaxonNamespace::new().into_shared();
        let mut t1 = parse_newick("((A:1,B:1):1,(C:1,D:1):2);", &ns).unwrap();
        let mut t2 = parse_newick("((C:1,D:1):0.5,(A:1,B:1):0.5);", &ns).unwrap();
        t1.encode_splits().unwrap();
        t2.encode_splits().unwrap();
        let s1 = TreeSnapshot::from_tree(&t1).unwrap();
        let s2 = TreeSnapshot::from_tree(&t2).unwrap();

        assert_eq!(s1.parts, s2.parts);
        assert_eq!(s1.parts.len(), 1);
        assert_eq!(s1.lengths[&Bitset::from(0b0011)], 3.0);
        assert_eq!(s2.lengths[&Bitset::from(0b0011)], 1.0);
        assert_eq!(s1.root_children, s2.root_children);
    }

    #[test]
    fn test_requires_encoding() {
        let ns = TaxonNamespace::new().into_shared();
        let tree = parse_newick("((A,B),(C,D));", &ns).unwrap();
        assert!(matches!(TreeSnapshot::from_tree(&tree), Err(PhyloError::SplitsNotEncoded)));
    }

    #[test]
    fn test_snapshot_is_send() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TreeSnapshot>();
    }
}
