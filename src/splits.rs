//! Split bitmask encoding.
//!
//! Each edge gets a bitmask over taxon bit positions naming the taxa below
//! it. Leaves contribute the bit of their taxon, internal nodes the union of
//! their children, and the seed edge ends up with the taxa mask: every taxon
//! present on the tree. Masks are kept in the rooted orientation; use
//! [`normalize`] to compare splits of unrooted trees.
//!
//! Bitmasks and the registry exist together or not at all. Structural edits
//! drop both, and [`Tree::encode_splits`] rebuilds them from scratch.

use crate::bitset::Bitset;
use crate::error::{PhyloError, Result};
use crate::node::{EdgeId, NodeId};
use crate::tree::Tree;
use std::collections::HashMap;

/// Canonical orientation of a split: the smaller of `mask` and its
/// complement within `taxa_mask`.
///
/// # Example
/// ```
/// # use phylo_splits::bitset::Bitset;
/// # use phylo_splits::splits::normalize;
/// let taxa = Bitset::from(0b1111);
/// assert_eq!(normalize(&Bitset::from(0b1100), &taxa), Bitset::from(0b0011));
/// assert_eq!(normalize(&Bitset::from(0b0011), &taxa), Bitset::from(0b0011));
/// ```
pub fn normalize(mask: &Bitset, taxa_mask: &Bitset) -> Bitset {
    let complement = mask.symmetric_difference(taxa_mask);
    if complement < *mask { complement } else { mask.clone() }
}

impl Tree {
    /// Computes the split bitmask of every edge and rebuilds the registry.
    ///
    /// A node's mask is the union of its children's masks plus its own taxon
    /// bit when it has one.
    ///
    /// Fails with [`PhyloError::UntaxonedLeaf`] for a leaf without taxon and
    /// with [`PhyloError::MaskOverflow`] when a leaf's taxon does not belong
    /// to the namespace. On failure the tree is left without any bitmasks.
    pub fn encode_splits(&mut self) -> Result<()> {
        self.clear_splits();
        match self.compute_splits() {
            Ok(registry) => {
                self.split_edges = Some(registry);
                Ok(())
            }
            Err(e) => {
                self.clear_splits();
                Err(e)
            }
        }
    }

    fn compute_splits(&mut self) -> Result<HashMap<Bitset, EdgeId>> {
        let namespace_mask = self.namespace.borrow().all_taxa_bitmask();
        let order: Vec<NodeId> = self.postorder_node_iter().collect();
        let mut registry = HashMap::with_capacity(order.len());
        for node in order {
            let mask = self.own_and_child_mask(node)?;
            if !mask.is_subset_of(&namespace_mask) {
                return Err(PhyloError::MaskOverflow { mask, taxa_mask: namespace_mask });
            }
            let edge = self[node].edge;
            self[edge].split_bitmask = Some(mask.clone());
            registry.insert(mask, edge);
        }
        Ok(registry)
    }

    /// Taxon bit of `node` (if any) OR-ed with its children's edge masks.
    /// Internal nodes may carry a taxon, e.g. a leaf that became the seed.
    pub(crate) fn own_and_child_mask(&self, node: NodeId) -> Result<Bitset> {
        let mut mask = match self[node].taxon {
            Some(taxon) => Bitset::singleton(taxon.bit()),
            None if self[node].is_leaf() => return Err(PhyloError::UntaxonedLeaf(node)),
            None => Bitset::new(),
        };
        for &child in self[node].children() {
            if let Some(child_mask) = &self.edge_of(child).split_bitmask {
                mask.or_assign(child_mask);
            }
        }
        Ok(mask)
    }

    /// Whether bitmasks and the registry reflect the current topology.
    pub fn is_encoded(&self) -> bool {
        self.split_edges.is_some()
    }

    /// Split bitmask → edge registry, if encoded.
    pub fn split_edges(&self) -> Option<&HashMap<Bitset, EdgeId>> {
        self.split_edges.as_ref()
    }

    /// Edge inducing `mask` (rooted orientation).
    pub fn edge_for_split(&self, mask: &Bitset) -> Result<Option<EdgeId>> {
        let registry = self.split_edges.as_ref().ok_or(PhyloError::SplitsNotEncoded)?;
        Ok(registry.get(mask).copied())
    }

    /// Union of the taxa on the tree: the seed edge's bitmask.
    pub fn taxa_mask(&self) -> Result<Bitset> {
        if !self.is_encoded() {
            return Err(PhyloError::SplitsNotEncoded);
        }
        self.edge_of(self.seed)
            .split_bitmask
            .clone()
            .ok_or(PhyloError::SplitsNotEncoded)
    }

    /// Bitmasks of all edges in preorder, each normalized when `unrooted`.
    pub fn split_bitmasks(&self, unrooted: bool) -> Result<Vec<Bitset>> {
        let taxa_mask = self.taxa_mask()?;
        self.preorder_edge_iter()
            .map(|e| {
                let mask = self[e].split_bitmask.as_ref().ok_or(PhyloError::SplitsNotEncoded)?;
                Ok(if unrooted { normalize(mask, &taxa_mask) } else { mask.clone() })
            })
            .collect()
    }

    /// Renders the split of `edge` one character per namespace taxon.
    pub fn split_as_string(&self, edge: EdgeId) -> Result<String> {
        let mask = self[edge].split_bitmask.as_ref().ok_or(PhyloError::SplitsNotEncoded)?;
        Ok(self.namespace.borrow().split_as_string(mask))
    }

    /// Drops every bitmask and the registry.
    pub fn clear_splits(&mut self) {
        self.split_edges = None;
        for edge in &mut self.edges {
            edge.split_bitmask = None;
        }
    }

    /// Drops split data after a structural edit. Cheap when nothing is encoded.
    pub(crate) fn discard_splits(&mut self) {
        if self.split_edges.is_some() {
            self.clear_splits();
        }
    }
}
