//! Tree distance metrics on split snapshots.
//!
//! This module implements three phylogenetic tree distance measures:
//!
//! 1. **Robinson-Foulds (RF)**: Counts the number of bipartitions that differ
//!    between two trees. Range: [0, 2n-6] where n is the number of leaves.
//!
//! 2. **Weighted Robinson-Foulds**: Like RF but considers branch lengths.
//!    For shared partitions, adds |length_a - length_b|.
//!    For unique partitions, adds the full branch length.
//!
//! 3. **Kuhner-Felsenstein (Branch Score)**: Similar to weighted RF but uses
//!    squared differences: sqrt(Σ(length_a - length_b)²)
//!
//! Tree-level functions need both trees on one taxon namespace and the same
//! taxon set. The `pairwise_*` functions fan out over rayon.

use crate::error::{PhyloError, Result};
use crate::snapshot::TreeSnapshot;
use crate::tree::Tree;
use rayon::prelude::*;
use tracing::debug;

fn encoded_snapshot(tree: &Tree) -> Result<TreeSnapshot> {
    if tree.is_encoded() {
        return TreeSnapshot::from_tree(tree);
    }
    let mut encoded = tree.clone();
    encoded.encode_splits()?;
    TreeSnapshot::from_tree(&encoded)
}

fn snapshot_pair(tree_a: &Tree, tree_b: &Tree) -> Result<(TreeSnapshot, TreeSnapshot)> {
    if !tree_a.shares_namespace(tree_b) {
        return Err(PhyloError::ForeignNamespace);
    }
    let snap_a = encoded_snapshot(tree_a)?;
    let snap_b = encoded_snapshot(tree_b)?;
    if snap_a.taxa_mask != snap_b.taxa_mask {
        return Err(PhyloError::InvalidOperation(format!(
            "trees cover different taxa: {} vs {}",
            snap_a.taxa_mask, snap_b.taxa_mask
        )));
    }
    Ok((snap_a, snap_b))
}

/// Compute Robinson-Foulds distance between two trees.
///
/// Trees without encoded splits are encoded on a copy.
///
/// # Algorithm
/// RF = |A ∪ B| - |A ∩ B| = |A| + |B| - 2|A ∩ B|
///
/// Where A and B are the sets of bipartitions in each tree.
///
/// # Rooted Tree Adjustment
/// For rooted trees, if the root position differs, we add 2 to the distance.
/// This accounts for the two extra bipartitions created by moving the root.
///
/// # Example
/// ```text
/// Tree 1:  ((A,B),(C,D))     Partitions: {A,B}, {C,D}
/// Tree 2:  ((A,C),(B,D))     Partitions: {A,C}, {B,D}
///
/// Each tree has one canonical split ({A,B} and {A,C})
/// RF = 1 + 1 - 2*0 = 2, plus 2 for the differing roots
/// ```
///
/// # Errors
/// [`PhyloError::ForeignNamespace`] if the trees use different namespaces,
/// [`PhyloError::InvalidOperation`] if they cover different taxa, and any
/// encoding error.
pub fn robinson_foulds(tree_a: &Tree, tree_b: &Tree) -> Result<usize> {
    let (snap_a, snap_b) = snapshot_pair(tree_a, tree_b)?;
    Ok(rf_from_snapshots(&snap_a, &snap_b))
}

/// Compute Robinson-Foulds distance from two pre-computed snapshots.
///
/// # Algorithm (O(n) using HashSet)
/// ```text
/// intersection = A.parts ∩ B.parts
/// RF = len(A) + len(B) - 2 * len(intersection)
/// ```
pub fn rf_from_snapshots(a: &TreeSnapshot, b: &TreeSnapshot) -> usize {
    let inter = a.parts.intersection(&b.parts).count();
    let rf = a.parts.len() + b.parts.len() - 2 * inter;
    let same_root = a.root_children == b.root_children;
    if a.rooted && b.rooted && rf != 0 && !same_root { rf + 2 } else { rf }
}

/// Compute Weighted Robinson-Foulds distance between two trees.
///
/// # Algorithm
/// For each partition:
/// - If in both trees: add |length_a - length_b|
/// - If only in A: add length_a
/// - If only in B: add length_b
///
/// Total: Sum of all branch length differences
///
/// # Example
/// ```text
/// Tree 1: ((A:1.0,B:1.0):2.0,(C:1.0,D:1.0):2.0);
/// Tree 2: ((A:1.5,B:1.0):3.0,(C:0.5,D:1.0):2.0);
///
/// The root split {A,B} | {C,D}: |(2.0 + 2.0) - (3.0 + 2.0)| = 1.0
/// Leaf branches are trivial splits and do not contribute
/// ```
pub fn weighted_robinson_foulds(tree_a: &Tree, tree_b: &Tree) -> Result<f64> {
    let (snap_a, snap_b) = snapshot_pair(tree_a, tree_b)?;
    Ok(weighted_rf_from_snapshots(&snap_a, &snap_b))
}

/// Compute Weighted RF distance from two pre-computed snapshots.
pub fn weighted_rf_from_snapshots(a: &TreeSnapshot, b: &TreeSnapshot) -> f64 {
    let mut distance = 0.0;

    for part in &a.parts {
        let length_a = a.lengths.get(part).unwrap_or(&0.0);
        match b.lengths.get(part) {
            Some(length_b) => distance += (length_a - length_b).abs(),
            None => distance += length_a,
        }
    }

    // Partitions only in B
    for part in b.parts.difference(&a.parts) {
        distance += b.lengths.get(part).unwrap_or(&0.0);
    }

    distance
}

/// Compute Kuhner-Felsenstein (Branch Score) distance between two trees.
///
/// # Algorithm
/// Like Weighted RF but uses squared differences:
/// distance = sqrt(Σ (length_a - length_b)²)
///
/// For each partition:
/// - If in both trees: add (length_a - length_b)²
/// - If only in A: add length_a²
/// - If only in B: add length_b²
///
/// Then take the square root of the sum.
pub fn kuhner_felsenstein(tree_a: &Tree, tree_b: &Tree) -> Result<f64> {
    let (snap_a, snap_b) = snapshot_pair(tree_a, tree_b)?;
    Ok(kf_from_snapshots(&snap_a, &snap_b))
}

/// Compute Kuhner-Felsenstein distance from two pre-computed snapshots.
pub fn kf_from_snapshots(a: &TreeSnapshot, b: &TreeSnapshot) -> f64 {
    let mut sum_squared = 0.0;

    for part in &a.parts {
        let length_a = a.lengths.get(part).unwrap_or(&0.0);
        let diff = match b.lengths.get(part) {
            Some(length_b) => length_a - length_b,
            None => *length_a,
        };
        sum_squared += diff * diff;
    }

    for part in b.parts.difference(&a.parts) {
        let length_b = b.lengths.get(part).unwrap_or(&0.0);
        sum_squared += length_b * length_b;
    }

    sum_squared.sqrt()
}

/// Symmetric matrix of `metric` over every pair of snapshots, computed in
/// parallel. The diagonal holds `T::default()`.
pub fn pairwise_matrix<T, F>(snapshots: &[TreeSnapshot], metric: F) -> Vec<Vec<T>>
where
    T: Copy + Default + Send,
    F: Fn(&TreeSnapshot, &TreeSnapshot) -> T + Sync,
{
    let n = snapshots.len();
    debug!(trees = n, pairs = n * n.saturating_sub(1) / 2, "computing pairwise distances");

    let pairs: Vec<(usize, usize, T)> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| (i + 1..n).map(move |j| (i, j)))
        .map(|(i, j)| (i, j, metric(&snapshots[i], &snapshots[j])))
        .collect();

    let mut matrix = vec![vec![T::default(); n]; n];
    for (i, j, d) in pairs {
        matrix[i][j] = d;
        matrix[j][i] = d;
    }
    matrix
}

pub fn pairwise_rf(snapshots: &[TreeSnapshot]) -> Vec<Vec<usize>> {
    pairwise_matrix(snapshots, rf_from_snapshots)
}

pub fn pairwise_weighted_rf(snapshots: &[TreeSnapshot]) -> Vec<Vec<f64>> {
    pairwise_matrix(snapshots, weighted_rf_from_snapshots)
}

pub fn pairwise_kf(snapshots: &[TreeSnapshot]) -> Vec<Vec<f64>> {
    pairwise_matrix(snapshots, kf_from_snapshots)
}
