//! Python binding layer for split-based tree distances and rerooting.
//!
//! Provides Python functions for computing pairwise tree distances
//! from BEAST/NEXUS tree files.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::distances::{pairwise_kf, pairwise_rf, pairwise_weighted_rf};
use crate::error::PhyloError;
use crate::io::{parse_newick, read_beast_trees_into};
use crate::newick::NewickOptions;
use crate::reroot::RerootOptions;
use crate::snapshot::TreeSnapshot;
use crate::taxon::TaxonNamespace;
use crate::tree_list::TreeList;

fn value_error(err: PhyloError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Compute pairwise Robinson-Foulds distances from multiple tree files.
///
/// Args:
///     paths: List of file paths to BEAST/NEXUS tree files
///     burnin_trees: Number of trees to skip at the beginning of each file (default: 0)
///     burnin_states: Minimum STATE value to keep trees (default: 0)
///     use_real_taxa: Use TRANSLATE block for taxon names when available (default: True)
///
/// Returns:
///     A tuple of (tree_names, distance_matrix) where:
///     - tree_names is a list of tree identifiers
///     - distance_matrix is a 2D list of RF distances
///
/// Raises:
///     ValueError: If no trees are found, trees have different leaf sets, or sanity checks fail
#[pyfunction]
#[pyo3(name = "pairwise_rf", signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=true))]
fn pairwise_rf_py(
    paths: Vec<String>,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<Vec<usize>>)> {
    let (tree_names, snapshots) = read_snapshots(&paths, burnin_trees, burnin_states, use_real_taxa)?;
    Ok((tree_names, pairwise_rf(&snapshots)))
}

/// Compute pairwise Weighted Robinson-Foulds distances from multiple tree files.
///
/// This metric considers branch lengths when comparing trees. Arguments and
/// errors as for `pairwise_rf`.
#[pyfunction]
#[pyo3(name = "pairwise_weighted_rf", signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=true))]
fn pairwise_weighted_rf_py(
    paths: Vec<String>,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
    let (tree_names, snapshots) = read_snapshots(&paths, burnin_trees, burnin_states, use_real_taxa)?;
    Ok((tree_names, pairwise_weighted_rf(&snapshots)))
}

/// Compute pairwise Kuhner-Felsenstein (Branch Score) distances from multiple tree files.
///
/// This metric uses squared differences of branch lengths: sqrt(Σ(length_a - length_b)²)
#[pyfunction]
#[pyo3(name = "pairwise_kf", signature = (paths, burnin_trees=0, burnin_states=0, use_real_taxa=true))]
fn pairwise_kf_py(
    paths: Vec<String>,
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<Vec<f64>>)> {
    let (tree_names, snapshots) = read_snapshots(&paths, burnin_trees, burnin_states, use_real_taxa)?;
    Ok((tree_names, pairwise_kf(&snapshots)))
}

/// Reroot a Newick tree so that `outgroup` sits in the first position below
/// its parent, which becomes the root.
///
/// Raises:
///     ValueError: If the tree cannot be parsed, the outgroup is missing or is the root
#[pyfunction]
#[pyo3(signature = (newick, outgroup, suppress_degree_two=true))]
fn reroot_newick(newick: &str, outgroup: &str, suppress_degree_two: bool) -> PyResult<String> {
    let ns = TaxonNamespace::new().into_shared();
    let mut tree = parse_newick(newick, &ns).map_err(value_error)?;
    let node = tree
        .find_node_with_taxon_label(outgroup)
        .ok_or_else(|| PyValueError::new_err(format!("taxon '{outgroup}' not found in tree")))?;
    let options = RerootOptions { update_splits: false, suppress_degree_two };
    tree.to_outgroup_position(node, options).map_err(value_error)?;
    Ok(tree.as_newick_string(&NewickOptions { include_internal_labels: true, ..Default::default() }))
}

/// Reads every file onto one namespace and returns names with snapshots.
/// Tree names get a `file<i>_` prefix.
fn read_snapshots(
    paths: &[String],
    burnin_trees: usize,
    burnin_states: usize,
    use_real_taxa: bool,
) -> PyResult<(Vec<String>, Vec<TreeSnapshot>)> {
    let mut trees = TreeList::new(TaxonNamespace::new().into_shared());
    let mut all_tree_names = Vec::new();

    for (file_idx, path) in paths.iter().enumerate() {
        let names = read_beast_trees_into(path, burnin_trees, burnin_states, use_real_taxa, &mut trees)
            .map_err(value_error)?;
        if names.is_empty() {
            return Err(PyValueError::new_err(format!(
                "No trees found in file '{path}' after burnin removal"
            )));
        }
        all_tree_names.extend(names.into_iter().map(|name| format!("file{file_idx}_{name}")));
    }

    if trees.len() < 2 {
        return Err(PyValueError::new_err(
            "Need at least 2 trees to compute pairwise distances",
        ));
    }

    let snapshots = trees.snapshots().map_err(|e| {
        PyValueError::new_err(format!("Failed to create tree snapshot: {e}"))
    })?;
    sanity_check_snapshots(&snapshots)?;
    Ok((all_tree_names, snapshots))
}

/// All trees must cover the same taxa.
fn sanity_check_snapshots(snapshots: &[TreeSnapshot]) -> PyResult<()> {
    let Some(first) = snapshots.first() else {
        return Err(PyValueError::new_err("No trees to compare"));
    };
    for (idx, snap) in snapshots.iter().enumerate().skip(1) {
        if snap.num_leaves != first.num_leaves {
            return Err(PyValueError::new_err(format!(
                "Tree {} has {} leaves, but tree 0 has {} leaves. All trees must have the same number of leaves.",
                idx, snap.num_leaves, first.num_leaves
            )));
        }
        if snap.taxa_mask != first.taxa_mask {
            return Err(PyValueError::new_err(format!(
                "Tree {idx} has different leaf set than tree 0. All trees must have the same taxa."
            )));
        }
    }
    Ok(())
}

/// Python module definition
#[pymodule]
fn phylo_splits(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(pairwise_rf_py, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_weighted_rf_py, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_kf_py, m)?)?;
    m.add_function(wrap_pyfunction!(reroot_newick, m)?)?;
    Ok(())
}
