//! Ages and summary statistics of ultrametric trees.
//!
//! Per-node results are returned as [`NodeAnnotations`] side-tables rather
//! than stored on the nodes. Missing edge lengths count as zero.

use crate::error::{PhyloError, Result};
use crate::node::NodeId;
use crate::tree::Tree;
use std::collections::HashMap;

/// Values attached to nodes of one tree, keyed by handle.
pub type NodeAnnotations<T> = HashMap<NodeId, T>;

fn require_nonempty(tree: &Tree) -> Result<()> {
    if tree[tree.seed_node()].is_leaf() {
        Err(PhyloError::EmptyTree)
    } else {
        Ok(())
    }
}

/// Age of every node: its distance to the tips below it.
///
/// The age of a node is taken through its first child; when another child
/// gives an age more than `check_prec` away, the tree is not ultrametric. A
/// negative `check_prec` disables the check.
pub fn node_ages(tree: &Tree, check_prec: f64) -> Result<NodeAnnotations<f64>> {
    require_nonempty(tree)?;
    let mut ages: NodeAnnotations<f64> = NodeAnnotations::new();
    for node in tree.postorder_node_iter() {
        let via = |child: NodeId| ages[&child] + tree.edge_length(child).unwrap_or(0.0);
        let age = match tree[node].children() {
            [] => 0.0,
            [first, rest @ ..] => {
                let age = via(*first);
                if check_prec >= 0.0 && rest.iter().any(|&c| (via(c) - age).abs() > check_prec) {
                    return Err(PhyloError::NotUltrametric);
                }
                age
            }
        };
        ages.insert(node, age);
    }
    Ok(ages)
}

/// Ages of the internal nodes, youngest first.
pub fn internal_node_ages(tree: &Tree, check_prec: f64) -> Result<Vec<f64>> {
    let ages = node_ages(tree, check_prec)?;
    let mut internal: Vec<f64> = tree.internal_nodes().into_iter().map(|n| ages[&n]).collect();
    internal.sort_by(f64::total_cmp);
    Ok(internal)
}

/// Waiting times between successive coalescence events, youngest first.
pub fn coalescence_intervals(tree: &Tree, check_prec: f64) -> Result<Vec<f64>> {
    let ages = internal_node_ages(tree, check_prec)?;
    let mut intervals = Vec::with_capacity(ages.len());
    let mut previous = 0.0;
    for age in ages {
        intervals.push(age - previous);
        previous = age;
    }
    Ok(intervals)
}

/// Gamma statistic of Pybus and Harvey (2000) for a binary ultrametric tree.
///
/// Under a pure-birth process the statistic follows a standard normal
/// distribution. Needs at least three leaves.
pub fn pybus_harvey_gamma(tree: &Tree, prec: f64) -> Result<f64> {
    require_nonempty(tree)?;
    if let Some(node) = tree.find_node(|n| n.is_internal() && n.num_children() != 2) {
        return Err(PhyloError::InvalidOperation(format!(
            "gamma needs a binary tree, node {node} is not bifurcating"
        )));
    }
    let n = tree.leaf_iter().count();
    if n < 3 {
        return Err(PhyloError::InvalidOperation(format!(
            "gamma needs at least 3 leaves, found {n}"
        )));
    }

    // Waiting times g_2 .. g_n, oldest interval first
    let mut speciation_ages = internal_node_ages(tree, prec)?;
    speciation_ages.reverse();
    let mut g: Vec<f64> = speciation_ages.windows(2).map(|w| w[0] - w[1]).collect();
    g.extend(speciation_ages.last());

    let mut t = 0.0;
    let mut accum = 0.0;
    for i in 2..n {
        t += i as f64 * g[i - 2];
        accum += t;
    }
    t += n as f64 * g[n - 2];
    let nmt = n as f64 - 2.0;
    let numerator = accum / nmt - t / 2.0;
    let c = t * (1.0 / (12.0 * nmt)).sqrt();
    Ok(numerator / c)
}
