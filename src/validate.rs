//! Structural checks and a debugging view of the tree.

use crate::bitset::Bitset;
use crate::error::{PhyloError, Result};
use crate::node::{EdgeId, NodeId};
use crate::tree::Tree;
use std::collections::HashSet;
use std::fmt::Write;

impl Tree {
    /// Walks the tree from the seed and checks every pointer invariant, and
    /// the split bitmasks when the tree is encoded. Stops at the first
    /// violation.
    pub fn validate(&self) -> Result<()> {
        let seed = self.seed;
        if self[seed].parent.is_some() {
            return Err(violation(format!("seed node {seed} has a parent")));
        }
        if self.edge_of(seed).tail.is_some() {
            return Err(violation(format!("seed edge {} has a tail node", self[seed].edge)));
        }

        let taxa_mask = match self.split_edges {
            Some(_) => Some(self.taxa_mask()?),
            None => None,
        };
        let mut seen_nodes = HashSet::new();
        let mut seen_edges: HashSet<EdgeId> = HashSet::new();
        let mut stack = vec![seed];
        while let Some(node) = stack.pop() {
            if node.0 >= self.nodes.len() {
                return Err(violation(format!("node {node} is outside the arena")));
            }
            if !seen_nodes.insert(node) {
                return Err(violation(format!("node {node} is reachable twice")));
            }
            let edge = self[node].edge;
            if !seen_edges.insert(edge) {
                return Err(violation(format!("edge {edge} is owned twice")));
            }
            if self[edge].head != node {
                return Err(violation(format!("edge {edge} does not point back to node {node}")));
            }
            if self[edge].tail != self[node].parent {
                return Err(violation(format!("edge {edge} tail disagrees with parent of node {node}")));
            }
            for &child in self[node].children() {
                if child.0 >= self.nodes.len() || self[child].parent != Some(node) {
                    return Err(violation(format!("child {child} does not point back to node {node}")));
                }
            }
            if let Some(taxa_mask) = &taxa_mask {
                self.check_split(node, taxa_mask)?;
            }
            stack.extend(self[node].children().iter().rev());
        }

        if let Some(registry) = &self.split_edges {
            for (mask, &edge) in registry {
                if !seen_edges.contains(&edge) {
                    return Err(violation(format!("registered edge {edge} is not in the tree")));
                }
                if self[edge].split_bitmask.as_ref() != Some(mask) {
                    return Err(violation(format!("edge {edge} is registered under {mask}")));
                }
            }
        }
        Ok(())
    }

    fn check_split(&self, node: NodeId, taxa_mask: &Bitset) -> Result<()> {
        let edge = self[node].edge;
        let Some(mask) = &self[edge].split_bitmask else {
            return Err(violation(format!("edge {edge} has no split bitmask")));
        };
        if !mask.is_subset_of(taxa_mask) {
            return Err(PhyloError::MaskOverflow { mask: mask.clone(), taxa_mask: taxa_mask.clone() });
        }
        let expected = self.own_and_child_mask(node)?;
        if &expected.intersection(taxa_mask) != mask {
            return Err(violation(format!(
                "edge {edge} has split {mask}, its subtree gives {expected}"
            )));
        }
        Ok(())
    }

    /// One line per node in preorder, indented by depth. With `splits`, each
    /// line starts with the edge's split as `.`/`*` characters.
    pub fn indented_form(&self, splits: bool) -> String {
        const INDENT: &str = "    ";
        let ns = self.namespace.borrow();
        let width = ns.len();
        let mut out = String::new();
        let mut stack = vec![(self.seed, 0usize)];
        while let Some((node, level)) = stack.pop() {
            if splits {
                match self.edge_of(node).split_bitmask() {
                    Some(mask) => out.push_str(&ns.split_as_string(mask)),
                    None => out.push_str(&"?".repeat(width)),
                }
                out.push(' ');
            }
            let label = match (self[node].taxon, self[node].label()) {
                (Some(t), _) => ns.label(t).unwrap_or_default().to_string(),
                (None, Some(label)) => label.to_string(),
                (None, None) => format!("@{node}"),
            };
            let _ = writeln!(out, "{}{}", INDENT.repeat(level), label);
            stack.extend(self[node].children().iter().rev().map(|&c| (c, level + 1)));
        }
        out
    }
}

fn violation(message: String) -> PhyloError {
    PhyloError::StructuralViolation(message)
}
