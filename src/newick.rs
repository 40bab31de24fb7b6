//! Newick serialization behind [`Tree::as_newick_string`].

use crate::node::NodeId;
use crate::taxon::TaxonId;
use crate::tree::Tree;
use std::fmt;

/// Controls what [`to_newick`] writes.
pub struct NewickOptions<'a> {
    /// Write `:length` after nodes whose edge has a length.
    pub edge_lengths: bool,
    /// Write plain labels of internal nodes. Taxon names are written either way.
    pub include_internal_labels: bool,
    /// Name taxa with this function instead of their namespace label.
    pub reverse_translate: Option<&'a dyn Fn(TaxonId) -> String>,
}

impl Default for NewickOptions<'_> {
    fn default() -> Self {
        NewickOptions {
            edge_lengths: true,
            include_internal_labels: false,
            reverse_translate: None,
        }
    }
}

impl fmt::Debug for NewickOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewickOptions")
            .field("edge_lengths", &self.edge_lengths)
            .field("include_internal_labels", &self.include_internal_labels)
            .field("reverse_translate", &self.reverse_translate.is_some())
            .finish()
    }
}

/// Returns the Newick representation of `tree`, terminated with `;`.
///
/// # Example
/// ```
/// use phylo_splits::newick::NewickOptions;
/// use phylo_splits::node::NodeData;
/// use phylo_splits::tree::Tree;
///
/// let mut tree = Tree::default();
/// let seed = tree.seed_node();
/// for (label, len) in [("A", 1.0), ("B", 2.5)] {
///     let taxon = tree.require_taxon(label);
///     tree.new_child(seed, NodeData::taxon(taxon).with_length(len));
/// }
/// assert_eq!(tree.as_newick_string(&NewickOptions::default()), "(A:1,B:2.5);");
/// ```
pub fn to_newick(tree: &Tree, options: &NewickOptions<'_>) -> String {
    enum Step {
        Enter(NodeId),
        Separator,
        Exit(NodeId),
    }

    let mut newick = String::with_capacity(tree.nodes.len() * 8);
    let mut stack = vec![Step::Enter(tree.seed_node())];
    while let Some(step) = stack.pop() {
        match step {
            Step::Enter(node) => {
                let children = tree[node].children();
                stack.push(Step::Exit(node));
                if !children.is_empty() {
                    newick.push('(');
                    for (i, &child) in children.iter().enumerate().rev() {
                        stack.push(Step::Enter(child));
                        if i > 0 {
                            stack.push(Step::Separator);
                        }
                    }
                }
            }
            Step::Separator => newick.push(','),
            Step::Exit(node) => {
                if tree[node].is_internal() {
                    newick.push(')');
                }
                push_node_label(tree, node, options, &mut newick);
                if options.edge_lengths
                    && let Some(length) = tree.edge_length(node)
                {
                    newick.push(':');
                    newick.push_str(&length.to_string());
                }
            }
        }
    }
    newick.push(';');
    newick
}

fn push_node_label(tree: &Tree, node: NodeId, options: &NewickOptions<'_>, newick: &mut String) {
    let node_ref = &tree[node];
    // Taxa are always named, wherever they sit
    let label = match (node_ref.taxon(), options.reverse_translate) {
        (Some(taxon), Some(translate)) => Some(translate(taxon)),
        (Some(taxon), None) => tree.namespace().borrow().label(taxon).map(str::to_string),
        (None, _) if node_ref.is_internal() && !options.include_internal_labels => None,
        (None, _) => node_ref.label().map(str::to_string),
    };
    if let Some(label) = label {
        newick.push_str(&escape_label(&label));
    }
}

/// Quotes labels containing Newick punctuation, doubling inner quotes;
/// other labels get spaces replaced by underscores.
///
/// ```
/// # use phylo_splits::newick::escape_label;
/// assert_eq!(escape_label("Pukeko"), "Pukeko");
/// assert_eq!(escape_label("Swamp hen"), "Swamp_hen");
/// assert_eq!(escape_label("Baillon's crake"), "'Baillon''s crake'");
/// assert_eq!(escape_label("a:b"), "'a:b'");
/// ```
pub fn escape_label(label: &str) -> String {
    let needs_quotes = label.chars().any(|c| {
        matches!(
            c,
            ',' | ';' | '\t' | '\n' | '\r' | '(' | ')' | ':' | '[' | ']' | '\''
        )
    });
    if needs_quotes {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.replace(' ', "_")
    }
}
