//! Crate root: module orchestration and public re-exports.
//!
//! Modules:
//! - `tree`, `node`, `taxon`: the arena tree, its node/edge records and the
//!   shared taxon namespace.
//! - `edit`, `reroot`: structural edits and rerooting.
//! - `traversal`: preorder, postorder, level-order, leaf and ancestor walks.
//! - `splits`: split bitmask encoding and the split registry.
//! - `validate`: structural checks and the indented debug form.
//! - `newick`: Newick output.
//! - `stats`: node ages, coalescence intervals, gamma statistic.
//! - `tree_list`: trees sharing one namespace.
//! - `snapshot`, `distances`: thread-safe split snapshots and RF / weighted RF /
//!   Kuhner-Felsenstein distances.
//! - `io`: reading Newick and BEAST/NEXUS files, writing distance matrices.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod bitset;
pub mod distances;
pub mod edit;
pub mod error;
pub mod io;
pub mod newick;
pub mod node;
pub mod reroot;
pub mod snapshot;
pub mod splits;
pub mod stats;
pub mod taxon;
pub mod traversal;
pub mod tree;
pub mod tree_list;
pub mod validate;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use bitset::Bitset;
pub use error::{ErrorKind, PhyloError, Result};
pub use io::{parse_newick, read_beast_trees, write_matrix_tsv};
pub use node::{Edge, EdgeId, Node, NodeData, NodeId};
pub use reroot::RerootOptions;
pub use snapshot::TreeSnapshot;
pub use taxon::{NamespaceRef, Taxon, TaxonId, TaxonNamespace};
pub use tree::Tree;
pub use tree_list::TreeList;
