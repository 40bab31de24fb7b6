//! Error types for tree construction, editing and split encoding.

use crate::bitset::Bitset;
use crate::node::NodeId;
use thiserror::Error;

/// Result type alias for tree operations.
pub type Result<T> = std::result::Result<T, PhyloError>;

/// Broad classes of failure, independent of the concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Pointer inconsistency inside the tree. Indicates a bug, never expected.
    StructuralViolation,
    /// The caller asked for something the current tree cannot do.
    InvalidOperation,
    /// A split bitmask has bits outside the taxa mask.
    MaskOverflow,
    /// A computation needs more than the seed node.
    EmptyTree,
    /// Reading or writing outside the core failed.
    Io,
}

/// Errors that can occur while working with trees.
#[derive(Error, Debug)]
pub enum PhyloError {
    /// Parent/child or head/tail pointers disagree.
    #[error("structural violation: {0}")]
    StructuralViolation(String),

    /// `child` is not in the child list of `parent`.
    #[error("node {child} is not a child of node {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Node is not reachable from the seed node.
    #[error("node {0} is not reachable from the seed node")]
    NotInTree(NodeId),

    /// Operation needs split bitmasks that have not been computed.
    #[error("split bitmasks have not been encoded on this tree")]
    SplitsNotEncoded,

    /// A leaf has no taxon and cannot contribute a bit.
    #[error("leaf node {0} has no taxon")]
    UntaxonedLeaf(NodeId),

    /// A computed split bitmask escapes the taxa mask.
    #[error("split {mask} has bits outside taxa mask {taxa_mask}")]
    MaskOverflow { mask: Bitset, taxa_mask: Bitset },

    /// The tree has nothing beyond its seed node.
    #[error("empty tree encountered")]
    EmptyTree,

    /// Root-to-tip path lengths disagree.
    #[error("tree is not ultrametric")]
    NotUltrametric,

    /// Trees compared or collected together use different taxon namespaces.
    #[error("tree uses a different taxon namespace")]
    ForeignNamespace,

    /// Any other operation the current tree state does not allow.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Tree text could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PhyloError {
    /// Maps the variant onto its broad [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            PhyloError::StructuralViolation(_) => ErrorKind::StructuralViolation,
            PhyloError::NotAChild { .. }
            | PhyloError::NotInTree(_)
            | PhyloError::SplitsNotEncoded
            | PhyloError::UntaxonedLeaf(_)
            | PhyloError::NotUltrametric
            | PhyloError::ForeignNamespace
            | PhyloError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            PhyloError::MaskOverflow { .. } => ErrorKind::MaskOverflow,
            PhyloError::EmptyTree => ErrorKind::EmptyTree,
            PhyloError::Parse(_) | PhyloError::Io(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let err = PhyloError::NotAChild { parent: NodeId(0), child: NodeId(3) };
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert_eq!(err.to_string(), "node 3 is not a child of node 0");
        assert_eq!(PhyloError::EmptyTree.kind(), ErrorKind::EmptyTree);
    }
}
