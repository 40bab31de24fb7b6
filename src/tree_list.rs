//! Collections of trees over one taxon namespace.

use crate::error::{PhyloError, Result};
use crate::snapshot::TreeSnapshot;
use crate::taxon::NamespaceRef;
use crate::tree::Tree;
use std::rc::Rc;

/// Trees sharing a single [`TaxonNamespace`](crate::taxon::TaxonNamespace),
/// so their split bitmasks can be compared directly.
#[derive(Debug, Clone)]
pub struct TreeList {
    namespace: NamespaceRef,
    trees: Vec<Tree>,
}

impl TreeList {
    pub fn new(namespace: NamespaceRef) -> Self {
        TreeList { namespace, trees: Vec::new() }
    }

    pub fn namespace(&self) -> &NamespaceRef {
        &self.namespace
    }

    /// Creates an empty tree on this list's namespace (not added to the list).
    pub fn new_tree(&self) -> Tree {
        Tree::new(Rc::clone(&self.namespace))
    }

    /// Appends `tree`, which must use this list's namespace.
    pub fn push(&mut self, tree: Tree) -> Result<()> {
        if !Rc::ptr_eq(tree.namespace(), &self.namespace) {
            return Err(PhyloError::ForeignNamespace);
        }
        self.trees.push(tree);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Tree> {
        self.trees.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Tree> {
        self.trees.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tree> {
        self.trees.iter()
    }

    /// Encodes splits on every tree that is not encoded yet.
    pub fn encode_all_splits(&mut self) -> Result<()> {
        for tree in self.trees.iter_mut().filter(|t| !t.is_encoded()) {
            tree.encode_splits()?;
        }
        Ok(())
    }

    /// Thread-safe split snapshots of every tree, encoding splits first.
    pub fn snapshots(&mut self) -> Result<Vec<TreeSnapshot>> {
        self.encode_all_splits()?;
        self.trees.iter().map(TreeSnapshot::from_tree).collect()
    }

    pub fn into_trees(self) -> Vec<Tree> {
        self.trees
    }
}

impl<'a> IntoIterator for &'a TreeList {
    type Item = &'a Tree;
    type IntoIter = std::slice::Iter<'a, Tree>;

    fn into_iter(self) -> Self::IntoIter {
        self.trees.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_newick;
    use crate::taxon::TaxonNamespace;

    #[test]
    fn test_push_rejects_foreign_namespace() {
        let ns = TaxonNamespace::new().into_shared();
        let mut list = TreeList::new(ns);
        list.push(list.new_tree()).unwrap();
        let err = list.push(Tree::default()).unwrap_err();
        assert!(matches!(err, PhyloError::ForeignNamespace));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_snapshots() {
        let ns = TaxonNamespace::new().into_shared();
        let mut list = TreeList::new(Rc::clone(&ns));
        for text in ["((A,B),(C,D));", "((A,C),(B,D));"] {
            list.push(parse_newick(text, &ns).unwrap()).unwrap();
        }
        let snapshots = list.snapshots().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(list.iter().all(Tree::is_encoded));
        assert_eq!(ns.borrow().len(), 4);
    }
}
