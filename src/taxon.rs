//! Taxa and the namespace that assigns each of them a bit position.
//!
//! A [`TaxonNamespace`] is shared by every tree built over the same taxon
//! universe, so splits of different trees can be compared bit for bit.
//! Taxa are only ever appended: a taxon's position never changes once it
//! exists, which keeps every split bitmask computed against the namespace valid.

use crate::bitset::Bitset;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Identity of a taxon within its namespace, doubling as its bit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxonId(pub usize);

impl TaxonId {
    /// Bit position of this taxon in split bitmasks.
    #[inline]
    pub fn bit(self) -> usize {
        self.0
    }
}

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "taxon#{}", self.0)
    }
}

/// An operational taxonomic unit. Immutable once created.
#[derive(Debug, Clone)]
pub struct Taxon {
    id: TaxonId,
    label: String,
}

impl Taxon {
    pub fn id(&self) -> TaxonId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Handle through which trees share a namespace.
pub type NamespaceRef = Rc<RefCell<TaxonNamespace>>;

/// Ordered collection of taxa.
#[derive(Debug, Clone, Default)]
pub struct TaxonNamespace {
    taxa: Vec<Taxon>,
    /// First taxon created for each label
    by_label: HashMap<String, TaxonId>,
}

impl TaxonNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a namespace whose bit positions follow the order of `labels`.
    ///
    /// Repeated labels resolve to the taxon created first.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ns = Self::new();
        for label in labels {
            ns.require_taxon(label.as_ref());
        }
        ns
    }

    /// Wraps the namespace for sharing between trees.
    pub fn into_shared(self) -> NamespaceRef {
        Rc::new(RefCell::new(self))
    }

    /// Appends a new taxon, even if another taxon already carries `label`.
    pub fn new_taxon(&mut self, label: &str) -> TaxonId {
        let id = TaxonId(self.taxa.len());
        self.taxa.push(Taxon { id, label: label.to_string() });
        self.by_label.entry(label.to_string()).or_insert(id);
        id
    }

    /// Returns the taxon labelled `label`, creating it if absent.
    pub fn require_taxon(&mut self, label: &str) -> TaxonId {
        match self.by_label.get(label) {
            Some(&id) => id,
            None => self.new_taxon(label),
        }
    }

    /// Looks up the first taxon labelled `label`.
    pub fn get_taxon(&self, label: &str) -> Option<TaxonId> {
        self.by_label.get(label).copied()
    }

    pub fn taxon(&self, id: TaxonId) -> Option<&Taxon> {
        self.taxa.get(id.0)
    }

    pub fn label(&self, id: TaxonId) -> Option<&str> {
        self.taxon(id).map(Taxon::label)
    }

    pub fn contains(&self, id: TaxonId) -> bool {
        id.0 < self.taxa.len()
    }

    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    /// Iterates over taxa in bit-position order.
    pub fn iter(&self) -> impl Iterator<Item = &Taxon> {
        self.taxa.iter()
    }

    /// Bitmask with only the bit of `id` set.
    ///
    /// The bit is produced even for ids this namespace never issued; split
    /// encoding detects those through the taxa mask.
    pub fn taxon_bitmask(&self, id: TaxonId) -> Bitset {
        Bitset::singleton(id.bit())
    }

    /// Bitmask with the bit of every taxon in the namespace set.
    pub fn all_taxa_bitmask(&self) -> Bitset {
        let mut mask = Bitset::new();
        for taxon in &self.taxa {
            mask.set(taxon.id.bit());
        }
        mask
    }

    /// Taxa whose bits are set in `mask`.
    pub fn taxa_in(&self, mask: &Bitset) -> Vec<TaxonId> {
        mask.iter_ones()
            .filter(|&bit| bit < self.taxa.len())
            .map(TaxonId)
            .collect()
    }

    /// Renders `mask` one character per taxon, last taxon first.
    pub fn split_as_string(&self, mask: &Bitset) -> String {
        mask.to_bit_string(self.taxa.len(), '.', '*')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_taxon_reuses() {
        let mut ns = TaxonNamespace::new();
        let a = ns.require_taxon("A");
        let b = ns.require_taxon("B");
        assert_eq!(ns.require_taxon("A"), a);
        assert_ne!(a, b);
        assert_eq!(ns.len(), 2);
        assert_eq!(ns.label(b), Some("B"));
    }

    #[test]
    fn test_same_label_distinct_identity() {
        let mut ns = TaxonNamespace::new();
        let first = ns.new_taxon("A");
        let second = ns.new_taxon("A");
        assert_ne!(first, second);
        assert_eq!(ns.get_taxon("A"), Some(first));
        assert_ne!(ns.taxon_bitmask(first), ns.taxon_bitmask(second));
    }

    #[test]
    fn test_bit_positions_stable() {
        let mut ns = TaxonNamespace::from_labels(["A", "B", "C"]);
        let c = ns.get_taxon("C").unwrap();
        let before = ns.taxon_bitmask(c);
        ns.require_taxon("D");
        assert_eq!(ns.taxon_bitmask(c), before);
        assert_eq!(before.count_ones(), 1);
        assert_eq!(ns.all_taxa_bitmask(), Bitset::from(0b1111));
    }

    #[test]
    fn test_split_as_string() {
        let ns = TaxonNamespace::from_labels(["A", "B", "C", "D"]);
        assert_eq!(ns.split_as_string(&Bitset::from(0b0011)), "..**");
        assert_eq!(ns.taxa_in(&Bitset::from(0b1010)), vec![TaxonId(1), TaxonId(3)]);
    }
}
