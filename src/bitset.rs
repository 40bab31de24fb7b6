//! Arbitrary-width bitset used as a split bitmask.
//!
//! # Overview
//! Each taxon of a [`TaxonNamespace`](crate::taxon::TaxonNamespace) owns one bit
//! position. A split bitmask marks the taxa on the head side of an edge.
//!
//! # Example
//! For a namespace with taxa [A, B, C, D] at positions [0, 1, 2, 3]:
//! - Split {A, C} → bitset `0b0101` (bits 0 and 2 set)
//! - Split {B, C, D} → bitset `0b1110` (bits 1, 2, 3 set)
//!
//! # Canonical form
//! Trailing zero words are always trimmed, so two bitsets with the same bits
//! compare and hash equal no matter how many taxa existed when they were built.

use std::cmp::Ordering;
use std::fmt;

/// A compact bitset over taxon bit positions.
///
/// Internally stores bits in `Vec<u64>` words to support arbitrarily many taxa.
/// Each u64 word holds 64 positions.
///
/// Ordering is numeric: the bitset is read as one unsigned integer.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Bitset(Vec<u64>);

impl Bitset {
    /// Creates an empty bitset.
    pub fn new() -> Self {
        Bitset(Vec::new())
    }

    /// Creates a bitset from raw words, least significant word first.
    ///
    /// # Example
    /// ```
    /// # use phylo_splits::bitset::Bitset;
    /// let bs = Bitset::from_words(vec![0b101, 0]);
    /// assert_eq!(bs.words(), &[0b101]);
    /// ```
    pub fn from_words(words: Vec<u64>) -> Self {
        let mut bs = Bitset(words);
        bs.trim();
        bs
    }

    /// Creates a bitset with exactly one bit set.
    pub fn singleton(idx: usize) -> Self {
        let mut bs = Bitset::new();
        bs.set(idx);
        bs
    }

    /// Raw words, least significant first. Never ends in a zero word.
    pub fn words(&self) -> &[u64] {
        &self.0
    }

    /// Sets the bit at the given index to 1, growing as needed.
    ///
    /// # Example
    /// ```
    /// # use phylo_splits::bitset::Bitset;
    /// let mut bs = Bitset::new();
    /// bs.set(0);
    /// bs.set(5);
    /// assert_eq!(bs.words()[0], 0b00100001);
    /// ```
    #[inline]
    pub fn set(&mut self, idx: usize) {
        let word = idx >> 6; // Equivalent to idx / 64
        let bit = idx & 63; // Equivalent to idx % 64
        if word >= self.0.len() {
            self.0.resize(word + 1, 0);
        }
        self.0[word] |= 1u64 << bit;
    }

    /// Returns whether the bit at `idx` is set.
    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.word(idx >> 6) & (1u64 << (idx & 63)) != 0
    }

    /// Performs bitwise OR with another bitset (union operation).
    ///
    /// # Example
    /// ```
    /// # use phylo_splits::bitset::Bitset;
    /// let mut left = Bitset::singleton(0);
    /// left.or_assign(&Bitset::singleton(1));
    /// assert_eq!(left.words()[0], 0b11);
    /// ```
    #[inline]
    pub fn or_assign(&mut self, other: &Bitset) {
        if other.0.len() > self.0.len() {
            self.0.resize(other.0.len(), 0);
        }
        for (a, b) in self.0.iter_mut().zip(&other.0) {
            *a |= *b;
        }
    }

    /// Returns `self | other`.
    pub fn union(&self, other: &Bitset) -> Bitset {
        let mut out = self.clone();
        out.or_assign(other);
        out
    }

    /// Returns `self & other`.
    pub fn intersection(&self, other: &Bitset) -> Bitset {
        Bitset::from_words(self.0.iter().zip(&other.0).map(|(a, b)| a & b).collect())
    }

    /// Returns `self ^ other`.
    pub fn symmetric_difference(&self, other: &Bitset) -> Bitset {
        let len = self.0.len().max(other.0.len());
        Bitset::from_words((0..len).map(|i| self.word(i) ^ other.word(i)).collect())
    }

    /// Returns `!self & universe`, the other side of a split within `universe`.
    ///
    /// # Example
    /// ```
    /// # use phylo_splits::bitset::Bitset;
    /// let universe = Bitset::from(0b1111);
    /// assert_eq!(Bitset::from(0b0011).complement_in(&universe), Bitset::from(0b1100));
    /// ```
    pub fn complement_in(&self, universe: &Bitset) -> Bitset {
        Bitset::from_words(
            universe
                .0
                .iter()
                .enumerate()
                .map(|(i, u)| u & !self.word(i))
                .collect(),
        )
    }

    /// Returns whether every bit of `self` is also set in `other`.
    pub fn is_subset_of(&self, other: &Bitset) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(i, w)| w & !other.word(i) == 0)
    }

    /// Returns whether no bit is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Counts the number of set bits (population count).
    #[inline]
    pub fn count_ones(&self) -> usize {
        self.0.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates over the indices of set bits in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(i, &w)| {
            (0..64)
                .filter(move |b| w & (1u64 << b) != 0)
                .map(move |b| i * 64 + b)
        })
    }

    /// Renders `width` positions, highest position first.
    ///
    /// # Example
    /// ```
    /// # use phylo_splits::bitset::Bitset;
    /// assert_eq!(Bitset::from(0b0110).to_bit_string(4, '.', '*'), ".**.");
    /// ```
    pub fn to_bit_string(&self, width: usize, off: char, on: char) -> String {
        (0..width)
            .rev()
            .map(|i| if self.contains(i) { on } else { off })
            .collect()
    }

    #[inline]
    fn word(&self, i: usize) -> u64 {
        self.0.get(i).copied().unwrap_or(0)
    }

    fn trim(&mut self) {
        while self.0.last() == Some(&0) {
            self.0.pop();
        }
    }
}

impl From<u64> for Bitset {
    fn from(word: u64) -> Self {
        Bitset::from_words(vec![word])
    }
}

impl Ord for Bitset {
    fn cmp(&self, other: &Self) -> Ordering {
        // Trimmed form: more words means a larger number.
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.iter().rev().cmp(other.0.iter().rev()))
    }
}

impl PartialOrd for Bitset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Bitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((last, rest)) = self.0.split_last() else {
            return write!(f, "0b0");
        };
        write!(f, "0b{last:b}")?;
        for w in rest.iter().rev() {
            write!(f, "{w:064b}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_basic() {
        let mut bs = Bitset::new();
        bs.set(0);
        bs.set(2);
        assert_eq!(bs.words()[0], 0b0101);
        assert!(bs.contains(2));
        assert!(!bs.contains(1));
        assert!(!bs.contains(500));
    }

    #[test]
    fn test_bitset_or() {
        let mut bs1 = Bitset::from(0b0011);
        let bs2 = Bitset::from(0b1100);
        bs1.or_assign(&bs2);
        assert_eq!(bs1, Bitset::from(0b1111));
    }

    #[test]
    fn test_count_ones() {
        let mut bs = Bitset::new();
        bs.set(0);
        bs.set(2);
        bs.set(5);
        assert_eq!(bs.count_ones(), 3);
        assert_eq!(bs.iter_ones().collect::<Vec<_>>(), vec![0, 2, 5]);
    }

    /// Split bitmasks of a small tree
    ///
    /// ```text
    ///           root
    ///          /    \
    ///        node1   D
    ///        /   \
    ///       A    node2
    ///            /   \
    ///           B     C
    /// ```
    ///
    /// Taxa: A=0, B=1, C=2, D=3
    ///
    /// - node2: {B, C} → `0b0110`
    /// - node1: {A, B, C} → `0b0111`
    /// - root: all taxa → `0b1111`
    #[test]
    fn test_mini_tree_example() {
        let mut node2 = Bitset::singleton(1);
        node2.or_assign(&Bitset::singleton(2));
        assert_eq!(node2.words()[0], 0b0110);

        let mut node1 = Bitset::singleton(0);
        node1.or_assign(&node2);
        assert_eq!(node1.words()[0], 0b0111);

        let root = node1.union(&Bitset::singleton(3));
        assert_eq!(node1.complement_in(&root), Bitset::singleton(3));
        assert!(node2.is_subset_of(&node1));
        assert!(!root.is_subset_of(&node1));
    }

    #[test]
    fn test_large_tree() {
        let mut bs = Bitset::new();
        bs.set(0);
        bs.set(63);
        bs.set(64);
        bs.set(127);

        assert_eq!(bs.count_ones(), 4);
        assert_eq!(bs.words()[0], 1u64 | (1u64 << 63));
        assert_eq!(bs.words()[1], 1u64 | (1u64 << 63));
    }

    #[test]
    fn test_trimmed_equality() {
        let wide = Bitset::from_words(vec![0b10, 0, 0]);
        assert_eq!(wide, Bitset::from(0b10));

        let mut high = Bitset::singleton(70);
        let low = Bitset::singleton(70).complement_in(&Bitset::singleton(70));
        assert!(low.is_empty());
        high.or_assign(&low);
        assert_eq!(high.words().len(), 2);
        assert_eq!(Bitset::singleton(70).intersection(&Bitset::singleton(3)), Bitset::new());
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(Bitset::from(0b0011) < Bitset::from(0b1100));
        assert!(Bitset::from(u64::MAX) < Bitset::singleton(64));
        assert!(Bitset::new() < Bitset::singleton(0));
        assert_eq!(Bitset::from(7).cmp(&Bitset::from(7)), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        assert_eq!(Bitset::new().to_string(), "0b0");
        assert_eq!(Bitset::from(0b1010).to_string(), "0b1010");
        assert_eq!(Bitset::singleton(64).to_string(), format!("0b1{}", "0".repeat(64)));
    }
}
