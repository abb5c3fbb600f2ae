//! Symbol classes, stacks and reel strips — the atoms of the reel data model.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// A symbol is just a small non-negative integer identifier; the paytable,
/// wild/scatter sets and operator-designated "high" set give it meaning.
pub type SymbolId = u32;

/// The three disjoint symbol classes the Reel Sequencer reasons about.
///
/// `Special` is the union of wild and scatter ids; the sequencer treats both
/// uniformly for adjacency even though the Spin Engine tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolClass {
    Special,
    High,
    Low,
}

/// Derives each symbol's class from the slot configuration's wild/scatter/high
/// sets. Anything not special and not high falls into `Low` by definition.
#[derive(Debug, Clone, Default)]
pub struct SymbolClasses {
    special: HashSet<SymbolId>,
    high: HashSet<SymbolId>,
}

impl SymbolClasses {
    pub fn new(wild: &HashSet<SymbolId>, scatter: &HashSet<SymbolId>, high: &HashSet<SymbolId>) -> Self {
        let special: HashSet<SymbolId> = wild.union(scatter).copied().collect();
        let high = high.difference(&special).copied().collect();
        Self { special, high }
    }

    pub fn classify(&self, symbol: SymbolId) -> SymbolClass {
        if self.special.contains(&symbol) {
            SymbolClass::Special
        } else if self.high.contains(&symbol) {
            SymbolClass::High
        } else {
            SymbolClass::Low
        }
    }

    pub fn is_special(&self, symbol: SymbolId) -> bool {
        self.special.contains(&symbol)
    }
}

/// `length` consecutive copies of `symbol` on a strip. Equality is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stack {
    pub symbol: SymbolId,
    pub length: u32,
}

impl Stack {
    pub fn new(symbol: SymbolId, length: u32) -> Self {
        debug_assert!(length >= 1, "a stack must have at least one copy");
        Self { symbol, length }
    }
}

/// Per-reel histogram of stack counts: for each symbol, an ordered sequence
/// whose index `i` gives the multiplicity of stacks of length `i + 1`.
///
/// Stored as a flat matrix indexed by (symbol row, length index) with a
/// sidecar symbol-id list, per the row/col layout idiomatic for this kind of
/// small fixed-shape genome — cloning an individual is then a plain `Vec`
/// copy rather than a tree of hash maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackHistogram {
    symbols: Vec<SymbolId>,
    counts: Vec<Vec<u32>>,
}

impl StackHistogram {
    /// Builds a histogram from an explicit (symbol, counts) list. Symbol
    /// order is preserved — the Sequencer enumerates specials in this order.
    pub fn from_rows(rows: Vec<(SymbolId, Vec<u32>)>) -> Self {
        let mut symbols = Vec::with_capacity(rows.len());
        let mut counts = Vec::with_capacity(rows.len());
        for (symbol, row) in rows {
            symbols.push(symbol);
            counts.push(row);
        }
        Self { symbols, counts }
    }

    /// Builds a histogram from a deterministically ordered map (ascending
    /// symbol id), matching "histogram iteration by ascending symbol id"
    /// from the Sequencer's contract.
    pub fn from_map(map: BTreeMap<SymbolId, Vec<u32>>) -> Self {
        Self::from_rows(map.into_iter().collect())
    }

    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    pub fn counts_for(&self, symbol: SymbolId) -> Option<&[u32]> {
        self.symbols
            .iter()
            .position(|&s| s == symbol)
            .map(|row| self.counts[row].as_slice())
    }

    pub fn rows(&self) -> impl Iterator<Item = (SymbolId, &[u32])> {
        self.symbols
            .iter()
            .copied()
            .zip(self.counts.iter().map(|c| c.as_slice()))
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = (SymbolId, &mut Vec<u32>)> {
        self.symbols.iter().copied().zip(self.counts.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Materializes every stack instance this histogram describes, one
    /// `Stack` per stacked copy, in (symbol row, length index) order.
    pub fn to_stacks(&self) -> Vec<Stack> {
        let mut stacks = Vec::new();
        for (&symbol, lengths) in self.symbols.iter().zip(self.counts.iter()) {
            for (i, &count) in lengths.iter().enumerate() {
                for _ in 0..count {
                    stacks.push(Stack::new(symbol, (i + 1) as u32));
                }
            }
        }
        stacks
    }

    /// Total strip length this histogram would produce:
    /// `Σ_symbol Σ_i count[i] × (i + 1)`.
    pub fn total_length(&self) -> u64 {
        self.counts
            .iter()
            .flat_map(|row| row.iter().enumerate())
            .map(|(i, &count)| count as u64 * (i + 1) as u64)
            .sum()
    }
}

/// An ordered cyclic sequence of symbols consumed by the Spin Engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReelStrip {
    symbols: Vec<SymbolId>,
}

impl ReelStrip {
    pub fn new(symbols: Vec<SymbolId>) -> Self {
        Self { symbols }
    }

    pub fn from_stacks(stacks: &[Stack]) -> Self {
        let mut symbols = Vec::with_capacity(stacks.iter().map(|s| s.length as usize).sum());
        for stack in stacks {
            symbols.extend(std::iter::repeat_n(stack.symbol, stack.length as usize));
        }
        Self { symbols }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn as_slice(&self) -> &[SymbolId] {
        &self.symbols
    }

    /// Symbol at `position`, wrapping cyclically.
    #[inline]
    pub fn symbol_at(&self, position: usize) -> SymbolId {
        self.symbols[position % self.symbols.len()]
    }

    /// Run-length-encodes the strip back into stacks, linearly from index 0
    /// (not merging across the wraparound boundary). Used to check the
    /// Sequencer's round-trip property against a source histogram.
    pub fn to_stacks(&self) -> Vec<Stack> {
        let mut stacks = Vec::new();
        let mut iter = self.symbols.iter().copied().peekable();
        while let Some(symbol) = iter.next() {
            let mut length = 1u32;
            while iter.peek() == Some(&symbol) {
                iter.next();
                length += 1;
            }
            stacks.push(Stack::new(symbol, length));
        }
        stacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histogram_round_trips_through_stacks() {
        let hist = StackHistogram::from_rows(vec![(5, vec![2, 0, 1])]);
        let stacks = hist.to_stacks();
        assert_eq!(stacks.len(), 3);
        assert_eq!(stacks.iter().filter(|s| s.length == 1).count(), 2);
        assert_eq!(stacks.iter().filter(|s| s.length == 3).count(), 1);
        assert_eq!(hist.total_length(), 2 * 1 + 1 * 3);
    }

    #[test]
    fn reel_strip_wraps() {
        let strip = ReelStrip::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(strip.symbol_at(0), 1);
        assert_eq!(strip.symbol_at(5), 1);
        assert_eq!(strip.symbol_at(7), 3);
    }

    #[test]
    fn reel_strip_rle_recovers_stacks() {
        let strip = ReelStrip::new(vec![5, 5, 7, 7, 7, 9]);
        let stacks = strip.to_stacks();
        assert_eq!(
            stacks,
            vec![Stack::new(5, 2), Stack::new(7, 3), Stack::new(9, 1)]
        );
    }

    #[test]
    fn classifies_special_high_low() {
        let wild: HashSet<SymbolId> = [1].into_iter().collect();
        let scatter: HashSet<SymbolId> = [2].into_iter().collect();
        let high: HashSet<SymbolId> = [3, 4].into_iter().collect();
        let classes = SymbolClasses::new(&wild, &scatter, &high);

        assert_eq!(classes.classify(1), SymbolClass::Special);
        assert_eq!(classes.classify(2), SymbolClass::Special);
        assert_eq!(classes.classify(3), SymbolClass::High);
        assert_eq!(classes.classify(5), SymbolClass::Low);
    }
}
