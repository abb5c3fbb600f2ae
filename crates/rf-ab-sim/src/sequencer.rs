//! The Reel Sequencer: turns a per-reel stack histogram into a concrete
//! cyclic reel strip that honors the adjacency rules between special, high
//! and low symbol stacks.
//!
//! The source this spec distills from leaks a sentinel `symbol = -1` stack
//! into the strip to signal "gap could not be filled", then discards the
//! whole attempt if one is present. Here a gap or suffix that can't be
//! filled returns `None` directly — no sentinel value ever exists.

use std::collections::BTreeMap;

use rf_slot_lab::symbols::{Stack, StackHistogram, SymbolClass, SymbolClasses};
use thiserror::Error;

use crate::rng::Mulberry32;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequencerError {
    #[error("reel sequencing exhausted {attempts} attempts for seed {seed}")]
    Exhausted { seed: u32, attempts: u32 },
    #[error("radius must be at least 1, got {radius}")]
    InvalidRadius { radius: u32 },
}

type LengthBuckets = BTreeMap<u32, Vec<Stack>>;

/// Splits a histogram into the three stack collections the sequencer
/// reasons about, ordered by ascending symbol id as the contract requires.
fn build_buckets(histogram: &StackHistogram, classes: &SymbolClasses) -> (Vec<Stack>, LengthBuckets, LengthBuckets) {
    let mut symbols: Vec<_> = histogram.rows().collect();
    symbols.sort_by_key(|(symbol, _)| *symbol);

    let mut specials = Vec::new();
    let mut high: LengthBuckets = BTreeMap::new();
    let mut low: LengthBuckets = BTreeMap::new();

    for (symbol, counts) in symbols {
        let class = classes.classify(symbol);
        for (i, &count) in counts.iter().enumerate() {
            let length = (i + 1) as u32;
            for _ in 0..count {
                let stack = Stack::new(symbol, length);
                match class {
                    SymbolClass::Special => specials.push(stack),
                    SymbolClass::High => high.entry(length).or_default().push(stack),
                    SymbolClass::Low => low.entry(length).or_default().push(stack),
                }
            }
        }
    }
    (specials, high, low)
}

/// Fills a gap of total length `gap` via the randomized DFS of spec.md §4.B.
/// Returns `None` the instant no legal move exists — no sentinel is ever
/// materialized.
fn fill_gap(gap: u32, high: &mut LengthBuckets, low: &mut LengthBuckets, rng: &mut Mulberry32) -> Option<Vec<Stack>> {
    let mut out = Vec::new();
    let mut remaining = gap;
    let mut prev_was_high = false;
    let mut is_first = true;

    while remaining > 0 {
        let mut moves: Vec<(bool, u32)> = Vec::new();
        for ln in 1..=remaining {
            if low.get(&ln).is_some_and(|v| !v.is_empty()) {
                moves.push((false, ln));
            }
            if ln < remaining
                && !is_first
                && !prev_was_high
                && high.get(&ln).is_some_and(|v| !v.is_empty())
            {
                moves.push((true, ln));
            }
        }
        if moves.is_empty() {
            return None;
        }
        let (is_high, ln) = moves[rng.uniform_index(moves.len())];
        let bucket = if is_high { &mut *high } else { &mut *low };
        let slot = bucket.get_mut(&ln).expect("move was only enumerated for a non-empty bucket");
        let pick = rng.uniform_index(slot.len());
        out.push(slot.swap_remove(pick));

        remaining -= ln;
        prev_was_high = is_high;
        is_first = false;
    }
    Some(out)
}

/// Flattens `high`/`low` (ascending length, then insertion order) and emits
/// the suffix sequence of spec.md §4.B. Returns `None` if the remaining
/// stock can't be drained without two highs becoming adjacent.
fn build_suffix(high: LengthBuckets, low: LengthBuckets, must_start_low: bool, rng: &mut Mulberry32) -> Option<Vec<Stack>> {
    let mut high_flat: Vec<Stack> = high.into_values().flatten().collect();
    let mut low_flat: Vec<Stack> = low.into_values().flatten().collect();

    let mut out = Vec::new();
    let mut prev_high = false;

    if must_start_low && !low_flat.is_empty() {
        let idx = rng.uniform_index(low_flat.len());
        out.push(low_flat.swap_remove(idx));
    }

    while !high_flat.is_empty() || !low_flat.is_empty() {
        let emit_high = if prev_high {
            if low_flat.is_empty() {
                return None;
            }
            false
        } else if high_flat.is_empty() {
            false
        } else if low_flat.is_empty() {
            true
        } else {
            rng.next_f64() < 0.5 || high_flat.len() > low_flat.len()
        };

        if emit_high {
            let idx = rng.uniform_index(high_flat.len());
            out.push(high_flat.swap_remove(idx));
            prev_high = true;
        } else {
            let idx = rng.uniform_index(low_flat.len());
            out.push(low_flat.swap_remove(idx));
            prev_high = false;
        }
    }
    Some(out)
}

/// Runs one sequencing attempt with a fresh `Mulberry32::new(seed, attempt)`.
fn attempt(histogram: &StackHistogram, classes: &SymbolClasses, radius: u32, seed: u32, attempt: u32) -> Option<Vec<Stack>> {
    let mut rng = Mulberry32::new(seed, attempt);
    let (specials, mut high, mut low) = build_buckets(histogram, classes);

    let mut strip = Vec::new();
    if specials.is_empty() {
        strip.extend(build_suffix(high, low, false, &mut rng)?);
        return Some(strip);
    }

    for special in specials {
        strip.push(special);
        if radius > 1 {
            strip.extend(fill_gap(radius - 1, &mut high, &mut low, &mut rng)?);
        }
    }
    strip.extend(build_suffix(high, low, true, &mut rng)?);
    Some(strip)
}

/// Produces a cyclic reel strip for `histogram`, or a `SequencerError` once
/// `max_attempts` consecutive tries all fail to drain the buckets legally.
pub fn sequence_reel(
    histogram: &StackHistogram,
    classes: &SymbolClasses,
    radius: u32,
    seed: u32,
    max_attempts: u32,
) -> Result<Vec<Stack>, SequencerError> {
    if radius < 1 {
        return Err(SequencerError::InvalidRadius { radius });
    }
    for n in 0..max_attempts {
        if let Some(stacks) = attempt(histogram, classes, radius, seed, n) {
            return Ok(stacks);
        }
        log::debug!("reel sequencing attempt {n} failed for seed {seed}");
    }
    log::warn!("reel sequencer exhausted {max_attempts} attempts for seed {seed}");
    Err(SequencerError::Exhausted { seed, attempts: max_attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn classes(special: &[u32], high: &[u32]) -> SymbolClasses {
        let wild: HashSet<u32> = special.iter().copied().collect();
        SymbolClasses::new(&wild, &HashSet::new(), &high.iter().copied().collect())
    }

    /// S1 — pure-low strip: two length-1 stacks of the same symbol, order-free.
    #[test]
    fn s1_pure_low_strip() {
        let histogram = StackHistogram::from_rows(vec![(5, vec![2])]);
        let classes = classes(&[], &[]);
        let strip = sequence_reel(&histogram, &classes, 2, 1, DEFAULT_MAX_ATTEMPTS).unwrap();
        assert_eq!(strip, vec![Stack::new(5, 1), Stack::new(5, 1)]);
    }

    /// S2 — insufficient low stock to fill the required gaps: every attempt
    /// fails and the call reports exhaustion.
    #[test]
    fn s2_special_spacing_exhausts_on_insufficient_stock() {
        let histogram = StackHistogram::from_rows(vec![(1, vec![2]), (5, vec![1])]);
        let classes = classes(&[1], &[]);
        let err = sequence_reel(&histogram, &classes, 3, 1, DEFAULT_MAX_ATTEMPTS).unwrap_err();
        assert_eq!(err, SequencerError::Exhausted { seed: 1, attempts: DEFAULT_MAX_ATTEMPTS });
    }

    #[test]
    fn sequenced_strip_preserves_stack_multiset() {
        let histogram = StackHistogram::from_rows(vec![(1, vec![1]), (5, vec![2, 1]), (9, vec![1, 1])]);
        let classes = classes(&[1], &[9]);
        let strip = sequence_reel(&histogram, &classes, 2, 77, DEFAULT_MAX_ATTEMPTS).unwrap();

        let mut expected = histogram.to_stacks();
        let mut actual = strip.clone();
        expected.sort_by_key(|s| (s.symbol, s.length));
        actual.sort_by_key(|s| (s.symbol, s.length));
        assert_eq!(expected, actual);
    }

    #[test]
    fn same_seed_reproduces_identical_strip() {
        let histogram = StackHistogram::from_rows(vec![(1, vec![2]), (5, vec![3]), (9, vec![2])]);
        let classes = classes(&[1], &[9]);
        let a = sequence_reel(&histogram, &classes, 2, 555, DEFAULT_MAX_ATTEMPTS).unwrap();
        let b = sequence_reel(&histogram, &classes, 2, 555, DEFAULT_MAX_ATTEMPTS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn specials_are_separated_by_at_least_radius_minus_one() {
        let histogram = StackHistogram::from_rows(vec![(1, vec![3]), (5, vec![6])]);
        let classes = classes(&[1], &[]);
        let radius = 3;
        let strip = sequence_reel(&histogram, &classes, radius, 314, DEFAULT_MAX_ATTEMPTS).unwrap();

        let n = strip.len();
        let special_positions: Vec<usize> = (0..n).filter(|&i| classes.is_special(strip[i].symbol)).collect();
        for w in special_positions.windows(2) {
            let gap = w[1] - w[0] - 1;
            assert!(gap as u32 >= radius - 1);
        }
        // wraparound: last special back to the first, through the suffix.
        let wrap_gap = (n - special_positions[special_positions.len() - 1] - 1) + special_positions[0];
        assert!(wrap_gap as u32 >= radius - 1);
    }

    #[test]
    fn rejects_zero_radius() {
        let histogram = StackHistogram::from_rows(vec![(5, vec![1])]);
        let classes = classes(&[], &[]);
        let err = sequence_reel(&histogram, &classes, 0, 1, DEFAULT_MAX_ATTEMPTS).unwrap_err();
        assert_eq!(err, SequencerError::InvalidRadius { radius: 0 });
    }
}
