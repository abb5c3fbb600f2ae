//! The GA's genome: per-reel gene boxes, histogram sampling, and the BLX-α
//! crossover / Gaussian mutation operators that act directly on stack
//! counts. Kept as flat `StackHistogram`s (see `rf_slot_lab::symbols`) so
//! cloning an individual is a handful of `Vec` copies, not a tree of maps.

use std::collections::BTreeMap;

use rand::Rng;
use rf_slot_lab::symbols::{ReelStrip, Stack, StackHistogram, SymbolId};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenomeError {
    #[error("reel box is missing a `low`/`high` bound for symbol {symbol}")]
    MissingSymbol { symbol: SymbolId },
    #[error("symbol {symbol} has low/high bounds of different lengths ({low_len} vs {high_len})")]
    BoundLengthMismatch {
        symbol: SymbolId,
        low_len: usize,
        high_len: usize,
    },
    #[error("symbol {symbol} index {index} has low bound {low} greater than high bound {high}")]
    LowExceedsHigh {
        symbol: SymbolId,
        index: usize,
        low: u32,
        high: u32,
    },
    #[error("radius must be at least 1, got {radius}")]
    InvalidRadius { radius: u32 },
}

/// The `[low, high]` box every gene of one reel's histogram must stay
/// within, plus the sequencing parameters that are fixed per reel.
#[derive(Debug, Clone)]
pub struct ReelBox {
    pub radius: u32,
    pub seed: u32,
    low: BTreeMap<SymbolId, Vec<u32>>,
    high: BTreeMap<SymbolId, Vec<u32>>,
}

impl ReelBox {
    pub fn new(
        radius: u32,
        seed: u32,
        low: BTreeMap<SymbolId, Vec<u32>>,
        high: BTreeMap<SymbolId, Vec<u32>>,
    ) -> Result<Self, GenomeError> {
        if radius < 1 {
            return Err(GenomeError::InvalidRadius { radius });
        }
        for (&symbol, low_row) in &low {
            let high_row = high
                .get(&symbol)
                .ok_or(GenomeError::MissingSymbol { symbol })?;
            if low_row.len() != high_row.len() {
                return Err(GenomeError::BoundLengthMismatch {
                    symbol,
                    low_len: low_row.len(),
                    high_len: high_row.len(),
                });
            }
            for (index, (&lo, &hi)) in low_row.iter().zip(high_row.iter()).enumerate() {
                if lo > hi {
                    return Err(GenomeError::LowExceedsHigh {
                        symbol,
                        index,
                        low: lo,
                        high: hi,
                    });
                }
            }
        }
        for &symbol in high.keys() {
            if !low.contains_key(&symbol) {
                return Err(GenomeError::MissingSymbol { symbol });
            }
        }
        Ok(Self { radius, seed, low, high })
    }

    pub fn symbols(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.low.keys().copied()
    }

    pub fn bounds_for(&self, symbol: SymbolId) -> Option<(&[u32], &[u32])> {
        let lo = self.low.get(&symbol)?;
        let hi = self.high.get(&symbol)?;
        Some((lo, hi))
    }

    /// Samples a fresh histogram with every gene drawn uniformly in its box.
    pub fn sample(&self, rng: &mut impl Rng) -> StackHistogram {
        let rows = self
            .low
            .iter()
            .map(|(&symbol, low_row)| {
                let high_row = &self.high[&symbol];
                let counts = low_row
                    .iter()
                    .zip(high_row.iter())
                    .map(|(&lo, &hi)| if lo == hi { lo } else { rng.random_range(lo..=hi) })
                    .collect();
                (symbol, counts)
            })
            .collect();
        StackHistogram::from_rows(rows)
    }

    fn clamp(&self, symbol: SymbolId, index: usize, value: i64) -> u32 {
        let (lo, hi) = self.bounds_for(symbol).expect("symbol must be in box");
        value.clamp(lo[index] as i64, hi[index] as i64) as u32
    }
}

/// BLX-α blend crossover over every gene of two same-boxed histograms,
/// producing two offspring.
pub fn blend_crossover(
    reel_box: &ReelBox,
    parent_a: &StackHistogram,
    parent_b: &StackHistogram,
    alpha: f64,
    rng: &mut impl Rng,
) -> (StackHistogram, StackHistogram) {
    let mut rows_a = Vec::new();
    let mut rows_b = Vec::new();

    for symbol in reel_box.symbols() {
        let x_row = parent_a.counts_for(symbol).expect("parent missing boxed symbol");
        let y_row = parent_b.counts_for(symbol).expect("parent missing boxed symbol");
        let mut out_a = Vec::with_capacity(x_row.len());
        let mut out_b = Vec::with_capacity(x_row.len());

        for i in 0..x_row.len() {
            let x = x_row[i] as f64;
            let y = y_row[i] as f64;
            let spread = alpha * (x - y).abs();
            let lo = (x.min(y) - spread).round();
            let hi = (x.max(y) + spread).round();
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            let draw_a = if (hi - lo).abs() < f64::EPSILON { lo } else { rng.random_range(lo..=hi) };
            let draw_b = if (hi - lo).abs() < f64::EPSILON { lo } else { rng.random_range(lo..=hi) };

            out_a.push(reel_box.clamp(symbol, i, draw_a.round() as i64));
            out_b.push(reel_box.clamp(symbol, i, draw_b.round() as i64));
        }
        rows_a.push((symbol, out_a));
        rows_b.push((symbol, out_b));
    }

    (StackHistogram::from_rows(rows_a), StackHistogram::from_rows(rows_b))
}

/// Box-Muller standard normal sample from two independent uniform draws.
fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Gaussian mutation: each gene independently mutates with probability
/// `mutation_rate`, then is clamped back into its box.
pub fn gaussian_mutate(
    reel_box: &ReelBox,
    histogram: &StackHistogram,
    mutation_rate: f64,
    mutation_sigma: f64,
    rng: &mut impl Rng,
) -> StackHistogram {
    let mut mutated = histogram.clone();
    for (symbol, row) in mutated.rows_mut() {
        for (i, gene) in row.iter_mut().enumerate() {
            if rng.random_range(0.0..1.0) < mutation_rate {
                let delta = (standard_normal(rng) * mutation_sigma).round() as i64;
                *gene = reel_box.clamp(symbol, i, *gene as i64 + delta);
            }
        }
    }
    mutated
}

/// One candidate: a sequenced strip per reel plus the histogram that
/// produced it. A genome produced by any GA operator always carries a
/// successfully sequenced strip for every reel.
#[derive(Debug, Clone)]
pub struct Individual {
    pub histograms: Vec<StackHistogram>,
    pub strips: Vec<ReelStrip>,
}

impl Individual {
    pub fn new(histograms: Vec<StackHistogram>, strips: Vec<ReelStrip>) -> Self {
        debug_assert_eq!(histograms.len(), strips.len());
        Self { histograms, strips }
    }
}

pub(crate) fn stacks_to_strip(stacks: Vec<Stack>) -> ReelStrip {
    ReelStrip::from_stacks(&stacks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_box() -> ReelBox {
        let mut low = BTreeMap::new();
        let mut high = BTreeMap::new();
        low.insert(5, vec![1, 0]);
        high.insert(5, vec![3, 2]);
        ReelBox::new(2, 1, low, high).unwrap()
    }

    #[test]
    fn rejects_mismatched_bound_lengths() {
        let mut low = BTreeMap::new();
        let mut high = BTreeMap::new();
        low.insert(5, vec![1, 0]);
        high.insert(5, vec![3]);
        let err = ReelBox::new(1, 1, low, high).unwrap_err();
        assert_eq!(
            err,
            GenomeError::BoundLengthMismatch { symbol: 5, low_len: 2, high_len: 1 }
        );
    }

    #[test]
    fn rejects_low_exceeding_high() {
        let mut low = BTreeMap::new();
        let mut high = BTreeMap::new();
        low.insert(5, vec![4]);
        high.insert(5, vec![3]);
        let err = ReelBox::new(1, 1, low, high).unwrap_err();
        assert_eq!(err, GenomeError::LowExceedsHigh { symbol: 5, index: 0, low: 4, high: 3 });
    }

    #[test]
    fn sample_stays_within_box() {
        let reel_box = sample_box();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..200 {
            let histogram = reel_box.sample(&mut rng);
            let row = histogram.counts_for(5).unwrap();
            assert!(row[0] >= 1 && row[0] <= 3);
            assert!(row[1] <= 2);
        }
    }

    #[test]
    fn crossover_offspring_stay_within_box() {
        let reel_box = sample_box();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let a = StackHistogram::from_rows(vec![(5, vec![1, 0])]);
        let b = StackHistogram::from_rows(vec![(5, vec![3, 2])]);
        for _ in 0..100 {
            let (child_a, child_b) = blend_crossover(&reel_box, &a, &b, 0.5, &mut rng);
            for child in [&child_a, &child_b] {
                let row = child.counts_for(5).unwrap();
                assert!(row[0] >= 1 && row[0] <= 3);
                assert!(row[1] <= 2);
            }
        }
    }

    #[test]
    fn zero_rate_mutation_is_identity() {
        let reel_box = sample_box();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let original = StackHistogram::from_rows(vec![(5, vec![2, 1])]);
        let mutated = gaussian_mutate(&reel_box, &original, 0.0, 1.0, &mut rng);
        assert_eq!(original, mutated);
    }
}
