//! The Simulator: Monte Carlo aggregation of many spins into RTP, hit
//! frequency, bonus frequency and per-(symbol, length) win statistics.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::SlotMachineConfig;
pub use crate::spin::SimulatorError;
use crate::spin::SpinEngine;
use crate::symbols::{ReelStrip, SymbolId};

/// Aggregate stats for one (symbol, run length) pairing across a simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SymbolLengthStats {
    pub hits: u64,
    pub total_win: i64,
}

/// The raw metrics spec.md §4.D defines, bundled for reuse by both the
/// `runSimulation` interface and the Fitness Function.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationBreakdown {
    pub rtp: f64,
    pub hit_frequency: f64,
    pub bonus_frequency: f64,
    /// Per-symbol RTP: each symbol's share of total win, divided by spin count.
    pub symbol_rtp: HashMap<SymbolId, f64>,
}

/// Full output of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub spin_count: u64,
    pub total_win: i64,
    pub hits: u64,
    pub bonus_hits: u64,
    pub by_symbol_length: HashMap<(SymbolId, u32), SymbolLengthStats>,
}

impl SimulationReport {
    pub fn rtp(&self) -> f64 {
        if self.spin_count == 0 {
            return 0.0;
        }
        self.total_win as f64 / self.spin_count as f64
    }

    pub fn hit_frequency(&self) -> f64 {
        if self.spin_count == 0 {
            return 0.0;
        }
        self.hits as f64 / self.spin_count as f64
    }

    pub fn bonus_frequency(&self) -> f64 {
        if self.spin_count == 0 {
            return 0.0;
        }
        self.bonus_hits as f64 / self.spin_count as f64
    }

    pub fn symbol_rtp(&self) -> HashMap<SymbolId, f64> {
        let mut totals: HashMap<SymbolId, i64> = HashMap::new();
        for (&(symbol, _), stats) in &self.by_symbol_length {
            *totals.entry(symbol).or_insert(0) += stats.total_win;
        }
        totals
            .into_iter()
            .map(|(symbol, total)| {
                let rtp = if self.spin_count == 0 {
                    0.0
                } else {
                    total as f64 / self.spin_count as f64
                };
                (symbol, rtp)
            })
            .collect()
    }

    pub fn to_breakdown(&self) -> SimulationBreakdown {
        SimulationBreakdown {
            rtp: self.rtp(),
            hit_frequency: self.hit_frequency(),
            bonus_frequency: self.bonus_frequency(),
            symbol_rtp: self.symbol_rtp(),
        }
    }
}

/// Runs `spin_count` spins of `reels`/`config`, drawing each spin's index
/// uniformly from `[0, cycle)` with a PRNG seeded from `seed`, and
/// aggregating the statistics spec.md §4.D requires.
///
/// The spin index is drawn from a seeded generator rather than an ambient
/// shared one (see spec.md §9) so that two calls with the same `seed` over
/// the same reels/config reproduce bitwise-identical reports.
///
/// Errors immediately, before any spin runs, if the reel/window counts
/// don't match or if the reel cycle (`Π_r |reel_r|`) would overflow a
/// 64-bit signed counter — never discovered mid-run.
pub fn run_simulation(
    reels: Vec<ReelStrip>,
    config: SlotMachineConfig,
    spin_count: u64,
    seed: u64,
) -> Result<SimulationReport, SimulatorError> {
    if spin_count == 0 {
        return Err(SimulatorError::ZeroSpinCount);
    }

    let mut engine = SpinEngine::new(reels, config)?;
    let cycle = engine.cycle()?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut total_win: i64 = 0;
    let mut hits: u64 = 0;
    let mut bonus_hits: u64 = 0;
    let mut by_symbol_length: HashMap<(SymbolId, u32), SymbolLengthStats> = HashMap::new();

    for _ in 0..spin_count {
        let index = rng.random_range(0..cycle);
        let outcome = engine.spin(index, true);
        if outcome.total_win > 0 {
            hits += 1;
            total_win += outcome.total_win;
        }
        if outcome.bonus_triggered {
            bonus_hits += 1;
        }
        for combo in &outcome.winning_combinations {
            let entry = by_symbol_length
                .entry((combo.symbol, combo.length))
                .or_default();
            entry.hits += 1;
            entry.total_win += combo.win;
        }
    }

    Ok(SimulationReport {
        spin_count,
        total_win,
        hits,
        bonus_hits,
        by_symbol_length,
    })
}
