//! The Spin Engine: window sampling, payline evaluation and the bonus
//! predicate for a single spin, at the throughput the Simulator needs to
//! run millions of spins per fitness call.

use thiserror::Error;

use crate::config::SlotMachineConfig;
use crate::symbols::{ReelStrip, SymbolId};

/// Construction- and run-time errors the Spin Engine and Simulator share
/// (spec.md §7's `ConfigInvalid` family plus the overflow case it names
/// separately).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulatorError {
    #[error("reel count ({reels}) does not match the configured window length ({windows})")]
    ReelWindowMismatch { reels: usize, windows: usize },
    #[error("reel cycle {cycle_description} overflows a 64-bit signed counter; reduce reel lengths or spin count")]
    CycleOverflow { cycle_description: String },
    #[error("spin count must be at least 1")]
    ZeroSpinCount,
}

/// A non-zero payline win, recorded only in the "recording" spin path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinningCombination {
    pub symbol: SymbolId,
    pub length: u32,
    pub win: i64,
}

/// The result of a single spin.
#[derive(Debug, Clone, Default)]
pub struct SpinOutcome {
    pub total_win: i64,
    pub bonus_triggered: bool,
    /// Populated only when the spin was run with recording enabled; bounded
    /// by the number of paylines.
    pub winning_combinations: Vec<WinningCombination>,
}

/// Evaluates spins against a fixed set of reel strips and a slot
/// configuration. Owns reusable per-instance buffers so the non-recording
/// fast path performs no per-spin allocation.
#[derive(Debug)]
pub struct SpinEngine {
    config: SlotMachineConfig,
    reels: Vec<ReelStrip>,
    /// Per line, the flat cell-buffer index to read from each reel.
    flat_lines: Vec<Vec<usize>>,
    /// `suffix_product[r]` = product of reel lengths strictly after `r`.
    suffix_product: Vec<u64>,
    cell_buffer: Vec<SymbolId>,
    offset_buffer: Vec<usize>,
}

impl SpinEngine {
    /// Builds an engine over `reels`/`config`, or reports `ConfigInvalid`
    /// immediately — never a partial, half-built engine (spec.md §7).
    pub fn new(reels: Vec<ReelStrip>, config: SlotMachineConfig) -> Result<Self, SimulatorError> {
        if reels.len() != config.reel_count() {
            return Err(SimulatorError::ReelWindowMismatch {
                reels: reels.len(),
                windows: config.reel_count(),
            });
        }
        let flat_lines = Self::flatten_lines(&config);
        let suffix_product = Self::suffix_products(&reels);
        let total_window: usize = config.window().iter().sum();
        Ok(Self {
            cell_buffer: vec![0; total_window],
            offset_buffer: vec![0; reels.len()],
            config,
            reels,
            flat_lines,
            suffix_product,
        })
    }

    fn flatten_lines(config: &SlotMachineConfig) -> Vec<Vec<usize>> {
        let mut cumulative = Vec::with_capacity(config.window().len());
        let mut total = 0usize;
        for &w in config.window() {
            cumulative.push(total);
            total += w;
        }
        config
            .lines()
            .iter()
            .map(|line| {
                line.iter()
                    .enumerate()
                    .map(|(r, &row)| cumulative[r] + row)
                    .collect()
            })
            .collect()
    }

    fn suffix_products(reels: &[ReelStrip]) -> Vec<u64> {
        let mut products = vec![1u64; reels.len()];
        for r in (0..reels.len().saturating_sub(1)).rev() {
            products[r] = products[r + 1] * reels[r + 1].len() as u64;
        }
        products
    }

    pub fn config(&self) -> &SlotMachineConfig {
        &self.config
    }

    pub fn reels(&self) -> &[ReelStrip] {
        &self.reels
    }

    /// The full spin-index cycle `Π_r |reel_r|`. Errors if the product
    /// overflows a 64-bit *signed* range (spec.md:137) even though the
    /// cycle is carried as `u64` — a cycle in `(i64::MAX, u64::MAX]` is
    /// still rejected.
    pub fn cycle(&self) -> Result<u64, SimulatorError> {
        let product = self
            .reels
            .iter()
            .try_fold(1u64, |acc, reel| acc.checked_mul(reel.len() as u64));
        match product {
            Some(cycle) if cycle <= i64::MAX as u64 => Ok(cycle),
            _ => Err(SimulatorError::CycleOverflow {
                cycle_description: self
                    .reels
                    .iter()
                    .map(|r| r.len().to_string())
                    .collect::<Vec<_>>()
                    .join(" * "),
            }),
        }
    }

    /// Fills the cell buffer for spin index `i`, per spec.md §4.C's window
    /// decomposition. `i` and `i + cycle` produce identical windows.
    fn load_window(&mut self, spin_index: u64) {
        for (r, reel) in self.reels.iter().enumerate() {
            let len = reel.len() as u64;
            let offset = (spin_index / self.suffix_product[r]) % len;
            self.offset_buffer[r] = offset as usize;
        }
        let mut cell = 0;
        for (r, reel) in self.reels.iter().enumerate() {
            let window = self.config.window()[r];
            let offset = self.offset_buffer[r];
            for k in 0..window {
                self.cell_buffer[cell] = reel.symbol_at(offset + k);
                cell += 1;
            }
        }
    }

    /// Runs one spin, filling the internal window buffer and evaluating
    /// every line plus the bonus predicate. `record` controls whether
    /// winning combinations are collected (the hot Monte-Carlo path should
    /// pass `false`).
    pub fn spin(&mut self, spin_index: u64, record: bool) -> SpinOutcome {
        self.load_window(spin_index);

        let mut total_win: i64 = 0;
        let mut winning_combinations = Vec::new();

        for flat_line in &self.flat_lines {
            if let Some(combo) = Self::evaluate_line(&self.cell_buffer, flat_line, &self.config) {
                total_win += combo.win;
                if record {
                    winning_combinations.push(combo);
                }
            }
        }

        let bonus_triggered = self.bonus_triggered();

        SpinOutcome {
            total_win,
            bonus_triggered,
            winning_combinations,
        }
    }

    fn evaluate_line(
        cell_buffer: &[SymbolId],
        flat_line: &[usize],
        config: &SlotMachineConfig,
    ) -> Option<WinningCombination> {
        let mut locked_symbol = cell_buffer[flat_line[0]];
        let mut run_len: u32 = 1;

        for &cell_index in &flat_line[1..] {
            let s = cell_buffer[cell_index];

            if config.is_scatter(locked_symbol) {
                if config.is_scatter(s) {
                    run_len += 1;
                    continue;
                } else {
                    break;
                }
            }

            if config.is_wild(locked_symbol) && !config.is_wild(s) && !config.is_scatter(s) {
                locked_symbol = s;
                run_len += 1;
                continue;
            }

            if s == locked_symbol || config.is_wild(s) {
                run_len += 1;
            } else {
                break;
            }
        }

        let payout = config.payout(locked_symbol, run_len);
        if payout == 0 {
            return None;
        }
        Some(WinningCombination {
            symbol: locked_symbol,
            length: run_len,
            win: payout,
        })
    }

    /// A spin triggers a bonus game iff every reel's visible window
    /// contains at least one scatter symbol.
    fn bonus_triggered(&self) -> bool {
        let mut cell = 0;
        for &window in self.config.window() {
            let segment = &self.cell_buffer[cell..cell + window];
            if !segment.iter().any(|&s| self.config.is_scatter(s)) {
                return false;
            }
            cell += window;
        }
        true
    }
}
