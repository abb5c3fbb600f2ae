//! Slot machine configuration: window sizes, special symbol sets, paytable
//! and payline patterns. Immutable once validated.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::symbols::SymbolId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("window must list at least one reel")]
    EmptyWindow,
    #[error("line {line_index} has {actual} entries, expected one per reel ({expected})")]
    LineArityMismatch {
        line_index: usize,
        actual: usize,
        expected: usize,
    },
    #[error("line {line_index} picks row {row} on reel {reel}, but that reel's window only has {window} rows")]
    LineRowOutOfBounds {
        line_index: usize,
        reel: usize,
        row: usize,
        window: usize,
    },
    #[error("paytable entry for symbol {symbol} has an empty payout sequence")]
    EmptyPaytableEntry { symbol: SymbolId },
    #[error("window size for reel {reel} must be at least 1, got {size}")]
    ZeroWindow { reel: usize, size: usize },
}

/// Immutable per-run slot configuration (spec.md §3 `SlotMachineConfig`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotMachineConfig {
    window: Vec<usize>,
    wild: HashSet<SymbolId>,
    scatter: HashSet<SymbolId>,
    /// Operator-designated "high" symbols — everything else that isn't
    /// special is implicitly "low". Not part of the distilled interface
    /// schema; see DESIGN.md for why this field was added.
    #[serde(default)]
    high: HashSet<SymbolId>,
    paytable: HashMap<SymbolId, Vec<i64>>,
    lines: Vec<Vec<usize>>,
}

impl SlotMachineConfig {
    pub fn new(
        window: Vec<usize>,
        wild: HashSet<SymbolId>,
        scatter: HashSet<SymbolId>,
        high: HashSet<SymbolId>,
        paytable: HashMap<SymbolId, Vec<i64>>,
        lines: Vec<Vec<usize>>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            window,
            wild,
            scatter,
            high,
            paytable,
            lines,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.window.is_empty() {
            return Err(ConfigError::EmptyWindow);
        }
        for (reel, &size) in self.window.iter().enumerate() {
            if size == 0 {
                return Err(ConfigError::ZeroWindow { reel, size });
            }
        }
        for (line_index, line) in self.lines.iter().enumerate() {
            if line.len() != self.window.len() {
                return Err(ConfigError::LineArityMismatch {
                    line_index,
                    actual: line.len(),
                    expected: self.window.len(),
                });
            }
            for (reel, &row) in line.iter().enumerate() {
                if row >= self.window[reel] {
                    return Err(ConfigError::LineRowOutOfBounds {
                        line_index,
                        reel,
                        row,
                        window: self.window[reel],
                    });
                }
            }
        }
        for (&symbol, payouts) in &self.paytable {
            if payouts.is_empty() {
                return Err(ConfigError::EmptyPaytableEntry { symbol });
            }
        }
        Ok(())
    }

    pub fn reel_count(&self) -> usize {
        self.window.len()
    }

    pub fn window(&self) -> &[usize] {
        &self.window
    }

    pub fn wild(&self) -> &HashSet<SymbolId> {
        &self.wild
    }

    pub fn scatter(&self) -> &HashSet<SymbolId> {
        &self.scatter
    }

    pub fn high(&self) -> &HashSet<SymbolId> {
        &self.high
    }

    pub fn lines(&self) -> &[Vec<usize>] {
        &self.lines
    }

    pub fn is_wild(&self, symbol: SymbolId) -> bool {
        self.wild.contains(&symbol)
    }

    pub fn is_scatter(&self, symbol: SymbolId) -> bool {
        self.scatter.contains(&symbol)
    }

    pub fn is_special(&self, symbol: SymbolId) -> bool {
        self.is_wild(symbol) || self.is_scatter(symbol)
    }

    /// Payout for `symbol` at `run_len` (1-based match count), or 0 if the
    /// symbol isn't paytable-indexed or the run is longer than its entry.
    pub fn payout(&self, symbol: SymbolId, run_len: u32) -> i64 {
        self.paytable
            .get(&symbol)
            .and_then(|payouts| payouts.get(run_len.saturating_sub(1) as usize))
            .copied()
            .unwrap_or(0)
    }

    pub fn max_single_symbol_payout(&self) -> i64 {
        self.paytable
            .values()
            .flat_map(|payouts| payouts.iter().copied())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_paytable() -> HashMap<SymbolId, Vec<i64>> {
        HashMap::from([(7, vec![2, 5, 10])])
    }

    #[test]
    fn rejects_line_arity_mismatch() {
        let err = SlotMachineConfig::new(
            vec![3],
            HashSet::new(),
            HashSet::new(),
            HashSet::new(),
            sample_paytable(),
            vec![vec![0, 0]],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::LineArityMismatch {
                line_index: 0,
                actual: 2,
                expected: 1
            }
        );
    }

    #[test]
    fn rejects_line_row_out_of_bounds() {
        let err = SlotMachineConfig::new(
            vec![3],
            HashSet::new(),
            HashSet::new(),
            HashSet::new(),
            sample_paytable(),
            vec![vec![3]],
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::LineRowOutOfBounds {
                line_index: 0,
                reel: 0,
                row: 3,
                window: 3
            }
        );
    }

    #[test]
    fn rejects_empty_paytable_entry() {
        let err = SlotMachineConfig::new(
            vec![3],
            HashSet::new(),
            HashSet::new(),
            HashSet::new(),
            HashMap::from([(7, vec![])]),
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::EmptyPaytableEntry { symbol: 7 });
    }

    #[test]
    fn accepts_valid_config() {
        let config = SlotMachineConfig::new(
            vec![3],
            HashSet::new(),
            HashSet::new(),
            HashSet::new(),
            sample_paytable(),
            vec![vec![0]],
        )
        .unwrap();
        assert_eq!(config.payout(7, 1), 2);
        assert_eq!(config.payout(7, 3), 10);
        assert_eq!(config.payout(7, 4), 0);
        assert_eq!(config.payout(1, 1), 0);
    }
}
