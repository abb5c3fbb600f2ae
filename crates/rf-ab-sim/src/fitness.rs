//! The Fitness Function: composes simulator output against operator targets
//! into a single scalar ("lower is better") plus a reported breakdown.

use std::collections::HashMap;

use rf_slot_lab::simulator::SimulationBreakdown;
use rf_slot_lab::symbols::SymbolId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TargetsError {
    #[error("{field} must be in [0, 1], got {value}")]
    RateOutOfRange { field: &'static str, value: f64 },
}

/// Operator-supplied targets a candidate reel set is scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationTargets {
    pub target_rtp: f64,
    pub target_hit_frequency: f64,
    pub target_bonus_frequency: f64,
    #[serde(default)]
    pub symbol_rtp_targets: HashMap<SymbolId, f64>,
    #[serde(default)]
    pub symbol_rtp_unevenness_weight: f64,
}

impl SimulationTargets {
    /// `targetHitFrequency` and `targetBonusFrequency` are rates and must
    /// stay in `[0, 1]` (spec.md:44); `targetRtp` is unbounded (an RTP
    /// target can exceed 1.0) and isn't checked here.
    pub fn validate(&self) -> Result<(), TargetsError> {
        if !(0.0..=1.0).contains(&self.target_hit_frequency) {
            return Err(TargetsError::RateOutOfRange {
                field: "targetHitFrequency",
                value: self.target_hit_frequency,
            });
        }
        if !(0.0..=1.0).contains(&self.target_bonus_frequency) {
            return Err(TargetsError::RateOutOfRange {
                field: "targetBonusFrequency",
                value: self.target_bonus_frequency,
            });
        }
        Ok(())
    }
}

/// Relative-delta error: `|t-a| / (|t|+|a|)`, or `0` when both are ~0.
pub fn relative_delta(target: f64, actual: f64) -> f64 {
    let denom = target.abs() + actual.abs();
    if denom < 1e-12 {
        0.0
    } else {
        (target - actual).abs() / denom
    }
}

/// Per-component breakdown of one individual's fitness, lowest `total` wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessBreakdown {
    pub total: f64,
    pub rtp_error: f64,
    pub hit_frequency_error: f64,
    pub bonus_frequency_error: f64,
    pub symbol_rtp_error: f64,
    pub rtp: f64,
    pub hit_frequency: f64,
    pub bonus_frequency: f64,
}

/// Scores a simulation breakdown against `targets`, per spec.md §4.F.
pub fn evaluate(breakdown: &SimulationBreakdown, targets: &SimulationTargets) -> FitnessBreakdown {
    let rtp_error = relative_delta(targets.target_rtp, breakdown.rtp);
    let hit_frequency_error = relative_delta(targets.target_hit_frequency, breakdown.hit_frequency);
    let bonus_frequency_error = relative_delta(targets.target_bonus_frequency, breakdown.bonus_frequency);

    let symbol_rtp_error = if targets.symbol_rtp_targets.is_empty() {
        0.0
    } else {
        let sum: f64 = targets
            .symbol_rtp_targets
            .iter()
            .map(|(symbol, &target)| {
                let actual = breakdown.symbol_rtp.get(symbol).copied().unwrap_or(0.0);
                relative_delta(target, actual)
            })
            .sum();
        sum / targets.symbol_rtp_targets.len() as f64
    };

    let total = rtp_error
        + hit_frequency_error
        + bonus_frequency_error
        + targets.symbol_rtp_unevenness_weight * symbol_rtp_error;

    FitnessBreakdown {
        total,
        rtp_error,
        hit_frequency_error,
        bonus_frequency_error,
        symbol_rtp_error,
        rtp: breakdown.rtp,
        hit_frequency: breakdown.hit_frequency,
        bonus_frequency: breakdown.bonus_frequency,
    }
}
