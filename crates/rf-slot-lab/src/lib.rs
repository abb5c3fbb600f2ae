//! # rf-slot-lab — reel data model and spin evaluator
//!
//! Provides the slot machine data model (symbols, stacks, reel strips,
//! configuration), the Spin Engine that evaluates a single spin against a
//! fixed set of reel strips, and the Simulator that aggregates many spins
//! into RTP, hit frequency, bonus frequency and per-symbol statistics.
//!
//! ## Architecture
//!
//! ```text
//! SlotMachineConfig + ReelStrip
//!     │
//!     v
//! SpinEngine::spin(i) → SpinOutcome
//!     │
//!     v
//! run_simulation(..) → SimulationReport
//! ```
//!
//! `rf-ab-sim` builds on this crate to sequence reel strips from a genome
//! and search for ones that hit simulation targets.

pub mod config;
pub mod simulator;
pub mod spin;
pub mod symbols;

pub use config::*;
pub use simulator::*;
pub use spin::*;
pub use symbols::*;
