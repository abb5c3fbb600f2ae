//! # rf-ab-sim — deterministic reel sequencing and genetic reel-strip search
//!
//! Builds on `rf-slot-lab`'s data model and Spin Engine to search for reel
//! strips whose simulated statistics match operator-supplied targets:
//!
//! - [`rng`] — the Mulberry32 PRNG every sequencing draw routes through.
//! - [`sequencer`] — turns a stack histogram into a concrete cyclic strip.
//! - [`genome`] — per-reel gene boxes and the BLX-α / Gaussian GA operators.
//! - [`fitness`] — scores simulator output against targets.
//! - [`ga`] — the generation loop (`run_genetic_search`, spec.md §6).

pub mod fitness;
pub mod ga;
pub mod genome;
pub mod rng;
pub mod sequencer;

pub use fitness::*;
pub use ga::*;
pub use genome::*;
pub use rng::*;
pub use sequencer::*;
