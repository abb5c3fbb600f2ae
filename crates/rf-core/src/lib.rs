//! rf-core: shared types and utilities for ReelForge
//!
//! Provides the error type shared by crates that compose the reel-search core.

mod error;

pub use error::*;
