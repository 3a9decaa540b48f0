//! Test utilities for the largetext crates.
//!
//! - Data generation: synthetic texts, encoded in any supported charset and
//!   written to temporary files
//! - Byte sources with controllable behavior (blocking reads)

pub mod data_gen;
pub mod sources;
